//! Triple (coordinate) storage for the local part of a distributed sparse matrix

use num_traits::Num;

/// The local nonzeros of a distributed n×n sparse matrix, in triple form
///
/// Each slot k holds one nonzero a_{ij}: `rows[k]` and `cols[k]` are the
/// *global* 0-based indices, `values[k]` the numerical value. The order is
/// arbitrary; conversion to ICRS establishes the row-major order. A rank
/// stores only the nonzeros assigned to it by the partitioning, so the
/// rows and columns present here are an arbitrary subset of 0..n.
#[derive(Clone, Debug)]
pub struct TripleMatrix<T> {
    /// Global size of the (square) matrix
    pub n: usize,

    /// Global row index of each local nonzero
    pub rows: Vec<usize>,

    /// Global column index of each local nonzero
    pub cols: Vec<usize>,

    /// Numerical value of each local nonzero
    pub values: Vec<T>,
}

impl<T> TripleMatrix<T>
where
    T: Copy + Num,
{
    /// Creates a triple matrix from parallel index/value arrays
    ///
    /// # Panics
    ///
    /// Panics if the arrays differ in length or an index is out of range.
    pub fn new(n: usize, rows: Vec<usize>, cols: Vec<usize>, values: Vec<T>) -> Self {
        assert_eq!(rows.len(), cols.len(), "rows.len() must equal cols.len()");
        assert_eq!(
            cols.len(),
            values.len(),
            "cols.len() must equal values.len()"
        );
        for (&i, &j) in rows.iter().zip(&cols) {
            assert!(i < n, "row index {} out of bounds (n = {})", i, n);
            assert!(j < n, "column index {} out of bounds (n = {})", j, n);
        }

        Self {
            n,
            rows,
            cols,
            values,
        }
    }

    /// Creates an empty triple matrix of global size n
    pub fn empty(n: usize) -> Self {
        Self {
            n,
            rows: Vec::new(),
            cols: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Creates a triple matrix from (row, col, value) entries
    pub fn from_entries(n: usize, entries: &[(usize, usize, T)]) -> Self {
        let rows = entries.iter().map(|e| e.0).collect();
        let cols = entries.iter().map(|e| e.1).collect();
        let values = entries.iter().map(|e| e.2).collect();
        Self::new(n, rows, cols, values)
    }

    /// Returns the number of local nonzeros
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Returns an iterator over the local nonzeros as (row, col, value)
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, T)> + '_ {
        self.rows
            .iter()
            .zip(&self.cols)
            .zip(&self.values)
            .map(|((&i, &j), &v)| (i, j, v))
    }
}
