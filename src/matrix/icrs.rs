//! Incremental Compressed Row Storage (ICRS) matrix format
//!
//! ICRS is a CRS variant where successive column indices are stored as
//! increments rather than absolute positions. Walking the nonzeros needs
//! one running column cursor and one running row cursor: adding an
//! increment that pushes the column cursor past `ncols` signals a row
//! change. This trades one addition per nonzero against storing per-row
//! length metadata, and it is the format the matvec kernel streams over.

use num_traits::Num;
use std::fmt;

/// The local part of a distributed sparse matrix in ICRS form
///
/// Indices are *local*: only the nonempty rows and columns of this rank
/// are represented, renumbered compactly. `row_index` and `col_index` map
/// a local index back to the global one; both are strictly increasing.
///
/// The increments satisfy: `inc[0]` is the local column of the first
/// nonzero; for k > 0, `inc[k]` is the local column difference to the
/// previous nonzero, plus `ncols` when nonzero k starts a new row; the
/// sentinel `inc[nz]` is `ncols` minus the last local column (0 when the
/// matrix is empty). Their sum is therefore `nrows * ncols`.
#[derive(Clone)]
pub struct SparseMatrixICRS<T> {
    /// Global size of the (square) matrix
    pub n: usize,

    /// Number of local nonempty rows
    pub nrows: usize,

    /// Number of local nonempty columns
    pub ncols: usize,

    /// Nonzero values in row-major order, ties by column (size: nz)
    pub values: Vec<T>,

    /// Column-cursor increments (size: nz + 1, the last is the sentinel)
    pub inc: Vec<usize>,

    /// Global row index of each local row (size: nrows)
    pub row_index: Vec<usize>,

    /// Global column index of each local column (size: ncols)
    pub col_index: Vec<usize>,
}

impl<T> SparseMatrixICRS<T>
where
    T: Copy + Num,
{
    /// Creates an ICRS matrix from its parts
    ///
    /// # Panics
    ///
    /// Panics if the array sizes are inconsistent or an index map is not
    /// strictly increasing.
    pub fn new(
        n: usize,
        nrows: usize,
        ncols: usize,
        values: Vec<T>,
        inc: Vec<usize>,
        row_index: Vec<usize>,
        col_index: Vec<usize>,
    ) -> Self {
        assert_eq!(inc.len(), values.len() + 1, "inc.len() must be nz + 1");
        assert_eq!(row_index.len(), nrows, "row_index.len() must be nrows");
        assert_eq!(col_index.len(), ncols, "col_index.len() must be ncols");
        assert!(
            row_index.windows(2).all(|w| w[0] < w[1]),
            "row_index must be strictly increasing"
        );
        assert!(
            col_index.windows(2).all(|w| w[0] < w[1]),
            "col_index must be strictly increasing"
        );

        Self {
            n,
            nrows,
            ncols,
            values,
            inc,
            row_index,
            col_index,
        }
    }

    /// Returns the number of local nonzeros
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Returns an iterator over the nonzeros as (local_row, local_col, value)
    ///
    /// The iterator replays the increment walk the kernel performs, so it
    /// visits nonzeros in row-major order.
    pub fn iter(&self) -> IcrsIter<'_, T> {
        IcrsIter {
            matrix: self,
            k: 0,
            i: 0,
            j: self.inc[0],
        }
    }

    /// Returns an iterator over the nonzeros as (global_row, global_col, value)
    pub fn global_iter(&self) -> impl Iterator<Item = (usize, usize, T)> + '_ {
        self.iter()
            .map(|(i, j, v)| (self.row_index[i], self.col_index[j], v))
    }
}

/// Iterator over ICRS nonzeros in row-major order
pub struct IcrsIter<'a, T> {
    matrix: &'a SparseMatrixICRS<T>,
    k: usize,
    i: usize,
    j: usize,
}

impl<T: Copy + Num> Iterator for IcrsIter<'_, T> {
    type Item = (usize, usize, T);

    fn next(&mut self) -> Option<Self::Item> {
        if self.k >= self.matrix.nnz() {
            return None;
        }
        let entry = (self.i, self.j, self.matrix.values[self.k]);
        self.j += self.matrix.inc[self.k + 1];
        if self.j >= self.matrix.ncols {
            self.j -= self.matrix.ncols;
            self.i += 1;
        }
        self.k += 1;
        Some(entry)
    }
}

impl<T: fmt::Debug + Copy + Num> fmt::Debug for SparseMatrixICRS<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SparseMatrixICRS {{")?;
        writeln!(f, "  global size: {}", self.n)?;
        writeln!(
            f,
            "  local rows × cols: {} × {}, nnz: {}",
            self.nrows,
            self.ncols,
            self.nnz()
        )?;

        let max_entries = 8.min(self.nnz());
        if max_entries > 0 {
            writeln!(f, "  entries (global indices):")?;
            for (i, j, v) in self.global_iter().take(max_entries) {
                writeln!(f, "    ({}, {}) = {:?}", i, j, v)?;
            }
            if self.nnz() > max_entries {
                writeln!(f, "    ... ({} more)", self.nnz() - max_entries)?;
            }
        }
        write!(f, "}}")
    }
}
