//! Conversion from triple format to ICRS
//!
//! The conversion costs O(nz + sqrt(n)) time and memory per rank: two
//! counting-sort passes per index, with a radix of about sqrt(n).

use num_traits::Num;

use crate::matrix::sort::{radix_for, sort_by_key, SortKey};
use crate::matrix::{SparseMatrixICRS, TripleMatrix};

/// Converts a local triple set with global indices into an ICRS matrix
/// with local indices
///
/// The triples are sorted by global row, ties by global column, using a
/// stable counting sort (MOD pass, then DIV pass) per index. Along the
/// way the distinct global columns and rows are collected into the
/// local-to-global maps, and the column increments are derived. The
/// triple set is consumed; its value array becomes the ICRS value array.
pub fn triple_to_icrs<T>(triples: TripleMatrix<T>) -> SparseMatrixICRS<T>
where
    T: Copy + Num,
{
    let TripleMatrix {
        n,
        mut rows,
        mut cols,
        mut values,
    } = triples;
    let nz = values.len();
    let radix = radix_for(n);

    // Sort the nonzeros by global column index
    sort_by_key(n, &mut cols, &mut rows, &mut values, radix, SortKey::Mod);
    sort_by_key(n, &mut cols, &mut rows, &mut values, radix, SortKey::Div);

    // Register each distinct column and rewrite cols to local indices
    let mut col_index: Vec<usize> = Vec::new();
    let mut jglob_last = usize::MAX;
    for k in 0..nz {
        let jglob = cols[k];
        if jglob != jglob_last {
            col_index.push(jglob);
        }
        cols[k] = col_index.len() - 1;
        jglob_last = jglob;
    }
    let ncols = col_index.len();

    // Sort the nonzeros by global row index; stability keeps each row's
    // entries in ascending local-column order
    sort_by_key(n, &mut rows, &mut cols, &mut values, radix, SortKey::Mod);
    sort_by_key(n, &mut rows, &mut cols, &mut values, radix, SortKey::Div);

    // Register each distinct row and derive the column increments
    let mut row_index: Vec<usize> = Vec::new();
    let mut inc: Vec<usize> = Vec::with_capacity(nz + 1);
    let mut iglob_last = usize::MAX;
    for k in 0..nz {
        let new_row = rows[k] != iglob_last;
        let inck = if k == 0 {
            cols[0]
        } else if new_row {
            // wrap past ncols to signal the row change
            cols[k] + ncols - cols[k - 1]
        } else {
            cols[k] - cols[k - 1]
        };
        if new_row {
            row_index.push(rows[k]);
        }
        inc.push(inck);
        iglob_last = rows[k];
    }

    // Sentinel closing the last row
    inc.push(if nz == 0 { 0 } else { ncols - cols[nz - 1] });

    let nrows = row_index.len();
    SparseMatrixICRS::new(n, nrows, ncols, values, inc, row_index, col_index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_conversion() {
        // Local nonzeros of an 8x8 matrix, deliberately shuffled:
        //   (4,5)=2  (7,5)=3  (4,1)=1
        let t = TripleMatrix::from_entries(8, &[(4, 5, 2.0), (7, 5, 3.0), (4, 1, 1.0)]);
        let m = triple_to_icrs(t);

        assert_eq!(m.nrows, 2);
        assert_eq!(m.ncols, 2);
        assert_eq!(m.row_index, vec![4, 7]);
        assert_eq!(m.col_index, vec![1, 5]);
        assert_eq!(m.values, vec![1.0, 2.0, 3.0]);
        assert_eq!(m.inc, vec![0, 1, 2, 1]);
    }

    #[test]
    fn test_roundtrip_preserves_triples() {
        let entries = vec![
            (9, 0, 1.5),
            (0, 9, -2.0),
            (3, 3, 4.0),
            (9, 9, 0.5),
            (3, 7, 7.0),
            (0, 0, 3.0),
        ];
        let t = TripleMatrix::from_entries(10, &entries);
        let m = triple_to_icrs(t);

        let mut recovered: Vec<_> = m.global_iter().collect();
        recovered.sort_by_key(|&(i, j, _)| (i, j));
        let mut expected = entries.clone();
        expected.sort_by_key(|&(i, j, _)| (i, j));
        assert_eq!(recovered, expected);
    }

    #[test]
    fn test_increment_sum_law() {
        let t = TripleMatrix::from_entries(
            16,
            &[(2, 14, 1.0), (11, 3, 1.0), (2, 3, 1.0), (5, 5, 1.0), (11, 14, 1.0)],
        );
        let m = triple_to_icrs(t);
        let total: usize = m.inc.iter().sum();
        assert_eq!(total, m.nrows * m.ncols);
    }

    #[test]
    fn test_empty_row_is_skipped() {
        // Rows 0 and 2 populated, row 1 empty: only two local rows exist
        let t = TripleMatrix::from_entries(3, &[(0, 0, 1.0), (2, 2, 3.0), (2, 0, 2.0)]);
        let m = triple_to_icrs(t);

        assert_eq!(m.nrows, 2);
        assert_eq!(m.row_index, vec![0, 2]);
        assert_eq!(m.col_index, vec![0, 2]);
        // (0,0)=1 then (2,0)=2 then (2,2)=3 in row-major order
        assert_eq!(m.values, vec![1.0, 2.0, 3.0]);
        assert_eq!(m.inc, vec![0, 2, 1, 1]);
    }

    #[test]
    fn test_empty_matrix() {
        let m = triple_to_icrs(TripleMatrix::<f64>::empty(12));
        assert_eq!(m.nrows, 0);
        assert_eq!(m.ncols, 0);
        assert_eq!(m.inc, vec![0]);
        assert_eq!(m.nnz(), 0);
    }

    #[test]
    fn test_single_nonzero() {
        let t = TripleMatrix::from_entries(100, &[(42, 17, 9.0)]);
        let m = triple_to_icrs(t);
        assert_eq!(m.nrows, 1);
        assert_eq!(m.ncols, 1);
        assert_eq!(m.inc, vec![0, 1]);
        assert_eq!(m.global_iter().collect::<Vec<_>>(), vec![(42, 17, 9.0)]);
    }
}
