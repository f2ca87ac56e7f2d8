//! Conversion to sprs and the sequential reference product
//!
//! The distributed kernel is validated against a plain sequential
//! product computed by sprs; tests collect the distributed result by
//! owner and compare.

use sprs::{CsMat, TriMat};

use crate::matrix::TripleMatrix;

/// Converts a triple matrix to a sprs CSR matrix
pub fn to_sprs(matrix: &TripleMatrix<f64>) -> CsMat<f64> {
    let mut tri = TriMat::new((matrix.n, matrix.n));
    for (i, j, v) in matrix.iter() {
        tri.add_triplet(i, j, v);
    }
    tri.to_csr()
}

/// Computes u = A·v sequentially from the full triple set
///
/// `matrix` must hold every nonzero of the global matrix (tests build it
/// unpartitioned) and `v` the full global vector.
pub fn reference_spmv(matrix: &TripleMatrix<f64>, v: &[f64]) -> Vec<f64> {
    assert_eq!(v.len(), matrix.n);
    let csr = to_sprs(matrix);
    let mut u = vec![0.0; matrix.n];
    sprs::prod::mul_acc_mat_vec_csr(csr.view(), v, &mut u);
    u
}
