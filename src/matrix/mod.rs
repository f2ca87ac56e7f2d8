// Sparse matrix data structures and the triple-to-ICRS conversion

pub mod convert;
pub mod icrs;
pub mod sort;
pub mod triple;

pub use convert::triple_to_icrs;
pub use icrs::SparseMatrixICRS;
pub use sort::{radix_for, sort_by_key, SortKey};
pub use triple::TripleMatrix;
