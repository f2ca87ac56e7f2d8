// Interoperability helpers

pub mod formats;

pub use formats::{reference_spmv, to_sprs};
