//! Error types for parmv

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using parmv's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal conditions detected while loading the matrix or vector files.
///
/// None of these are recoverable: the binary maps them to the runtime
/// abort primitive, terminating every rank. `abort_code` gives the
/// process exit code for each condition.
#[derive(Error, Debug)]
pub enum Error {
    /// The matrix file was written for a different number of processors
    #[error("matrix file declares {declared} processors, but the runtime has {runtime}")]
    MatrixProcMismatch {
        /// Processor count in the file header
        declared: usize,
        /// Processor count of the running communicator
        runtime: usize,
    },

    /// The matrix is not square
    #[error("matrix is {rows}x{cols}; only square matrices are supported")]
    NotSquare {
        /// Declared row count
        rows: usize,
        /// Declared column count
        cols: usize,
    },

    /// The vector file was written for a different number of processors
    #[error("vector file declares {declared} processors, but the runtime has {runtime}")]
    VectorProcMismatch {
        /// Processor count in the file header
        declared: usize,
        /// Processor count of the running communicator
        runtime: usize,
    },

    /// A vector component line is out of order
    #[error("vector component {found} out of order; expected component {expected}")]
    IndexOutOfOrder {
        /// The 1-based index the file should have listed next
        expected: usize,
        /// The 1-based index actually found
        found: usize,
    },

    /// The file could not be opened or read
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// Path of the offending file
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The file did not contain the expected sequence of numbers
    #[error("malformed input in {}: expected {expected}", path.display())]
    Parse {
        /// Path of the offending file
        path: PathBuf,
        /// Description of what should have come next
        expected: &'static str,
    },
}

impl Error {
    /// The exit code handed to the runtime abort primitive.
    ///
    /// Configuration and format errors carry the distinguished negative
    /// codes; I/O and parse failures fall back to -1.
    pub fn abort_code(&self) -> i32 {
        match self {
            Error::MatrixProcMismatch { .. } => -8,
            Error::NotSquare { .. } => -9,
            Error::VectorProcMismatch { .. } => -10,
            Error::IndexOutOfOrder { .. } => -11,
            Error::Io { .. } | Error::Parse { .. } => -1,
        }
    }
}
