//! # parmv: distributed sparse matrix-vector multiplication
//!
//! parmv multiplies an n×n sparse matrix A by a dense vector v across p
//! SPMD ranks, u = A·v, where the nonzeros of A are spread over the
//! ranks by an arbitrary two-dimensional partitioning and the vectors by
//! arbitrary component-to-rank ownership maps.
//!
//! What makes the multiplication fast is how the distribution is
//! exploited:
//!
//! - each rank stores only its own nonzeros, in **ICRS** form, a
//!   compressed-row variant whose column indices are increments, built
//!   from unordered triples by a radix counting sort
//!   ([`triple_to_icrs`]);
//! - a precomputed **communication plan** ([`MatvecPlan`]) records, for
//!   every local column and row slot, which rank owns the matching
//!   vector component and where, resolved once through a distributed
//!   directory that hashes global indices over the ranks;
//! - per multiplication ([`matvec`]), the needed v-components are
//!   gathered from their owners (*fan-out*, each component at most once
//!   per consuming rank), the local product runs over the ICRS stream,
//!   and the partial row sums return to the u-owners where they
//!   accumulate (*fan-in*).
//!
//! Communication volume, not arithmetic, is the dominant cost; the plan
//! is built once and replayed for many iterations.
//!
//! ## Usage
//!
//! ```
//! use parmv::{matvec, run_spmd, triple_to_icrs, Comm};
//! use parmv::{MatvecPlan, TripleMatrix, VectorDistribution};
//!
//! // Two ranks, each owning one diagonal entry of a 2x2 matrix and one
//! // component of each vector.
//! let results = run_spmd(2, |comm| {
//!     let s = comm.rank();
//!     let triples = TripleMatrix::from_entries(2, &[(s, s, (s + 1) as f64)]);
//!     let matrix = triple_to_icrs(triples);
//!     let dist = VectorDistribution::new(2, vec![s]);
//!
//!     let plan = MatvecPlan::build(&comm, &matrix, &dist, &dist);
//!     let v = vec![10.0];
//!     let mut u = vec![0.0];
//!     matvec(&comm, &matrix, &plan, &v, &mut u);
//!     u[0]
//! });
//! assert_eq!(results, vec![10.0, 20.0]);
//! ```
//!
//! The bundled binary reads the matrix and vector distributions from
//! files and reports timings; every distributed piece of the library
//! talks to the runtime through the [`Comm`] trait, so a cluster backend
//! can replace the in-process [`ThreadComm`] without touching the
//! numerics.

pub mod comm;
pub mod config;
pub mod error;
pub mod io;
pub mod kernel;
pub mod matrix;
pub mod plan;
pub mod utils;
pub mod vector;

// Re-export primary components
pub use comm::{run_spmd, Comm, ThreadComm};
pub use config::{RunConfig, DEFAULT_ITERATIONS};
pub use error::{Error, Result};
pub use io::{load_matrix, load_vector_distribution};
pub use kernel::matvec;
pub use matrix::{radix_for, sort_by_key, triple_to_icrs, SortKey};
pub use matrix::{SparseMatrixICRS, TripleMatrix};
pub use plan::{ExchangePlan, MatvecPlan};
pub use utils::{reference_spmv, to_sprs};
pub use vector::VectorDistribution;

/// Version information for the parmv library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
