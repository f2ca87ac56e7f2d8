//! Run configuration for the multiplication driver

/// Number of timed multiplications when none is requested
pub const DEFAULT_ITERATIONS: usize = 1000;

/// Configuration of a timed multiplication run
///
/// The plan-building cost is paid once and amortized over `n_iters`
/// kernel invocations, so the iteration count mostly controls how well
/// the per-matvec average washes out timer noise.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Number of kernel invocations to time
    pub n_iters: usize,

    /// Number of SPMD ranks to run
    pub n_procs: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            n_iters: DEFAULT_ITERATIONS,
            n_procs: num_cpus::get(),
        }
    }
}
