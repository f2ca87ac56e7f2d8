//! Message-passing runtime seam
//!
//! Everything distributed in this crate (loaders, plan builder, kernel)
//! talks to the runtime through the [`Comm`] trait, which captures the
//! point-to-point and collective primitives by their semantics. The
//! in-process backend [`ThreadComm`](thread::ThreadComm) runs p ranks as
//! threads of one process; a cluster backend would implement the same
//! trait over a real message-passing library without touching the callers.

pub mod thread;

pub use thread::{run_spmd, ThreadComm};

/// Payload types the communicator can carry
pub trait Message: Clone + Send + 'static {}

impl<T: Clone + Send + 'static> Message for T {}

/// The communication primitives of an SPMD runtime
///
/// All collectives must be entered by every rank of the communicator;
/// point-to-point messages are matched by (source, tag) with per-channel
/// FIFO ordering. Collective calls on different ranks pair up in program
/// order.
pub trait Comm {
    /// This rank's number, in 0..size
    fn rank(&self) -> usize;

    /// Number of ranks in the communicator
    fn size(&self) -> usize;

    /// Blocks until every rank has entered the barrier
    fn barrier(&self);

    /// Seconds elapsed on this rank's wall clock
    fn wall_time(&self) -> f64;

    /// Terminates the entire job with the given exit code
    fn abort(&self, code: i32) -> !;

    /// Sends `buf` to rank `dst` under `tag`; does not block on the receiver
    fn send<T: Message>(&self, dst: usize, tag: u32, buf: &[T]);

    /// Receives the next message from rank `src` under `tag`, blocking
    fn recv<T: Message>(&self, src: usize, tag: u32) -> Vec<T>;

    /// Replaces `buf` on every rank with root's `buf`
    fn broadcast<T: Message>(&self, root: usize, buf: &mut Vec<T>);

    /// Distributes `sendbuf` from root in equal chunks; rank q receives
    /// elements q*chunk..(q+1)*chunk. Only root's `sendbuf` is read, and
    /// it must hold size*chunk elements.
    fn scatter<T: Message>(&self, root: usize, sendbuf: &[T], chunk: usize) -> Vec<T>;

    /// Collects `local` from every rank on root, concatenated in rank
    /// order; non-root ranks receive an empty vector. Every rank must
    /// pass the same number of elements.
    fn gather<T: Message>(&self, root: usize, local: &[T]) -> Vec<T>;

    /// Exchanges equal chunks with every rank: rank q receives elements
    /// q*chunk..(q+1)*chunk of this rank's `sendbuf`, placed at block
    /// position of the sender. `sendbuf` must hold size*chunk elements.
    fn all_to_all<T: Message>(&self, sendbuf: &[T], chunk: usize) -> Vec<T>;

    /// Personalized exchange with per-destination counts
    ///
    /// `sendbuf` is packed contiguously by destination, `send_counts[q]`
    /// elements for rank q. Returns the received data packed contiguously
    /// by source, together with the per-source counts.
    fn all_to_allv<T: Message>(&self, sendbuf: &[T], send_counts: &[usize])
        -> (Vec<T>, Vec<usize>);
}

/// Exclusive prefix sum, the standard offset computation for packed
/// personalized exchanges
pub fn exclusive_prefix_sum(counts: &[usize]) -> Vec<usize> {
    let mut offsets = vec![0usize; counts.len()];
    for q in 1..counts.len() {
        offsets[q] = offsets[q - 1] + counts[q - 1];
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclusive_prefix_sum() {
        assert_eq!(exclusive_prefix_sum(&[]), Vec::<usize>::new());
        assert_eq!(exclusive_prefix_sum(&[5]), vec![0]);
        assert_eq!(exclusive_prefix_sum(&[2, 0, 3, 1]), vec![0, 2, 2, 5]);
    }
}
