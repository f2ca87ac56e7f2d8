//! In-process SPMD backend
//!
//! [`run_spmd`] spawns one thread per rank and wires them with a full
//! mesh of unbounded channels. Sends never block, so the
//! send-everything-then-receive-everything pattern the collectives use
//! cannot deadlock. Payloads travel type-erased and are checked back into
//! their concrete type at receipt; a mismatch is a programming error in
//! the protocol, not a runtime condition, and panics.

use std::any::Any;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::{Arc, Barrier};
use std::time::Instant;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::comm::{Comm, Message};

// Collective operations use a reserved tag range so they never collide
// with caller-chosen point-to-point tags (which should stay small).
const TAG_BCAST: u32 = u32::MAX;
const TAG_SCATTER: u32 = u32::MAX - 1;
const TAG_GATHER: u32 = u32::MAX - 2;
const TAG_A2A: u32 = u32::MAX - 3;
const TAG_A2AV: u32 = u32::MAX - 4;

struct Packet {
    tag: u32,
    data: Box<dyn Any + Send>,
}

/// One rank of an in-process SPMD job
///
/// Created by [`run_spmd`]; each instance is owned by exactly one thread.
pub struct ThreadComm {
    rank: usize,
    size: usize,
    /// senders[dst] feeds the (self → dst) channel
    senders: Vec<Sender<Packet>>,
    /// receivers[src] drains the (src → self) channel
    receivers: Vec<Receiver<Packet>>,
    /// Messages drained while waiting for a different tag
    pending: RefCell<Vec<VecDeque<Packet>>>,
    barrier: Arc<Barrier>,
    epoch: Instant,
}

impl ThreadComm {
    fn recv_packet(&self, src: usize, tag: u32) -> Packet {
        {
            let mut pending = self.pending.borrow_mut();
            if let Some(pos) = pending[src].iter().position(|p| p.tag == tag) {
                return pending[src].remove(pos).unwrap();
            }
        }
        loop {
            let pkt = self.receivers[src]
                .recv()
                .expect("rank disconnected mid-protocol");
            if pkt.tag == tag {
                return pkt;
            }
            self.pending.borrow_mut()[src].push_back(pkt);
        }
    }

    fn send_to<T: Message>(&self, dst: usize, tag: u32, buf: Vec<T>) {
        self.senders[dst]
            .send(Packet {
                tag,
                data: Box::new(buf),
            })
            .expect("rank disconnected mid-protocol");
    }

    fn recv_from<T: Message>(&self, src: usize, tag: u32) -> Vec<T> {
        let pkt = self.recv_packet(src, tag);
        *pkt.data
            .downcast::<Vec<T>>()
            .expect("message payload type mismatch")
    }
}

impl Comm for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn barrier(&self) {
        self.barrier.wait();
    }

    fn wall_time(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    fn abort(&self, code: i32) -> ! {
        eprintln!("rank {}: aborting job with code {}", self.rank, code);
        std::process::exit(code);
    }

    fn send<T: Message>(&self, dst: usize, tag: u32, buf: &[T]) {
        self.send_to(dst, tag, buf.to_vec());
    }

    fn recv<T: Message>(&self, src: usize, tag: u32) -> Vec<T> {
        self.recv_from(src, tag)
    }

    fn broadcast<T: Message>(&self, root: usize, buf: &mut Vec<T>) {
        if self.rank == root {
            for dst in 0..self.size {
                if dst != root {
                    self.send_to(dst, TAG_BCAST, buf.clone());
                }
            }
        } else {
            *buf = self.recv_from(root, TAG_BCAST);
        }
    }

    fn scatter<T: Message>(&self, root: usize, sendbuf: &[T], chunk: usize) -> Vec<T> {
        if self.rank == root {
            assert_eq!(
                sendbuf.len(),
                chunk * self.size,
                "scatter buffer must hold size * chunk elements"
            );
            for dst in 0..self.size {
                if dst != root {
                    self.send_to(dst, TAG_SCATTER, sendbuf[dst * chunk..(dst + 1) * chunk].to_vec());
                }
            }
            sendbuf[root * chunk..(root + 1) * chunk].to_vec()
        } else {
            self.recv_from(root, TAG_SCATTER)
        }
    }

    fn gather<T: Message>(&self, root: usize, local: &[T]) -> Vec<T> {
        if self.rank == root {
            let mut out = Vec::with_capacity(local.len() * self.size);
            for src in 0..self.size {
                if src == root {
                    out.extend_from_slice(local);
                } else {
                    out.extend(self.recv_from::<T>(src, TAG_GATHER));
                }
            }
            out
        } else {
            self.send_to(root, TAG_GATHER, local.to_vec());
            Vec::new()
        }
    }

    fn all_to_all<T: Message>(&self, sendbuf: &[T], chunk: usize) -> Vec<T> {
        assert_eq!(
            sendbuf.len(),
            chunk * self.size,
            "all_to_all buffer must hold size * chunk elements"
        );
        for dst in 0..self.size {
            if dst != self.rank {
                self.send_to(dst, TAG_A2A, sendbuf[dst * chunk..(dst + 1) * chunk].to_vec());
            }
        }
        let mut out = Vec::with_capacity(chunk * self.size);
        for src in 0..self.size {
            if src == self.rank {
                out.extend_from_slice(&sendbuf[src * chunk..(src + 1) * chunk]);
            } else {
                out.extend(self.recv_from::<T>(src, TAG_A2A));
            }
        }
        out
    }

    fn all_to_allv<T: Message>(
        &self,
        sendbuf: &[T],
        send_counts: &[usize],
    ) -> (Vec<T>, Vec<usize>) {
        assert_eq!(send_counts.len(), self.size);
        assert_eq!(
            sendbuf.len(),
            send_counts.iter().sum::<usize>(),
            "all_to_allv buffer must match its counts"
        );

        let recv_counts = self.all_to_all(send_counts, 1);

        let mut offset = 0;
        let mut self_block: Vec<T> = Vec::new();
        for dst in 0..self.size {
            let block = &sendbuf[offset..offset + send_counts[dst]];
            if dst == self.rank {
                self_block = block.to_vec();
            } else {
                self.send_to(dst, TAG_A2AV, block.to_vec());
            }
            offset += send_counts[dst];
        }

        let mut out = Vec::with_capacity(recv_counts.iter().sum());
        for src in 0..self.size {
            if src == self.rank {
                out.append(&mut self_block);
            } else {
                let block = self.recv_from::<T>(src, TAG_A2AV);
                debug_assert_eq!(block.len(), recv_counts[src]);
                out.extend(block);
            }
        }
        (out, recv_counts)
    }
}

/// Runs `f` as an SPMD job of `p` ranks on threads of this process
///
/// Each rank receives its own [`ThreadComm`]; results are returned in
/// rank order. A panic on any rank propagates.
pub fn run_spmd<R, F>(p: usize, f: F) -> Vec<R>
where
    F: Fn(ThreadComm) -> R + Sync,
    R: Send,
{
    assert!(p >= 1, "an SPMD job needs at least one rank");

    // Full mesh: one channel per ordered (src, dst) pair
    let mut txs: Vec<Vec<Sender<Packet>>> = (0..p).map(|_| Vec::with_capacity(p)).collect();
    let mut rxs: Vec<Vec<Receiver<Packet>>> = (0..p).map(|_| Vec::with_capacity(p)).collect();
    for src in 0..p {
        for dst in 0..p {
            let (tx, rx) = unbounded();
            txs[src].push(tx);
            rxs[dst].push(rx);
        }
    }

    let barrier = Arc::new(Barrier::new(p));
    let epoch = Instant::now();

    let mut comms: Vec<ThreadComm> = Vec::with_capacity(p);
    for (rank, (senders, receivers)) in txs.into_iter().zip(rxs).enumerate() {
        comms.push(ThreadComm {
            rank,
            size: p,
            senders,
            receivers,
            pending: RefCell::new((0..p).map(|_| VecDeque::new()).collect()),
            barrier: Arc::clone(&barrier),
            epoch,
        });
    }

    std::thread::scope(|scope| {
        let f = &f;
        let handles: Vec<_> = comms
            .into_iter()
            .map(|comm| scope.spawn(move || f(comm)))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("SPMD rank panicked"))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_and_size() {
        let ranks = run_spmd(4, |comm| (comm.rank(), comm.size()));
        assert_eq!(ranks, vec![(0, 4), (1, 4), (2, 4), (3, 4)]);
    }

    #[test]
    fn test_send_recv_ring() {
        let results = run_spmd(3, |comm| {
            let next = (comm.rank() + 1) % comm.size();
            let prev = (comm.rank() + comm.size() - 1) % comm.size();
            comm.send(next, 7, &[comm.rank()]);
            comm.recv::<usize>(prev, 7)[0]
        });
        assert_eq!(results, vec![2, 0, 1]);
    }

    #[test]
    fn test_recv_matches_tags_out_of_order() {
        let results = run_spmd(2, |comm| {
            if comm.rank() == 0 {
                comm.send(1, 1, &[10i64]);
                comm.send(1, 2, &[20i64]);
                0
            } else {
                // Drain tag 2 first even though tag 1 arrived first
                let b = comm.recv::<i64>(0, 2)[0];
                let a = comm.recv::<i64>(0, 1)[0];
                a + 2 * b
            }
        });
        assert_eq!(results[1], 50);
    }

    #[test]
    fn test_broadcast() {
        let results = run_spmd(3, |comm| {
            let mut buf = if comm.rank() == 1 {
                vec![3.5f64, 4.5]
            } else {
                Vec::new()
            };
            comm.broadcast(1, &mut buf);
            buf
        });
        for r in results {
            assert_eq!(r, vec![3.5, 4.5]);
        }
    }

    #[test]
    fn test_scatter_and_gather() {
        let results = run_spmd(3, |comm| {
            let sendbuf: Vec<usize> = if comm.rank() == 0 {
                (0..6).collect()
            } else {
                Vec::new()
            };
            let chunk = comm.scatter(0, &sendbuf, 2);
            assert_eq!(chunk, vec![2 * comm.rank(), 2 * comm.rank() + 1]);

            let doubled: Vec<usize> = chunk.iter().map(|x| x * 10).collect();
            comm.gather(0, &doubled)
        });
        assert_eq!(results[0], vec![0, 10, 20, 30, 40, 50]);
        assert!(results[1].is_empty());
        assert!(results[2].is_empty());
    }

    #[test]
    fn test_all_to_all() {
        let results = run_spmd(3, |comm| {
            let s = comm.rank();
            // Rank s sends value 10*s + q to rank q
            let sendbuf: Vec<usize> = (0..3).map(|q| 10 * s + q).collect();
            comm.all_to_all(&sendbuf, 1)
        });
        // Rank q holds 10*src + q from each src
        assert_eq!(results[0], vec![0, 10, 20]);
        assert_eq!(results[1], vec![1, 11, 21]);
        assert_eq!(results[2], vec![2, 12, 22]);
    }

    #[test]
    fn test_all_to_allv_uneven() {
        let results = run_spmd(2, |comm| {
            if comm.rank() == 0 {
                // 3 elements for rank 1, none for self
                comm.all_to_allv(&[1.0f64, 2.0, 3.0], &[0, 3])
            } else {
                // 1 element for rank 0, none for self
                comm.all_to_allv(&[9.0f64], &[1, 0])
            }
        });
        assert_eq!(results[0], (vec![9.0], vec![0, 1]));
        assert_eq!(results[1], (vec![1.0, 2.0, 3.0], vec![3, 0]));
    }

    #[test]
    fn test_wall_time_advances() {
        run_spmd(1, |comm| {
            let t0 = comm.wall_time();
            std::thread::sleep(std::time::Duration::from_millis(5));
            assert!(comm.wall_time() > t0);
        });
    }
}
