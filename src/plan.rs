//! Communication-plan construction for the distributed matvec
//!
//! Before the first multiplication, every rank must learn where each of
//! its local columns' v-components lives and where each of its local
//! rows' u-contributions must go. Ownership is scattered across the job,
//! so the lookup itself is distributed: a directory partition of the
//! global index space (index g is registered at rank g mod p) serves as
//! the rendezvous point between owners and requestors. Building the plan
//! costs a handful of all-to-all exchanges once; the kernel then replays
//! the resulting schedules for every multiplication.

use num_traits::Num;

use crate::comm::{exclusive_prefix_sum, Comm};
use crate::matrix::SparseMatrixICRS;
use crate::vector::VectorDistribution;

/// One direction of a packed per-peer exchange
///
/// For the fan-out (gather of v): `send[q]` holds the local v-indices
/// this rank ships to rank q, in q's request order, and `recv[q]` holds
/// the column slots where values arriving from q land.
///
/// For the fan-in (scatter of u): `send[q]` holds the row slots whose
/// partial sums go to owner q, and `recv[q]` holds the local u-indices
/// where contributions arriving from q accumulate.
#[derive(Clone, Debug)]
pub struct ExchangePlan {
    /// Per peer: positions in the local source array to pack
    pub send: Vec<Vec<usize>>,
    /// Per peer: positions in the local destination array to unpack into
    pub recv: Vec<Vec<usize>>,
}

/// The complete communication plan for u = A·v on one rank
///
/// The slot-level arrays answer "where does slot c's component live":
/// `src_proc[c]` owns global column `col_index[c]` as its
/// `src_ind[c]`-th local v-component, and symmetrically `dst_proc[r]`,
/// `dst_ind[r]` for the rows. The two [`ExchangePlan`]s are the packed
/// form the kernel actually replays.
#[derive(Clone, Debug)]
pub struct MatvecPlan {
    /// Owning rank of each local column's v-component (size: ncols)
    pub src_proc: Vec<usize>,
    /// Local index of that component on its owner (size: ncols)
    pub src_ind: Vec<usize>,
    /// Owning rank of each local row's u-component (size: nrows)
    pub dst_proc: Vec<usize>,
    /// Local index of that component on its owner (size: nrows)
    pub dst_ind: Vec<usize>,
    /// Packed schedule for the fan-out of v
    pub fan_out: ExchangePlan,
    /// Packed schedule for the fan-in of u
    pub fan_in: ExchangePlan,
}

impl MatvecPlan {
    /// Builds the communication plan; a collective call
    ///
    /// Resolves ownership of every local column against the
    /// v-distribution and of every local row against the u-distribution,
    /// then derives the packed fan-out and fan-in schedules. Every rank
    /// of the communicator must call this with its own local matrix and
    /// distribution parts.
    pub fn build<C, T>(
        comm: &C,
        matrix: &SparseMatrixICRS<T>,
        vdist: &VectorDistribution,
        udist: &VectorDistribution,
    ) -> MatvecPlan
    where
        C: Comm,
        T: Copy + Num,
    {
        assert_eq!(
            matrix.n, vdist.n,
            "matrix and v-distribution disagree on the global size"
        );
        assert_eq!(
            matrix.n, udist.n,
            "matrix and u-distribution disagree on the global size"
        );

        let p = comm.size();

        let (src_proc, src_ind) = resolve_owners(comm, matrix.n, &matrix.col_index, vdist);
        let (dst_proc, dst_ind) = resolve_owners(comm, matrix.n, &matrix.row_index, udist);

        // Fan-out: group column slots by owner and tell each owner which
        // of its local v-components we consume. Column indices are
        // distinct, so no owner is ever asked twice for the same
        // component by the same rank.
        let mut recv_slots: Vec<Vec<usize>> = vec![Vec::new(); p];
        let mut wanted: Vec<Vec<usize>> = vec![Vec::new(); p];
        for c in 0..matrix.ncols {
            recv_slots[src_proc[c]].push(c);
            wanted[src_proc[c]].push(src_ind[c]);
        }
        let fan_out = ExchangePlan {
            send: exchange_index_lists(comm, &wanted),
            recv: recv_slots,
        };

        // Fan-in: group row slots by owner and tell each owner which of
        // its local u-components will receive our contributions, in send
        // order.
        let mut send_rows: Vec<Vec<usize>> = vec![Vec::new(); p];
        let mut targets: Vec<Vec<usize>> = vec![Vec::new(); p];
        for r in 0..matrix.nrows {
            send_rows[dst_proc[r]].push(r);
            targets[dst_proc[r]].push(dst_ind[r]);
        }
        let fan_in = ExchangePlan {
            send: send_rows,
            recv: exchange_index_lists(comm, &targets),
        };

        MatvecPlan {
            src_proc,
            src_ind,
            dst_proc,
            dst_ind,
            fan_out,
            fan_in,
        }
    }
}

/// Resolves (owner rank, owner-local index) for each queried global index
///
/// Two-phase rendezvous through the g mod p directory:
///
/// 1. *Publish*: every rank registers each component it owns with the
///    directory rank of its global index, as a (global, owner, local)
///    triple.
/// 2. *Resolve*: every rank asks the directory rank of each queried
///    index; the directory answers (owner, local) in request order.
///
/// Directory work is O(n/p) table slots plus the traffic that hashes
/// here; each rank's query volume is proportional to its query list.
fn resolve_owners<C: Comm>(
    comm: &C,
    n: usize,
    queries: &[usize],
    dist: &VectorDistribution,
) -> (Vec<usize>, Vec<usize>) {
    let p = comm.size();
    let s = comm.rank();

    // Phase 1: publish ownership to the directory
    let mut counts = vec![0usize; p];
    for &g in &dist.index {
        counts[g % p] += 3;
    }
    let mut cursor = exclusive_prefix_sum(&counts);
    let mut sendbuf = vec![0usize; dist.index.len() * 3];
    for (loc, &g) in dist.index.iter().enumerate() {
        let d = g % p;
        sendbuf[cursor[d]] = g;
        sendbuf[cursor[d] + 1] = s;
        sendbuf[cursor[d] + 2] = loc;
        cursor[d] += 3;
    }
    let (published, _) = comm.all_to_allv(&sendbuf, &counts);

    // This rank's directory slice covers globals g with g mod p == s,
    // stored densely at slot g / p.
    let mut table: Vec<Option<(usize, usize)>> = vec![None; n.div_ceil(p)];
    for entry in published.chunks_exact(3) {
        let (g, owner, loc) = (entry[0], entry[1], entry[2]);
        debug_assert_eq!(g % p, s, "component published to the wrong directory rank");
        debug_assert!(table[g / p].is_none(), "global index owned by two ranks");
        table[g / p] = Some((owner, loc));
    }

    // Phase 2: route each query to its directory rank, remembering which
    // slot asked, so the packed answers map back.
    let mut counts = vec![0usize; p];
    for &g in queries {
        counts[g % p] += 1;
    }
    let mut cursor = exclusive_prefix_sum(&counts);
    let mut sendbuf = vec![0usize; queries.len()];
    let mut slots: Vec<Vec<usize>> = vec![Vec::new(); p];
    for (c, &g) in queries.iter().enumerate() {
        let d = g % p;
        sendbuf[cursor[d]] = g;
        cursor[d] += 1;
        slots[d].push(c);
    }
    let (requests, request_counts) = comm.all_to_allv(&sendbuf, &counts);

    // Answer every incoming request from the directory table
    let mut reply = Vec::with_capacity(requests.len() * 2);
    for &g in &requests {
        let (owner, loc) = table[g / p].expect("query for a global index nobody owns");
        reply.push(owner);
        reply.push(loc);
    }
    let reply_counts: Vec<usize> = request_counts.iter().map(|c| c * 2).collect();
    let (answers, _) = comm.all_to_allv(&reply, &reply_counts);

    // Unpack: answers arrive packed by directory rank, in the order we
    // queried each one.
    let mut owner_proc = vec![0usize; queries.len()];
    let mut owner_ind = vec![0usize; queries.len()];
    let mut pos = 0;
    for q in 0..p {
        for &c in &slots[q] {
            owner_proc[c] = answers[pos];
            owner_ind[c] = answers[pos + 1];
            pos += 2;
        }
    }
    (owner_proc, owner_ind)
}

/// Ships each peer its index list; returns the lists received, per peer
///
/// `lists[q]` goes to rank q; the return value's entry q is what rank q
/// sent here. Used to turn consumer-side slot groupings into owner-side
/// send schedules and producer-side target lists into owner-side
/// accumulation schedules.
fn exchange_index_lists<C: Comm>(comm: &C, lists: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let counts: Vec<usize> = lists.iter().map(|l| l.len()).collect();
    let sendbuf: Vec<usize> = lists.concat();
    let (recv, recv_counts) = comm.all_to_allv(&sendbuf, &counts);

    let mut out = Vec::with_capacity(lists.len());
    let mut pos = 0;
    for &c in &recv_counts {
        out.push(recv[pos..pos + c].to_vec());
        pos += c;
    }
    out
}
