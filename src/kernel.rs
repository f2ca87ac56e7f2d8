//! The distributed matrix-vector multiplication kernel
//!
//! One invocation computes u = A·v for the local parts: gather the needed
//! v-components from their owners (fan-out), stream the local nonzeros in
//! ICRS order, push the partial row sums back to the u-owners where they
//! accumulate (fan-in). The communication pattern is fixed by the
//! [`MatvecPlan`]; the kernel only packs, exchanges and unpacks along it,
//! so repeated invocations amortize the plan-building cost.

use num_traits::Num;
use std::ops::AddAssign;

use crate::comm::Comm;
use crate::matrix::SparseMatrixICRS;
use crate::plan::MatvecPlan;

/// Computes u = A·v across the communicator; a collective call
///
/// `v` holds this rank's owned v-components (in distribution order), `u`
/// its owned u-components; `u` is zeroed and overwritten. Each
/// v-component travels at most once to each consuming rank, and each
/// partial row sum travels exactly once to its owner. All communication
/// for this invocation completes before the call returns, so the same
/// buffers can be reused immediately.
pub fn matvec<C, T>(
    comm: &C,
    matrix: &SparseMatrixICRS<T>,
    plan: &MatvecPlan,
    v: &[T],
    u: &mut [T],
) where
    C: Comm,
    T: Copy + Num + AddAssign + Send + 'static,
{
    let p = comm.size();
    debug_assert!(
        matrix.nnz() > 0 || (matrix.nrows == 0 && matrix.ncols == 0),
        "a rank without nonzeros must have no local rows or columns"
    );

    // Fan-out: ship owned components to their consumers, then place the
    // arrivals into the local column buffer.
    let send_counts: Vec<usize> = plan.fan_out.send.iter().map(Vec::len).collect();
    let mut sendbuf = Vec::with_capacity(send_counts.iter().sum());
    for peer in &plan.fan_out.send {
        sendbuf.extend(peer.iter().map(|&l| v[l]));
    }
    let (arrivals, _) = comm.all_to_allv(&sendbuf, &send_counts);

    let mut v_local = vec![T::zero(); matrix.ncols];
    let mut pos = 0;
    for q in 0..p {
        for &c in &plan.fan_out.recv[q] {
            v_local[c] = arrivals[pos];
            pos += 1;
        }
    }

    // Local ICRS product: one column cursor, one row cursor; an
    // increment wrapping past ncols bumps the row.
    let mut u_local = vec![T::zero(); matrix.nrows];
    let mut i = 0;
    let mut j = matrix.inc[0];
    for k in 0..matrix.nnz() {
        u_local[i] += matrix.values[k] * v_local[j];
        j += matrix.inc[k + 1];
        if j >= matrix.ncols {
            j -= matrix.ncols;
            i += 1;
        }
    }

    // Fan-in: partial sums travel to their owners and accumulate there.
    for x in u.iter_mut() {
        *x = T::zero();
    }
    let send_counts: Vec<usize> = plan.fan_in.send.iter().map(Vec::len).collect();
    let mut sendbuf = Vec::with_capacity(send_counts.iter().sum());
    for peer in &plan.fan_in.send {
        sendbuf.extend(peer.iter().map(|&r| u_local[r]));
    }
    let (arrivals, _) = comm.all_to_allv(&sendbuf, &send_counts);

    let mut pos = 0;
    for q in 0..p {
        for &t in &plan.fan_in.recv[q] {
            u[t] += arrivals[pos];
            pos += 1;
        }
    }

    // Completion fence: the next invocation reuses u.
    comm.barrier();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::run_spmd;
    use crate::matrix::{triple_to_icrs, TripleMatrix};
    use crate::plan::MatvecPlan;
    use crate::vector::VectorDistribution;

    #[test]
    fn test_single_rank_product() {
        // A = [[1, 2], [0, 3]], v = (10, 100)
        run_spmd(1, |comm| {
            let matrix = triple_to_icrs(TripleMatrix::from_entries(
                2,
                &[(0, 0, 1.0), (0, 1, 2.0), (1, 1, 3.0)],
            ));
            let dist = VectorDistribution::new(2, vec![0, 1]);
            let plan = MatvecPlan::build(&comm, &matrix, &dist, &dist);

            let v = vec![10.0, 100.0];
            let mut u = vec![0.0; 2];
            matvec(&comm, &matrix, &plan, &v, &mut u);
            assert_eq!(u, vec![210.0, 300.0]);
        });
    }

    #[test]
    fn test_rank_without_nonzeros() {
        // Rank 1 holds no nonzeros but still owns vector components.
        run_spmd(2, |comm| {
            let s = comm.rank();
            let triples = if s == 0 {
                TripleMatrix::from_entries(2, &[(0, 0, 2.0), (1, 1, 5.0)])
            } else {
                TripleMatrix::empty(2)
            };
            let matrix = triple_to_icrs(triples);
            let dist = VectorDistribution::new(2, vec![s]);
            let plan = MatvecPlan::build(&comm, &matrix, &dist, &dist);

            let v = vec![3.0];
            let mut u = vec![0.0];
            matvec(&comm, &matrix, &plan, &v, &mut u);

            // u = diag(2, 5) · (3, 3)
            assert_eq!(u[0], if s == 0 { 6.0 } else { 15.0 });
        });
    }
}
