//! Benchmarks for the distributed multiplication pipeline

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use parmv::{matvec, run_spmd, triple_to_icrs, Comm};
use parmv::{MatvecPlan, TripleMatrix, VectorDistribution};

/// Pentadiagonal test matrix of global size n
fn banded_entries(n: usize) -> Vec<(usize, usize, f64)> {
    let mut entries = Vec::new();
    for i in 0..n {
        for d in -2i64..=2 {
            let j = i as i64 + d;
            if (0..n as i64).contains(&j) {
                entries.push((i, j as usize, 1.0 + d as f64 * 0.1));
            }
        }
    }
    entries
}

fn bench_conversion(c: &mut Criterion) {
    let mut group = c.benchmark_group("triple_to_icrs");

    for &n in &[1_000, 10_000] {
        let entries = banded_entries(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |bench, _| {
            bench.iter(|| {
                let m = triple_to_icrs(TripleMatrix::from_entries(n, &entries));
                black_box(m.nnz())
            })
        });
    }
    group.finish();
}

fn bench_distributed_matvec(c: &mut Criterion) {
    let mut group = c.benchmark_group("distributed_matvec");
    let n = 2_000;
    let entries = banded_entries(n);
    let matvecs_per_run = 50;

    for &p in &[1, 2, 4] {
        group.bench_with_input(BenchmarkId::new("ranks", p), &p, |bench, _| {
            // Timed per run: thread spawn, plan build, and a batch of
            // multiplications, dominated by the batch.
            bench.iter(|| {
                let checks = run_spmd(p, |comm| {
                    let s = comm.rank();
                    let mine: Vec<(usize, usize, f64)> = entries
                        .iter()
                        .filter(|&&(i, _, _)| i % p == s)
                        .copied()
                        .collect();
                    let matrix = triple_to_icrs(TripleMatrix::from_entries(n, &mine));
                    let dist =
                        VectorDistribution::new(n, (s..n).step_by(p).collect());
                    let plan = MatvecPlan::build(&comm, &matrix, &dist, &dist);

                    let v: Vec<f64> =
                        dist.index.iter().map(|&g| (g % 7) as f64).collect();
                    let mut u = vec![0.0; dist.local_len()];
                    for _ in 0..matvecs_per_run {
                        matvec(&comm, &matrix, &plan, &v, &mut u);
                    }
                    u.first().copied().unwrap_or(0.0)
                });
                black_box(checks)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_conversion, bench_distributed_matvec);
criterion_main!(benches);
