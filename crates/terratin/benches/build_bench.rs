//! Criterion benchmarks for incremental TIN construction and queries.
//! Focus sizes: n in {100, 1000, 5000}.

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use terratin::{IncrementalTin, Vertex};

fn random_vertices(n: usize, seed: u64) -> Vec<Vertex> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            Vertex::new(
                rng.gen_range(0.0..1000.0),
                rng.gen_range(0.0..1000.0),
                rng.gen_range(0.0..100.0),
                i as i32,
            )
        })
        .collect()
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    for &n in &[100usize, 1000, 5000] {
        group.bench_with_input(BenchmarkId::new("add_bulk", n), &n, |b, &n| {
            b.iter_batched(
                || random_vertices(n, 42),
                |vertices| {
                    let mut tin = IncrementalTin::new(1000.0 / (n as f64).sqrt()).unwrap();
                    tin.add_bulk(vertices).unwrap();
                    tin
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_locate(c: &mut Criterion) {
    let mut tin = IncrementalTin::new(10.0).unwrap();
    tin.add_bulk(random_vertices(5000, 7)).unwrap();
    let queries = random_vertices(1000, 8);

    let mut group = c.benchmark_group("locate");
    group.bench_function("containing_triangle", |b| {
        let mut nav = tin.navigator();
        b.iter(|| {
            let mut hits = 0usize;
            for q in &queries {
                if tin
                    .locate_containing_triangle_with(&mut nav, q.x, q.y)
                    .is_some()
                {
                    hits += 1;
                }
            }
            hits
        })
    });
    group.finish();
}

criterion_group!(benches, bench_build, bench_locate);
criterion_main!(benches);
