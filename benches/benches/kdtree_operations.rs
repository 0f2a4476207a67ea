// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use understory_kdtree::{
    Balancing, BracketLess, Idle, IdlePointMap, Kdtree, LooseBalancing, PerfectBalancing,
    StaticRank, TightBalancing,
};

type Tree<B> = Kdtree<[f64; 3], u32, StaticRank<3>, BracketLess, B>;

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn next_f64(&mut self) -> f64 {
        let v = self.next_u64() >> 11;
        (v as f64) / ((1u64 << 53) as f64)
    }
}

fn gen_random_points(count: usize, extent: f64) -> Vec<[f64; 3]> {
    let mut rng = Rng::new(0xCAFE_F00D_DEAD_BEEF);
    (0..count)
        .map(|_| {
            [
                rng.next_f64() * extent,
                rng.next_f64() * extent,
                rng.next_f64() * extent,
            ]
        })
        .collect()
}

fn gen_sorted_points(count: usize) -> Vec<[f64; 3]> {
    (0..count)
        .map(|i| {
            let f = i as f64;
            [f, f * 0.5, f * 0.25]
        })
        .collect()
}

fn build<B: Balancing>(points: &[[f64; 3]]) -> Tree<B> {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| (*p, i as u32))
        .collect()
}

fn bench_insert_policies(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    for &n in &[1_000usize, 10_000] {
        group.throughput(Throughput::Elements(n as u64));
        for (label, points) in [
            ("random", gen_random_points(n, 1000.0)),
            ("sorted", gen_sorted_points(n)),
        ] {
            group.bench_function(format!("idle_{label}_n{n}"), |b| {
                b.iter(|| black_box(build::<Idle>(&points).len()));
            });
            group.bench_function(format!("idle_rebalance_{label}_n{n}"), |b| {
                b.iter(|| {
                    let mut t: IdlePointMap<[f64; 3], u32, StaticRank<3>> = IdlePointMap::new();
                    t.insert_rebalance(points.iter().enumerate().map(|(i, p)| (*p, i as u32)));
                    black_box(t.len())
                });
            });
            group.bench_function(format!("loose_{label}_n{n}"), |b| {
                b.iter(|| black_box(build::<LooseBalancing>(&points).len()));
            });
            group.bench_function(format!("tight_{label}_n{n}"), |b| {
                b.iter(|| black_box(build::<TightBalancing>(&points).len()));
            });
            group.bench_function(format!("perfect_{label}_n{n}"), |b| {
                b.iter(|| black_box(build::<PerfectBalancing>(&points).len()));
            });
        }
    }
    group.finish();
}

fn bench_erase(c: &mut Criterion) {
    let mut group = c.benchmark_group("erase");
    let n = 10_000usize;
    let points = gen_random_points(n, 1000.0);
    group.throughput(Throughput::Elements(n as u64 / 2));
    group.bench_function("loose_erase_half", |b| {
        b.iter_batched(
            || build::<LooseBalancing>(&points),
            |mut t| {
                for p in points.iter().step_by(2) {
                    t.erase_key(p);
                }
                black_box(t.len())
            },
            BatchSize::LargeInput,
        );
    });
    group.bench_function("idle_erase_half", |b| {
        b.iter_batched(
            || build::<Idle>(&points),
            |mut t| {
                for p in points.iter().step_by(2) {
                    t.erase_key(p);
                }
                black_box(t.len())
            },
            BatchSize::LargeInput,
        );
    });
    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");
    let n = 20_000usize;
    let points = gen_random_points(n, 1000.0);
    let tree = build::<LooseBalancing>(&points);
    let mut idle = build::<Idle>(&points);
    idle.rebalance();
    let probes = gen_random_points(64, 1000.0);

    group.bench_function("nearest_loose", |b| {
        b.iter(|| {
            for p in &probes {
                let first = tree.quadrance_neighbors::<f64>(p).unwrap().next();
                black_box(first.map(|n| n.map(|n| n.distance)));
            }
        });
    });
    group.bench_function("nearest_idle_rebalanced", |b| {
        b.iter(|| {
            for p in &probes {
                let first = idle.quadrance_neighbors::<f64>(p).unwrap().next();
                black_box(first.map(|n| n.map(|n| n.distance)));
            }
        });
    });
    group.bench_function("k16_nearest_loose", |b| {
        b.iter(|| {
            for p in &probes {
                let found = tree.euclidean_neighbors::<f64>(p).unwrap().take(16).count();
                black_box(found);
            }
        });
    });
    group.bench_function("region_loose", |b| {
        b.iter(|| {
            for p in &probes {
                let upper = [p[0] + 100.0, p[1] + 100.0, p[2] + 100.0];
                black_box(tree.region_bounds(p, &upper).unwrap().count());
            }
        });
    });
    group.bench_function("mapping_axis2_full", |b| {
        b.iter(|| black_box(tree.mapping(2).unwrap().count()));
    });
    group.bench_function("ordered_full", |b| {
        b.iter(|| black_box(tree.ordered().count()));
    });
    group.finish();
}

criterion_group!(benches, bench_insert_policies, bench_erase, bench_queries);
criterion_main!(benches);
