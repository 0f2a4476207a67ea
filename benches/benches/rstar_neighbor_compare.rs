// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![cfg(feature = "compare_rstar")]

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rstar::{AABB, RTree};
use understory_kdtree::{IdlePointSet, PointSet, StaticRank};

fn gen_grid_points(n: usize, cell: f64) -> Vec<[f64; 2]> {
    let mut out = Vec::with_capacity(n * n);
    for y in 0..n {
        for x in 0..n {
            // Scramble so insertion order is not sorted.
            let xs = (x * 7919) % n;
            out.push([xs as f64 * cell, y as f64 * cell]);
        }
    }
    out
}

fn bench_rstar_neighbor_compare_f64(c: &mut Criterion) {
    let mut group = c.benchmark_group("rstar_neighbor_compare_f64");
    for &n in &[64usize, 128] {
        let points = gen_grid_points(n, 10.0);
        let target = [n as f64 * 5.0 + 3.0, n as f64 * 5.0 + 1.0];
        let lower = [100.0, 100.0];
        let upper = [500.0, 500.0];
        group.throughput(Throughput::Elements((n * n) as u64));

        group.bench_function(format!("understory_build_nearest_n{}", n), |b| {
            b.iter_batched(
                || points.clone(),
                |points| {
                    let set: PointSet<[f64; 2], StaticRank<2>> =
                        points.into_iter().map(|p| (p, ())).collect();
                    let nearest = set.euclidean_neighbors::<f64>(&target).unwrap().next();
                    black_box(nearest.map(|n| n.map(|n| n.distance)));
                },
                BatchSize::SmallInput,
            );
        });

        group.bench_function(format!("understory_bulk_region_n{}", n), |b| {
            b.iter_batched(
                || points.clone(),
                |points| {
                    let mut set: IdlePointSet<[f64; 2], StaticRank<2>> = IdlePointSet::new();
                    set.insert_rebalance(points.into_iter().map(|p| (p, ())));
                    black_box(set.closed_region(&lower, &upper).unwrap().count());
                },
                BatchSize::SmallInput,
            );
        });

        group.bench_function(format!("rstar_build_nearest_n{}", n), |b| {
            b.iter_batched(
                || points.clone(),
                |points| {
                    let mut tree = RTree::new();
                    for p in points {
                        tree.insert(p);
                    }
                    black_box(tree.nearest_neighbor(&target).copied());
                },
                BatchSize::SmallInput,
            );
        });

        group.bench_function(format!("rstar_bulk_region_n{}", n), |b| {
            b.iter_batched(
                || points.clone(),
                |points| {
                    let tree = RTree::bulk_load(points);
                    let aabb = AABB::from_corners(lower, upper);
                    black_box(tree.locate_in_envelope(&aabb).count());
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_rstar_neighbor_compare_f64);
criterion_main!(benches);
