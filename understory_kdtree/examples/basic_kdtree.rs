// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Basic usage of Understory K-d Tree: insert, sort along an axis, query a
//! region, walk nearest neighbors, erase.

use understory_kdtree::{BracketMinus, IdlePointMap, Manhattan, PointMap, StaticRank};

fn main() -> Result<(), understory_kdtree::Error> {
    let mut stations: PointMap<[i32; 2], &str, StaticRank<2>> = PointMap::new();
    for (pos, name) in [
        ([3, 4], "harbor"),
        ([1, 2], "market"),
        ([5, 6], "tower"),
        ([1, 2], "annex"),
        ([4, 1], "depot"),
    ] {
        stations.insert(pos, name);
    }

    // Sorted by the second coordinate
    let by_y: Vec<_> = stations.mapping(1)?.map(|(k, v)| (*k, *v)).collect();
    println!("by y: {by_y:?}");

    // Half-open box [2, 5) x [0, 5)
    let inside: Vec<_> = stations.region_bounds(&[2, 0], &[5, 5])?.map(|(_, v)| *v).collect();
    println!("inside: {inside:?}");

    // Nearest first, straight line and taxicab
    for n in stations.euclidean_neighbors::<f64>(&[2, 2])?.take(3) {
        let n = n?;
        println!("euclidean {:.3} -> {}", n.distance, n.value);
    }
    let taxicab = Manhattan::new(BracketMinus::<i32>::new());
    for n in stations.neighbors(taxicab, &[2, 2])?.take(3) {
        let n = n?;
        println!("manhattan {} -> {}", n.distance, n.value);
    }

    // Erase both entries at (1, 2)
    let removed = stations.erase_key(&[1, 2]);
    println!("removed {removed}, {} left", stations.len());

    // A strict tree built in one go and rebuilt balanced
    let mut grid: IdlePointMap<[i32; 2], usize, StaticRank<2>> = IdlePointMap::new();
    grid.insert_rebalance((0..100).map(|i| ([i % 10, i / 10], i as usize)));
    let corner: Vec<_> = grid.closed_region(&[0, 0], &[1, 1])?.map(|(_, v)| *v).collect();
    println!("grid corner: {corner:?}");
    Ok(())
}
