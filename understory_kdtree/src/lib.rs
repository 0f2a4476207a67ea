// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_kdtree --heading-base-level=0

//! Understory K-d Tree: generic in-memory k-d tree containers.
//!
//! A [`Kdtree`] stores `(key, value)` elements in a binary tree whose levels
//! split on axes `0, 1, …, rank - 1` in turn. Keys are read through a
//! comparator, so any type with per-axis coordinates can be stored: arrays,
//! user structs through [`AccessorLess`], or boxes encoded as their two
//! corners.
//!
//! - Two invariants: strict containers ([`Idle`] balancing) put keys equal to
//!   a node on its right and only rebuild on request; relaxed containers
//!   ([`LooseBalancing`] and friends) accept equal keys on either side and
//!   rebuild unbalanced subtrees as they go.
//! - Query families, all double-ended borrowing iterators: in-order
//!   ([`Kdtree::iter`]), sorted along one axis ([`Kdtree::mapping`]),
//!   lexicographic ([`Kdtree::ordered`]), region ([`Kdtree::region`] and the
//!   bounds and box wrappers), nearest neighbor ([`Kdtree::neighbors`]) and
//!   equal keys ([`Kdtree::equal_range`]).
//! - Elements are addressed by generational [`NodeId`] handles which stay
//!   valid across rebalancing and are rejected once erased.
//!
//! The rank is fixed at compile time with [`StaticRank`] or at run time with
//! [`DynamicRank`]; [`BoxRank`] marks box containers whose keys hold a low
//! and a high corner.
//!
//! # Example
//!
//! ```rust
//! use understory_kdtree::{PointMap, StaticRank};
//!
//! let mut cities: PointMap<[i32; 2], &str, StaticRank<2>> = PointMap::new();
//! cities.insert([2, 7], "north");
//! cities.insert([9, 1], "east");
//! cities.insert([1, 2], "west");
//! cities.insert([5, 4], "middle");
//!
//! // Sorted along the second axis.
//! let by_y: Vec<_> = cities.mapping(1)?.map(|(_, name)| *name).collect();
//! assert_eq!(by_y, ["east", "west", "middle", "north"]);
//!
//! // Everything in the half-open box [0, 6) x [0, 5).
//! let mut inside: Vec<_> = cities.region_bounds(&[0, 0], &[6, 5])?.map(|(_, n)| *n).collect();
//! inside.sort_unstable();
//! assert_eq!(inside, ["middle", "west"]);
//!
//! // Nearest first.
//! let nearest = cities.euclidean_neighbors::<f64>(&[6, 3])?.next().unwrap()?;
//! assert_eq!(*nearest.value, "middle");
//! # Ok::<(), understory_kdtree::Error>(())
//! ```
//!
//! ## Neighbors and metrics
//!
//! A [`Metric`] measures the distance between two keys and between a key and
//! a splitting plane. [`Euclidean`], [`Quadrance`] and [`Manhattan`] are
//! provided over any [`Difference`] functor; their `checked` constructors
//! report overflow as [`Error::Arithmetic`] instead of wrapping, so neighbor
//! iteration yields `Result`s.
//!
//! ## Features
//!
//! - `std` (default): floating point square roots from `std`.
//! - `libm`: square roots from `libm` for `no_std` builds.
//! - `kurbo`: `kurbo::Point` and `kurbo::Rect` as keys, see [`adapters::kurbo`].
//!
//! This crate assumes no NaNs in floating point coordinates or distances.

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

#[cfg(not(any(feature = "std", feature = "libm")))]
compile_error!("understory_kdtree requires either the `std` or `libm` feature");

#[cfg(feature = "kurbo")]
pub mod adapters;

mod balancing;
mod compare;
mod equal;
mod error;
mod idle;
mod iter;
mod mapping;
mod math;
mod metric;
mod neighbor;
mod node;
mod ordered;
mod rank;
mod rebuild;
mod region;
mod relaxed;
mod tree;

pub use balancing::{Balancing, Idle, LooseBalancing, PerfectBalancing, TightBalancing};
pub use compare::{
    AccessorLess, AccessorMinus, BracketLess, BracketMinus, BuiltinDifference, Difference,
    KeyCompare,
};
pub use equal::Equal;
pub use error::{ArithmeticError, Error, Result};
pub use iter::{Iter, Keys, Preorder, Values, ValuesMut};
pub use mapping::Mapping;
pub use math::{
    Real, Scalar, check_abs, check_positive_add, check_positive_distance, check_positive_mul,
    check_square,
};
pub use metric::{Euclidean, Manhattan, Metric, Quadrance};
pub use neighbor::{Neighbor, Neighbors};
pub use node::NodeId;
pub use ordered::Ordered;
pub use rank::{BoxRank, DynamicRank, Rank, StaticRank};
pub use region::{
    Bounds, ClosedBounds, Enclosed, Layout, OpenBounds, Overlap, Region, RegionPredicate,
    RelativeOrder,
};
pub use tree::{
    BoxMap, BoxSet, IdleBoxMap, IdleBoxSet, IdlePointMap, IdlePointSet, Kdtree, PointMap,
    PointSet,
};

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    const POINTS: [[i32; 2]; 5] = [[3, 4], [1, 2], [5, 6], [1, 2], [4, 1]];

    fn scenario_set() -> IdlePointSet<[i32; 2], StaticRank<2>> {
        let mut set = IdlePointSet::new();
        for p in POINTS {
            set.insert_key(p);
        }
        set
    }

    #[test]
    fn idle_insert_then_ordered() {
        let set = scenario_set();
        let keys: Vec<_> = set.ordered().map(|(k, _)| *k).collect();
        assert_eq!(keys, [[1, 2], [1, 2], [3, 4], [4, 1], [5, 6]]);
        set.assert_invariants();
    }

    #[test]
    fn erase_key_removes_all_duplicates() {
        let mut set = scenario_set();
        assert_eq!(set.erase_key(&[1, 2]), 2);
        let keys: Vec<_> = set.ordered().map(|(k, _)| *k).collect();
        assert_eq!(keys, [[3, 4], [4, 1], [5, 6]]);
        set.assert_invariants();
    }

    #[test]
    fn relaxed_insert_weighs_the_root() {
        let mut set: PointSet<[i32; 2], StaticRank<2>> = PointSet::new();
        for p in POINTS {
            set.insert_key(p);
        }
        let root = set.arena.root().expect("non-empty tree has a root");
        assert_eq!(set.arena.weight(root), 5);
        set.assert_invariants();
    }

    #[test]
    fn mapping_begins_at_smallest_on_axis() {
        let set: IdlePointSet<[i32; 2], StaticRank<2>> = [[3, 4], [1, 2], [5, 6], [4, 1]]
            .into_iter()
            .map(|k| (k, ()))
            .collect();
        assert_eq!(set.mapping(1).unwrap().next().map(|(k, _)| *k), Some([4, 1]));
    }

    #[test]
    fn nearest_neighbor_of_target() {
        let set = scenario_set();
        let first = set.euclidean_neighbors::<f64>(&[2, 2]).unwrap().next();
        let first = first.expect("tree is not empty").unwrap();
        assert_eq!(*first.key, [1, 2]);
        assert_eq!(first.distance, 1.0);
    }

    #[test]
    fn region_bounds_in_preorder() {
        let set = scenario_set();
        let found: Vec<_> = set
            .region_bounds(&[2, 0], &[5, 5])
            .unwrap()
            .map(|(k, _)| *k)
            .collect();
        assert_eq!(found, [[3, 4], [4, 1]]);
    }

    mod fuzz {
        use super::super::*;
        use alloc::vec::Vec;
        use proptest::prelude::*;

        type Tree<B> = PointMap<[i32; 2], u32, StaticRank<2>, BracketLess, B>;

        #[derive(Clone, Debug)]
        enum Op {
            Insert([i32; 2]),
            EraseKey([i32; 2]),
            EraseNth(usize),
            Rebuild,
        }

        fn key() -> impl Strategy<Value = [i32; 2]> {
            (-6..6_i32, -6..6_i32).prop_map(|(x, y)| [x, y])
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                8 => key().prop_map(Op::Insert),
                2 => key().prop_map(Op::EraseKey),
                2 => any::<usize>().prop_map(Op::EraseNth),
                1 => Just(Op::Rebuild),
            ]
        }

        fn sorted<T: Ord>(mut v: Vec<T>) -> Vec<T> {
            v.sort_unstable();
            v
        }

        fn quadrance(a: &[i32; 2], b: &[i32; 2]) -> i64 {
            let dx = i64::from(a[0] - b[0]);
            let dy = i64::from(a[1] - b[1]);
            dx * dx + dy * dy
        }

        /// Apply `ops` to a tree and a flat model, checking both agree.
        fn run<B: Balancing>(ops: &[Op]) -> Result<Tree<B>, TestCaseError> {
            let mut tree: Tree<B> = Tree::new();
            let mut model: Vec<([i32; 2], u32)> = Vec::new();
            let mut next = 0_u32;
            for op in ops {
                match *op {
                    Op::Insert(k) => {
                        tree.insert(k, next);
                        model.push((k, next));
                        next += 1;
                    }
                    Op::EraseKey(k) => {
                        let before = model.len();
                        model.retain(|(m, _)| *m != k);
                        prop_assert_eq!(tree.erase_key(&k), before - model.len());
                    }
                    Op::EraseNth(n) => {
                        if model.is_empty() {
                            continue;
                        }
                        let (k, _) = model[n % model.len()];
                        let id = tree.find(&k).expect("model key is in the tree");
                        let (key, value) = tree.erase(id).expect("found handle is valid");
                        prop_assert_eq!(key, k);
                        model.retain(|(_, v)| *v != value);
                    }
                    Op::Rebuild => tree = tree.clone_rebalanced(),
                }
                tree.assert_invariants();
                prop_assert_eq!(tree.len(), model.len());
            }
            let stored: Vec<_> = tree.iter().map(|(k, v)| (*k, *v)).collect();
            prop_assert_eq!(sorted(stored), sorted(model));
            Ok(tree)
        }

        fn check_queries<B: Balancing>(
            tree: &Tree<B>,
            probe: [i32; 2],
            span: [i32; 2],
        ) -> Result<(), TestCaseError> {
            let in_order: Vec<([i32; 2], u32)> = tree.iter().map(|(k, v)| (*k, *v)).collect();

            for axis in 0..2 {
                let mut want = in_order.clone();
                want.sort_by_key(|(k, _)| k[axis]);
                let got: Vec<_> = tree.mapping(axis).unwrap().map(|(k, v)| (*k, *v)).collect();
                prop_assert_eq!(&got, &want);
                let mut back: Vec<_> = tree
                    .mapping(axis)
                    .unwrap()
                    .rev()
                    .map(|(k, v)| (*k, *v))
                    .collect();
                back.reverse();
                prop_assert_eq!(&back, &want);
                let lower: Vec<_> = tree
                    .mapping_lower_bound(axis, &probe)
                    .unwrap()
                    .map(|(k, v)| (*k, *v))
                    .collect();
                let want_lower: Vec<_> = want
                    .iter()
                    .copied()
                    .filter(|(k, _)| k[axis] >= probe[axis])
                    .collect();
                prop_assert_eq!(lower, want_lower);
            }

            let mut want = in_order.clone();
            want.sort_by_key(|(k, _)| *k);
            let got: Vec<_> = tree.ordered().map(|(k, v)| (*k, *v)).collect();
            prop_assert_eq!(got, want);

            let upper = [probe[0] + span[0], probe[1] + span[1]];
            let inside = |k: &[i32; 2]| (0..2).all(|a| probe[a] <= k[a] && k[a] < upper[a]);
            let want = sorted(in_order.iter().copied().filter(|(k, _)| inside(k)).collect());
            let region: Vec<_> = tree
                .region_bounds(&probe, &upper)
                .unwrap()
                .map(|(k, v)| (*k, *v))
                .collect();
            let mut back: Vec<_> = tree
                .region_bounds(&probe, &upper)
                .unwrap()
                .rev()
                .map(|(k, v)| (*k, *v))
                .collect();
            back.reverse();
            prop_assert_eq!(&region, &back);
            prop_assert_eq!(sorted(region), want);

            let want = sorted(in_order.iter().copied().filter(|(k, _)| *k == probe).collect());
            let equal: Vec<_> = tree.equal_range(&probe).map(|(k, v)| (*k, *v)).collect();
            prop_assert_eq!(sorted(equal), want);

            let mut want: Vec<_> = in_order
                .iter()
                .map(|(k, v)| (quadrance(k, &probe), *v))
                .collect();
            want.sort_by_key(|(d, _)| *d);
            let got: Vec<_> = tree
                .quadrance_neighbors::<i64>(&probe)
                .unwrap()
                .map(|n| n.map(|n| (n.distance, *n.value)))
                .collect::<Result<_>>()
                .unwrap();
            prop_assert_eq!(&got, &want);
            let mut back: Vec<_> = tree
                .quadrance_neighbors::<i64>(&probe)
                .unwrap()
                .rev()
                .map(|n| n.map(|n| (n.distance, *n.value)))
                .collect::<Result<_>>()
                .unwrap();
            back.reverse();
            prop_assert_eq!(&back, &want);
            Ok(())
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            #[test]
            fn strict_tree_matches_model(
                ops in prop::collection::vec(op(), 0..200),
                probe in key(),
                span in (1..8_i32, 1..8_i32),
            ) {
                let tree = run::<Idle>(&ops)?;
                check_queries(&tree, probe, [span.0, span.1])?;
            }

            #[test]
            fn loose_tree_matches_model(
                ops in prop::collection::vec(op(), 0..200),
                probe in key(),
                span in (1..8_i32, 1..8_i32),
            ) {
                let tree = run::<LooseBalancing>(&ops)?;
                check_queries(&tree, probe, [span.0, span.1])?;
            }

            #[test]
            fn tight_tree_matches_model(
                ops in prop::collection::vec(op(), 0..200),
                probe in key(),
                span in (1..8_i32, 1..8_i32),
            ) {
                let tree = run::<TightBalancing>(&ops)?;
                check_queries(&tree, probe, [span.0, span.1])?;
            }

            #[test]
            fn perfect_tree_matches_model(
                ops in prop::collection::vec(op(), 0..120),
                probe in key(),
                span in (1..8_i32, 1..8_i32),
            ) {
                let tree = run::<PerfectBalancing>(&ops)?;
                check_queries(&tree, probe, [span.0, span.1])?;
            }

            #[test]
            fn strict_rebalance_keeps_handles(keys in prop::collection::vec(key(), 1..100)) {
                let mut tree: IdlePointMap<[i32; 2], usize, StaticRank<2>> = IdlePointMap::new();
                let ids: Vec<_> = keys
                    .iter()
                    .enumerate()
                    .map(|(i, k)| tree.insert(*k, i))
                    .collect();
                tree.rebalance();
                tree.assert_invariants();
                for (i, id) in ids.into_iter().enumerate() {
                    prop_assert_eq!(tree.get(id), Some((&keys[i], &i)));
                }
            }
        }
    }
}
