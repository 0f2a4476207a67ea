// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Whole-tree rebuild by recursive median selection.

use alloc::vec::Vec;
use core::cmp::Ordering;

use crate::balancing::{Balancing, Idle};
use crate::compare::KeyCompare;
use crate::node::{Arena, HEADER};
use crate::rank::{Rank, incr_axis};
use crate::tree::Kdtree;

impl<K, V, R: Rank, C: KeyCompare<K>, B: Balancing> Kdtree<K, V, R, C, B> {
    /// Relink every node into a balanced shape. Slots, and so handles, are kept.
    pub(crate) fn rebuild(&mut self) {
        let mut nodes = Vec::with_capacity(self.len);
        let mut node = self.arena.leftmost();
        while node != HEADER {
            nodes.push(node);
            node = self.arena.increment(node);
        }
        self.arena.reset_header();
        if nodes.is_empty() {
            return;
        }
        let root = self.build(&mut nodes, 0);
        self.arena.set_root(root);
        let (min, max) = (self.arena.minimum(root), self.arena.maximum(root));
        self.arena.set_leftmost(min);
        self.arena.set_rightmost(max);
        tracing::trace!(len = self.len, "rebuilt tree");
    }

    /// Link `items` into a subtree splitting on `axis` and return its root.
    fn build(&mut self, items: &mut [usize], axis: usize) -> usize {
        let pivot = median(&self.arena, &self.compare, items, axis);
        let node = items[pivot];
        let next = incr_axis(self.rank.get(), axis);
        let (lower, rest) = items.split_at_mut(pivot);
        let upper = &mut rest[1..];
        let left = (!lower.is_empty()).then(|| self.build(lower, next));
        let right = (!upper.is_empty()).then(|| self.build(upper, next));
        let weight =
            1 + self.arena.link_weight(left) + self.arena.link_weight(right);
        let n = self.arena.node_mut(node);
        n.left = left;
        n.right = right;
        n.weight = weight;
        for child in [left, right].into_iter().flatten() {
            self.arena.node_mut(child).parent = node;
        }
        node
    }
}

/// Partition `items` around their median on `axis` and return its position.
///
/// With duplicates of the median, the leftmost one is chosen, so everything
/// before the returned position is strictly below it and equal keys end up on
/// the right.
fn median<K, V, C: KeyCompare<K>>(
    arena: &Arena<K, V>,
    compare: &C,
    items: &mut [usize],
    axis: usize,
) -> usize {
    if items.len() == 1 {
        return 0;
    }
    let less = |a: usize, b: usize| compare.less(axis, arena.key(a), arena.key(b));
    let mid = items.len() / 2;
    items.select_nth_unstable_by(mid, |&a, &b| {
        if less(a, b) {
            Ordering::Less
        } else if less(b, a) {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    });
    let mut pivot = mid;
    for seek in (0..mid).rev() {
        if !less(items[seek], items[mid]) {
            pivot -= 1;
            items.swap(seek, pivot);
        }
    }
    pivot
}

impl<K, V, R: Rank, C: KeyCompare<K>> Kdtree<K, V, R, C, Idle> {
    /// Rebuild the tree into a balanced shape.
    ///
    /// Handles stay valid. Iteration orders that depend on the shape (pre-order,
    /// region, equal) may change; axis orders do not.
    pub fn rebalance(&mut self) {
        self.rebuild();
    }

    /// Insert every element of `iter`, then rebuild once.
    pub fn insert_rebalance<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            let node = self.arena.allocate(key, value);
            self.insert_strict(node);
            self.len += 1;
        }
        self.rebuild();
    }
}

impl<K, V, R, C, B> Kdtree<K, V, R, C, B>
where
    K: Clone,
    V: Clone,
    R: Rank,
    C: KeyCompare<K> + Clone,
    B: Balancing,
{
    /// Copy of the tree rebuilt into a balanced shape, weights recomputed.
    pub fn clone_rebalanced(&self) -> Self {
        let mut copy = self.clone();
        copy.rebuild();
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::median;
    use crate::node::Arena;
    use crate::{BracketLess, IdlePointSet, PointSet, StaticRank};
    use alloc::vec::Vec;

    #[test]
    fn median_picks_leftmost_duplicate() {
        let mut arena = Arena::new();
        let mut items: Vec<usize> = [3, 5, 5, 1, 5, 5, 9, 5]
            .into_iter()
            .map(|k| arena.allocate([k], ()))
            .collect();
        let pivot = median(&arena, &BracketLess, &mut items, 0);
        assert_eq!(arena.key(items[pivot]), &[5]);
        assert!(items[..pivot].iter().all(|&n| arena.key(n)[0] < 5));
        assert!(items[pivot..].iter().all(|&n| arena.key(n)[0] >= 5));
    }

    #[test]
    fn rebalance_flattens_sorted_input() {
        let mut t: IdlePointSet<[i32; 2], StaticRank<2>> = IdlePointSet::new();
        let ids: Vec<_> = (0..255).map(|i| t.insert_key([i, (i * 7) % 255])).collect();
        t.rebalance();
        t.assert_invariants();
        let root = t.arena.root().unwrap();
        assert!(t.arena.weight(root) == 255);
        let mut deepest = 0;
        for id in &ids {
            let mut n = id.slot();
            let mut depth = 0;
            while n != crate::node::HEADER {
                n = t.arena.parent(n);
                depth += 1;
            }
            deepest = deepest.max(depth);
        }
        assert_eq!(deepest, 8, "perfect shape for 255 nodes");
        assert!(ids.iter().all(|id| t.get(*id).is_some()));
    }

    #[test]
    fn insert_rebalance_with_duplicates_keeps_strict_order() {
        let mut t: IdlePointSet<[i32; 2], StaticRank<2>> = IdlePointSet::new();
        t.insert_rebalance((0..100).map(|i| ([i % 3, i % 2], ())));
        t.assert_invariants();
        assert_eq!(t.len(), 100);
    }

    #[test]
    fn rebalanced_clone_recomputes_weights() {
        let mut t: PointSet<[i32; 2], StaticRank<2>> = PointSet::new();
        t.extend((0..64).map(|i| ([i, -i], ())));
        let copy = t.clone_rebalanced();
        copy.assert_invariants();
        assert_eq!(copy, t);
    }
}
