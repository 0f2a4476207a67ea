// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Insertion and erasure under the relaxed invariant, with scapegoat
//! rebalancing.
//!
//! Every node carries the weight of its subtree. Keys equal to a node on its
//! axis may sit on either side, which lets insertion send ties to the lighter
//! side and lets erasure draw its replacement from the heavier side. Whenever
//! the [`Balancing`] policy flags a node, its subtree is rebalanced by taking
//! the node out and inserting it back below its replacement.

use crate::balancing::Balancing;
use crate::compare::KeyCompare;
use crate::node::HEADER;
use crate::rank::{Rank, decr_axis, incr_axis};
use crate::tree::Kdtree;

impl<K, V, R: Rank, C: KeyCompare<K>, B: Balancing> Kdtree<K, V, R, C, B> {
    fn unbalanced(&self, node: usize) -> bool {
        let left = self.arena.link_weight(self.arena.left(node));
        let right = self.arena.link_weight(self.arena.right(node));
        self.balancing
            .should_rebalance(self.rank.get(), left, right)
    }

    /// Attach an unlinked node of weight 1.
    pub(crate) fn insert_relaxed(&mut self, node: usize) {
        match self.arena.root() {
            Some(root) => self.insert_below(0, root, node),
            None => {
                self.arena.set_root(node);
                self.arena.set_leftmost(node);
                self.arena.set_rightmost(node);
            }
        }
    }

    /// Insert `target` into the subtree rooted at `node`, found at `axis`.
    fn insert_below(&mut self, mut axis: usize, mut node: usize, target: usize) {
        let rank = self.rank.get();
        loop {
            let (left, right) = (self.arena.left(node), self.arena.right(node));
            let (wl, wr) = (self.arena.link_weight(left), self.arena.link_weight(right));
            let (tk, nk) = (self.arena.key(target), self.arena.key(node));
            let go_left = self.compare.less(axis, tk, nk)
                || (!self.compare.less(axis, nk, tk)
                    && (left.is_none() || (right.is_some() && wl < wr)));
            let (child, weights) = if go_left {
                (left, (wl + 1, wr))
            } else {
                (right, (wl, wr + 1))
            };
            let Some(child) = child else {
                let n = self.arena.node_mut(node);
                if go_left {
                    n.left = Some(target);
                } else {
                    n.right = Some(target);
                }
                n.weight += 1;
                self.arena.node_mut(target).parent = node;
                if go_left && self.arena.leftmost() == node {
                    self.arena.set_leftmost(target);
                }
                if !go_left && self.arena.rightmost() == node {
                    self.arena.set_rightmost(target);
                }
                return;
            };
            if self.balancing.should_rebalance(rank, weights.0, weights.1) {
                // Retry the same position with the rebalanced subtree.
                node = self.balance_node(axis, node);
            } else {
                self.arena.node_mut(node).weight += 1;
                node = child;
                axis = incr_axis(rank, axis);
            }
        }
    }

    /// Rebalance the subtree at `node`, found at `axis`, and return the node
    /// now occupying that position.
    fn balance_node(&mut self, axis: usize, node: usize) -> usize {
        if self.arena.is_leaf(node) {
            return node;
        }
        let parent = self.arena.parent(node);
        let was_left = parent != HEADER && self.arena.left(parent) == Some(node);
        tracing::trace!(
            axis,
            left = self.arena.link_weight(self.arena.left(node)),
            right = self.arena.link_weight(self.arena.right(node)),
            "rebalancing subtree"
        );
        self.erase_below(axis, node);
        let replacing = self.child_at(parent, was_left);
        self.insert_below(axis, replacing, node);
        self.child_at(parent, was_left)
    }

    /// The node linked under `parent` on the given side; the root when
    /// `parent` is the header.
    fn child_at(&self, parent: usize, left: bool) -> usize {
        let child = if parent == HEADER {
            self.arena.root()
        } else if left {
            self.arena.left(parent)
        } else {
            self.arena.right(parent)
        };
        child.expect("rebalanced subtree is not empty")
    }

    /// Unlink `node`, found at `axis`, from a tree holding at least one other
    /// node.
    ///
    /// Weights are fixed and subtrees rebalanced from the detached leaf up to,
    /// and including, the position `node` started at. Ancestors above that
    /// position are left to the caller.
    fn erase_below(&mut self, mut axis: usize, mut node: usize) {
        let rank = self.rank.get();
        let parent = self.arena.parent(node);
        let target = node;
        while !self.arena.is_leaf(target) {
            let (left, right) = (self.arena.left(target), self.arena.right(target));
            let from_left = match (left, right) {
                (Some(_), None) => true,
                (Some(_), Some(_)) => {
                    self.arena.link_weight(right) < self.arena.link_weight(left)
                }
                _ => false,
            };
            let next = incr_axis(rank, axis);
            let (candidate, candidate_axis) = if let (true, Some(l)) = (from_left, left) {
                let found = self.nav().maximum_mapping(l, next, axis);
                if self.arena.leftmost() == found.0 {
                    self.arena.set_leftmost(target);
                }
                if self.arena.rightmost() == target {
                    self.arena.set_rightmost(found.0);
                }
                found
            } else if let Some(r) = right {
                let found = self.nav().minimum_mapping(r, next, axis);
                if self.arena.rightmost() == found.0 {
                    self.arena.set_rightmost(target);
                }
                if self.arena.leftmost() == target {
                    self.arena.set_leftmost(found.0);
                }
                found
            } else {
                break;
            };
            self.arena.swap_nodes(target, candidate);
            axis = candidate_axis;
        }
        self.detach_leaf(target);
        // The detached slot keeps its parent link until it is reinserted or freed.
        while self.arena.parent(node) != parent {
            node = self.arena.parent(node);
            axis = decr_axis(rank, axis);
            self.arena.node_mut(node).weight -= 1;
            if self.unbalanced(node) {
                node = self.balance_node(axis, node);
            }
        }
        self.arena.node_mut(target).weight = 1;
    }

    /// Unlink `node`, found at `axis`, and rebalance the path to the root.
    pub(crate) fn erase_relaxed(&mut self, axis: usize, node: usize) {
        let rank = self.rank.get();
        let parent = self.arena.parent(node);
        if parent == HEADER && self.arena.is_leaf(node) {
            self.arena.reset_header();
            return;
        }
        self.erase_below(axis, node);
        let mut p = parent;
        let mut axis = decr_axis(rank, axis);
        while p != HEADER {
            self.arena.node_mut(p).weight -= 1;
            if self.unbalanced(p) {
                p = self.balance_node(axis, p);
            }
            p = self.arena.parent(p);
            axis = decr_axis(rank, axis);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::node::HEADER;
    use crate::{
        BracketLess, DynamicRank, LooseBalancing, PerfectBalancing, PointSet, StaticRank,
        TightBalancing,
    };
    use alloc::vec::Vec;

    #[test]
    fn ties_go_to_the_lighter_side() {
        let mut t: PointSet<[i32; 1], StaticRank<1>, BracketLess, PerfectBalancing> =
            PointSet::new();
        for _ in 0..9 {
            t.insert_key([7]);
        }
        t.assert_invariants();
        let root = t.arena.root().unwrap();
        let l = t.arena.link_weight(t.arena.left(root));
        let r = t.arena.link_weight(t.arena.right(root));
        assert!(l.abs_diff(r) <= 2, "left {l} right {r}");
    }

    #[test]
    fn sorted_input_stays_shallow() {
        let mut t: PointSet<[i32; 2], StaticRank<2>> = PointSet::new();
        for i in 0..512 {
            t.insert_key([i, i]);
        }
        t.assert_invariants();
        let depth = |mut n: usize| {
            let mut d = 0;
            while n != HEADER {
                n = t.arena.parent(n);
                d += 1;
            }
            d
        };
        let mut deepest = 0;
        let mut n = t.arena.leftmost();
        while n != HEADER {
            deepest = deepest.max(depth(n));
            n = t.arena.increment(n);
        }
        assert!(deepest < 40, "depth {deepest} for 512 sorted keys");
    }

    #[test]
    fn insert_between_two_keys_settles() {
        let mut t: PointSet<[i32; 1], StaticRank<1>> = PointSet::new();
        for k in [0, 10, 5, 7, 6, 3, 4] {
            t.insert_key([k]);
            t.assert_invariants();
        }
        let keys: Vec<_> = t.keys().map(|k| k[0]).collect();
        assert_eq!(keys, [0, 3, 4, 5, 6, 7, 10]);
    }

    #[test]
    fn erase_keeps_weights_under_every_policy() {
        fn run<B: crate::Balancing>() {
            let mut t: PointSet<Vec<i32>, DynamicRank, BracketLess, B> =
                PointSet::with_rank(DynamicRank::new(3).unwrap());
            let ids: Vec<_> = (0..120)
                .map(|i| t.insert_key(alloc::vec![i % 5, (i * 7) % 11, i / 10]))
                .collect();
            t.assert_invariants();
            for (n, id) in ids.into_iter().enumerate().filter(|(n, _)| n % 3 != 1) {
                let (k, ()) = t.erase(id).unwrap();
                assert_eq!(usize::try_from(k[0]).unwrap(), n % 5);
                t.assert_invariants();
            }
            assert_eq!(t.len(), 40);
        }
        run::<LooseBalancing>();
        run::<TightBalancing>();
        run::<PerfectBalancing>();
    }

    #[test]
    fn erase_key_removes_all_duplicates() {
        let mut t: PointSet<[i32; 2], StaticRank<2>> = PointSet::new();
        for i in 0..30 {
            t.insert_key([i % 3, 1]);
        }
        assert_eq!(t.erase_key(&[1, 1]), 10);
        t.assert_invariants();
        assert_eq!(t.len(), 20);
        assert!(!t.contains(&[1, 1]));
        assert_eq!(t.erase_key(&[1, 1]), 0);
    }
}
