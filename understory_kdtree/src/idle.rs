// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Insertion and erasure under the strict invariant.
//!
//! Left subtrees hold keys strictly below their root on the root's axis; equal
//! keys always go right. Nothing is rebalanced here: see
//! [`Kdtree::rebalance`](crate::Kdtree::rebalance).

use crate::balancing::Balancing;
use crate::compare::KeyCompare;
use crate::node::HEADER;
use crate::rank::{Rank, incr_axis};
use crate::tree::Kdtree;

impl<K, V, R: Rank, C: KeyCompare<K>, B: Balancing> Kdtree<K, V, R, C, B> {
    /// Attach an unlinked node as a leaf.
    pub(crate) fn insert_strict(&mut self, node: usize) {
        let rank = self.rank.get();
        let Some(mut cur) = self.arena.root() else {
            self.arena.set_root(node);
            self.arena.set_leftmost(node);
            self.arena.set_rightmost(node);
            return;
        };
        let mut axis = 0;
        loop {
            if self
                .compare
                .less(axis, self.arena.key(node), self.arena.key(cur))
            {
                match self.arena.left(cur) {
                    Some(l) => cur = l,
                    None => {
                        self.arena.node_mut(cur).left = Some(node);
                        self.arena.node_mut(node).parent = cur;
                        if self.arena.leftmost() == cur {
                            self.arena.set_leftmost(node);
                        }
                        return;
                    }
                }
            } else {
                match self.arena.right(cur) {
                    Some(r) => cur = r,
                    None => {
                        self.arena.node_mut(cur).right = Some(node);
                        self.arena.node_mut(node).parent = cur;
                        if self.arena.rightmost() == cur {
                            self.arena.set_rightmost(node);
                        }
                        return;
                    }
                }
            }
            axis = incr_axis(rank, axis);
        }
    }

    /// Unlink `node`, found at `axis`, from the tree. The slot is not released.
    ///
    /// The node sinks by swapping places with the minimum of its right subtree
    /// along its own axis until it is a leaf. A node with only a left subtree
    /// first moves that subtree to the right, since a replacement drawn from
    /// the left would leave its equals on the wrong side.
    pub(crate) fn erase_strict(&mut self, mut axis: usize, node: usize) {
        let rank = self.rank.get();
        while !self.arena.is_leaf(node) {
            let right = match self.arena.right(node) {
                Some(right) => right,
                None => {
                    let Some(left) = self.arena.node_mut(node).left.take() else {
                        break;
                    };
                    self.arena.node_mut(node).right = Some(left);
                    if self.arena.rightmost() == node {
                        let max = self.arena.maximum(left);
                        self.arena.set_rightmost(max);
                    }
                    let mut seeker = left;
                    loop {
                        if seeker == self.arena.leftmost() {
                            self.arena.set_leftmost(node);
                            break;
                        }
                        match self.arena.left(seeker) {
                            Some(l) => seeker = l,
                            None => break,
                        }
                    }
                    tracing::trace!(axis, "shifted left subtree to the right");
                    left
                }
            };
            let (candidate, candidate_axis) =
                self.nav()
                    .minimum_mapping(right, incr_axis(rank, axis), axis);
            if self.arena.rightmost() == candidate {
                self.arena.set_rightmost(node);
            }
            if self.arena.leftmost() == node {
                self.arena.set_leftmost(candidate);
            }
            self.arena.swap_nodes(node, candidate);
            axis = candidate_axis;
        }
        self.detach_leaf(node);
    }

    /// Unlink a leaf from its parent, fixing the leftmost and rightmost caches.
    pub(crate) fn detach_leaf(&mut self, node: usize) {
        let parent = self.arena.parent(node);
        if parent == HEADER {
            self.arena.reset_header();
        } else if self.arena.left(parent) == Some(node) {
            self.arena.node_mut(parent).left = None;
            if self.arena.leftmost() == node {
                self.arena.set_leftmost(parent);
            }
        } else {
            self.arena.node_mut(parent).right = None;
            if self.arena.rightmost() == node {
                self.arena.set_rightmost(parent);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{IdlePointSet, StaticRank};
    use alloc::vec::Vec;

    type Set2 = IdlePointSet<[i32; 2], StaticRank<2>>;

    fn sorted_keys(t: &Set2) -> Vec<[i32; 2]> {
        let mut keys: Vec<_> = t.iter().map(|(k, _)| *k).collect();
        keys.sort_unstable();
        keys
    }

    #[test]
    fn equal_keys_go_right() {
        let mut t = Set2::new();
        let root = t.insert_key([5, 5]);
        let twin = t.insert_key([5, 5]);
        assert_eq!(t.arena.right(root.slot()), Some(twin.slot()));
        t.insert_key([4, 9]);
        assert_eq!(t.arena.leftmost(), t.arena.left(root.slot()).unwrap());
        t.assert_invariants();
    }

    #[test]
    fn erase_root_with_only_left_subtree() {
        // Every key is below the root on axis 0, so the root has no right child.
        let mut t = Set2::new();
        let root = t.insert_key([9, 0]);
        for k in [[4, 4], [2, 8], [6, 1], [4, 4], [1, 1], [3, 9]] {
            t.insert_key(k);
        }
        assert!(t.arena.right(root.slot()).is_none());
        assert_eq!(t.erase(root).map(|(k, _)| k), Ok([9, 0]));
        t.assert_invariants();
        assert_eq!(
            sorted_keys(&t),
            [[1, 1], [2, 8], [3, 9], [4, 4], [4, 4], [6, 1]]
        );
    }

    #[test]
    fn erase_every_node_in_turn() {
        let keys: Vec<[i32; 2]> = (0..60).map(|i| [(i * 37) % 11, (i * 13) % 7]).collect();
        for victim in 0..keys.len() {
            let mut t = Set2::new();
            let ids: Vec<_> = keys.iter().map(|k| t.insert_key(*k)).collect();
            t.erase(ids[victim]).unwrap();
            t.assert_invariants();
            let mut expected = keys.clone();
            expected.remove(victim);
            expected.sort_unstable();
            assert_eq!(sorted_keys(&t), expected);
            // Other handles survive.
            for (i, id) in ids.iter().enumerate() {
                assert_eq!(t.get(*id).is_some(), i != victim);
            }
        }
    }

    #[test]
    fn drain_to_empty() {
        let mut t = Set2::new();
        let ids: Vec<_> = (0..25).map(|i| t.insert_key([i % 5, i / 5])).collect();
        for id in ids.into_iter().rev() {
            t.erase(id).unwrap();
            t.assert_invariants();
        }
        assert!(t.is_empty());
        assert_eq!(t.iter().next(), None);
    }
}
