// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Iteration over the elements equal to a model key on every axis.
//!
//! Elements come in pre-order. A node split on some axis rules out the side
//! that cannot hold the model's coordinate, so the walk only enters subtrees
//! whose cells contain the model key.

use core::iter::FusedIterator;

use crate::balancing::Balancing;
use crate::compare::KeyCompare;
use crate::mapping::Pos;
use crate::rank::Rank;
use crate::region::PreorderFilter;
use crate::tree::{Kdtree, Nav};

/// Prunes to the cells that contain a model key.
pub(crate) struct EqualFilter<'a, K, C> {
    compare: &'a C,
    key: &'a K,
    rank: usize,
    relaxed: bool,
}

impl<K, C: KeyCompare<K>> PreorderFilter<K> for EqualFilter<'_, K, C> {
    fn enter_left(&self, dim: usize, node: &K) -> bool {
        // Strict left subtrees hold no key equal to their root on its axis.
        if self.relaxed {
            !self.compare.less(dim, node, self.key)
        } else {
            self.compare.less(dim, self.key, node)
        }
    }

    fn enter_right(&self, dim: usize, node: &K) -> bool {
        !self.compare.less(dim, self.key, node)
    }

    fn accept(&self, key: &K) -> bool {
        (0..self.rank).all(|axis| {
            !self.compare.less(axis, key, self.key) && !self.compare.less(axis, self.key, key)
        })
    }
}

impl<'a, K, V, C> Nav<'a, K, V, C> {
    pub(crate) fn equal_filter(&self, key: &'a K) -> EqualFilter<'a, K, C> {
        EqualFilter {
            compare: self.compare,
            key,
            rank: self.rank,
            relaxed: self.relaxed,
        }
    }
}

impl<K, V, C: KeyCompare<K>> Nav<'_, K, V, C> {
    /// First element equal to `key` in the pre-order of the subtree at
    /// `start`, found at `axis`; the subtree's parent when there is none.
    pub(crate) fn first_equal(&self, start: usize, axis: usize, key: &K) -> Pos {
        self.preorder_first(&self.equal_filter(key), start, axis)
    }
}

/// Elements equal to a model key on every axis, in pre-order.
///
/// Created by [`Kdtree::equal_range`].
pub struct Equal<'a, K, V, C> {
    nav: Nav<'a, K, V, C>,
    filter: EqualFilter<'a, K, C>,
    front: Pos,
    back: Pos,
}

impl<K: core::fmt::Debug, V, C> core::fmt::Debug for Equal<'_, K, V, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Equal")
            .field("key", self.filter.key)
            .finish_non_exhaustive()
    }
}

impl<'a, K, V, C: KeyCompare<K>> Iterator for Equal<'a, K, V, C> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.front.0 == self.back.0 {
            return None;
        }
        let node = self.front.0;
        self.front = self.nav.preorder_increment_by(&self.filter, self.front);
        Some(self.nav.entry(node))
    }
}

impl<K, V, C: KeyCompare<K>> DoubleEndedIterator for Equal<'_, K, V, C> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front.0 == self.back.0 {
            return None;
        }
        self.back = self.nav.preorder_decrement_by(&self.filter, self.back);
        Some(self.nav.entry(self.back.0))
    }
}

impl<K, V, C: KeyCompare<K>> FusedIterator for Equal<'_, K, V, C> {}

impl<K, V, R: Rank, C: KeyCompare<K>, B: Balancing> Kdtree<K, V, R, C, B> {
    /// Every element equal to `key` on all axes.
    ///
    /// ```rust
    /// use understory_kdtree::{PointMap, StaticRank};
    ///
    /// let mut map: PointMap<[i32; 2], char, StaticRank<2>> = PointMap::new();
    /// map.insert([1, 2], 'a');
    /// map.insert([2, 1], 'b');
    /// map.insert([1, 2], 'c');
    /// let mut found: Vec<_> = map.equal_range(&[1, 2]).map(|(_, v)| *v).collect();
    /// found.sort_unstable();
    /// assert_eq!(found, ['a', 'c']);
    /// ```
    pub fn equal_range<'a>(&'a self, key: &'a K) -> Equal<'a, K, V, C> {
        let nav = self.nav();
        let filter = nav.equal_filter(key);
        let front = nav.preorder_begin(&filter);
        Equal {
            nav,
            filter,
            front,
            back: nav.end(),
        }
    }
}
