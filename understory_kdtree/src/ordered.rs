// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Iteration in the lexicographic order of keys, axis 0 first.

use core::iter::FusedIterator;

use crate::balancing::Balancing;
use crate::compare::KeyCompare;
use crate::mapping::{Pos, SweepOrder};
use crate::rank::Rank;
use crate::tree::{Kdtree, Nav};

/// Lexicographic order over all axes.
///
/// Only nodes split on axis 0 say anything about their subtrees under this
/// order, and only when the comparison on axis 0 is strict.
pub(crate) struct LexOrder<'a, C> {
    compare: &'a C,
    rank: usize,
    relaxed: bool,
}

impl<K, C: KeyCompare<K>> SweepOrder<K> for LexOrder<'_, C> {
    fn less(&self, a: &K, b: &K) -> bool {
        for axis in 0..self.rank {
            if self.compare.less(axis, a, b) {
                return true;
            }
            if self.compare.less(axis, b, a) {
                return false;
            }
        }
        false
    }

    fn right_not_below(&self, dim: usize, node: &K, x: &K) -> bool {
        self.right_above(dim, node, x)
    }

    fn right_above(&self, dim: usize, node: &K, x: &K) -> bool {
        dim == 0 && self.compare.less(0, x, node)
    }

    fn left_below(&self, dim: usize, node: &K, x: &K) -> bool {
        dim == 0
            && if self.relaxed {
                self.compare.less(0, node, x)
            } else {
                !self.compare.less(0, x, node)
            }
    }

    fn left_not_above(&self, dim: usize, node: &K, x: &K) -> bool {
        self.left_below(dim, node, x)
    }
}

impl<'a, K, V, C> Nav<'a, K, V, C> {
    pub(crate) fn lex_order(&self) -> LexOrder<'a, C> {
        LexOrder {
            compare: self.compare,
            rank: self.rank,
            relaxed: self.relaxed,
        }
    }
}

impl<K, V, C: KeyCompare<K>> Nav<'_, K, V, C> {
    /// Lexicographic comparison of two keys.
    pub(crate) fn order_less(&self, a: &K, b: &K) -> bool {
        self.lex_order().less(a, b)
    }
}

/// Elements in lexicographic order of their keys; equal keys in in-order
/// sequence.
///
/// Created by [`Kdtree::ordered`], [`Kdtree::ordered_lower_bound`] and
/// [`Kdtree::ordered_upper_bound`].
pub struct Ordered<'a, K, V, C> {
    nav: Nav<'a, K, V, C>,
    front: Pos,
    back: Pos,
}

impl<K, V, C> core::fmt::Debug for Ordered<'_, K, V, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Ordered").finish_non_exhaustive()
    }
}

impl<'a, K, V, C: KeyCompare<K>> Iterator for Ordered<'a, K, V, C> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.front.0 == self.back.0 {
            return None;
        }
        let node = self.front.0;
        self.front = self.nav.increment_by(&self.nav.lex_order(), self.front);
        Some(self.nav.entry(node))
    }
}

impl<K, V, C: KeyCompare<K>> DoubleEndedIterator for Ordered<'_, K, V, C> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front.0 == self.back.0 {
            return None;
        }
        self.back = self.nav.decrement_by(&self.nav.lex_order(), self.back);
        Some(self.nav.entry(self.back.0))
    }
}

impl<K, V, C: KeyCompare<K>> FusedIterator for Ordered<'_, K, V, C> {}

impl<K, V, R: Rank, C: KeyCompare<K>, B: Balancing> Kdtree<K, V, R, C, B> {
    /// Every element in lexicographic key order.
    ///
    /// ```rust
    /// use understory_kdtree::{IdlePointSet, StaticRank};
    ///
    /// let set: IdlePointSet<[i32; 2], StaticRank<2>> =
    ///     [[3, 4], [1, 2], [5, 6], [1, 2], [4, 1]].into_iter().map(|k| (k, ())).collect();
    /// let keys: Vec<_> = set.ordered().map(|(k, _)| *k).collect();
    /// assert_eq!(keys, [[1, 2], [1, 2], [3, 4], [4, 1], [5, 6]]);
    /// ```
    pub fn ordered(&self) -> Ordered<'_, K, V, C> {
        let nav = self.nav();
        self.ordered_from(nav.first_by(&nav.lex_order()))
    }

    /// Elements whose key is not below `bound`, in lexicographic order.
    pub fn ordered_lower_bound(&self, bound: &K) -> Ordered<'_, K, V, C> {
        let nav = self.nav();
        self.ordered_from(nav.bound_by(&nav.lex_order(), bound, false))
    }

    /// Elements whose key is above `bound`, in lexicographic order.
    pub fn ordered_upper_bound(&self, bound: &K) -> Ordered<'_, K, V, C> {
        let nav = self.nav();
        self.ordered_from(nav.bound_by(&nav.lex_order(), bound, true))
    }

    fn ordered_from(&self, front: Pos) -> Ordered<'_, K, V, C> {
        let nav = self.nav();
        Ordered {
            nav,
            front,
            back: nav.end(),
        }
    }
}
