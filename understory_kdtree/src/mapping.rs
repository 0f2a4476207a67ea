// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Iteration in ascending order of one coordinate.
//!
//! A mapping iterator fixes an axis and walks the elements sorted by their
//! coordinate on that axis; elements with equal coordinates come in in-order
//! sequence. Each step searches the tree again, skipping subtrees that a
//! node split on the mapped axis proves useless, so a full walk costs about
//! `O(n^(1 - 1/k))` per element rather than `O(log n)`.
//!
//! The sweeps here are written against [`SweepOrder`], which the
//! lexicographic [`Ordered`](crate::Ordered) iterator reuses.

use core::iter::FusedIterator;

use crate::balancing::Balancing;
use crate::compare::KeyCompare;
use crate::error::Result;
use crate::node::HEADER;
use crate::rank::{Rank, check_axis};
use crate::tree::{Kdtree, Nav};

pub(crate) type Pos = (usize, usize);

/// A total order on keys, plus what a node split on some axis proves about
/// the keys of its subtrees under that order.
///
/// Elements equal under `less` are sorted by in-order position, so every sweep
/// below is a walk over the in-order sequence that skips provably useless
/// subtrees.
pub(crate) trait SweepOrder<K> {
    fn less(&self, a: &K, b: &K) -> bool;
    /// Every key right of `node` (split on `dim`) is at least `x`.
    fn right_not_below(&self, dim: usize, node: &K, x: &K) -> bool;
    /// Every key right of `node` is above `x`.
    fn right_above(&self, dim: usize, node: &K, x: &K) -> bool;
    /// Every key left of `node` is below `x`.
    fn left_below(&self, dim: usize, node: &K, x: &K) -> bool;
    /// Every key left of `node` is at most `x`.
    fn left_not_above(&self, dim: usize, node: &K, x: &K) -> bool;
}

/// Order on a single coordinate.
pub(crate) struct AxisOrder<'a, C> {
    compare: &'a C,
    map: usize,
    relaxed: bool,
}

impl<K, C: KeyCompare<K>> SweepOrder<K> for AxisOrder<'_, C> {
    #[inline]
    fn less(&self, a: &K, b: &K) -> bool {
        self.compare.less(self.map, a, b)
    }

    fn right_not_below(&self, dim: usize, node: &K, x: &K) -> bool {
        dim == self.map && !self.less(node, x)
    }

    fn right_above(&self, dim: usize, node: &K, x: &K) -> bool {
        dim == self.map && self.less(x, node)
    }

    fn left_below(&self, dim: usize, node: &K, x: &K) -> bool {
        // Strict left subtrees are below their root, relaxed ones may equal it.
        dim == self.map
            && if self.relaxed {
                self.less(node, x)
            } else {
                !self.less(x, node)
            }
    }

    fn left_not_above(&self, dim: usize, node: &K, x: &K) -> bool {
        dim == self.map && !self.less(x, node)
    }
}

impl<'a, K, V, C> Nav<'a, K, V, C> {
    pub(crate) fn axis_order(&self, map: usize) -> AxisOrder<'a, C> {
        AxisOrder {
            compare: self.compare,
            map,
            relaxed: self.relaxed,
        }
    }

    /// Smallest position of the subtree at `node`, found at `dim`.
    pub(crate) fn minimum_by<O: SweepOrder<K>>(
        &self,
        order: &O,
        mut node: usize,
        mut dim: usize,
    ) -> Pos {
        let arena = self.arena;
        let end = arena.parent(node);
        while let Some(l) = arena.left(node) {
            node = l;
            dim = self.incr(dim);
        }
        let mut best = (node, dim);
        loop {
            match arena.right(node) {
                Some(r) if !order.right_not_below(dim, self.key(node), self.key(best.0)) => {
                    node = r;
                    dim = self.incr(dim);
                    while let Some(l) = arena.left(node) {
                        node = l;
                        dim = self.incr(dim);
                    }
                }
                _ => {
                    (node, dim) = self.ascend_from_right((node, dim), end);
                    if node == end {
                        break;
                    }
                }
            }
            if order.less(self.key(node), self.key(best.0)) {
                best = (node, dim);
            }
        }
        best
    }

    /// Largest position of the subtree at `node`, found at `dim`.
    pub(crate) fn maximum_by<O: SweepOrder<K>>(
        &self,
        order: &O,
        mut node: usize,
        mut dim: usize,
    ) -> Pos {
        let arena = self.arena;
        let end = arena.parent(node);
        while let Some(r) = arena.right(node) {
            node = r;
            dim = self.incr(dim);
        }
        let mut best = (node, dim);
        loop {
            match arena.left(node) {
                Some(l) if !order.left_not_above(dim, self.key(node), self.key(best.0)) => {
                    node = l;
                    dim = self.incr(dim);
                    while let Some(r) = arena.right(node) {
                        node = r;
                        dim = self.incr(dim);
                    }
                }
                _ => {
                    (node, dim) = self.ascend_from_left((node, dim), end);
                    if node == end {
                        break;
                    }
                }
            }
            if order.less(self.key(best.0), self.key(node)) {
                best = (node, dim);
            }
        }
        best
    }

    /// Smallest position of the whole tree, or the end.
    pub(crate) fn first_by<O: SweepOrder<K>>(&self, order: &O) -> Pos {
        match self.root() {
            Some(root) => self.minimum_by(order, root, 0),
            None => self.end(),
        }
    }

    /// Position following `pos`, or the end.
    pub(crate) fn increment_by<O: SweepOrder<K>>(&self, order: &O, pos: Pos) -> Pos {
        let arena = self.arena;
        let orig = self.key(pos.0);
        let (mut node, mut dim) = pos;
        let mut best: Option<Pos> = None;
        // Forward in in-order: an equal key ends the search at once.
        loop {
            match arena.right(node) {
                Some(r)
                    if best.is_none_or(|(b, _)| {
                        !order.right_not_below(dim, self.key(node), self.key(b))
                    }) =>
                {
                    node = r;
                    dim = self.incr(dim);
                    while let Some(l) = arena.left(node) {
                        if order.left_below(dim, self.key(node), orig) {
                            break;
                        }
                        node = l;
                        dim = self.incr(dim);
                    }
                }
                _ => {
                    (node, dim) = self.ascend_from_right((node, dim), HEADER);
                    if node == HEADER {
                        break;
                    }
                }
            }
            let key = self.key(node);
            if order.less(orig, key) {
                if best.is_none_or(|(b, _)| order.less(key, self.key(b))) {
                    best = Some((node, dim));
                }
            } else if !order.less(key, orig) {
                return (node, dim);
            }
        }
        // Backward: greater keys placed before `pos` in in-order.
        (node, dim) = pos;
        loop {
            match arena.left(node) {
                Some(l) if !order.left_not_above(dim, self.key(node), orig) => {
                    node = l;
                    dim = self.incr(dim);
                    while let Some(r) = arena.right(node) {
                        // Keys equal to `best` further right still precede it.
                        if best.is_some_and(|(b, _)| {
                            order.right_above(dim, self.key(node), self.key(b))
                        }) {
                            break;
                        }
                        node = r;
                        dim = self.incr(dim);
                    }
                }
                _ => {
                    (node, dim) = self.ascend_from_left((node, dim), HEADER);
                    if node == HEADER {
                        break;
                    }
                }
            }
            let key = self.key(node);
            if order.less(orig, key) && best.is_none_or(|(b, _)| !order.less(self.key(b), key)) {
                best = Some((node, dim));
            }
        }
        best.unwrap_or_else(|| self.end())
    }

    /// Position preceding `pos`; from the end, the largest position.
    pub(crate) fn decrement_by<O: SweepOrder<K>>(&self, order: &O, pos: Pos) -> Pos {
        let arena = self.arena;
        if pos.0 == HEADER {
            return match self.root() {
                Some(root) => self.maximum_by(order, root, 0),
                None => self.end(),
            };
        }
        let orig = self.key(pos.0);
        let (mut node, mut dim) = pos;
        let mut best: Option<Pos> = None;
        // Backward in in-order: an equal key ends the search at once.
        loop {
            match arena.left(node) {
                Some(l)
                    if best.is_none_or(|(b, _)| {
                        !order.left_not_above(dim, self.key(node), self.key(b))
                    }) =>
                {
                    node = l;
                    dim = self.incr(dim);
                    while let Some(r) = arena.right(node) {
                        if order.right_above(dim, self.key(node), orig) {
                            break;
                        }
                        node = r;
                        dim = self.incr(dim);
                    }
                }
                _ => {
                    (node, dim) = self.ascend_from_left((node, dim), HEADER);
                    if node == HEADER {
                        break;
                    }
                }
            }
            let key = self.key(node);
            if order.less(key, orig) {
                if best.is_none_or(|(b, _)| order.less(self.key(b), key)) {
                    best = Some((node, dim));
                }
            } else if !order.less(orig, key) {
                return (node, dim);
            }
        }
        // Forward: smaller keys placed after `pos` in in-order.
        (node, dim) = pos;
        loop {
            match arena.right(node) {
                Some(r) if !order.right_not_below(dim, self.key(node), orig) => {
                    node = r;
                    dim = self.incr(dim);
                    while let Some(l) = arena.left(node) {
                        // Keys equal to `best` further left still follow it.
                        if best.is_some_and(|(b, _)| {
                            order.left_below(dim, self.key(node), self.key(b))
                        }) {
                            break;
                        }
                        node = l;
                        dim = self.incr(dim);
                    }
                }
                _ => {
                    (node, dim) = self.ascend_from_right((node, dim), HEADER);
                    if node == HEADER {
                        break;
                    }
                }
            }
            let key = self.key(node);
            if order.less(key, orig) && best.is_none_or(|(b, _)| !order.less(key, self.key(b))) {
                best = Some((node, dim));
            }
        }
        best.unwrap_or_else(|| self.end())
    }

    /// First position not below `bound` (`upper == false`) or above it
    /// (`upper == true`), or the end.
    pub(crate) fn bound_by<O: SweepOrder<K>>(&self, order: &O, bound: &K, upper: bool) -> Pos {
        let arena = self.arena;
        let Some(root) = self.root() else {
            return self.end();
        };
        let skip_left = |node: usize, dim: usize| {
            if upper {
                order.left_not_above(dim, self.key(node), bound)
            } else {
                order.left_below(dim, self.key(node), bound)
            }
        };
        let accept = |node: usize| {
            if upper {
                order.less(bound, self.key(node))
            } else {
                !order.less(self.key(node), bound)
            }
        };
        let descend_left = |(mut node, mut dim): Pos| {
            while let Some(l) = arena.left(node) {
                if skip_left(node, dim) {
                    break;
                }
                node = l;
                dim = self.incr(dim);
            }
            (node, dim)
        };
        let (mut node, mut dim) = descend_left((root, 0));
        let mut best = accept(node).then_some((node, dim));
        loop {
            match arena.right(node) {
                Some(r)
                    if best.is_none_or(|(b, _)| {
                        !order.right_not_below(dim, self.key(node), self.key(b))
                    }) =>
                {
                    (node, dim) = descend_left((r, self.incr(dim)));
                }
                _ => {
                    (node, dim) = self.ascend_from_right((node, dim), HEADER);
                    if node == HEADER {
                        break;
                    }
                }
            }
            if accept(node) && best.is_none_or(|(b, _)| order.less(self.key(node), self.key(b))) {
                best = Some((node, dim));
            }
        }
        best.unwrap_or_else(|| self.end())
    }
}

impl<K, V, C: KeyCompare<K>> Nav<'_, K, V, C> {
    /// Minimum on `map` of the subtree at `node`, found at `dim`; the first in
    /// in-order among equals.
    pub(crate) fn minimum_mapping(&self, node: usize, dim: usize, map: usize) -> Pos {
        self.minimum_by(&self.axis_order(map), node, dim)
    }

    /// Maximum on `map` of the subtree at `node`, found at `dim`; the last in
    /// in-order among equals.
    pub(crate) fn maximum_mapping(&self, node: usize, dim: usize, map: usize) -> Pos {
        self.maximum_by(&self.axis_order(map), node, dim)
    }
}

/// Elements in ascending order of their coordinate on one axis.
///
/// Created by [`Kdtree::mapping`], [`Kdtree::mapping_lower_bound`] and
/// [`Kdtree::mapping_upper_bound`].
pub struct Mapping<'a, K, V, C> {
    nav: Nav<'a, K, V, C>,
    map: usize,
    front: Pos,
    back: Pos,
}

impl<K, V, C> Mapping<'_, K, V, C> {
    /// The axis elements are sorted on.
    pub fn axis(&self) -> usize {
        self.map
    }
}

impl<K, V, C> core::fmt::Debug for Mapping<'_, K, V, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Mapping")
            .field("axis", &self.map)
            .finish_non_exhaustive()
    }
}

impl<'a, K, V, C: KeyCompare<K>> Iterator for Mapping<'a, K, V, C> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.front.0 == self.back.0 {
            return None;
        }
        let node = self.front.0;
        self.front = self
            .nav
            .increment_by(&self.nav.axis_order(self.map), self.front);
        Some(self.nav.entry(node))
    }
}

impl<K, V, C: KeyCompare<K>> DoubleEndedIterator for Mapping<'_, K, V, C> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front.0 == self.back.0 {
            return None;
        }
        self.back = self
            .nav
            .decrement_by(&self.nav.axis_order(self.map), self.back);
        Some(self.nav.entry(self.back.0))
    }
}

impl<K, V, C: KeyCompare<K>> FusedIterator for Mapping<'_, K, V, C> {}

impl<K, V, R: Rank, C: KeyCompare<K>, B: Balancing> Kdtree<K, V, R, C, B> {
    /// Every element, in ascending order of its coordinate on `axis`.
    ///
    /// ```rust
    /// use understory_kdtree::{IdlePointSet, StaticRank};
    ///
    /// let mut set: IdlePointSet<[i32; 2], StaticRank<2>> = IdlePointSet::new();
    /// for p in [[3, 4], [1, 2], [5, 6], [4, 1]] {
    ///     set.insert_key(p);
    /// }
    /// let by_y: Vec<_> = set.mapping(1)?.map(|(k, _)| *k).collect();
    /// assert_eq!(by_y, [[4, 1], [1, 2], [3, 4], [5, 6]]);
    /// # Ok::<(), understory_kdtree::Error>(())
    /// ```
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDimension`](crate::Error::InvalidDimension) when `axis`
    /// is not below the rank.
    pub fn mapping(&self, axis: usize) -> Result<Mapping<'_, K, V, C>> {
        check_axis(self.rank.get(), axis)?;
        let nav = self.nav();
        Ok(self.mapping_from(axis, nav.first_by(&nav.axis_order(axis))))
    }

    /// Elements whose coordinate on `axis` is at least `bound[axis]`, in
    /// ascending order of that coordinate.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDimension`](crate::Error::InvalidDimension) when `axis`
    /// is not below the rank.
    pub fn mapping_lower_bound(&self, axis: usize, bound: &K) -> Result<Mapping<'_, K, V, C>> {
        check_axis(self.rank.get(), axis)?;
        let nav = self.nav();
        let front = nav.bound_by(&nav.axis_order(axis), bound, false);
        Ok(self.mapping_from(axis, front))
    }

    /// Elements whose coordinate on `axis` is strictly above `bound[axis]`, in
    /// ascending order of that coordinate.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDimension`](crate::Error::InvalidDimension) when `axis`
    /// is not below the rank.
    pub fn mapping_upper_bound(&self, axis: usize, bound: &K) -> Result<Mapping<'_, K, V, C>> {
        check_axis(self.rank.get(), axis)?;
        let nav = self.nav();
        let front = nav.bound_by(&nav.axis_order(axis), bound, true);
        Ok(self.mapping_from(axis, front))
    }

    fn mapping_from(&self, axis: usize, front: Pos) -> Mapping<'_, K, V, C> {
        let nav = self.nav();
        Mapping {
            nav,
            map: axis,
            front,
            back: nav.end(),
        }
    }
}
