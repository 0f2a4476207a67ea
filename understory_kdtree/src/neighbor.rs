// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Nearest-neighbor iteration.
//!
//! Elements come in order of non-decreasing distance to a target key under a
//! [`Metric`]; elements at the same distance come in in-order sequence. Each
//! step is a fresh search: the subtree on the far side of a splitting plane is
//! skipped once the plane is too far away to hold a better candidate.
//!
//! Metrics may fail (checked arithmetic), so the iterator yields
//! `Result<Neighbor>`. After an error the iterator is exhausted.

use core::cell::Cell;
use core::fmt;
use core::iter::FusedIterator;
use core::ops::ControlFlow;

use crate::balancing::Balancing;
use crate::compare::{BuiltinDifference, KeyCompare};
use crate::error::{Error, Result};
use crate::mapping::Pos;
use crate::math::{Scalar, check_positive_distance};
use crate::metric::{Euclidean, Manhattan, Metric, Quadrance};
use crate::node::{HEADER, NodeId};
use crate::rank::Rank;
use crate::tree::{Kdtree, Nav};

/// An element met by a [`Neighbors`] walk.
#[derive(Debug)]
pub struct Neighbor<'a, K, V, D> {
    /// Handle of the element.
    pub id: NodeId,
    /// Its key.
    pub key: &'a K,
    /// Its value.
    pub value: &'a V,
    /// Its distance to the target.
    pub distance: D,
}

type Found<D> = (Pos, Option<D>);

/// A search over the tree for one target under one metric.
struct Search<'n, 'a, K, V, C, M> {
    nav: &'n Nav<'a, K, V, C>,
    metric: &'n M,
    target: &'n K,
}

impl<K, V, C: KeyCompare<K>, M: Metric<K>> Search<'_, '_, K, V, C, M> {
    fn distance(&self, node: usize) -> Result<M::Distance> {
        self.metric
            .distance_to_key(self.nav.rank, self.target, self.nav.key(node))
    }

    /// Whether the walk may enter the subtree on the `left` side of `(node,
    /// dim)`. The near side is always entered; the far side only when `skip`
    /// refuses the distance to the splitting plane.
    fn enter(
        &self,
        (node, dim): Pos,
        left: bool,
        skip: impl Fn(M::Distance) -> bool,
    ) -> Result<bool> {
        let key = self.nav.key(node);
        let far_left = !self.nav.less(dim, self.target, key);
        if left != far_left {
            return Ok(true);
        }
        let plane = self
            .metric
            .distance_to_plane(self.nav.rank, dim, self.target, key)?;
        Ok(!skip(plane))
    }

    /// Walk the in-order sequence after `pos` (or before it, when `forward`
    /// is false) through the subtrees `enter` admits, until `visit` breaks.
    fn walk(
        &self,
        pos: Pos,
        forward: bool,
        enter: impl Fn(Pos, bool) -> Result<bool>,
        mut visit: impl FnMut(Pos) -> Result<ControlFlow<()>>,
    ) -> Result<()> {
        let nav = self.nav;
        let arena = nav.arena;
        let away = |n: usize| if forward { arena.right(n) } else { arena.left(n) };
        let toward = |n: usize| if forward { arena.left(n) } else { arena.right(n) };
        let (mut node, mut dim) = pos;
        loop {
            let child = match away(node) {
                Some(c) if enter((node, dim), !forward)? => Some(c),
                _ => None,
            };
            if let Some(child) = child {
                node = child;
                dim = nav.incr(dim);
                while let Some(c) = toward(node) {
                    if !enter((node, dim), forward)? {
                        break;
                    }
                    node = c;
                    dim = nav.incr(dim);
                }
            } else {
                (node, dim) = if forward {
                    nav.ascend_from_right((node, dim), HEADER)
                } else {
                    nav.ascend_from_left((node, dim), HEADER)
                };
                if node == HEADER {
                    return Ok(());
                }
            }
            if visit((node, dim))?.is_break() {
                return Ok(());
            }
        }
    }

    /// Like [`Self::walk`], from the first position of the whole tree.
    fn walk_all(
        &self,
        forward: bool,
        enter: impl Fn(Pos, bool) -> Result<bool>,
        mut visit: impl FnMut(Pos) -> Result<ControlFlow<()>>,
    ) -> Result<()> {
        let nav = self.nav;
        let Some(root) = nav.root() else {
            return Ok(());
        };
        let (mut node, mut dim) = (root, 0);
        loop {
            let next = if forward {
                nav.arena.left(node)
            } else {
                nav.arena.right(node)
            };
            match next {
                Some(c) if enter((node, dim), forward)? => {
                    node = c;
                    dim = nav.incr(dim);
                }
                _ => break,
            }
        }
        if visit((node, dim))?.is_break() {
            return Ok(());
        }
        self.walk((node, dim), forward, enter, visit)
    }

    fn finish(&self, best: Option<(Pos, M::Distance)>) -> Found<M::Distance> {
        match best {
            Some((pos, d)) => (pos, Some(d)),
            None => (self.nav.end(), None),
        }
    }

    /// Nearest element whose distance is not below `bound` (or above it when
    /// `strict`); the nearest of all without a bound.
    fn first(&self, bound: Option<(M::Distance, bool)>) -> Result<Found<M::Distance>> {
        let best: Cell<Option<(Pos, M::Distance)>> = Cell::new(None);
        self.walk_all(
            true,
            |pos, left| {
                self.enter(pos, left, |plane| {
                    best.get().is_some_and(|(_, b)| !(plane < b))
                })
            },
            |pos| {
                let d = self.distance(pos.0)?;
                let accepted = match bound {
                    None => true,
                    Some((l, false)) => !(d < l),
                    Some((l, true)) => l < d,
                };
                if !accepted {
                    return Ok(ControlFlow::Continue(()));
                }
                if let Some((l, false)) = bound
                    && !(l < d)
                {
                    // Nothing can precede an element exactly at the bound.
                    best.set(Some((pos, d)));
                    return Ok(ControlFlow::Break(()));
                }
                if best.get().is_none_or(|(_, b)| d < b) {
                    best.set(Some((pos, d)));
                }
                Ok(ControlFlow::Continue(()))
            },
        )?;
        Ok(self.finish(best.get()))
    }

    /// Element following `pos`, found at distance `d0`.
    fn increment(&self, pos: Pos, d0: M::Distance) -> Result<Found<M::Distance>> {
        let best: Cell<Option<(Pos, M::Distance)>> = Cell::new(None);
        let found = Cell::new(None);
        // Forward in in-order: an element at the same distance comes next.
        self.walk(
            pos,
            true,
            |p, left| self.enter(p, left, |plane| best.get().is_some_and(|(_, b)| !(plane < b))),
            |p| {
                let d = self.distance(p.0)?;
                if d0 < d {
                    if best.get().is_none_or(|(_, b)| d < b) {
                        best.set(Some((p, d)));
                    }
                } else if !(d < d0) {
                    found.set(Some((p, d)));
                    return Ok(ControlFlow::Break(()));
                }
                Ok(ControlFlow::Continue(()))
            },
        )?;
        if let Some((p, d)) = found.get() {
            return Ok((p, Some(d)));
        }
        // Backward: farther elements placed before `pos` in in-order.
        self.walk(
            pos,
            false,
            |p, left| self.enter(p, left, |plane| best.get().is_some_and(|(_, b)| b < plane)),
            |p| {
                let d = self.distance(p.0)?;
                if d0 < d && best.get().is_none_or(|(_, b)| !(b < d)) {
                    best.set(Some((p, d)));
                }
                Ok(ControlFlow::Continue(()))
            },
        )?;
        Ok(self.finish(best.get()))
    }

    /// Element preceding `pos`, found at distance `d0`; from the end, the
    /// farthest element.
    fn decrement(&self, pos: Pos, d0: Option<M::Distance>) -> Result<Found<M::Distance>> {
        let best: Cell<Option<(Pos, M::Distance)>> = Cell::new(None);
        let Some(d0) = d0.filter(|_| pos.0 != HEADER) else {
            self.walk_all(
                false,
                |_, _| Ok(true),
                |p| {
                    let d = self.distance(p.0)?;
                    if best.get().is_none_or(|(_, b)| b < d) {
                        best.set(Some((p, d)));
                    }
                    Ok(ControlFlow::Continue(()))
                },
            )?;
            return Ok(self.finish(best.get()));
        };
        let found = Cell::new(None);
        // Backward in in-order: an element at the same distance comes first.
        self.walk(
            pos,
            false,
            |p, left| self.enter(p, left, |plane| d0 < plane),
            |p| {
                let d = self.distance(p.0)?;
                if d < d0 {
                    if best.get().is_none_or(|(_, b)| b < d) {
                        best.set(Some((p, d)));
                    }
                } else if !(d0 < d) {
                    found.set(Some((p, d)));
                    return Ok(ControlFlow::Break(()));
                }
                Ok(ControlFlow::Continue(()))
            },
        )?;
        if let Some((p, d)) = found.get() {
            return Ok((p, Some(d)));
        }
        // Forward: nearer elements placed after `pos` in in-order.
        self.walk(
            pos,
            true,
            |p, left| self.enter(p, left, |plane| !(plane < d0)),
            |p| {
                let d = self.distance(p.0)?;
                if d < d0 && best.get().is_none_or(|(_, b)| !(d < b)) {
                    best.set(Some((p, d)));
                }
                Ok(ControlFlow::Continue(()))
            },
        )?;
        Ok(self.finish(best.get()))
    }
}

/// Elements in order of distance to a target key.
///
/// Created by [`Kdtree::neighbors`] and its bounded and typed variants. Yields
/// `Err` once if the metric fails, then nothing.
pub struct Neighbors<'a, K, V, C, M: Metric<K>> {
    nav: Nav<'a, K, V, C>,
    metric: M,
    target: &'a K,
    front: Found<M::Distance>,
    back: Found<M::Distance>,
    error: Option<Error>,
}

impl<'a, K, V, C, M: Metric<K>> Neighbors<'a, K, V, C, M> {
    /// Distance of the element the next call to `next` yields, without
    /// advancing.
    pub fn distance(&self) -> Option<M::Distance> {
        if self.front.0.0 == self.back.0.0 {
            None
        } else {
            self.front.1
        }
    }

    /// The target key.
    pub fn target(&self) -> &'a K {
        self.target
    }

    /// The metric.
    pub fn metric(&self) -> &M {
        &self.metric
    }

    fn neighbor(&self, node: usize, distance: M::Distance) -> Neighbor<'a, K, V, M::Distance> {
        let (key, value) = self.nav.entry(node);
        Neighbor {
            id: self.nav.arena.id(node),
            key,
            value,
            distance,
        }
    }

    fn fuse(&mut self) {
        self.front = self.back;
    }
}

impl<K, V, C, M: Metric<K>> fmt::Debug for Neighbors<'_, K, V, C, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Neighbors")
            .field("distance", &self.distance())
            .finish_non_exhaustive()
    }
}

impl<'a, K, V, C: KeyCompare<K>, M: Metric<K>> Iterator for Neighbors<'a, K, V, C, M> {
    type Item = Result<Neighbor<'a, K, V, M::Distance>>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(e) = self.error.take() {
            self.fuse();
            return Some(Err(e));
        }
        if self.front.0.0 == self.back.0.0 {
            return None;
        }
        let (pos, d) = self.front;
        let d = d?;
        let search = Search {
            nav: &self.nav,
            metric: &self.metric,
            target: self.target,
        };
        match search.increment(pos, d) {
            Ok(next) => self.front = next,
            Err(e) => self.error = Some(e),
        }
        Some(Ok(self.neighbor(pos.0, d)))
    }
}

impl<K, V, C: KeyCompare<K>, M: Metric<K>> DoubleEndedIterator for Neighbors<'_, K, V, C, M> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if let Some(e) = self.error.take() {
            self.fuse();
            return Some(Err(e));
        }
        if self.front.0.0 == self.back.0.0 {
            return None;
        }
        let search = Search {
            nav: &self.nav,
            metric: &self.metric,
            target: self.target,
        };
        match search.decrement(self.back.0, self.back.1) {
            Ok((pos, Some(d))) => {
                self.back = (pos, Some(d));
                Some(Ok(self.neighbor(pos.0, d)))
            }
            Ok((_, None)) => {
                self.fuse();
                None
            }
            Err(e) => {
                self.fuse();
                Some(Err(e))
            }
        }
    }
}

impl<K, V, C: KeyCompare<K>, M: Metric<K>> FusedIterator for Neighbors<'_, K, V, C, M> {}

impl<K, V, R: Rank, C: KeyCompare<K>, B: Balancing> Kdtree<K, V, R, C, B> {
    fn neighbors_from<'a, M: Metric<K>>(
        &'a self,
        metric: M,
        target: &'a K,
        bound: Option<(M::Distance, bool)>,
    ) -> Result<Neighbors<'a, K, V, C, M>> {
        let nav = self.nav();
        let front = Search {
            nav: &nav,
            metric: &metric,
            target,
        }
        .first(bound)?;
        Ok(Neighbors {
            nav,
            metric,
            target,
            front,
            back: (nav.end(), None),
            error: None,
        })
    }

    /// Every element, nearest to `target` first.
    ///
    /// ```rust
    /// use understory_kdtree::{BracketMinus, IdlePointSet, Manhattan, StaticRank};
    ///
    /// let set: IdlePointSet<[i32; 2], StaticRank<2>> =
    ///     [[0, 0], [5, 5], [2, 1], [9, 0]].into_iter().map(|k| (k, ())).collect();
    /// let metric = Manhattan::new(BracketMinus::<i32>::new());
    /// let near: Vec<_> = set
    ///     .neighbors(metric, &[3, 1])?
    ///     .map(|n| n.map(|n| (*n.key, n.distance)))
    ///     .collect::<Result<_, _>>()?;
    /// assert_eq!(near, [([2, 1], 1), ([0, 0], 4), ([5, 5], 6), ([9, 0], 7)]);
    /// # Ok::<(), understory_kdtree::Error>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Whatever the metric reports while locating the nearest element.
    pub fn neighbors<'a, M: Metric<K>>(
        &'a self,
        metric: M,
        target: &'a K,
    ) -> Result<Neighbors<'a, K, V, C, M>> {
        self.neighbors_from(metric, target, None)
    }

    /// Elements at distance `bound` or more from `target`, nearest first.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDistance`] when `bound` is negative, or whatever the
    /// metric reports.
    pub fn neighbors_lower_bound<'a, M>(
        &'a self,
        metric: M,
        target: &'a K,
        bound: M::Distance,
    ) -> Result<Neighbors<'a, K, V, C, M>>
    where
        M: Metric<K>,
        M::Distance: Scalar,
    {
        let bound = check_positive_distance(bound)?;
        self.neighbors_from(metric, target, Some((bound, false)))
    }

    /// Elements farther than `bound` from `target`, nearest first.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDistance`] when `bound` is negative, or whatever the
    /// metric reports.
    pub fn neighbors_upper_bound<'a, M>(
        &'a self,
        metric: M,
        target: &'a K,
        bound: M::Distance,
    ) -> Result<Neighbors<'a, K, V, C, M>>
    where
        M: Metric<K>,
        M::Distance: Scalar,
    {
        let bound = check_positive_distance(bound)?;
        self.neighbors_from(metric, target, Some((bound, true)))
    }

    /// Neighbors under the straight-line metric, with distances of type `D`,
    /// reading coordinates the way the comparator does.
    ///
    /// ```rust
    /// use understory_kdtree::{PointSet, StaticRank};
    ///
    /// let set: PointSet<[i32; 2], StaticRank<2>> =
    ///     [[3, 4], [1, 2], [5, 6]].into_iter().map(|k| (k, ())).collect();
    /// let nearest = set.euclidean_neighbors::<f64>(&[2, 2])?.next().unwrap()?;
    /// assert_eq!((*nearest.key, nearest.distance), ([1, 2], 1.0));
    /// # Ok::<(), understory_kdtree::Error>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Whatever the metric reports while locating the nearest element.
    pub fn euclidean_neighbors<'a, D>(
        &'a self,
        target: &'a K,
    ) -> Result<Neighbors<'a, K, V, C, Euclidean<<C as BuiltinDifference<D>>::Difference>>>
    where
        C: BuiltinDifference<D>,
        Euclidean<<C as BuiltinDifference<D>>::Difference>: Metric<K>,
    {
        let metric = Euclidean::new(self.compare.builtin_difference());
        self.neighbors(metric, target)
    }

    /// Neighbors under the squared straight-line metric.
    ///
    /// # Errors
    ///
    /// Whatever the metric reports while locating the nearest element.
    pub fn quadrance_neighbors<'a, D>(
        &'a self,
        target: &'a K,
    ) -> Result<Neighbors<'a, K, V, C, Quadrance<<C as BuiltinDifference<D>>::Difference>>>
    where
        C: BuiltinDifference<D>,
        Quadrance<<C as BuiltinDifference<D>>::Difference>: Metric<K>,
    {
        let metric = Quadrance::new(self.compare.builtin_difference());
        self.neighbors(metric, target)
    }

    /// Neighbors under the taxicab metric.
    ///
    /// # Errors
    ///
    /// Whatever the metric reports while locating the nearest element.
    pub fn manhattan_neighbors<'a, D>(
        &'a self,
        target: &'a K,
    ) -> Result<Neighbors<'a, K, V, C, Manhattan<<C as BuiltinDifference<D>>::Difference>>>
    where
        C: BuiltinDifference<D>,
        Manhattan<<C as BuiltinDifference<D>>::Difference>: Metric<K>,
    {
        let metric = Manhattan::new(self.compare.builtin_difference());
        self.neighbors(metric, target)
    }
}
