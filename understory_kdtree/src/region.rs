// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Region queries: every element whose key lies in a region, in pre-order.
//!
//! A region is described per axis by a [`RegionPredicate`], which says whether
//! a coordinate is below, inside, or above the region along that axis. The
//! walk skips the left subtree of a node that is below the region and the
//! right subtree of a node that is above it; a node is reported when every
//! coordinate is inside.
//!
//! Predicates for half-open, open and closed bounds ship with the crate, as do
//! two box predicates: [`Enclosed`] and [`Overlap`]. Box keys store both
//! corners in one key; the [`Layout`] says where each corner lives.

use core::fmt;
use core::iter::FusedIterator;

use crate::balancing::Balancing;
use crate::compare::KeyCompare;
use crate::error::{Error, Result};
use crate::mapping::Pos;
use crate::node::HEADER;
use crate::rank::Rank;
use crate::tree::{Kdtree, Nav};

/// Where a coordinate stands relative to a region along one axis.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RelativeOrder {
    /// Below the region.
    Below,
    /// Inside the region.
    Matching,
    /// Above the region.
    Above,
}

/// Tells, axis by axis, where a key stands relative to a region.
///
/// Answers must be monotone along each axis: if a key is `Below` on `axis`,
/// every key whose coordinate on `axis` is not greater must be `Below` too, and
/// likewise for `Above`. The region walk relies on this to skip subtrees.
///
/// Closures `Fn(axis, rank, &K) -> RelativeOrder` are predicates.
///
/// ```rust
/// use understory_kdtree::{IdlePointSet, RelativeOrder, StaticRank};
///
/// let set: IdlePointSet<[i32; 2], StaticRank<2>> =
///     [[1, 1], [4, 2], [2, 9], [3, 3]].into_iter().map(|k| (k, ())).collect();
/// // The band 2 <= x <= 3, any y.
/// let band = |axis: usize, _rank: usize, key: &[i32; 2]| match (axis, key[axis]) {
///     (0, x) if x < 2 => RelativeOrder::Below,
///     (0, x) if x > 3 => RelativeOrder::Above,
///     _ => RelativeOrder::Matching,
/// };
/// assert_eq!(set.region(band).count(), 2);
/// ```
pub trait RegionPredicate<K: ?Sized> {
    /// Where `key` stands along `axis`, in a space of `rank` axes.
    fn relate(&self, axis: usize, rank: usize, key: &K) -> RelativeOrder;
}

impl<K: ?Sized, F> RegionPredicate<K> for F
where
    F: Fn(usize, usize, &K) -> RelativeOrder,
{
    fn relate(&self, axis: usize, rank: usize, key: &K) -> RelativeOrder {
        self(axis, rank, key)
    }
}

/// Keys with `lower <= key < upper` on every axis.
#[derive(Debug)]
pub struct Bounds<'a, K: ?Sized, C> {
    compare: &'a C,
    lower: &'a K,
    upper: &'a K,
}

/// Keys with `lower < key < upper` on every axis.
#[derive(Debug)]
pub struct OpenBounds<'a, K: ?Sized, C> {
    compare: &'a C,
    lower: &'a K,
    upper: &'a K,
}

/// Keys with `lower <= key <= upper` on every axis.
#[derive(Debug)]
pub struct ClosedBounds<'a, K: ?Sized, C> {
    compare: &'a C,
    lower: &'a K,
    upper: &'a K,
}

macro_rules! bounds_ctor {
    ($name:ident) => {
        impl<'a, K: ?Sized, C> $name<'a, K, C> {
            /// Bounds between `lower` and `upper`. Not validated here; the tree
            /// factories check them.
            pub const fn new(compare: &'a C, lower: &'a K, upper: &'a K) -> Self {
                Self {
                    compare,
                    lower,
                    upper,
                }
            }
        }
    };
}

bounds_ctor!(Bounds);
bounds_ctor!(OpenBounds);
bounds_ctor!(ClosedBounds);

impl<K: ?Sized, C: KeyCompare<K>> RegionPredicate<K> for Bounds<'_, K, C> {
    fn relate(&self, axis: usize, _rank: usize, key: &K) -> RelativeOrder {
        if self.compare.less(axis, key, self.lower) {
            RelativeOrder::Below
        } else if self.compare.less(axis, key, self.upper) {
            RelativeOrder::Matching
        } else {
            RelativeOrder::Above
        }
    }
}

impl<K: ?Sized, C: KeyCompare<K>> RegionPredicate<K> for OpenBounds<'_, K, C> {
    fn relate(&self, axis: usize, _rank: usize, key: &K) -> RelativeOrder {
        if !self.compare.less(axis, self.lower, key) {
            RelativeOrder::Below
        } else if self.compare.less(axis, key, self.upper) {
            RelativeOrder::Matching
        } else {
            RelativeOrder::Above
        }
    }
}

impl<K: ?Sized, C: KeyCompare<K>> RegionPredicate<K> for ClosedBounds<'_, K, C> {
    fn relate(&self, axis: usize, _rank: usize, key: &K) -> RelativeOrder {
        if self.compare.less(axis, key, self.lower) {
            RelativeOrder::Below
        } else if self.compare.less(axis, self.upper, key) {
            RelativeOrder::Above
        } else {
            RelativeOrder::Matching
        }
    }
}

/// How the coordinates of a box key are split between its low and high
/// corners, for a box of `2 * n` coordinates.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Layout {
    /// `[l0, l1, .., h0, h1, ..]`.
    #[default]
    Llhh,
    /// `[l0, h0, l1, h1, ..]`.
    Lhlh,
    /// `[h0, h1, .., l0, l1, ..]`.
    Hhll,
    /// `[h0, l0, h1, l1, ..]`.
    Hlhl,
}

impl Layout {
    /// Whether coordinate `dim` holds a low corner, and the coordinate holding
    /// the other corner on the same axis.
    fn corner(self, dim: usize, half: usize) -> (bool, usize) {
        match self {
            Self::Llhh if dim < half => (true, dim + half),
            Self::Llhh => (false, dim - half),
            Self::Hhll if dim < half => (false, dim + half),
            Self::Hhll => (true, dim - half),
            Self::Lhlh => (dim % 2 == 0, dim ^ 1),
            Self::Hlhl => (dim % 2 == 1, dim ^ 1),
        }
    }

    /// Coordinates of the low and high corners on `axis`, for `axis < half`.
    pub fn low_high(self, axis: usize, half: usize) -> (usize, usize) {
        match self {
            Self::Llhh => (axis, axis + half),
            Self::Lhlh => (2 * axis, 2 * axis + 1),
            Self::Hhll => (axis + half, axis),
            Self::Hlhl => (2 * axis + 1, 2 * axis),
        }
    }
}

/// Box keys lying inside a target box, boundaries included.
#[derive(Debug)]
pub struct Enclosed<'a, K: ?Sized, C> {
    compare: &'a C,
    target: &'a K,
    layout: Layout,
}

/// Box keys whose interior meets the interior of a target box.
///
/// Boxes that only share an edge or a corner with the target do not overlap
/// it.
#[derive(Debug)]
pub struct Overlap<'a, K: ?Sized, C> {
    compare: &'a C,
    target: &'a K,
    layout: Layout,
}

macro_rules! box_ctor {
    ($name:ident) => {
        impl<'a, K: ?Sized, C> $name<'a, K, C> {
            /// Relate box keys to `target`, both following `layout`. Not
            /// validated here; the tree factories check the target.
            pub const fn new(compare: &'a C, target: &'a K, layout: Layout) -> Self {
                Self {
                    compare,
                    target,
                    layout,
                }
            }
        }
    };
}

box_ctor!(Enclosed);
box_ctor!(Overlap);

impl<K: ?Sized, C: KeyCompare<K>> RegionPredicate<K> for Enclosed<'_, K, C> {
    fn relate(&self, axis: usize, rank: usize, key: &K) -> RelativeOrder {
        let (low, partner) = self.layout.corner(axis, rank / 2);
        let (t_low, t_high) = if low { (axis, partner) } else { (partner, axis) };
        // Low corners must not pass the target's high corner either, since the
        // key's own high corner is above them.
        if self.compare.less_across(axis, key, t_low, self.target) {
            RelativeOrder::Below
        } else if self.compare.less_across(t_high, self.target, axis, key) {
            RelativeOrder::Above
        } else {
            RelativeOrder::Matching
        }
    }
}

impl<K: ?Sized, C: KeyCompare<K>> RegionPredicate<K> for Overlap<'_, K, C> {
    fn relate(&self, axis: usize, rank: usize, key: &K) -> RelativeOrder {
        let (low, partner) = self.layout.corner(axis, rank / 2);
        if low {
            // A low corner must sit strictly below the target's high corner.
            if !self.compare.less_across(axis, key, partner, self.target) {
                return RelativeOrder::Above;
            }
        } else if !self.compare.less_across(partner, self.target, axis, key) {
            return RelativeOrder::Below;
        }
        RelativeOrder::Matching
    }
}

/// Reject half-open or open bounds where `lower` is not below `upper`.
pub(crate) fn check_bounds<K: ?Sized, C: KeyCompare<K>>(
    rank: usize,
    compare: &C,
    lower: &K,
    upper: &K,
) -> Result<()> {
    match (0..rank).find(|&axis| !compare.less(axis, lower, upper)) {
        Some(axis) => Err(Error::InvalidBounds { axis }),
        None => Ok(()),
    }
}

/// Reject closed bounds where `upper` is below `lower`.
pub(crate) fn check_closed_bounds<K: ?Sized, C: KeyCompare<K>>(
    rank: usize,
    compare: &C,
    lower: &K,
    upper: &K,
) -> Result<()> {
    match (0..rank).find(|&axis| compare.less(axis, upper, lower)) {
        Some(axis) => Err(Error::InvalidBounds { axis }),
        None => Ok(()),
    }
}

/// Reject an odd rank, or a box whose high corner is below its low corner.
pub(crate) fn check_box<K: ?Sized, C: KeyCompare<K>>(
    rank: usize,
    compare: &C,
    target: &K,
    layout: Layout,
) -> Result<()> {
    if rank % 2 == 1 {
        return Err(Error::InvalidOddRank { rank });
    }
    let half = rank / 2;
    for axis in 0..half {
        let (lo, hi) = layout.low_high(axis, half);
        if compare.less_across(hi, target, lo, target) {
            return Err(Error::InvalidBox { axis: lo });
        }
    }
    Ok(())
}

/// Which subtrees a pruned pre-order walk enters and which nodes it reports.
pub(crate) trait PreorderFilter<K> {
    fn enter_left(&self, dim: usize, node: &K) -> bool;
    fn enter_right(&self, dim: usize, node: &K) -> bool;
    fn accept(&self, key: &K) -> bool;
}

/// A [`RegionPredicate`] seen as a pre-order filter.
pub(crate) struct RegionFilter<P> {
    predicate: P,
    rank: usize,
}

impl<K, P: RegionPredicate<K>> PreorderFilter<K> for RegionFilter<P> {
    fn enter_left(&self, dim: usize, node: &K) -> bool {
        self.predicate.relate(dim, self.rank, node) != RelativeOrder::Below
    }

    fn enter_right(&self, dim: usize, node: &K) -> bool {
        self.predicate.relate(dim, self.rank, node) != RelativeOrder::Above
    }

    fn accept(&self, key: &K) -> bool {
        (0..self.rank)
            .all(|axis| self.predicate.relate(axis, self.rank, key) == RelativeOrder::Matching)
    }
}

impl<K, V, C> Nav<'_, K, V, C> {
    /// Next pre-order position after `(node, dim)` among the subtrees `filter`
    /// enters, stopping at `end`.
    fn pruned_next<F: PreorderFilter<K>>(
        &self,
        filter: &F,
        (mut node, mut dim): Pos,
        end: usize,
    ) -> Pos {
        let arena = self.arena;
        if let Some(l) = arena.left(node).filter(|_| filter.enter_left(dim, self.key(node))) {
            return (l, self.incr(dim));
        }
        if let Some(r) = arena.right(node).filter(|_| filter.enter_right(dim, self.key(node))) {
            return (r, self.incr(dim));
        }
        loop {
            let parent = arena.parent(node);
            let up = self.decr(dim);
            if parent == end {
                return (end, up);
            }
            if arena.left(parent) == Some(node)
                && let Some(r) = arena
                    .right(parent)
                    .filter(|_| filter.enter_right(up, self.key(parent)))
            {
                return (r, dim);
            }
            node = parent;
            dim = up;
        }
    }

    /// Last pre-order position of the subtree at `(node, dim)`.
    fn pruned_last<F: PreorderFilter<K>>(&self, filter: &F, (mut node, mut dim): Pos) -> Pos {
        let arena = self.arena;
        loop {
            let key = self.key(node);
            if let Some(r) = arena.right(node).filter(|_| filter.enter_right(dim, key)) {
                node = r;
            } else if let Some(l) = arena.left(node).filter(|_| filter.enter_left(dim, key)) {
                node = l;
            } else {
                return (node, dim);
            }
            dim = self.incr(dim);
        }
    }

    /// Previous pre-order position; from the end, the last one of the tree.
    fn pruned_prev<F: PreorderFilter<K>>(&self, filter: &F, (node, dim): Pos) -> Pos {
        let arena = self.arena;
        if node == HEADER {
            return match self.root() {
                Some(root) => self.pruned_last(filter, (root, 0)),
                None => self.end(),
            };
        }
        let parent = arena.parent(node);
        let up = self.decr(dim);
        if parent != HEADER
            && arena.right(parent) == Some(node)
            && let Some(l) = arena
                .left(parent)
                .filter(|_| filter.enter_left(up, self.key(parent)))
        {
            return self.pruned_last(filter, (l, dim));
        }
        (parent, up)
    }

    /// First accepted position in the pre-order of the subtree at `start`,
    /// found at `axis`; the subtree's parent when there is none.
    pub(crate) fn preorder_first<F: PreorderFilter<K>>(
        &self,
        filter: &F,
        start: usize,
        axis: usize,
    ) -> Pos {
        let end = self.arena.parent(start);
        let mut pos = (start, axis);
        while pos.0 != end {
            if filter.accept(self.key(pos.0)) {
                return pos;
            }
            pos = self.pruned_next(filter, pos, end);
        }
        pos
    }

    /// First accepted position of the whole tree, or the end.
    pub(crate) fn preorder_begin<F: PreorderFilter<K>>(&self, filter: &F) -> Pos {
        match self.root() {
            Some(root) => match self.preorder_first(filter, root, 0) {
                (HEADER, _) => self.end(),
                pos => pos,
            },
            None => self.end(),
        }
    }

    /// Next accepted position after `pos`, or the end.
    pub(crate) fn preorder_increment_by<F: PreorderFilter<K>>(&self, filter: &F, pos: Pos) -> Pos {
        let mut pos = self.pruned_next(filter, pos, HEADER);
        while pos.0 != HEADER {
            if filter.accept(self.key(pos.0)) {
                return pos;
            }
            pos = self.pruned_next(filter, pos, HEADER);
        }
        self.end()
    }

    /// Previous accepted position before `pos`; from the end, the last one.
    pub(crate) fn preorder_decrement_by<F: PreorderFilter<K>>(&self, filter: &F, pos: Pos) -> Pos {
        let mut pos = self.pruned_prev(filter, pos);
        while pos.0 != HEADER {
            if filter.accept(self.key(pos.0)) {
                return pos;
            }
            pos = self.pruned_prev(filter, pos);
        }
        self.end()
    }
}

/// Elements whose keys satisfy a [`RegionPredicate`], in pre-order.
///
/// Created by [`Kdtree::region`] and the typed region factories.
pub struct Region<'a, K, V, C, P> {
    nav: Nav<'a, K, V, C>,
    filter: RegionFilter<P>,
    front: Pos,
    back: Pos,
}

impl<K, V, C, P> Region<'_, K, V, C, P> {
    /// The predicate being matched.
    pub fn predicate(&self) -> &P {
        &self.filter.predicate
    }
}

impl<K, V, C, P: fmt::Debug> fmt::Debug for Region<'_, K, V, C, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("predicate", &self.filter.predicate)
            .finish_non_exhaustive()
    }
}

impl<'a, K, V, C, P: RegionPredicate<K>> Iterator for Region<'a, K, V, C, P> {
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

impl<K, V, C, P: RegionPredicate<K>> DoubleEndedIterator for Region<'_, K, V, C, P> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front.0 == self.back.0 {
            return None;
        }
        self.back = self.nav.preorder_decrement_by(&self.filter, self.back);
        Some(self.nav.entry(self.back.0))
    }
}

impl<K, V, C, P: RegionPredicate<K>> FusedIterator for Region<'_, K, V, C, P> {}

impl<K, V, R: Rank, C, B: Balancing> Kdtree<K, V, R, C, B> {
    /// Elements whose keys satisfy `predicate` on every axis, in pre-order.
    pub fn region<P: RegionPredicate<K>>(&self, predicate: P) -> Region<'_, K, V, C, P> {
        let nav = self.nav();
        let filter = RegionFilter {
            predicate,
            rank: self.rank.get(),
        };
        let front = nav.preorder_begin(&filter);
        Region {
            nav,
            filter,
            front,
            back: nav.end(),
        }
    }
}

impl<K, V, R: Rank, C: KeyCompare<K>, B: Balancing> Kdtree<K, V, R, C, B> {
    /// Elements with `lower <= key < upper` on every axis.
    ///
    /// ```rust
    /// use understory_kdtree::{IdlePointSet, StaticRank};
    ///
    /// let set: IdlePointSet<[i32; 2], StaticRank<2>> =
    ///     [[3, 4], [1, 2], [5, 6], [1, 2], [4, 1]].into_iter().map(|k| (k, ())).collect();
    /// let found: Vec<_> = set.region_bounds(&[2, 0], &[5, 5])?.map(|(k, _)| *k).collect();
    /// assert_eq!(found, [[3, 4], [4, 1]]);
    /// # Ok::<(), understory_kdtree::Error>(())
    /// ```
    ///
    /// # Errors
    ///
    /// [`Error::InvalidBounds`] when `lower` is not below `upper` on some axis.
    pub fn region_bounds<'a>(
        &'a self,
        lower: &'a K,
        upper: &'a K,
    ) -> Result<Region<'a, K, V, C, Bounds<'a, K, C>>> {
        check_bounds(self.rank.get(), &self.compare, lower, upper)?;
        Ok(self.region(Bounds::new(&self.compare, lower, upper)))
    }

    /// Elements with `lower < key < upper` on every axis.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidBounds`] when `lower` is not below `upper` on some axis.
    pub fn open_region<'a>(
        &'a self,
        lower: &'a K,
        upper: &'a K,
    ) -> Result<Region<'a, K, V, C, OpenBounds<'a, K, C>>> {
        check_bounds(self.rank.get(), &self.compare, lower, upper)?;
        Ok(self.region(OpenBounds::new(&self.compare, lower, upper)))
    }

    /// Elements with `lower <= key <= upper` on every axis.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidBounds`] when `upper` is below `lower` on some axis.
    pub fn closed_region<'a>(
        &'a self,
        lower: &'a K,
        upper: &'a K,
    ) -> Result<Region<'a, K, V, C, ClosedBounds<'a, K, C>>> {
        check_closed_bounds(self.rank.get(), &self.compare, lower, upper)?;
        Ok(self.region(ClosedBounds::new(&self.compare, lower, upper)))
    }

    /// Box keys lying inside `target`, both following `layout`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidOddRank`] when the rank is odd, and [`Error::InvalidBox`]
    /// when the high corner of `target` is below its low corner on some axis.
    pub fn enclosed_region<'a>(
        &'a self,
        target: &'a K,
        layout: Layout,
    ) -> Result<Region<'a, K, V, C, Enclosed<'a, K, C>>> {
        check_box(self.rank.get(), &self.compare, target, layout)?;
        Ok(self.region(Enclosed::new(&self.compare, target, layout)))
    }

    /// Box keys overlapping `target`, both following `layout`. Boxes that only
    /// touch `target` are left out.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidOddRank`] when the rank is odd, and [`Error::InvalidBox`]
    /// when the high corner of `target` is below its low corner on some axis.
    pub fn overlap_region<'a>(
        &'a self,
        target: &'a K,
        layout: Layout,
    ) -> Result<Region<'a, K, V, C, Overlap<'a, K, C>>> {
        check_box(self.rank.get(), &self.compare, target, layout)?;
        Ok(self.region(Overlap::new(&self.compare, target, layout)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BoxRank, BracketLess, IdleBoxSet, IdlePointMap, PointMap, PointSet, StaticRank};
    use alloc::vec::Vec;

    fn grid() -> impl Iterator<Item = ([i32; 2], usize)> {
        // A 12 x 12 grid in scrambled order.
        (0..144_usize).map(|i| {
            let c = |x: usize| i32::try_from(x).unwrap();
            let j = i * 5 % 144;
            ([c(j % 12), c(j / 12)], i)
        })
    }

    fn brute<P: RegionPredicate<[i32; 2]>>(p: &P) -> Vec<usize> {
        let mut v: Vec<_> = grid()
            .filter(|(k, _)| (0..2).all(|a| p.relate(a, 2, k) == RelativeOrder::Matching))
            .map(|(_, i)| i)
            .collect();
        v.sort_unstable();
        v
    }

    fn collect<'a>(it: impl Iterator<Item = (&'a [i32; 2], &'a usize)>) -> Vec<usize> {
        let mut v: Vec<_> = it.map(|(_, i)| *i).collect();
        v.sort_unstable();
        v
    }

    #[test]
    fn bounds_variants_match_linear_scan() {
        let strict: IdlePointMap<[i32; 2], usize, StaticRank<2>> = grid().collect();
        let relaxed: PointMap<[i32; 2], usize, StaticRank<2>> = grid().collect();
        let (lo, hi) = ([3, 2], [8, 8]);
        let c = &BracketLess;
        for (got, want) in [
            (collect(strict.region_bounds(&lo, &hi).unwrap()), brute(&Bounds::new(c, &lo, &hi))),
            (collect(relaxed.region_bounds(&lo, &hi).unwrap()), brute(&Bounds::new(c, &lo, &hi))),
            (collect(strict.open_region(&lo, &hi).unwrap()), brute(&OpenBounds::new(c, &lo, &hi))),
            (collect(relaxed.open_region(&lo, &hi).unwrap()), brute(&OpenBounds::new(c, &lo, &hi))),
            (
                collect(strict.closed_region(&lo, &hi).unwrap()),
                brute(&ClosedBounds::new(c, &lo, &hi)),
            ),
            (
                collect(relaxed.closed_region(&lo, &hi).unwrap()),
                brute(&ClosedBounds::new(c, &lo, &hi)),
            ),
        ] {
            assert!(!want.is_empty(), "region should not be empty");
            assert_eq!(got, want);
        }
    }

    #[test]
    fn reverse_walk_mirrors_preorder() {
        let t: PointMap<[i32; 2], usize, StaticRank<2>> = grid().collect();
        let fwd: Vec<_> = t.closed_region(&[2, 2], &[9, 6]).unwrap().map(|(_, v)| *v).collect();
        let mut back: Vec<_> = t
            .closed_region(&[2, 2], &[9, 6])
            .unwrap()
            .rev()
            .map(|(_, v)| *v)
            .collect();
        back.reverse();
        assert_eq!(fwd, back);
    }

    #[test]
    fn empty_and_inverted_regions() {
        let t: PointSet<[i32; 2], StaticRank<2>> = grid().map(|(k, _)| (k, ())).collect();
        assert_eq!(t.region_bounds(&[100, 100], &[200, 200]).unwrap().count(), 0);
        assert_eq!(
            t.region_bounds(&[1, 5], &[4, 5]).err(),
            Some(Error::InvalidBounds { axis: 1 })
        );
        assert_eq!(
            t.open_region(&[4, 1], &[4, 5]).err(),
            Some(Error::InvalidBounds { axis: 0 })
        );
        assert_eq!(t.closed_region(&[4, 5], &[4, 5]).unwrap().count(), 1);
    }

    fn boxes() -> IdleBoxSet<[i32; 4], StaticRank<4>> {
        // [x_low, y_low, x_high, y_high]
        let mut t = IdleBoxSet::with_rank(BoxRank::default());
        for x in 0..8 {
            for y in 0..8 {
                t.insert_key([x, y, x + 1 + y % 3, y + 1 + x % 2]);
            }
        }
        t
    }

    #[test]
    fn enclosed_and_overlapping_boxes() {
        let t = boxes();
        let target = [2, 2, 5, 5];
        let all: Vec<[i32; 4]> = t.iter().map(|(k, _)| *k).collect();
        let mut inside: Vec<_> = t
            .enclosed_region(&target, Layout::Llhh)
            .unwrap()
            .map(|(k, _)| *k)
            .collect();
        inside.sort_unstable();
        let mut want: Vec<_> = all
            .iter()
            .copied()
            .filter(|b| b[0] >= 2 && b[1] >= 2 && b[2] <= 5 && b[3] <= 5)
            .collect();
        want.sort_unstable();
        assert_eq!(inside, want);

        let mut overlapping: Vec<_> = t
            .overlap_region(&target, Layout::Llhh)
            .unwrap()
            .map(|(k, _)| *k)
            .collect();
        overlapping.sort_unstable();
        let mut want: Vec<_> = all
            .iter()
            .copied()
            .filter(|b| b[0] < 5 && b[2] > 2 && b[1] < 5 && b[3] > 2)
            .collect();
        want.sort_unstable();
        assert_eq!(overlapping, want);
    }

    #[test]
    fn boxes_sharing_only_an_edge_do_not_overlap() {
        let mut t: IdleBoxSet<[i32; 4], StaticRank<4>> =
            IdleBoxSet::with_rank(BoxRank::default());
        let right_edge = t.insert_key([5, 0, 8, 3]);
        let corner = t.insert_key([5, 5, 6, 6]);
        let below = t.insert_key([1, -3, 2, 0]);
        let inner = t.insert_key([4, 4, 9, 9]);
        let target = [0, 0, 5, 5];
        let hits: Vec<_> = t
            .overlap_region(&target, Layout::Llhh)
            .unwrap()
            .map(|(k, _)| *k)
            .collect();
        assert_eq!(hits, [[4, 4, 9, 9]]);
        assert_eq!(t.get(inner).map(|(k, _)| *k), Some([4, 4, 9, 9]));

        // Enclosure keeps its boundaries: a box flush with the target is inside.
        let inside: Vec<_> = t
            .enclosed_region(&[0, -3, 8, 6], Layout::Llhh)
            .unwrap()
            .map(|(k, _)| *k)
            .collect();
        assert_eq!(inside.len(), 3);
        for id in [right_edge, corner, below] {
            let key = t.get(id).map(|(k, _)| *k).unwrap();
            assert!(inside.contains(&key), "{key:?} should be enclosed");
        }
    }

    #[test]
    fn layouts_agree_after_permutation() {
        // The same boxes stored as [x_low, x_high, y_low, y_high].
        let t = boxes();
        let mut lhlh: IdleBoxSet<[i32; 4], StaticRank<4>> =
            IdleBoxSet::with_rank(BoxRank::default());
        for (b, ()) in t.iter() {
            lhlh.insert_key([b[0], b[2], b[1], b[3]]);
        }
        let a = t.overlap_region(&[1, 3, 4, 6], Layout::Llhh).unwrap().count();
        let b = lhlh.overlap_region(&[1, 4, 3, 6], Layout::Lhlh).unwrap().count();
        assert_eq!(a, b);
        assert!(a > 0);
    }

    #[test]
    fn box_checks() {
        let t = boxes();
        assert_eq!(
            t.enclosed_region(&[3, 2, 1, 5], Layout::Llhh).err(),
            Some(Error::InvalidBox { axis: 0 })
        );
        assert_eq!(
            t.overlap_region(&[3, 2, 1, 5], Layout::Hhll).err(),
            Some(Error::InvalidBox { axis: 3 })
        );
        let points: IdlePointMap<[i32; 3], (), StaticRank<3>> = IdlePointMap::new();
        assert_eq!(
            points.overlap_region(&[0, 0, 0], Layout::Llhh).err(),
            Some(Error::InvalidOddRank { rank: 3 })
        );
    }
}
