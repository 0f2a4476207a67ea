// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! [`kurbo`] geometry as tree keys.
//!
//! [`Point`] is a rank-2 key read as `(x, y)`. [`Rect`] is a rank-4 box key
//! read as `(x0, y0, x1, y1)`, which is the [`Layout::Llhh`] order; store
//! rectangles with non-negative width and height (see [`Rect::abs`]).
//!
//! ```rust
//! use kurbo::{Point, Rect};
//! use understory_kdtree::adapters::kurbo::{KurboPointSet, KurboRectMap};
//!
//! let mut points: KurboPointSet = KurboPointSet::new();
//! points.insert_key(Point::new(1.0, 1.0));
//! points.insert_key(Point::new(4.0, 5.0));
//! let target = Point::new(3.0, 4.0);
//! let nearest = points.euclidean_neighbors::<f64>(&target)?.next().unwrap()?;
//! assert_eq!(*nearest.key, Point::new(4.0, 5.0));
//!
//! let mut rects: KurboRectMap<&str> = KurboRectMap::new();
//! rects.insert(Rect::new(0.0, 0.0, 10.0, 10.0), "big");
//! rects.insert(Rect::new(20.0, 20.0, 25.0, 25.0), "far");
//! let probe = Rect::new(5.0, 5.0, 6.0, 6.0);
//! let hits: Vec<_> = rects.overlapping(&probe)?.map(|(_, v)| *v).collect();
//! assert_eq!(hits, ["big"]);
//! # Ok::<(), understory_kdtree::Error>(())
//! ```

use ::kurbo::{Point, Rect};

use crate::balancing::{Balancing, LooseBalancing};
use crate::compare::{BuiltinDifference, Difference, KeyCompare};
use crate::error::Result;
use crate::rank::{BoxRank, StaticRank};
use crate::region::{Enclosed, Layout, Overlap, Region};
use crate::tree::Kdtree;

#[inline]
fn point_coord(p: &Point, axis: usize) -> f64 {
    debug_assert!(axis < 2, "point axis out of range");
    if axis == 0 { p.x } else { p.y }
}

#[inline]
fn rect_coord(r: &Rect, axis: usize) -> f64 {
    debug_assert!(axis < 4, "rect axis out of range");
    match axis {
        0 => r.x0,
        1 => r.y0,
        2 => r.x1,
        _ => r.y1,
    }
}

/// Compares [`Point`] keys on `x` (axis 0) and `y` (axis 1).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PointLess;

impl KeyCompare<Point> for PointLess {
    #[inline]
    fn less_across(&self, a_axis: usize, a: &Point, b_axis: usize, b: &Point) -> bool {
        point_coord(a, a_axis) < point_coord(b, b_axis)
    }
}

/// Signed gap between [`Point`] coordinates.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PointMinus;

impl Difference<Point> for PointMinus {
    type Output = f64;

    #[inline]
    fn difference(&self, axis: usize, a: &Point, b: &Point) -> f64 {
        point_coord(a, axis) - point_coord(b, axis)
    }
}

impl BuiltinDifference<f64> for PointLess {
    type Difference = PointMinus;

    fn builtin_difference(&self) -> PointMinus {
        PointMinus
    }
}

/// Compares [`Rect`] keys on `x0`, `y0`, `x1`, `y1` (axes 0 to 3).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct RectLess;

impl KeyCompare<Rect> for RectLess {
    #[inline]
    fn less_across(&self, a_axis: usize, a: &Rect, b_axis: usize, b: &Rect) -> bool {
        rect_coord(a, a_axis) < rect_coord(b, b_axis)
    }
}

/// Signed gap between [`Rect`] coordinates.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct RectMinus;

impl Difference<Rect> for RectMinus {
    type Output = f64;

    #[inline]
    fn difference(&self, axis: usize, a: &Rect, b: &Rect) -> f64 {
        rect_coord(a, axis) - rect_coord(b, axis)
    }
}

impl BuiltinDifference<f64> for RectLess {
    type Difference = RectMinus;

    fn builtin_difference(&self) -> RectMinus {
        RectMinus
    }
}

/// Points, relaxed with loose balancing unless told otherwise.
pub type KurboPointSet<B = LooseBalancing> = Kdtree<Point, (), StaticRank<2>, PointLess, B>;
/// Points mapped to values.
pub type KurboPointMap<V, B = LooseBalancing> = Kdtree<Point, V, StaticRank<2>, PointLess, B>;
/// Rectangles.
pub type KurboRectSet<B = LooseBalancing> = Kdtree<Rect, (), BoxRank<StaticRank<4>>, RectLess, B>;
/// Rectangles mapped to values.
pub type KurboRectMap<V, B = LooseBalancing> =
    Kdtree<Rect, V, BoxRank<StaticRank<4>>, RectLess, B>;

impl<V, B: Balancing> Kdtree<Rect, V, BoxRank<StaticRank<4>>, RectLess, B> {
    /// Rectangles overlapping `target`. Sharing only an edge is not enough.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidBox`](crate::Error::InvalidBox) when `target` has a
    /// negative width or height.
    pub fn overlapping<'a>(
        &'a self,
        target: &'a Rect,
    ) -> Result<Region<'a, Rect, V, RectLess, Overlap<'a, Rect, RectLess>>> {
        self.overlap_region(target, Layout::Llhh)
    }

    /// Rectangles lying inside `target`, edges included.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidBox`](crate::Error::InvalidBox) when `target` has a
    /// negative width or height.
    pub fn inside<'a>(
        &'a self,
        target: &'a Rect,
    ) -> Result<Region<'a, Rect, V, RectLess, Enclosed<'a, Rect, RectLess>>> {
        self.enclosed_region(target, Layout::Llhh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use alloc::vec::Vec;

    #[test]
    fn points_sort_by_axis() {
        let set: KurboPointSet = [(3.0, 1.0), (1.0, 2.0), (2.0, 0.5)]
            .into_iter()
            .map(|p| (Point::from(p), ()))
            .collect();
        let ys: Vec<_> = set.mapping(1).unwrap().map(|(p, _)| p.y).collect();
        assert_eq!(ys, [0.5, 1.0, 2.0]);
        let xs: Vec<_> = set.mapping(0).unwrap().map(|(p, _)| p.x).collect();
        assert_eq!(xs, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn nearest_point_uses_euclidean_distance() {
        let mut map: KurboPointMap<u32> = KurboPointMap::new();
        for i in 0..20_u32 {
            let f = f64::from(i);
            map.insert(Point::new(f, f * 0.5), i);
        }
        let mut it = map.euclidean_neighbors::<f64>(&Point::new(7.2, 3.5)).unwrap();
        let first = it.next().unwrap().unwrap();
        assert_eq!(*first.value, 7);
        let second = it.next().unwrap().unwrap();
        assert!(first.distance <= second.distance);
    }

    #[test]
    fn rect_queries() {
        let mut map: KurboRectMap<&str> = KurboRectMap::new();
        map.insert(Rect::new(0.0, 0.0, 4.0, 4.0), "a");
        map.insert(Rect::new(1.0, 1.0, 2.0, 2.0), "b");
        map.insert(Rect::new(4.0, 0.0, 6.0, 1.0), "c");
        map.insert(Rect::new(10.0, 10.0, 11.0, 11.0), "d");

        let mut hits: Vec<_> = map
            .overlapping(&Rect::new(3.0, 0.5, 5.0, 0.75))
            .unwrap()
            .map(|(_, v)| *v)
            .collect();
        hits.sort_unstable();
        assert_eq!(hits, ["a", "c"]);

        let mut inner: Vec<_> = map
            .inside(&Rect::new(0.0, 0.0, 6.0, 4.0))
            .unwrap()
            .map(|(_, v)| *v)
            .collect();
        inner.sort_unstable();
        assert_eq!(inner, ["a", "b", "c"]);

        assert_eq!(
            map.overlapping(&Rect::new(2.0, 0.0, 1.0, 1.0)).err(),
            Some(Error::InvalidBox { axis: 0 })
        );
    }
}
