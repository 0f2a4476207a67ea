// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-axis key comparison and difference functors.
//!
//! The tree never looks inside keys. It only asks a [`KeyCompare`] whether one
//! coordinate is below another, and neighbor queries additionally ask a
//! [`Difference`] for the signed gap between two coordinates.
//!
//! Two families are shipped:
//!
//! - [`BracketLess`] / [`BracketMinus`] for keys indexable with `key[axis]`
//!   (arrays, slices, `Vec`).
//! - [`AccessorLess`] / [`AccessorMinus`] for keys whose coordinates are read
//!   through a closure `Fn(axis, &key) -> coordinate`.

use core::fmt;
use core::marker::PhantomData;
use core::ops::{Index, Sub};

/// Strict weak ordering of keys along each axis.
pub trait KeyCompare<K: ?Sized> {
    /// Whether coordinate `a_axis` of `a` is below coordinate `b_axis` of `b`.
    ///
    /// Comparing across axes is needed by box predicates, which relate the low
    /// corner of one box to the high corner of another.
    fn less_across(&self, a_axis: usize, a: &K, b_axis: usize, b: &K) -> bool;

    /// Whether `a` is below `b` along `axis`.
    #[inline]
    fn less(&self, axis: usize, a: &K, b: &K) -> bool {
        self.less_across(axis, a, axis, b)
    }
}

/// Compares keys with `key[axis] < other[axis]`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct BracketLess;

impl<K> KeyCompare<K> for BracketLess
where
    K: Index<usize> + ?Sized,
    K::Output: PartialOrd,
{
    #[inline]
    fn less_across(&self, a_axis: usize, a: &K, b_axis: usize, b: &K) -> bool {
        a[a_axis] < b[b_axis]
    }
}

/// Compares keys through an accessor returning the coordinate on an axis.
///
/// ```rust
/// use understory_kdtree::{AccessorLess, KeyCompare};
///
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// let less = AccessorLess::new(|axis: usize, p: &Point| if axis == 0 { p.x } else { p.y });
/// assert!(less.less(1, &Point { x: 5, y: 0 }, &Point { x: 0, y: 1 }));
/// ```
#[derive(Copy, Clone, Default)]
pub struct AccessorLess<F>(F);

impl<F> AccessorLess<F> {
    /// Wrap an accessor.
    pub const fn new(accessor: F) -> Self {
        Self(accessor)
    }

    /// The wrapped accessor.
    pub fn accessor(&self) -> &F {
        &self.0
    }
}

impl<F> fmt::Debug for AccessorLess<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessorLess").finish_non_exhaustive()
    }
}

impl<K, F, T> KeyCompare<K> for AccessorLess<F>
where
    K: ?Sized,
    F: Fn(usize, &K) -> T,
    T: PartialOrd,
{
    #[inline]
    fn less_across(&self, a_axis: usize, a: &K, b_axis: usize, b: &K) -> bool {
        (self.0)(a_axis, a) < (self.0)(b_axis, b)
    }
}

/// Signed gap between two keys along an axis, used by metrics.
pub trait Difference<K: ?Sized> {
    /// The distance type produced.
    type Output: Copy + PartialOrd;

    /// `a[axis] - b[axis]`, converted to the output type.
    fn difference(&self, axis: usize, a: &K, b: &K) -> Self::Output;
}

/// Computes `key[axis] - other[axis]` in the distance type `D`.
///
/// Coordinates are converted with `Into<D>` before subtracting, so integer keys
/// can be measured with a floating point distance.
pub struct BracketMinus<D>(PhantomData<fn() -> D>);

impl<D> BracketMinus<D> {
    /// Create the functor.
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<D> Default for BracketMinus<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> Clone for BracketMinus<D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D> Copy for BracketMinus<D> {}

impl<D> fmt::Debug for BracketMinus<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BracketMinus")
    }
}

impl<K, D> Difference<K> for BracketMinus<D>
where
    K: Index<usize> + ?Sized,
    K::Output: Copy + Into<D>,
    D: Copy + PartialOrd + Sub<Output = D>,
{
    type Output = D;

    #[inline]
    fn difference(&self, axis: usize, a: &K, b: &K) -> D {
        a[axis].into() - b[axis].into()
    }
}

/// Computes `accessor(axis, key) - accessor(axis, other)` in the distance type `D`.
pub struct AccessorMinus<F, D> {
    accessor: F,
    _d: PhantomData<fn() -> D>,
}

impl<F, D> AccessorMinus<F, D> {
    /// Wrap an accessor.
    pub const fn new(accessor: F) -> Self {
        Self {
            accessor,
            _d: PhantomData,
        }
    }

    /// The wrapped accessor.
    pub fn accessor(&self) -> &F {
        &self.accessor
    }
}

impl<F: Clone, D> Clone for AccessorMinus<F, D> {
    fn clone(&self) -> Self {
        Self::new(self.accessor.clone())
    }
}

impl<F, D> fmt::Debug for AccessorMinus<F, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessorMinus").finish_non_exhaustive()
    }
}

impl<K, F, T, D> Difference<K> for AccessorMinus<F, D>
where
    K: ?Sized,
    F: Fn(usize, &K) -> T,
    T: Into<D>,
    D: Copy + PartialOrd + Sub<Output = D>,
{
    type Output = D;

    #[inline]
    fn difference(&self, axis: usize, a: &K, b: &K) -> D {
        (self.accessor)(axis, a).into() - (self.accessor)(axis, b).into()
    }
}

/// Comparators that know the difference functor reading the same coordinates.
///
/// The typed neighbor factories ([`Kdtree::euclidean_neighbors`] and friends)
/// use it to build a metric from the container's own comparator.
///
/// [`Kdtree::euclidean_neighbors`]: crate::Kdtree::euclidean_neighbors
pub trait BuiltinDifference<D> {
    /// The matching difference functor.
    type Difference;

    /// Build the difference functor.
    fn builtin_difference(&self) -> Self::Difference;
}

impl<D> BuiltinDifference<D> for BracketLess {
    type Difference = BracketMinus<D>;

    fn builtin_difference(&self) -> BracketMinus<D> {
        BracketMinus::new()
    }
}

impl<F: Clone, D> BuiltinDifference<D> for AccessorLess<F> {
    type Difference = AccessorMinus<F, D>;

    fn builtin_difference(&self) -> AccessorMinus<F, D> {
        AccessorMinus::new(self.0.clone())
    }
}
