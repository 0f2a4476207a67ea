// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Distance metrics for neighbor queries.
//!
//! A [`Metric`] answers two questions: the distance between two keys, and the
//! distance from a key to the axis-aligned plane through another key. The
//! second must never exceed the first for any key on the far side of the
//! plane; neighbor searches rely on it to skip subtrees.
//!
//! The built-in metrics take a [`Difference`] functor reading coordinates. Each
//! has an unchecked form (`new`) and an overflow-checked form (`checked`) that
//! reports [`Error::Arithmetic`](crate::Error::Arithmetic) instead of wrapping
//! or losing precision.

use crate::compare::Difference;
use crate::error::Result;
use crate::math::{Real, Scalar, check_abs, check_positive_add, check_positive_mul, check_square};

/// A distance between keys, and from keys to splitting planes.
pub trait Metric<K: ?Sized> {
    /// The distance type.
    type Distance: Copy + PartialOrd + core::fmt::Debug;

    /// Distance between `origin` and `key` over all `rank` axes.
    fn distance_to_key(&self, rank: usize, origin: &K, key: &K) -> Result<Self::Distance>;

    /// Distance between `origin` and the plane orthogonal to `axis` through `key`.
    fn distance_to_plane(
        &self,
        rank: usize,
        axis: usize,
        origin: &K,
        key: &K,
    ) -> Result<Self::Distance>;
}

macro_rules! metric_ctors {
    ($name:ident) => {
        impl<F> $name<F> {
            /// Unchecked metric over `difference`.
            pub const fn new(difference: F) -> Self {
                Self {
                    difference,
                    checked: false,
                }
            }

            /// Metric over `difference` that reports overflow as an error.
            pub const fn checked(difference: F) -> Self {
                Self {
                    difference,
                    checked: true,
                }
            }

            /// The difference functor.
            pub fn difference(&self) -> &F {
                &self.difference
            }

            /// Whether arithmetic is overflow-checked.
            pub fn is_checked(&self) -> bool {
                self.checked
            }
        }
    };
}

/// Straight-line distance, `sqrt(Σ dᵢ²)`.
///
/// The checked form scales every difference by the largest one before
/// squaring, so the sum cannot overflow even when the squares would.
#[derive(Copy, Clone, Debug, Default)]
pub struct Euclidean<F> {
    difference: F,
    checked: bool,
}

/// Squared straight-line distance, `Σ dᵢ²`.
///
/// Orders neighbors like [`Euclidean`] without taking roots, and works with
/// integer distance types.
#[derive(Copy, Clone, Debug, Default)]
pub struct Quadrance<F> {
    difference: F,
    checked: bool,
}

/// Taxicab distance, `Σ |dᵢ|`.
#[derive(Copy, Clone, Debug, Default)]
pub struct Manhattan<F> {
    difference: F,
    checked: bool,
}

metric_ctors!(Euclidean);
metric_ctors!(Quadrance);
metric_ctors!(Manhattan);

impl<K, F> Metric<K> for Euclidean<F>
where
    K: ?Sized,
    F: Difference<K>,
    F::Output: Real,
{
    type Distance = F::Output;

    fn distance_to_key(&self, rank: usize, origin: &K, key: &K) -> Result<F::Output> {
        let diff = |axis| self.difference.difference(axis, origin, key);
        if !self.checked {
            let mut sum = F::Output::ZERO;
            for axis in 0..rank {
                let d = diff(axis);
                sum = sum + d * d;
            }
            return Ok(sum.sqrt());
        }
        let mut max = F::Output::ZERO;
        let mut max_axis = 0;
        for axis in 0..rank {
            let d = diff(axis).abs();
            if max < d {
                max = d;
                max_axis = axis;
            }
        }
        if max == F::Output::ZERO {
            return Ok(max);
        }
        let mut sum = F::Output::ZERO;
        for axis in (0..rank).filter(|&axis| axis != max_axis) {
            let ratio = diff(axis) / max;
            sum = sum + ratio * ratio;
        }
        check_positive_mul(max, (F::Output::ONE + sum).sqrt())
    }

    fn distance_to_plane(
        &self,
        _rank: usize,
        axis: usize,
        origin: &K,
        key: &K,
    ) -> Result<F::Output> {
        Ok(self.difference.difference(axis, origin, key).abs())
    }
}

impl<K, F> Metric<K> for Quadrance<F>
where
    K: ?Sized,
    F: Difference<K>,
    F::Output: Scalar,
{
    type Distance = F::Output;

    fn distance_to_key(&self, rank: usize, origin: &K, key: &K) -> Result<F::Output> {
        let mut sum = F::Output::ZERO;
        for axis in 0..rank {
            let d = self.difference.difference(axis, origin, key);
            sum = if self.checked {
                check_positive_add(sum, check_square(d)?)?
            } else {
                sum + d * d
            };
        }
        Ok(sum)
    }

    fn distance_to_plane(
        &self,
        _rank: usize,
        axis: usize,
        origin: &K,
        key: &K,
    ) -> Result<F::Output> {
        let d = self.difference.difference(axis, origin, key);
        if self.checked {
            check_square(d)
        } else {
            Ok(d * d)
        }
    }
}

impl<K, F> Metric<K> for Manhattan<F>
where
    K: ?Sized,
    F: Difference<K>,
    F::Output: Scalar,
{
    type Distance = F::Output;

    fn distance_to_key(&self, rank: usize, origin: &K, key: &K) -> Result<F::Output> {
        let mut sum = F::Output::ZERO;
        for axis in 0..rank {
            let d = self.difference.difference(axis, origin, key);
            sum = if self.checked {
                check_positive_add(sum, check_abs(d)?)?
            } else {
                sum + d.abs()
            };
        }
        Ok(sum)
    }

    fn distance_to_plane(
        &self,
        _rank: usize,
        axis: usize,
        origin: &K,
        key: &K,
    ) -> Result<F::Output> {
        let d = self.difference.difference(axis, origin, key);
        if self.checked { check_abs(d) } else { Ok(d.abs()) }
    }
}
