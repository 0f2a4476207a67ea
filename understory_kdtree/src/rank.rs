// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Axis count of a container, fixed at compile time or chosen at runtime.

use core::fmt::Debug;

use crate::error::{Error, Result};

/// Number of axes of the keys stored in a container.
pub trait Rank: Copy + Debug {
    /// The axis count. Always at least 1.
    fn get(&self) -> usize;
}

/// Rank known at compile time.
///
/// `StaticRank<0>` fails to compile as soon as its value is read.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct StaticRank<const N: usize>;

impl<const N: usize> Rank for StaticRank<N> {
    #[inline]
    fn get(&self) -> usize {
        const { assert!(N > 0, "rank must be at least 1") };
        N
    }
}

/// Rank chosen at runtime and stored in the container.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DynamicRank(usize);

impl DynamicRank {
    /// Create a runtime rank; zero is rejected with [`Error::InvalidRank`].
    pub const fn new(rank: usize) -> Result<Self> {
        if rank == 0 {
            Err(Error::InvalidRank)
        } else {
            Ok(Self(rank))
        }
    }
}

impl Rank for DynamicRank {
    #[inline]
    fn get(&self) -> usize {
        self.0
    }
}

/// Rank of a box container: an even number of axes, lows and highs.
///
/// How the coordinates are split between low and high corners is a property of
/// the query ([`Layout`](crate::region::Layout)), not of the container.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BoxRank<R>(R);

impl<R: Rank> BoxRank<R> {
    /// Wrap `rank`; odd ranks are rejected with [`Error::InvalidOddRank`].
    pub fn new(rank: R) -> Result<Self> {
        let n = rank.get();
        if n % 2 == 1 {
            return Err(Error::InvalidOddRank { rank: n });
        }
        Ok(Self(rank))
    }

    /// Number of axes of each corner.
    pub fn half(&self) -> usize {
        self.0.get() / 2
    }
}

impl BoxRank<DynamicRank> {
    /// Shorthand for a runtime box rank.
    pub fn dynamic(rank: usize) -> Result<Self> {
        Self::new(DynamicRank::new(rank)?)
    }
}

impl<const N: usize> Default for BoxRank<StaticRank<N>> {
    fn default() -> Self {
        const { assert!(N > 0 && N % 2 == 0, "box rank must be even and non-zero") };
        Self(StaticRank)
    }
}

impl<R: Rank> Rank for BoxRank<R> {
    #[inline]
    fn get(&self) -> usize {
        self.0.get()
    }
}

/// Next axis, wrapping at `rank`.
#[inline]
pub(crate) const fn incr_axis(rank: usize, axis: usize) -> usize {
    if axis + 1 == rank { 0 } else { axis + 1 }
}

/// Previous axis, wrapping at zero.
#[inline]
pub(crate) const fn decr_axis(rank: usize, axis: usize) -> usize {
    if axis == 0 { rank - 1 } else { axis - 1 }
}

/// Reject `axis >= rank`.
pub(crate) const fn check_axis(rank: usize, axis: usize) -> Result<()> {
    if axis < rank {
        Ok(())
    } else {
        Err(Error::InvalidDimension { axis, rank })
    }
}
