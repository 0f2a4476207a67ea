// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rebalancing policies.
//!
//! A policy decides whether a node whose subtrees weigh `left` and `right`
//! should be rebuilt. [`Idle`] never rebuilds and selects the strict
//! invariant; every other policy selects the relaxed invariant and is consulted
//! on each node visited by insertion and erasure.

use core::fmt::Debug;

/// Decides when a subtree of a relaxed container is rebuilt.
pub trait Balancing: Copy + Debug + Default {
    /// Whether containers using this policy keep the relaxed invariant.
    ///
    /// Relaxed containers place keys equal to a node on either side and track
    /// subtree weights. Strict containers always place equal keys on the right.
    const RELAXED: bool = true;

    /// Whether a node with subtrees of weight `left` and `right` is too
    /// unbalanced for a container of the given rank.
    fn should_rebalance(&self, rank: usize, left: usize, right: usize) -> bool;
}

/// No rebalancing; the container keeps the strict invariant.
///
/// Insertion is cheaper than with any relaxed policy, at the cost of
/// degenerate shapes on sorted input. [`Kdtree::rebalance`] rebuilds on demand.
///
/// [`Kdtree::rebalance`]: crate::Kdtree::rebalance
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Idle;

impl Balancing for Idle {
    const RELAXED: bool = false;

    #[inline]
    fn should_rebalance(&self, _rank: usize, _left: usize, _right: usize) -> bool {
        false
    }
}

/// Rebuild when one side weighs more than twice the other plus one, that is
/// `heavy > 2 * (light + 1)`.
///
/// The default policy for relaxed containers. Sides that differ by at most two
/// never trip it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct LooseBalancing;

impl Balancing for LooseBalancing {
    #[inline]
    fn should_rebalance(&self, _rank: usize, left: usize, right: usize) -> bool {
        let (light, heavy) = if left < right { (left, right) } else { (right, left) };
        heavy > light.saturating_add(1).saturating_mul(2)
    }
}

/// Rebuild when the sides differ by more than the rank (at least 2).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TightBalancing;

impl Balancing for TightBalancing {
    #[inline]
    fn should_rebalance(&self, rank: usize, left: usize, right: usize) -> bool {
        let window = rank.max(2);
        left.abs_diff(right) > window
    }
}

/// Rebuild when the sides differ by more than 2.
///
/// Expensive on insertion; mostly useful for read-heavy workloads and tests.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PerfectBalancing;

impl Balancing for PerfectBalancing {
    #[inline]
    fn should_rebalance(&self, _rank: usize, left: usize, right: usize) -> bool {
        left.abs_diff(right) > 2
    }
}
