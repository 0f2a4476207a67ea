// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error kinds reported by tree constructors, factories, and checked metrics.

use core::fmt;

/// Result type for fallible tree operations.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// The checked operation that overflowed in a metric computation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ArithmeticError {
    /// Absolute value of the most negative signed integer.
    Abs,
    /// Sum of two non-negative values.
    Add,
    /// Square of a value.
    Square,
    /// Product of two non-negative values.
    Multiply,
}

/// Errors raised by tree operations.
///
/// Factories validate their arguments eagerly; internal invariants are never
/// reported through this type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Error {
    /// A dynamic rank of zero was requested.
    InvalidRank,
    /// A box container was given an odd rank.
    InvalidOddRank {
        /// The rejected rank.
        rank: usize,
    },
    /// An axis outside `0..rank` was given.
    InvalidDimension {
        /// The rejected axis.
        axis: usize,
        /// The rank of the container.
        rank: usize,
    },
    /// The handle denotes the header sentinel rather than an element.
    InvalidNode,
    /// The handle is stale or belongs to another container.
    InvalidIterator,
    /// The operation requires a non-empty container.
    InvalidEmptyContainer,
    /// Region bounds are inverted.
    InvalidBounds {
        /// First axis on which the bounds are inverted.
        axis: usize,
    },
    /// A box key does not follow its layout.
    InvalidBox {
        /// First low coordinate found above its high counterpart.
        axis: usize,
    },
    /// A negative distance was given to a neighbor factory.
    InvalidDistance,
    /// A checked metric overflowed.
    Arithmetic(ArithmeticError),
}

impl fmt::Display for ArithmeticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            Self::Abs => "absolute value",
            Self::Add => "addition",
            Self::Square => "square",
            Self::Multiply => "multiplication",
        };
        write!(f, "{op} overflowed")
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRank => write!(f, "rank must be at least 1"),
            Self::InvalidOddRank { rank } => {
                write!(f, "box containers need an even rank, got {rank}")
            }
            Self::InvalidDimension { axis, rank } => {
                write!(f, "axis {axis} is out of range for rank {rank}")
            }
            Self::InvalidNode => write!(f, "handle points to the header node"),
            Self::InvalidIterator => {
                write!(f, "handle is stale or belongs to another container")
            }
            Self::InvalidEmptyContainer => write!(f, "container is empty"),
            Self::InvalidBounds { axis } => {
                write!(f, "lower bound is not below upper bound on axis {axis}")
            }
            Self::InvalidBox { axis } => {
                write!(f, "box does not follow its layout on axis {axis}")
            }
            Self::InvalidDistance => write!(f, "distance is negative"),
            Self::Arithmetic(op) => write!(f, "arithmetic error: {op}"),
        }
    }
}

impl core::error::Error for Error {}

impl From<ArithmeticError> for Error {
    fn from(op: ArithmeticError) -> Self {
        Self::Arithmetic(op)
    }
}
