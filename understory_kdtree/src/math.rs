// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Numeric traits for distance types and overflow-checked helpers.
//!
//! Checked helpers assume their inputs are already non-negative where the name
//! says so; they are used by metrics built with `checked(...)`.

use core::fmt::Debug;
use core::ops::{Add, Div, Mul, Sub};

use crate::error::{ArithmeticError, Error, Result};

/// Arithmetic needed by the built-in metrics.
pub trait Scalar:
    Copy
    + PartialOrd
    + Debug
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
{
    /// Additive identity.
    const ZERO: Self;
    /// Largest finite value.
    const MAX: Self;

    /// Absolute value.
    fn abs(self) -> Self;

    /// Absolute value, or `None` when it is not representable.
    fn checked_abs(self) -> Option<Self>;
}

/// Scalars with a square root, required by [`Euclidean`](crate::Euclidean).
pub trait Real: Scalar {
    /// Multiplicative identity.
    const ONE: Self;

    /// Square root.
    fn sqrt(self) -> Self;
}

macro_rules! impl_signed {
    ($($t:ty),*) => {$(
        impl Scalar for $t {
            const ZERO: Self = 0;
            const MAX: Self = <$t>::MAX;

            #[inline]
            fn abs(self) -> Self {
                <$t>::abs(self)
            }

            #[inline]
            fn checked_abs(self) -> Option<Self> {
                <$t>::checked_abs(self)
            }
        }
    )*};
}

macro_rules! impl_unsigned {
    ($($t:ty),*) => {$(
        impl Scalar for $t {
            const ZERO: Self = 0;
            const MAX: Self = <$t>::MAX;

            #[inline]
            fn abs(self) -> Self {
                self
            }

            #[inline]
            fn checked_abs(self) -> Option<Self> {
                Some(self)
            }
        }
    )*};
}

macro_rules! impl_float {
    ($($t:ty => $libm_sqrt:ident),*) => {$(
        impl Scalar for $t {
            const ZERO: Self = 0.0;
            const MAX: Self = <$t>::MAX;

            #[inline]
            fn abs(self) -> Self {
                if self < 0.0 { -self } else { self }
            }

            #[inline]
            fn checked_abs(self) -> Option<Self> {
                Some(Scalar::abs(self))
            }
        }

        impl Real for $t {
            const ONE: Self = 1.0;

            #[cfg(feature = "std")]
            #[inline]
            fn sqrt(self) -> Self {
                <$t>::sqrt(self)
            }

            #[cfg(all(not(feature = "std"), feature = "libm"))]
            #[inline]
            fn sqrt(self) -> Self {
                libm::$libm_sqrt(self)
            }
        }
    )*};
}

impl_signed!(i8, i16, i32, i64, i128, isize);
impl_unsigned!(u8, u16, u32, u64, u128, usize);
impl_float!(f32 => sqrtf, f64 => sqrt);

/// Reject negative distances given to neighbor bound factories.
pub fn check_positive_distance<D: Scalar>(d: D) -> Result<D> {
    if d < D::ZERO {
        Err(Error::InvalidDistance)
    } else {
        Ok(d)
    }
}

/// `|x|`, failing on the most negative signed integer.
pub fn check_abs<D: Scalar>(x: D) -> Result<D> {
    x.checked_abs()
        .ok_or(Error::Arithmetic(ArithmeticError::Abs))
}

/// `x + y` for non-negative operands, failing past `D::MAX`.
pub fn check_positive_add<D: Scalar>(x: D, y: D) -> Result<D> {
    if D::MAX - x < y {
        Err(Error::Arithmetic(ArithmeticError::Add))
    } else {
        Ok(x + y)
    }
}

/// `x * x`, failing past `D::MAX`.
pub fn check_square<D: Scalar>(x: D) -> Result<D> {
    if x == D::ZERO {
        return Ok(x);
    }
    let a = check_abs(x)?;
    if D::MAX / a < a {
        Err(Error::Arithmetic(ArithmeticError::Square))
    } else {
        Ok(a * a)
    }
}

/// `x * y` for non-negative operands, failing past `D::MAX`.
pub fn check_positive_mul<D: Scalar>(x: D, y: D) -> Result<D> {
    if x == D::ZERO {
        return Ok(x);
    }
    if D::MAX / x < y {
        Err(Error::Arithmetic(ArithmeticError::Multiply))
    } else {
        Ok(x * y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abs_of_min_is_caught() {
        assert_eq!(check_abs(-4_i32), Ok(4));
        assert_eq!(
            check_abs(i32::MIN),
            Err(Error::Arithmetic(ArithmeticError::Abs))
        );
        assert_eq!(check_abs(-2.5_f64), Ok(2.5));
    }

    #[test]
    fn add_and_mul_stop_at_max() {
        assert_eq!(check_positive_add(u8::MAX - 1, 1), Ok(u8::MAX));
        assert!(check_positive_add(u8::MAX, 1).is_err());
        assert_eq!(check_positive_mul(0_i16, i16::MAX), Ok(0));
        assert_eq!(check_positive_mul(16_i16, 2047), Ok(32752));
        assert!(check_positive_mul(16_i16, 2048).is_err());
    }

    #[test]
    fn square_overflow() {
        assert_eq!(check_square(-11_i8), Ok(121));
        assert_eq!(
            check_square(12_i8),
            Err(Error::Arithmetic(ArithmeticError::Square))
        );
        assert_eq!(check_square(0_i8), Ok(0));
    }

    #[test]
    fn negative_distance_rejected() {
        assert_eq!(check_positive_distance(-0.5), Err(Error::InvalidDistance));
        assert_eq!(check_positive_distance(0), Ok(0));
    }

    #[test]
    fn sqrt_matches_exact_squares() {
        assert_eq!(Real::sqrt(16.0_f64), 4.0);
        assert_eq!(Real::sqrt(2.25_f32), 1.5);
    }
}
