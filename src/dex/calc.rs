//! Exact sqrt-price arithmetic.
//!
//! Everything here is integer math over `BigUint`. A Q64.96 sqrt-price squared
//! needs up to 320 bits, so `U256` is only used at the edges.

use crate::errors::RebalanceError;
use alloy_primitives::U256;
use bigdecimal::BigDecimal;
use num_bigint::{BigInt, BigUint};
use num_traits::{One, Zero};
use std::cmp::Ordering;

/// Fractional bits kept by `sqrt_fixed`, `inv_sqrt_fixed` and every amount
/// derived from them. Same scale as the pools' `sqrtPriceX96`, so a valid
/// on-chain sqrt price never rounds to zero.
pub const FIXED_POINT_BITS: u32 = Q96_BITS;

const Q96_BITS: u32 = 96;
const SQRT_PRICE_MAX_BITS: usize = 160;

/// Exact price of token0 in token1, `numerator / denominator`.
#[derive(Clone, Debug)]
pub struct Price {
    numerator: BigUint,
    denominator: BigUint,
}

impl Price {
    /// `floor(sqrt(price) * 2^96)`. For a price built from a sqrt price this
    /// is exactly the `sqrtPriceX96` it came from.
    pub fn sqrt_fixed(&self) -> BigUint {
        let shifted = (&self.numerator << (2 * FIXED_POINT_BITS)) / &self.denominator;
        big_sqrt(&shifted)
    }

    /// `floor(2^96 / sqrt(price))`, i.e. `floor(2^192 / sqrtPriceX96)`.
    pub fn inv_sqrt_fixed(&self) -> BigUint {
        let shifted = (&self.denominator << (2 * FIXED_POINT_BITS)) / &self.numerator;
        big_sqrt(&shifted)
    }

    /// Decimal rendering for logs. Never feed this back into sizing.
    pub fn to_decimal(&self) -> BigDecimal {
        let num = BigDecimal::from(BigInt::from(self.numerator.clone()));
        let den = BigDecimal::from(BigInt::from(self.denominator.clone()));
        num / den
    }
}

impl PartialEq for Price {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Price {}

impl PartialOrd for Price {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Price {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.numerator * &other.denominator).cmp(&(&other.numerator * &self.denominator))
    }
}

/// Converts a pool's Q64.96 `sqrtPriceX96` into the exact price
/// `(sqrtPriceX96 / 2^96)^2`.
pub fn price_from_sqrt_x96(sqrt_price_x96: U256) -> Result<Price, RebalanceError> {
    if sqrt_price_x96.is_zero() {
        return Err(RebalanceError::InvalidSqrtPrice {
            value: sqrt_price_x96.to_string(),
            reason: "must be non-zero",
        });
    }
    if sqrt_price_x96.bit_len() > SQRT_PRICE_MAX_BITS {
        return Err(RebalanceError::InvalidSqrtPrice {
            value: sqrt_price_x96.to_string(),
            reason: "exceeds the uint160 range",
        });
    }

    let sqrt = u256_to_biguint(sqrt_price_x96);
    Ok(Price {
        numerator: &sqrt * &sqrt,
        denominator: BigUint::one() << (2 * Q96_BITS),
    })
}

/// Floor square root: the largest `r` with `r * r <= value`.
///
/// Newton iteration from a power of two that is never below the root; the
/// sequence decreases monotonically and stops at the first non-decreasing step.
pub fn big_sqrt(value: &BigUint) -> BigUint {
    if value.is_zero() || value.is_one() {
        return value.clone();
    }

    let mut x = BigUint::one() << value.bits().div_ceil(2);
    loop {
        let y = (&x + value / &x) >> 1u32;
        if y >= x {
            return x;
        }
        x = y;
    }
}

/// `value * 2^96` as a fixed-point number, handy for whole quantities.
pub fn to_fixed(value: impl Into<BigUint>) -> BigUint {
    value.into() << FIXED_POINT_BITS
}

/// Drops the fractional bits of a fixed-point number (floor).
pub fn from_fixed(value: &BigUint) -> BigUint {
    value >> FIXED_POINT_BITS
}

pub fn u256_to_biguint(value: U256) -> BigUint {
    BigUint::from_bytes_be(&value.to_be_bytes::<32>())
}
