//! Exact arithmetic for amounts, prices and pool math.
//!
//! Ledger amounts are integers in stroops (1 unit = 10^7 stroops) and prices
//! are `i32` fractions. Nothing in this module touches floating point: offer
//! prices and pool share calculations must reproduce bit-for-bit on every
//! party that computes them.
//!
//! # Example
//!
//! ```
//! use questline_common::math::{parse_amount, format_amount, Price};
//!
//! assert_eq!(parse_amount("100").unwrap(), 1_000_000_000);
//! assert_eq!(format_amount(2_500_000_000), "250.0000000");
//!
//! let price = Price::from_decimal_str("0.1").unwrap();
//! assert_eq!((price.n, price.d), (1, 10));
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Number of stroops in one unit of any asset.
pub const STROOPS_PER_UNIT: i64 = 10_000_000;

const AMOUNT_DECIMALS: usize = 7;

/// Rounding mode for division operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Round toward zero (truncate).
    Down,
    /// Round away from zero (ceiling for positive results).
    Up,
}

/// Error type for math operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MathError {
    /// The result overflows the target type.
    Overflow,
    /// Division by zero was attempted.
    DivisionByZero,
    /// An input was negative when non-negative was required.
    NegativeInput,
}

impl fmt::Display for MathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MathError::Overflow => write!(f, "overflow while performing big divide"),
            MathError::DivisionByZero => write!(f, "division by zero"),
            MathError::NegativeInput => write!(f, "negative input where non-negative required"),
        }
    }
}

impl std::error::Error for MathError {}

/// Calculates `a * b / c` with a 128-bit intermediate product.
pub fn big_divide(a: i64, b: i64, c: i64, rounding: Rounding) -> std::result::Result<i64, MathError> {
    if a < 0 || b < 0 {
        return Err(MathError::NegativeInput);
    }
    if c <= 0 {
        return Err(MathError::DivisionByZero);
    }

    let product = (a as u128) * (b as u128);
    let c = c as u128;
    let result = match rounding {
        Rounding::Down => product / c,
        Rounding::Up => product.div_ceil(c),
    };

    i64::try_from(result).map_err(|_| MathError::Overflow)
}

/// Floor of `sqrt(a * b)` computed without overflow.
///
/// Used to mint the first batch of liquidity pool shares.
pub fn big_square_root(a: i64, b: i64) -> std::result::Result<i64, MathError> {
    if a < 0 || b < 0 {
        return Err(MathError::NegativeInput);
    }
    let n = (a as u128) * (b as u128);
    if n == 0 {
        return Ok(0);
    }

    // Newton iteration converges from above for a seed >= sqrt(n).
    let bits = 128 - n.leading_zeros();
    let mut x: u128 = 1u128 << bits.div_ceil(2);
    loop {
        let y = (x + n / x) / 2;
        if y >= x {
            break;
        }
        x = y;
    }

    i64::try_from(x).map_err(|_| MathError::Overflow)
}

/// Parses a decimal amount string ("100", "0.5", "12.0000001") into stroops.
///
/// At most seven fractional digits are accepted and the result must be
/// non-negative.
pub fn parse_amount(s: &str) -> Result<i64> {
    let invalid = || Error::InvalidAmount(s.to_string());
    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };

    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if frac.len() > AMOUNT_DECIMALS {
        return Err(invalid());
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let whole: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    let mut frac_digits = frac.to_string();
    while frac_digits.len() < AMOUNT_DECIMALS {
        frac_digits.push('0');
    }
    let frac: i64 = frac_digits.parse().map_err(|_| invalid())?;

    whole
        .checked_mul(STROOPS_PER_UNIT)
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(invalid)
}

/// Formats stroops the way Horizon does: always seven decimals.
pub fn format_amount(stroops: i64) -> String {
    let sign = if stroops < 0 { "-" } else { "" };
    let abs = stroops.unsigned_abs();
    let unit = STROOPS_PER_UNIT as u64;
    format!("{}{}.{:07}", sign, abs / unit, abs % unit)
}

/// An offer or pool price as an exact fraction `n / d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Price {
    pub n: i32,
    pub d: i32,
}

impl Price {
    /// Builds a price; both terms must be strictly positive.
    pub fn new(n: i32, d: i32) -> Result<Self> {
        if n <= 0 || d <= 0 {
            return Err(Error::InvalidPrice(format!("{}/{}", n, d)));
        }
        Ok(Self { n, d })
    }

    /// Converts a decimal string into the reduced fraction it denotes.
    ///
    /// "0.1" becomes 1/10 and "2.50" becomes 5/2. Inputs whose reduced terms
    /// do not fit an `i32` are rejected rather than approximated.
    pub fn from_decimal_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidPrice(s.to_string());
        let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
        if (whole.is_empty() && frac.is_empty())
            || !whole.chars().all(|c| c.is_ascii_digit())
            || !frac.chars().all(|c| c.is_ascii_digit())
            || frac.len() > 9
        {
            return Err(invalid());
        }

        let digits = format!("{}{}", whole, frac);
        let numerator: u128 = digits.parse().map_err(|_| invalid())?;
        let denominator: u128 = 10u128.pow(frac.len() as u32);
        if numerator == 0 {
            return Err(invalid());
        }

        let g = gcd(numerator, denominator);
        let n = i32::try_from(numerator / g).map_err(|_| invalid())?;
        let d = i32::try_from(denominator / g).map_err(|_| invalid())?;
        Self::new(n, d)
    }
}

impl FromStr for Price {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('/') {
            Some((n, d)) => {
                let n = n.trim().parse().map_err(|_| Error::InvalidPrice(s.to_string()))?;
                let d = d.trim().parse().map_err(|_| Error::InvalidPrice(s.to_string()))?;
                Self::new(n, d)
            }
            None => Self::from_decimal_str(s),
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.n, self.d)
    }
}

impl From<Price> for stellar_xdr::curr::Price {
    fn from(p: Price) -> Self {
        stellar_xdr::curr::Price { n: p.n, d: p.d }
    }
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_big_divide_rounding() {
        assert_eq!(big_divide(10, 20, 5, Rounding::Down), Ok(40));
        assert_eq!(big_divide(10, 1, 3, Rounding::Down), Ok(3));
        assert_eq!(big_divide(10, 1, 3, Rounding::Up), Ok(4));
        assert_eq!(big_divide(1, 1, 0, Rounding::Down), Err(MathError::DivisionByZero));
        assert_eq!(big_divide(i64::MAX, 4, 1, Rounding::Down), Err(MathError::Overflow));
    }

    #[test]
    fn test_big_square_root() {
        assert_eq!(big_square_root(0, 5), Ok(0));
        assert_eq!(big_square_root(4, 9), Ok(6));
        assert_eq!(big_square_root(2, 1), Ok(1));
        assert_eq!(big_square_root(i64::MAX, i64::MAX), Ok(i64::MAX));
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1000").unwrap(), 10_000_000_000);
        assert_eq!(parse_amount("0.0000001").unwrap(), 1);
        assert_eq!(parse_amount("12.5").unwrap(), 125_000_000);
        assert_eq!(parse_amount(".5").unwrap(), 5_000_000);
        assert!(parse_amount("").is_err());
        assert!(parse_amount("-1").is_err());
        assert!(parse_amount("1.00000001").is_err());
        assert!(parse_amount("1e5").is_err());
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(1), "0.0000001");
        assert_eq!(format_amount(10_000_000_000), "1000.0000000");
    }

    #[test]
    fn test_price_is_exact_fraction() {
        assert_eq!(Price::from_decimal_str("0.1").unwrap(), Price { n: 1, d: 10 });
        assert_eq!(Price::from_decimal_str("2.50").unwrap(), Price { n: 5, d: 2 });
        assert_eq!(Price::from_decimal_str("7").unwrap(), Price { n: 7, d: 1 });
        assert!(Price::from_decimal_str("0").is_err());
        assert!(Price::from_decimal_str("99999999999").is_err());
        assert_eq!("3/4".parse::<Price>().unwrap(), Price { n: 3, d: 4 });
        assert!(Price::new(1, 0).is_err());
    }
}
