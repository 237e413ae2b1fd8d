//! Money parsing at the API boundary
//!
//! Client amounts arrive as decimal strings and are converted to
//! `rust_decimal::Decimal` here, and only here.
//!
//! ## Rules
//! 1. No silent truncation: more fractional digits than allowed is an error
//! 2. Strict format: "0.5" not ".5", "5.0" not "5."
//! 3. Amounts must be strictly positive
//!
//! ## Usage
//! ```rust
//! use payout_gateway::money::{parse_amount, CRYPTO_SCALE};
//!
//! let amount = parse_amount("1000.50", CRYPTO_SCALE).unwrap();
//! assert_eq!(amount.to_string(), "1000.50");
//! ```

use rust_decimal::prelude::*;
use thiserror::Error;

/// Fractional digits kept for crypto amounts, balances and commissions
pub const CRYPTO_SCALE: u32 = 8;

/// Fractional digits kept for fiat prices
pub const FIAT_SCALE: u32 = 2;

/// Integer digits a stored amount may have (`NUMERIC(30,8)` columns)
pub const MAX_INTEGER_DIGITS: usize = 22;

/// Smallest amount that no longer fits the money columns: 10^22
pub fn amount_limit() -> Decimal {
    Decimal::from_i128_with_scale(10_i128.pow(MAX_INTEGER_DIGITS as u32), 0)
}

/// Money conversion errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Precision overflow: provided {provided} decimals, max allowed {max}")]
    PrecisionOverflow { provided: u32, max: u32 },

    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Amount too large")]
    Overflow,

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Convert a client amount string into a positive `Decimal`.
///
/// # Errors
/// * `PrecisionOverflow` - more than `max_scale` fractional digits
/// * `InvalidAmount` - zero or signed input
/// * `Overflow` - more than `MAX_INTEGER_DIGITS` integer digits
/// * `InvalidFormat` - anything that is not plain digits with one optional dot
pub fn parse_amount(amount_str: &str, max_scale: u32) -> Result<Decimal, MoneyError> {
    let amount_str = amount_str.trim();
    if amount_str.is_empty() {
        return Err(MoneyError::InvalidFormat("empty string".into()));
    }

    if amount_str.starts_with('-') || amount_str.starts_with('+') {
        return Err(MoneyError::InvalidAmount);
    }

    let (whole, frac) = match amount_str.split_once('.') {
        None => (amount_str, ""),
        Some((whole, frac)) => {
            if whole.is_empty() {
                return Err(MoneyError::InvalidFormat(
                    "missing leading zero (e.g., use 0.5 instead of .5)".into(),
                ));
            }
            if frac.is_empty() {
                return Err(MoneyError::InvalidFormat(
                    "missing fractional part (e.g., use 5.0 instead of 5.)".into(),
                ));
            }
            (whole, frac)
        }
    };

    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MoneyError::InvalidFormat(format!(
            "invalid character in amount: {}",
            amount_str
        )));
    }

    if frac.len() > max_scale as usize {
        return Err(MoneyError::PrecisionOverflow {
            provided: frac.len() as u32,
            max: max_scale,
        });
    }

    if whole.trim_start_matches('0').len() > MAX_INTEGER_DIGITS {
        return Err(MoneyError::Overflow);
    }

    let amount = Decimal::from_str_exact(amount_str).map_err(|_| MoneyError::Overflow)?;
    if amount.is_zero() {
        return Err(MoneyError::InvalidAmount);
    }

    Ok(amount)
}

/// Validate an already-typed amount (e.g. a plan price) against a scale.
/// Zero is allowed here; negatives are not.
pub fn check_non_negative(amount: Decimal, max_scale: u32) -> Result<Decimal, MoneyError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(MoneyError::InvalidAmount);
    }
    if amount.scale() > max_scale {
        return Err(MoneyError::PrecisionOverflow {
            provided: amount.scale(),
            max: max_scale,
        });
    }
    Ok(amount)
}

/// Round half away from zero to `scale` digits (banker's rounding is not
/// what merchants expect on fee lines).
#[inline]
pub fn round_to(amount: Decimal, scale: u32) -> Decimal {
    amount.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_amount_basic() {
        assert_eq!(parse_amount("1000.00", FIAT_SCALE).unwrap(), d("1000"));
        assert_eq!(parse_amount("0.00000001", CRYPTO_SCALE).unwrap(), d("0.00000001"));
        assert_eq!(parse_amount(" 42 ", CRYPTO_SCALE).unwrap(), d("42"));
    }

    #[test]
    fn test_parse_amount_rejects_excess_precision() {
        assert_eq!(
            parse_amount("1.001", FIAT_SCALE),
            Err(MoneyError::PrecisionOverflow {
                provided: 3,
                max: 2
            })
        );
    }

    #[test]
    fn test_parse_amount_rejects_non_positive() {
        assert_eq!(parse_amount("0", 8), Err(MoneyError::InvalidAmount));
        assert_eq!(parse_amount("0.00", 8), Err(MoneyError::InvalidAmount));
        assert_eq!(parse_amount("-5", 8), Err(MoneyError::InvalidAmount));
        assert_eq!(parse_amount("+5", 8), Err(MoneyError::InvalidAmount));
    }

    #[test]
    fn test_parse_amount_rejects_bad_format() {
        assert!(matches!(parse_amount("", 8), Err(MoneyError::InvalidFormat(_))));
        assert!(matches!(parse_amount(".5", 8), Err(MoneyError::InvalidFormat(_))));
        assert!(matches!(parse_amount("5.", 8), Err(MoneyError::InvalidFormat(_))));
        assert!(matches!(parse_amount("1.2.3", 8), Err(MoneyError::InvalidFormat(_))));
        assert!(matches!(parse_amount("1e5", 8), Err(MoneyError::InvalidFormat(_))));
        assert!(matches!(parse_amount("12a", 8), Err(MoneyError::InvalidFormat(_))));
    }

    #[test]
    fn test_parse_amount_overflow() {
        let huge = "9".repeat(40);
        assert_eq!(parse_amount(&huge, 8), Err(MoneyError::Overflow));
        // fits a Decimal, not the money columns
        assert_eq!(
            parse_amount("79228162514264337593543950335", 8),
            Err(MoneyError::Overflow)
        );
        assert_eq!(
            parse_amount("10000000000000000000000", 8),
            Err(MoneyError::Overflow)
        );
    }

    #[test]
    fn test_parse_amount_largest_storable() {
        let max = format!("{}.999999", "9".repeat(MAX_INTEGER_DIGITS));
        let amount = parse_amount(&max, CRYPTO_SCALE).unwrap();
        assert!(amount < amount_limit());
        // leading zeros do not count as digits
        assert!(parse_amount(&format!("000{}", "9".repeat(MAX_INTEGER_DIGITS)), 8).is_ok());
    }

    #[test]
    fn test_check_non_negative() {
        assert!(check_non_negative(d("0"), FIAT_SCALE).is_ok());
        assert!(check_non_negative(d("9.99"), FIAT_SCALE).is_ok());
        assert_eq!(
            check_non_negative(d("-1"), FIAT_SCALE),
            Err(MoneyError::InvalidAmount)
        );
        assert!(check_non_negative(d("1.999"), FIAT_SCALE).is_err());
    }

    #[test]
    fn test_round_to_midpoint() {
        assert_eq!(round_to(d("0.000000005"), 8), d("0.00000001"));
        assert_eq!(round_to(d("0.000000004"), 8), d("0"));
    }
}
