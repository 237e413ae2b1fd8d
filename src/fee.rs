//! Withdrawal fee arithmetic
//!
//! One convention throughout: `commission` is an absolute amount in the
//! request currency, `amount * rate` rounded to 8 places. It is computed once
//! at submission and settlement debits exactly the stored `deduction_amount`.

use rust_decimal::Decimal;

use crate::money::{CRYPTO_SCALE, MoneyError, amount_limit, round_to};
use crate::withdrawal::types::SubtractFrom;

/// Amounts derived from a withdrawal request before it is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeBreakdown {
    pub commission: Decimal,
    /// What the tenant balance loses at settlement
    pub deduction_amount: Decimal,
    /// What the payout destination receives
    pub receive_amount: Decimal,
}

/// Calculate commission from amount and rate.
///
/// # Example
/// ```
/// use payout_gateway::fee::calculate_commission;
/// use rust_decimal::Decimal;
/// // 1000.00 * 1.5% = 15.00
/// let fee = calculate_commission(Decimal::new(100000, 2), Decimal::new(15, 3)).unwrap();
/// assert_eq!(fee, Decimal::new(1500, 2));
/// ```
#[inline]
pub fn calculate_commission(amount: Decimal, rate: Decimal) -> Result<Decimal, MoneyError> {
    amount
        .checked_mul(rate)
        .map(|fee| round_to(fee, CRYPTO_SCALE))
        .ok_or(MoneyError::Overflow)
}

/// Split a requested amount into commission, balance debit and payout.
///
/// * `Balance`: the fee is charged on top, the destination gets `amount`
/// * `Amount`: the fee comes out of the payout, the balance loses `amount`
///
/// Fails with `Overflow` when the debit would not fit the money columns.
pub fn breakdown(
    amount: Decimal,
    rate: Decimal,
    subtract_from: SubtractFrom,
) -> Result<FeeBreakdown, MoneyError> {
    let commission = calculate_commission(amount, rate)?;
    let fees = match subtract_from {
        SubtractFrom::Balance => FeeBreakdown {
            commission,
            deduction_amount: amount.checked_add(commission).ok_or(MoneyError::Overflow)?,
            receive_amount: amount,
        },
        SubtractFrom::Amount => FeeBreakdown {
            commission,
            deduction_amount: amount,
            receive_amount: amount.checked_sub(commission).ok_or(MoneyError::Overflow)?,
        },
    };
    if fees.deduction_amount >= amount_limit() {
        return Err(MoneyError::Overflow);
    }
    Ok(fees)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_commission_scenario() {
        let fees = breakdown(d("1000.00"), d("0.015"), SubtractFrom::Balance).unwrap();
        assert_eq!(fees.commission, d("15.00"));
        assert_eq!(fees.deduction_amount, d("1015.00"));
        assert_eq!(fees.receive_amount, d("1000.00"));
    }

    #[test]
    fn test_subtract_from_amount_keeps_deduction() {
        let fees = breakdown(d("1000.00"), d("0.015"), SubtractFrom::Amount).unwrap();
        assert_eq!(fees.commission, d("15"));
        assert_eq!(fees.deduction_amount, d("1000"));
        assert_eq!(fees.receive_amount, d("985"));
    }

    #[test]
    fn test_deduction_is_amount_plus_rate_share() {
        let rate = d("0.015");
        for raw in ["0.01", "1", "33.33", "250.75", "99999.99"] {
            let amount = d(raw);
            let fees = breakdown(amount, rate, SubtractFrom::Balance).unwrap();
            assert_eq!(fees.deduction_amount, amount + amount * rate, "amount {}", raw);
            let fees = breakdown(amount, rate, SubtractFrom::Amount).unwrap();
            assert_eq!(fees.deduction_amount, amount, "amount {}", raw);
        }
    }

    #[test]
    fn test_commission_rounds_to_eight_places() {
        // 0.00000001 * 0.015 = 0.00000000015 -> 0
        assert_eq!(calculate_commission(d("0.00000001"), d("0.015")).unwrap(), d("0"));
        // 0.0000007 * 0.015 = 0.0000000105 -> 0.00000001
        assert_eq!(
            calculate_commission(d("0.0000007"), d("0.015")).unwrap(),
            d("0.00000001")
        );
    }

    #[test]
    fn test_zero_rate() {
        let fees = breakdown(d("10"), Decimal::ZERO, SubtractFrom::Balance).unwrap();
        assert_eq!(fees.commission, Decimal::ZERO);
        assert_eq!(fees.deduction_amount, d("10"));
    }

    #[test]
    fn test_decimal_max_does_not_panic() {
        let fees = breakdown(Decimal::MAX, d("0.015"), SubtractFrom::Balance);
        assert_eq!(fees, Err(MoneyError::Overflow));
    }

    #[test]
    fn test_debit_must_fit_money_columns() {
        // 9.9e21 + 1.5% crosses 10^22
        let near_limit = d("9900000000000000000000");
        assert_eq!(
            breakdown(near_limit, d("0.015"), SubtractFrom::Balance),
            Err(MoneyError::Overflow)
        );
        let fees = breakdown(near_limit, d("0.015"), SubtractFrom::Amount).unwrap();
        assert_eq!(fees.deduction_amount, near_limit);
    }
}
