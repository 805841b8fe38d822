//! Currency amounts.
//!
//! Amounts are `rust_decimal::Decimal` with exactly two fractional digits once
//! they enter the ledger, and never exceed what a `NUMERIC(12,2)` column holds.

use rust_decimal::{Decimal, RoundingStrategy};

use gymdesk_core::{DomainError, DomainResult};

/// Largest storable amount (`NUMERIC(12,2)`).
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);

/// Normalize an amount to two decimal places (half away from zero).
pub fn money(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Normalize `amount` and reject it when it is negative or does not fit the ledger.
pub fn checked_amount(amount: Decimal, field: &str) -> DomainResult<Decimal> {
    if amount < Decimal::ZERO {
        return Err(DomainError::validation(format!("{field} cannot be negative")));
    }
    let amount = money(amount);
    if amount > MAX_AMOUNT {
        return Err(DomainError::validation(format!(
            "{field} out of range (max {MAX_AMOUNT})"
        )));
    }
    Ok(amount)
}

/// `unit_price × quantity`, normalized and bounded.
pub fn line_total(unit_price: Decimal, quantity: i64) -> DomainResult<Decimal> {
    let total = unit_price
        .checked_mul(Decimal::from(quantity))
        .ok_or_else(|| DomainError::validation("amount out of range"))?;
    checked_amount(total, "amount")
}

/// Sum of amounts without overflow.
pub fn checked_sum<I>(amounts: I) -> DomainResult<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    amounts.into_iter().try_fold(Decimal::ZERO, |acc, a| {
        acc.checked_add(a)
            .ok_or_else(|| DomainError::validation("amount out of range"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn money_pads_to_two_places() {
        assert_eq!(money(dec("100")).to_string(), "100.00");
        assert_eq!(money(dec("2.5")).to_string(), "2.50");
    }

    #[test]
    fn money_rounds_half_away_from_zero() {
        assert_eq!(money(dec("1.005")).to_string(), "1.01");
        assert_eq!(money(dec("1.004")).to_string(), "1.00");
    }

    #[test]
    fn line_total_multiplies_and_normalizes() {
        assert_eq!(line_total(dec("4.99"), 5).unwrap().to_string(), "24.95");
        assert_eq!(line_total(dec("2"), 50).unwrap().to_string(), "100.00");
    }

    #[test]
    fn max_amount_matches_column_precision() {
        assert_eq!(MAX_AMOUNT.to_string(), "9999999999.99");
        assert_eq!(checked_amount(MAX_AMOUNT, "price"), Ok(MAX_AMOUNT));
        assert!(checked_amount(dec("10000000000"), "price").is_err());
        assert!(checked_amount(dec("-0.01"), "price").is_err());
    }

    #[test]
    fn huge_line_total_is_an_error_not_a_panic() {
        let err = line_total(dec("100000000000000000000"), 1_000_000_000).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(line_total(dec("9999999999.99"), 2).is_err());
    }

    #[test]
    fn checked_sum_reports_overflow() {
        assert_eq!(checked_sum([dec("1.50"), dec("2.25")]), Ok(dec("3.75")));
        assert!(checked_sum([Decimal::MAX, Decimal::ONE]).is_err());
    }
}
