//! Money calculation utilities using rust_decimal for precision
//!
//! Amounts are whole minor units (`Money = i64`). Percentages go through
//! `Decimal` and are rounded half away from zero back to whole units, so no
//! float ever touches a price.

use rust_decimal::prelude::*;
use shared::types::Money;

/// Percent-of rounding: whole units, half away from zero
const DECIMAL_PLACES: u32 = 0;

/// `percent`% of `amount`, rounded to whole units
pub fn percent_of(amount: Money, percent: i64) -> Money {
    if amount <= 0 || percent <= 0 {
        return 0;
    }
    let value = Decimal::from(amount) * Decimal::from(percent) / Decimal::ONE_HUNDRED;
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(Money::MAX)
}

/// Apply an optional cap
#[inline]
pub fn capped(amount: Money, cap: Option<Money>) -> Money {
    match cap {
        Some(cap) => amount.min(cap),
        None => amount,
    }
}

/// Line total `unit * quantity`
#[inline]
pub fn line_total(unit: Money, quantity: u32) -> Money {
    unit * Money::from(quantity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_of_exact() {
        assert_eq!(percent_of(200_000, 10), 20_000);
        assert_eq!(percent_of(185_000, 10), 18_500);
    }

    #[test]
    fn test_percent_of_rounds_half_away_from_zero() {
        // 10% of 125 = 12.5 -> 13
        assert_eq!(percent_of(125, 10), 13);
        // 10% of 124 = 12.4 -> 12
        assert_eq!(percent_of(124, 10), 12);
        // 15% of 3 = 0.45 -> 0
        assert_eq!(percent_of(3, 15), 0);
    }

    #[test]
    fn test_percent_of_non_positive_inputs() {
        assert_eq!(percent_of(0, 10), 0);
        assert_eq!(percent_of(-500, 10), 0);
        assert_eq!(percent_of(500, 0), 0);
    }

    #[test]
    fn test_capped() {
        assert_eq!(capped(20_000, Some(15_000)), 15_000);
        assert_eq!(capped(10_000, Some(15_000)), 10_000);
        assert_eq!(capped(10_000, None), 10_000);
    }

    #[test]
    fn test_line_total() {
        assert_eq!(line_total(100_000, 2), 200_000);
        assert_eq!(line_total(99, 0), 0);
    }
}
