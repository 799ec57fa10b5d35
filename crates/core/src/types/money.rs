//! Money helpers over [`rust_decimal::Decimal`].
//!
//! Cart and purchase amounts are stored as `NUMERIC(12,2)` and always
//! handled as decimals; floats only appear at the JSON boundary.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

/// Absolute distance (in store currency) within which a live product price
/// is considered to match a price hint scraped from chat text.
pub const PRICE_MATCH_TOLERANCE: Decimal = Decimal::from_parts(500, 0, 0, false, 2);

/// Parse a storefront amount string such as `"19.99"`.
///
/// Returns `None` for anything that is not a plain decimal number.
#[must_use]
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw.trim()).ok()
}

/// Round to cents, half away from zero.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Line total for a unit price and quantity, rounded to cents.
#[must_use]
pub fn line_total(unit_price: Decimal, quantity: i32) -> Decimal {
    round_money(unit_price * Decimal::from(quantity))
}

/// Render an amount as `$12.34`.
#[must_use]
pub fn format_usd(amount: Decimal) -> String {
    format!("${:.2}", round_money(amount))
}

/// Whether `live` is within [`PRICE_MATCH_TOLERANCE`] of `hint`.
#[must_use]
pub fn within_tolerance(live: Decimal, hint: Decimal) -> bool {
    (live - hint).abs() <= PRICE_MATCH_TOLERANCE
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_tolerance_is_five_dollars() {
        assert_eq!(PRICE_MATCH_TOLERANCE, Decimal::new(5, 0));
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount(" 19.99 "), Some(Decimal::new(1999, 2)));
        assert_eq!(parse_amount("abc"), None);
    }

    #[test]
    fn test_line_total() {
        assert_eq!(line_total(Decimal::new(1999, 2), 3), Decimal::new(5997, 2));
        assert_eq!(line_total(Decimal::new(1005, 3), 1), Decimal::new(101, 2));
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(Decimal::new(4598, 2)), "$45.98");
        assert_eq!(format_usd(Decimal::new(20, 0)), "$20.00");
    }

    #[test]
    fn test_within_tolerance() {
        let hint = Decimal::new(2000, 2);
        assert!(within_tolerance(Decimal::new(1999, 2), hint));
        assert!(within_tolerance(Decimal::new(2500, 2), hint));
        assert!(!within_tolerance(Decimal::new(2501, 2), hint));
    }
}
