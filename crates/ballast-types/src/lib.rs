//! # ballast-types
//!
//! Shared domain types for the Ballast stability engine.
//!
//! Prices, balances and amounts are [`Decimal`] throughout. Ledger amounts are
//! quantised to [`LEDGER_DECIMALS`] places with round-half-to-even so that
//! repeated proportional redistribution never accumulates drift.

pub mod config;
pub mod events;
pub mod ledger;
pub mod metrics;
pub mod price;
pub mod supply;

use rust_decimal::{Decimal, RoundingStrategy};

/// Account id type used by the ledger.
pub type AccountId = String;

/// Unix timestamp in milliseconds.
pub type TimestampMs = u64;

/// Decimal places of the ledger's smallest unit.
pub const LEDGER_DECIMALS: u32 = 6;

/// Decimal places kept for prices.
pub const PRICE_DECIMALS: u32 = 8;

/// Account that absorbs rounding residuals from proportional distribution.
pub const RESERVE_ACCOUNT: &str = "reserve";

/// Validation error for domain values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A price was zero or negative.
    #[error("price must be positive, got {0}")]
    NonPositivePrice(Decimal),

    /// A configuration field is outside its allowed range.
    #[error("invalid {field}: {reason}")]
    OutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// Human-readable constraint.
        reason: String,
    },
}

/// Round an amount to the ledger's smallest unit (round-half-to-even).
pub fn round_to_ledger(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(LEDGER_DECIMALS, RoundingStrategy::MidpointNearestEven)
}

/// Truncate an amount toward zero at the ledger's smallest unit.
pub fn floor_to_ledger(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(LEDGER_DECIMALS, RoundingStrategy::ToZero)
}

/// Round a price to [`PRICE_DECIMALS`] places.
pub fn round_price(price: Decimal) -> Decimal {
    price.round_dp_with_strategy(PRICE_DECIMALS, RoundingStrategy::MidpointNearestEven)
}

/// Current wall-clock time in unix milliseconds.
pub fn unix_millis() -> TimestampMs {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).expect("decimal literal")
    }

    #[test]
    fn test_round_half_to_even() {
        assert_eq!(round_to_ledger(dec("0.0000005")), dec("0.000000"));
        assert_eq!(round_to_ledger(dec("0.0000015")), dec("0.000002"));
        assert_eq!(round_to_ledger(dec("-0.0000025")), dec("-0.000002"));
        assert_eq!(round_to_ledger(dec("12.3456789")), dec("12.345679"));
    }

    #[test]
    fn test_floor_never_rounds_up() {
        assert_eq!(floor_to_ledger(dec("49999.9999999")), dec("49999.999999"));
        assert_eq!(floor_to_ledger(dec("-1.0000009")), dec("-1.000000"));
    }

    #[test]
    fn test_unix_millis_reasonable() {
        // Later than 2023-01-01 in milliseconds
        assert!(unix_millis() > 1_672_531_200_000);
    }
}
