//! Per-sample confidence scoring.
//!
//! Confidence starts at 1.0 and is reduced multiplicatively:
//!
//! - by the distance of the price from the peg, floored at [`DEVIATION_FLOOR`]
//! - by recent realized volatility (stdev / mean), floored at [`VOLATILITY_FLOOR`]
//!
//! The product is clamped to `[MIN_CONFIDENCE, 1.0]`.

use rust_decimal::Decimal;

use crate::stats::coefficient_of_variation;

/// Lowest factor the deviation penalty can reach (0.3).
pub const DEVIATION_FLOOR: Decimal = Decimal::from_parts(3, 0, 0, false, 1);

/// Lowest factor the volatility penalty can reach (0.5).
pub const VOLATILITY_FLOOR: Decimal = Decimal::from_parts(5, 0, 0, false, 1);

/// Lowest confidence any sample can carry (0.1).
pub const MIN_CONFIDENCE: Decimal = Decimal::from_parts(1, 0, 0, false, 1);

/// Confidence lost per unit of fractional deviation from the peg.
pub const DEVIATION_SENSITIVITY: Decimal = Decimal::TWO;

/// Confidence lost per unit of coefficient of variation.
pub const VOLATILITY_SENSITIVITY: Decimal = Decimal::TEN;

/// Number of recent samples considered for the volatility penalty.
pub const VOLATILITY_LOOKBACK: usize = 10;

/// Score a sampled price against the peg and the recent price history.
///
/// `recent` is the most recent prices, oldest first; only the last
/// [`VOLATILITY_LOOKBACK`] entries are used.
pub fn compute_confidence(price: Decimal, target: Decimal, recent: &[Decimal]) -> Decimal {
    let mut confidence = Decimal::ONE;

    if target > Decimal::ZERO {
        let deviation = ((price - target) / target).abs();
        let factor = (Decimal::ONE - deviation * DEVIATION_SENSITIVITY).max(DEVIATION_FLOOR);
        confidence *= factor;
    }

    let start = recent.len().saturating_sub(VOLATILITY_LOOKBACK);
    let cv = coefficient_of_variation(&recent[start..]);
    let factor = (Decimal::ONE - cv * VOLATILITY_SENSITIVITY).max(VOLATILITY_FLOOR);
    confidence *= factor;

    confidence.clamp(MIN_CONFIDENCE, Decimal::ONE)
}
