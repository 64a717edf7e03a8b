//! TWAP and volatility helpers.
//!
//! ```text
//! TWAP       = sum(price_i * duration_i) / sum(duration_i)
//! volatility = stdev(prices) / mean(prices)
//! ```
//!
//! `duration_i` is the time between consecutive observations, and `price_i`
//! is the price that prevailed at the start of that interval.

use rust_decimal::{Decimal, MathematicalOps};

use crate::{OracleError, Result};

/// Minimum number of observations for a valid TWAP.
pub const MIN_OBSERVATIONS: usize = 3;

/// Compute the TWAP from `(timestamp_ms, price)` pairs sorted ascending.
///
/// # Errors
///
/// - [`OracleError::InsufficientObservations`] if fewer than [`MIN_OBSERVATIONS`] pairs
/// - [`OracleError::NonMonotonicTimestamp`] if timestamps are not strictly increasing
/// - [`OracleError::EmptyWindow`] if total duration is zero
pub fn compute_twap(prices: &[(u64, Decimal)]) -> Result<Decimal> {
    if prices.len() < MIN_OBSERVATIONS {
        return Err(OracleError::InsufficientObservations {
            required: MIN_OBSERVATIONS,
            available: prices.len(),
        });
    }

    for window in prices.windows(2) {
        let (t_prev, _) = window[0];
        let (t_next, _) = window[1];
        if t_next <= t_prev {
            return Err(OracleError::NonMonotonicTimestamp {
                new: t_next,
                last: t_prev,
            });
        }
    }

    let mut weighted_sum = Decimal::ZERO;
    let mut total_duration = Decimal::ZERO;

    for window in prices.windows(2) {
        let (t_prev, p_prev) = window[0];
        let (t_next, _) = window[1];
        let duration = Decimal::from(t_next - t_prev);
        weighted_sum += p_prev * duration;
        total_duration += duration;
    }

    if total_duration.is_zero() {
        return Err(OracleError::EmptyWindow);
    }

    Ok(weighted_sum / total_duration)
}

/// Arithmetic mean, or zero for an empty slice.
pub fn mean(prices: &[Decimal]) -> Decimal {
    if prices.is_empty() {
        return Decimal::ZERO;
    }
    prices.iter().copied().sum::<Decimal>() / Decimal::from(prices.len())
}

/// Population standard deviation divided by the mean.
///
/// Returns zero for fewer than two samples or a non-positive mean.
pub fn coefficient_of_variation(prices: &[Decimal]) -> Decimal {
    if prices.len() < 2 {
        return Decimal::ZERO;
    }
    let avg = mean(prices);
    if avg <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let variance = prices
        .iter()
        .map(|p| {
            let d = *p - avg;
            d * d
        })
        .sum::<Decimal>()
        / Decimal::from(prices.len());
    let stdev = variance.sqrt().unwrap_or(Decimal::ZERO);
    stdev / avg
}
