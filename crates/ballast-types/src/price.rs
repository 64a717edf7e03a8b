//! Price observation types produced by samplers and the aggregator.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{round_price, TimestampMs, ValidationError};

/// A single timestamped price sample.
///
/// Immutable once created. `price > 0` and `0 <= confidence <= 1` hold for
/// every value built through [`PriceObservation::new`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    /// Quoted price, always positive.
    pub price: Decimal,
    /// When the sample was taken (unix ms).
    pub timestamp: TimestampMs,
    /// Traded volume behind the quote; zero for manual overrides.
    pub volume: Decimal,
    /// Trust in the quote, in `[0, 1]`.
    pub confidence: Decimal,
}

impl PriceObservation {
    /// Build an observation, rejecting non-positive prices.
    ///
    /// Out-of-range confidence is clamped into `[0, 1]` rather than rejected,
    /// and negative volume is clamped to zero.
    pub fn new(
        price: Decimal,
        timestamp: TimestampMs,
        volume: Decimal,
        confidence: Decimal,
    ) -> Result<Self, ValidationError> {
        if price <= Decimal::ZERO {
            return Err(ValidationError::NonPositivePrice(price));
        }
        Ok(Self {
            price: round_price(price),
            timestamp,
            volume: volume.max(Decimal::ZERO),
            confidence: confidence.clamp(Decimal::ZERO, Decimal::ONE),
        })
    }
}

/// Rolling statistics over a time window of observations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceStats {
    /// Most recent price in the window.
    pub current: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    /// Arithmetic mean of prices in the window.
    pub average: Decimal,
    /// Time-weighted average price, when the window has enough samples.
    pub twap: Option<Decimal>,
    /// Standard deviation divided by mean.
    pub volatility: Decimal,
    /// Percent change from the first to the last price in the window.
    pub change_pct: Decimal,
    /// Confidence of the most recent observation.
    pub confidence: Decimal,
    /// Number of observations in the window.
    pub samples: usize,
    /// Timestamp of the most recent observation.
    pub as_of: TimestampMs,
}

/// Health verdict derived from the observation ring.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OracleHealth {
    pub healthy: bool,
    /// Timestamp of the last observation, if any.
    pub last_update: Option<TimestampMs>,
    pub confidence: Decimal,
    pub issues: Vec<String>,
}

impl OracleHealth {
    /// Health for an oracle with no observations.
    pub fn no_data() -> Self {
        Self {
            healthy: false,
            last_update: None,
            confidence: Decimal::ZERO,
            issues: vec!["no price data".to_string()],
        }
    }
}
