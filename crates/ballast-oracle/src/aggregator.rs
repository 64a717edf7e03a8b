//! Bounded observation ring with rolling statistics and a health verdict.
//!
//! The aggregator never rejects a sample beyond `price > 0`: out-of-range
//! confidence is clamped so a flaky sampler can only degrade health, never
//! break the epoch loop.
//!
//! ## Health
//!
//! Unhealthy when the last observation is older than `max_price_age_ms` or
//! its confidence is below `min_confidence`. Volatility above
//! `volatility_threshold` over the stats window is reported as a non-fatal
//! issue.

use std::collections::VecDeque;

use ballast_types::price::{OracleHealth, PriceObservation, PriceStats};
use ballast_types::TimestampMs;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::stats::{coefficient_of_variation, compute_twap, mean};
use crate::{OracleError, Result};

/// Default ring capacity.
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// Default staleness threshold (5 minutes).
pub const DEFAULT_MAX_PRICE_AGE_MS: u64 = 5 * 60 * 1000;

/// Default statistics window (1 hour).
pub const DEFAULT_STATS_WINDOW_MS: u64 = 60 * 60 * 1000;

/// Oracle thresholds and sizing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Observations kept in the ring before the oldest is evicted.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// Age after which the last observation is stale and the oracle unhealthy.
    #[serde(default = "default_max_price_age_ms")]
    pub max_price_age_ms: u64,
    /// Confidence below which the oracle is unhealthy.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: Decimal,
    /// Coefficient of variation reported as a (non-fatal) volatility issue.
    #[serde(default = "default_volatility_threshold")]
    pub volatility_threshold: Decimal,
    /// Window over which stats and the volatility flag are computed.
    #[serde(default = "default_stats_window_ms")]
    pub stats_window_ms: u64,
    /// Period of the scheduler's sampling tick.
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

fn default_max_price_age_ms() -> u64 {
    DEFAULT_MAX_PRICE_AGE_MS
}

fn default_min_confidence() -> Decimal {
    Decimal::new(4, 1)
}

fn default_volatility_threshold() -> Decimal {
    Decimal::new(5, 2)
}

fn default_stats_window_ms() -> u64 {
    DEFAULT_STATS_WINDOW_MS
}

fn default_sample_interval_ms() -> u64 {
    10_000
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            max_price_age_ms: default_max_price_age_ms(),
            min_confidence: default_min_confidence(),
            volatility_threshold: default_volatility_threshold(),
            stats_window_ms: default_stats_window_ms(),
            sample_interval_ms: default_sample_interval_ms(),
        }
    }
}

/// Aggregates price observations over time.
#[derive(Debug, Clone)]
pub struct PriceAggregator {
    history: VecDeque<PriceObservation>,
    config: OracleConfig,
}

impl PriceAggregator {
    pub fn new(config: OracleConfig) -> Self {
        Self {
            history: VecDeque::with_capacity(config.history_capacity.min(4096)),
            config,
        }
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    /// Append an observation, evicting the oldest beyond capacity.
    ///
    /// # Errors
    ///
    /// - [`OracleError::InvalidPrice`] if `price <= 0`
    pub fn add_observation(&mut self, mut observation: PriceObservation) -> Result<()> {
        if observation.price <= Decimal::ZERO {
            return Err(OracleError::InvalidPrice(observation.price));
        }
        observation.confidence = observation.confidence.clamp(Decimal::ZERO, Decimal::ONE);
        if observation.volume < Decimal::ZERO {
            observation.volume = Decimal::ZERO;
        }

        tracing::trace!(
            price = %observation.price,
            confidence = %observation.confidence,
            "oracle: observation recorded"
        );

        self.history.push_back(observation);
        let capacity = self.config.history_capacity.max(1);
        while self.history.len() > capacity {
            self.history.pop_front();
        }
        Ok(())
    }

    /// Most recent observation, if any.
    pub fn current_price(&self) -> Option<&PriceObservation> {
        self.history.back()
    }

    /// Up to `n` most recent prices, oldest first.
    pub fn recent_prices(&self, n: usize) -> Vec<Decimal> {
        let start = self.history.len().saturating_sub(n);
        self.history.iter().skip(start).map(|o| o.price).collect()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Statistics over observations no older than `window_ms` before `now`.
    ///
    /// Returns `None` when the window holds no observations.
    pub fn price_stats(&self, window_ms: u64, now: TimestampMs) -> Option<PriceStats> {
        let cutoff = now.saturating_sub(window_ms);
        let window: Vec<&PriceObservation> = self
            .history
            .iter()
            .filter(|o| o.timestamp >= cutoff)
            .collect();
        let last = *window.last()?;
        let first = window[0];

        let prices: Vec<Decimal> = window.iter().map(|o| o.price).collect();
        let high = prices.iter().copied().max().unwrap_or(last.price);
        let low = prices.iter().copied().min().unwrap_or(last.price);
        let points: Vec<(u64, Decimal)> = window.iter().map(|o| (o.timestamp, o.price)).collect();

        let change_pct = if first.price > Decimal::ZERO {
            (last.price - first.price) / first.price * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        };

        Some(PriceStats {
            current: last.price,
            high,
            low,
            average: mean(&prices),
            twap: compute_twap(&points).ok(),
            volatility: coefficient_of_variation(&prices),
            change_pct,
            confidence: last.confidence,
            samples: prices.len(),
            as_of: last.timestamp,
        })
    }

    /// Health verdict at `now`.
    pub fn health(&self, now: TimestampMs) -> OracleHealth {
        let Some(last) = self.current_price() else {
            return OracleHealth::no_data();
        };

        let mut healthy = true;
        let mut issues = Vec::new();

        let age = now.saturating_sub(last.timestamp);
        if age > self.config.max_price_age_ms {
            healthy = false;
            issues.push(format!(
                "stale price data: last update {age}ms ago exceeds {}ms",
                self.config.max_price_age_ms
            ));
        }

        if last.confidence < self.config.min_confidence {
            healthy = false;
            issues.push(format!(
                "low confidence {} below minimum {}",
                last.confidence, self.config.min_confidence
            ));
        }

        if let Some(stats) = self.price_stats(self.config.stats_window_ms, now) {
            if stats.volatility > self.config.volatility_threshold {
                issues.push(format!(
                    "high volatility {} exceeds threshold {}",
                    stats.volatility.round_dp(6),
                    self.config.volatility_threshold
                ));
            }
        }

        OracleHealth {
            healthy,
            last_update: Some(last.timestamp),
            confidence: last.confidence,
            issues,
        }
    }
}

impl Default for PriceAggregator {
    fn default() -> Self {
        Self::new(OracleConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: u64 = 1_700_000_000_000;

    fn obs(price: Decimal, ts: u64, confidence: Decimal) -> PriceObservation {
        PriceObservation::new(price, ts, Decimal::from(1_000), confidence).expect("observation")
    }

    fn cents(n: i64) -> Decimal {
        Decimal::new(n, 2)
    }

    #[test]
    fn test_empty_ring_is_unhealthy_with_no_data_issue() {
        let agg = PriceAggregator::default();
        let health = agg.health(T0);
        assert!(!health.healthy);
        assert!(health.issues.iter().any(|i| i.contains("no price data")));
        assert!(agg.current_price().is_none());
        assert!(agg.price_stats(1000, T0).is_none());
    }

    #[test]
    fn test_ring_evicts_oldest() {
        let mut agg = PriceAggregator::new(OracleConfig {
            history_capacity: 3,
            ..Default::default()
        });
        for i in 1..=5 {
            agg.add_observation(obs(Decimal::from(i), T0 + i as u64, Decimal::ONE))
                .expect("add");
        }
        assert_eq!(agg.len(), 3);
        assert_eq!(
            agg.recent_prices(10),
            vec![Decimal::from(3), Decimal::from(4), Decimal::from(5)]
        );
    }

    #[test]
    fn test_rejects_non_positive_price() {
        let mut agg = PriceAggregator::default();
        let bad = PriceObservation {
            price: Decimal::ZERO,
            timestamp: T0,
            volume: Decimal::ONE,
            confidence: Decimal::ONE,
        };
        let err = agg.add_observation(bad).expect_err("zero price");
        assert!(matches!(err, OracleError::InvalidPrice(_)));
        assert!(agg.is_empty());
    }

    #[test]
    fn test_out_of_range_confidence_clamped() {
        let mut agg = PriceAggregator::default();
        let raw = PriceObservation {
            price: Decimal::ONE,
            timestamp: T0,
            volume: Decimal::ONE,
            confidence: Decimal::from(7),
        };
        agg.add_observation(raw).expect("clamped, not rejected");
        assert_eq!(agg.current_price().expect("current").confidence, Decimal::ONE);
    }

    #[test]
    fn test_stats_only_cover_window() {
        let mut agg = PriceAggregator::default();
        // Outside the window
        agg.add_observation(obs(Decimal::from(50), T0, Decimal::ONE)).expect("add");
        // Inside the window
        agg.add_observation(obs(cents(100), T0 + 10_000, Decimal::ONE)).expect("add");
        agg.add_observation(obs(cents(110), T0 + 20_000, Decimal::ONE)).expect("add");
        agg.add_observation(obs(cents(90), T0 + 30_000, Decimal::ONE)).expect("add");

        let stats = agg.price_stats(25_000, T0 + 30_000).expect("stats");
        assert_eq!(stats.samples, 3);
        assert_eq!(stats.high, cents(110));
        assert_eq!(stats.low, cents(90));
        assert_eq!(stats.current, cents(90));
        assert_eq!(stats.average, Decimal::ONE);
        assert_eq!(stats.change_pct, Decimal::from(-10));
        // (1.00*10s + 1.10*10s) / 20s
        assert_eq!(stats.twap, Some(Decimal::new(105, 2)));
        assert!(stats.volatility > Decimal::ZERO);
    }

    #[test]
    fn test_stale_data_is_unhealthy() {
        let mut agg = PriceAggregator::default();
        agg.add_observation(obs(Decimal::ONE, T0, Decimal::ONE)).expect("add");

        assert!(agg.health(T0 + DEFAULT_MAX_PRICE_AGE_MS).healthy);

        let health = agg.health(T0 + DEFAULT_MAX_PRICE_AGE_MS + 1);
        assert!(!health.healthy);
        assert!(health.issues.iter().any(|i| i.contains("stale")));
        assert_eq!(health.last_update, Some(T0));
    }

    #[test]
    fn test_low_confidence_is_unhealthy() {
        let mut agg = PriceAggregator::default();
        agg.add_observation(obs(Decimal::ONE, T0, Decimal::new(2, 1))).expect("add");
        let health = agg.health(T0);
        assert!(!health.healthy);
        assert!(health.issues.iter().any(|i| i.contains("low confidence")));
    }

    #[test]
    fn test_high_volatility_is_flagged_but_not_fatal() {
        let mut agg = PriceAggregator::default();
        for (i, p) in [cents(50), cents(150), cents(50), cents(150)].into_iter().enumerate() {
            agg.add_observation(obs(p, T0 + i as u64 * 1_000, Decimal::ONE)).expect("add");
        }
        let health = agg.health(T0 + 3_000);
        assert!(health.healthy);
        assert!(health.issues.iter().any(|i| i.contains("volatility")));
    }
}
