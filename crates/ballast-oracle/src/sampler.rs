//! Price samplers.
//!
//! A [`PriceSampler`] is the leaf data source of the engine. Two feeds are
//! provided:
//!
//! - [`SimulatedSampler`]: mean-reverting random walk around the peg, with
//!   market shocks for testing and operations drills
//! - [`StaticSampler`]: a fixed price, adjustable by hand
//!
//! Both score their samples with [`compute_confidence`].

use ballast_types::price::PriceObservation;
use ballast_types::{round_price, TimestampMs};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::*;

use crate::confidence::compute_confidence;
use crate::{OracleError, Result};

/// Lowest price a simulated feed can reach.
pub const MIN_SIMULATED_PRICE: Decimal = Decimal::from_parts(1, 0, 0, false, 4);

/// Largest fractional move a shock of severity 1.0 causes.
pub const MAX_SHOCK_MOVE: f64 = 0.5;

/// Source of price observations.
pub trait PriceSampler: Send {
    /// Produce one observation at `now`.
    ///
    /// `recent` holds the most recent aggregated prices, oldest first.
    fn sample(&mut self, now: TimestampMs, recent: &[Decimal]) -> Result<PriceObservation>;

    /// Move the feed's internal price to `price` (manual override).
    fn anchor(&mut self, price: Decimal);

    /// Follow a new peg after a configuration change. Confidence is scored
    /// against this target from the next sample on.
    fn set_target(&mut self, target: Decimal);

    /// Perturb the feed by `severity` in `[0, 1]`. Returns the new price.
    fn shock(&mut self, severity: Decimal) -> Result<Decimal>;
}

fn check_severity(severity: Decimal) -> Result<()> {
    if severity < Decimal::ZERO || severity > Decimal::ONE {
        return Err(OracleError::InvalidSeverity(severity));
    }
    Ok(())
}

/// Tuning for [`SimulatedSampler`].
#[derive(Debug, Clone)]
pub struct SimulationParams {
    /// Maximum per-step fractional noise.
    pub step_volatility: f64,
    /// Fraction of the gap to the peg closed each step.
    pub mean_reversion: f64,
    /// Typical traded volume per sample.
    pub base_volume: f64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            step_volatility: 0.002,
            mean_reversion: 0.05,
            base_volume: 100_000.0,
        }
    }
}

/// Mean-reverting random walk around a peg.
#[derive(Debug, Clone)]
pub struct SimulatedSampler {
    target: Decimal,
    price: Decimal,
    params: SimulationParams,
    rng: StdRng,
}

impl SimulatedSampler {
    /// Create a simulated feed starting at the peg.
    pub fn new(target: Decimal, seed: u64) -> Self {
        Self::with_params(target, seed, SimulationParams::default())
    }

    pub fn with_params(target: Decimal, seed: u64, params: SimulationParams) -> Self {
        Self {
            target,
            price: target,
            params,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// The feed's current internal price.
    pub fn price(&self) -> Decimal {
        self.price
    }

    fn to_decimal(value: f64) -> Decimal {
        Decimal::from_f64_retain(value)
            .unwrap_or(Decimal::ZERO)
            .round_dp(12)
    }
}

impl PriceSampler for SimulatedSampler {
    fn sample(&mut self, now: TimestampMs, recent: &[Decimal]) -> Result<PriceObservation> {
        let vol = self.params.step_volatility;
        let noise = if vol > 0.0 {
            self.rng.gen_range(-vol..=vol)
        } else {
            0.0
        };
        let gap = if self.target > Decimal::ZERO {
            (self.target - self.price) / self.target
        } else {
            Decimal::ZERO
        };
        let step = Self::to_decimal(noise)
            + gap * Self::to_decimal(self.params.mean_reversion);

        self.price = round_price(self.price * (Decimal::ONE + step)).max(MIN_SIMULATED_PRICE);

        let volume = self.params.base_volume * self.rng.gen_range(0.5..1.5);
        let confidence = compute_confidence(self.price, self.target, recent);

        let observation =
            PriceObservation::new(self.price, now, Self::to_decimal(volume).round_dp(2), confidence)?;
        Ok(observation)
    }

    fn anchor(&mut self, price: Decimal) {
        self.price = price.max(MIN_SIMULATED_PRICE);
    }

    fn set_target(&mut self, target: Decimal) {
        tracing::debug!(%target, "simulated sampler: peg moved");
        self.target = target;
    }

    fn shock(&mut self, severity: Decimal) -> Result<Decimal> {
        check_severity(severity)?;
        let magnitude = severity.to_f64().unwrap_or(0.0) * MAX_SHOCK_MOVE;
        let direction = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        let factor = Self::to_decimal(1.0 + direction * magnitude);
        self.price = round_price(self.price * factor).max(MIN_SIMULATED_PRICE);

        tracing::warn!(
            severity = %severity,
            new_price = %self.price,
            "simulated sampler: market shock applied"
        );
        Ok(self.price)
    }
}

/// A feed that always reports the same price until told otherwise.
#[derive(Debug, Clone)]
pub struct StaticSampler {
    target: Decimal,
    price: Decimal,
    volume: Decimal,
}

impl StaticSampler {
    /// A static feed sitting exactly at the peg.
    pub fn new(target: Decimal) -> Self {
        Self::with_price(target, target)
    }

    pub fn with_price(target: Decimal, price: Decimal) -> Self {
        Self {
            target,
            price,
            volume: Decimal::ZERO,
        }
    }

    pub fn price(&self) -> Decimal {
        self.price
    }
}

impl PriceSampler for StaticSampler {
    fn sample(&mut self, now: TimestampMs, recent: &[Decimal]) -> Result<PriceObservation> {
        let confidence = compute_confidence(self.price, self.target, recent);
        Ok(PriceObservation::new(self.price, now, self.volume, confidence)?)
    }

    fn anchor(&mut self, price: Decimal) {
        tracing::warn!(new_price = %price, "static sampler: price changed");
        self.price = price;
    }

    fn set_target(&mut self, target: Decimal) {
        self.target = target;
    }

    /// Static feeds always shock downward, by `severity * MAX_SHOCK_MOVE`.
    fn shock(&mut self, severity: Decimal) -> Result<Decimal> {
        check_severity(severity)?;
        let magnitude = severity * Decimal::from_f64_retain(MAX_SHOCK_MOVE).unwrap_or(Decimal::ZERO);
        self.price = round_price(self.price * (Decimal::ONE - magnitude)).max(MIN_SIMULATED_PRICE);
        Ok(self.price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: u64 = 1_700_000_000_000;

    #[test]
    fn test_simulated_is_deterministic_per_seed() {
        let mut a = SimulatedSampler::new(Decimal::ONE, 7);
        let mut b = SimulatedSampler::new(Decimal::ONE, 7);
        for i in 0..50 {
            let oa = a.sample(T0 + i, &[]).expect("sample a");
            let ob = b.sample(T0 + i, &[]).expect("sample b");
            assert_eq!(oa, ob);
        }
    }

    #[test]
    fn test_simulated_stays_near_peg() {
        let mut sampler = SimulatedSampler::new(Decimal::ONE, 42);
        let mut recent = Vec::new();
        for i in 0..500 {
            let obs = sampler.sample(T0 + i * 1000, &recent).expect("sample");
            assert!(obs.price > Decimal::ZERO);
            assert!(obs.confidence >= Decimal::new(1, 1));
            assert!(obs.confidence <= Decimal::ONE);
            recent.push(obs.price);
        }
        let last = sampler.price();
        assert!(last > Decimal::new(9, 1) && last < Decimal::new(11, 1), "drifted to {last}");
    }

    #[test]
    fn test_shock_moves_price_by_severity() {
        let mut sampler = SimulatedSampler::new(Decimal::ONE, 3);
        let new_price = sampler.shock(Decimal::new(4, 1)).expect("shock");
        // severity 0.4 => +/- 20%
        let moved = (new_price - Decimal::ONE).abs();
        assert_eq!(moved, Decimal::new(2, 1));
    }

    #[test]
    fn test_shock_severity_validated() {
        let mut sampler = SimulatedSampler::new(Decimal::ONE, 3);
        assert!(matches!(
            sampler.shock(Decimal::TWO),
            Err(OracleError::InvalidSeverity(_))
        ));
        assert!(sampler.shock(Decimal::NEGATIVE_ONE).is_err());
    }

    #[test]
    fn test_anchor_resets_simulation() {
        let mut sampler = SimulatedSampler::with_params(
            Decimal::ONE,
            1,
            SimulationParams {
                step_volatility: 0.0,
                mean_reversion: 0.0,
                base_volume: 10.0,
            },
        );
        sampler.anchor(Decimal::new(5, 1));
        let obs = sampler.sample(T0, &[]).expect("sample");
        assert_eq!(obs.price, Decimal::new(5, 1));
    }

    #[test]
    fn test_static_sampler() {
        let mut sampler = StaticSampler::new(Decimal::ONE);
        let obs = sampler.sample(T0, &[]).expect("sample");
        assert_eq!(obs.price, Decimal::ONE);
        assert_eq!(obs.confidence, Decimal::ONE);

        sampler.anchor(Decimal::new(105, 2));
        let obs = sampler.sample(T0 + 1, &[]).expect("sample");
        assert_eq!(obs.price, Decimal::new(105, 2));
        assert!(obs.confidence < Decimal::ONE);
    }

    #[test]
    fn test_set_target_rescores_confidence() {
        let mut sampler = StaticSampler::new(Decimal::ONE);
        sampler.anchor(Decimal::TWO);
        let off_peg = sampler.sample(T0, &[]).expect("sample");
        assert!(off_peg.confidence < Decimal::ONE);

        sampler.set_target(Decimal::TWO);
        let on_peg = sampler.sample(T0 + 1, &[]).expect("sample");
        assert_eq!(on_peg.confidence, Decimal::ONE);
    }

    #[test]
    fn test_simulated_reverts_to_new_target() {
        let mut sampler = SimulatedSampler::with_params(
            Decimal::ONE,
            5,
            SimulationParams {
                step_volatility: 0.0,
                mean_reversion: 0.5,
                base_volume: 10.0,
            },
        );
        sampler.set_target(Decimal::TWO);
        for i in 0..60 {
            sampler.sample(T0 + i, &[]).expect("sample");
        }
        let drift = (sampler.price() - Decimal::TWO).abs();
        assert!(drift < Decimal::new(1, 3), "price {}", sampler.price());
    }

    #[test]
    fn test_static_shock_is_downward() {
        let mut sampler = StaticSampler::new(Decimal::ONE);
        let price = sampler.shock(Decimal::ONE).expect("shock");
        assert_eq!(price, Decimal::new(5, 1));
    }
}
