//! Supply controller.
//!
//! ```text
//! deviation = (price - target) / target
//! raw       = supply * min(|deviation|, 1) * correction_gain
//! amount    = min(round_half_even(raw), floor(supply * max_supply_change_per_epoch))
//! ```
//!
//! Price above target expands supply; price below target contracts it.
//! Inside the tolerance band, on an unhealthy oracle, or with zero supply the
//! controller holds (`SupplyAction::None`, amount zero).

use ballast_types::config::StabilityConfig;
use ballast_types::price::{OracleHealth, PriceStats};
use ballast_types::supply::{AdjustmentStatus, SupplyAction, SupplyAdjustment};
use ballast_types::{floor_to_ledger, round_to_ledger, TimestampMs};
use rust_decimal::Decimal;

/// Decides each epoch's supply adjustment.
#[derive(Debug, Clone)]
pub struct SupplyController {
    config: StabilityConfig,
}

impl SupplyController {
    pub fn new(config: StabilityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StabilityConfig {
        &self.config
    }

    /// Replace the configuration. Callers validate before swapping.
    pub fn set_config(&mut self, config: StabilityConfig) {
        self.config = config;
    }

    /// Fractional deviation of `price` from the target.
    pub fn deviation(&self, price: Decimal) -> Decimal {
        if self.config.target_price.is_zero() {
            return Decimal::ZERO;
        }
        (price - self.config.target_price) / self.config.target_price
    }

    /// Decide the adjustment for `epoch`.
    pub fn decide(
        &self,
        epoch: u64,
        total_supply: Decimal,
        stats: &PriceStats,
        health: &OracleHealth,
        now: TimestampMs,
    ) -> SupplyAdjustment {
        let price = stats.current;
        let deviation = self.deviation(price);

        if total_supply <= Decimal::ZERO {
            return self.hold(epoch, total_supply, price, deviation, "no supply to adjust", now);
        }

        if deviation.abs() <= self.config.tolerance_band {
            return self.hold(epoch, total_supply, price, deviation, "within tolerance band", now);
        }

        if !health.healthy {
            let reason = format!("oracle degraded: {}", health.issues.join("; "));
            tracing::warn!(epoch, %price, %deviation, "{reason}; holding supply");
            return self.hold(epoch, total_supply, price, deviation, &reason, now);
        }

        let magnitude = deviation.abs().min(Decimal::ONE);
        let cap = floor_to_ledger(total_supply * self.config.max_supply_change_per_epoch);
        let raw = total_supply
            .checked_mul(magnitude)
            .and_then(|v| v.checked_mul(self.config.correction_gain))
            .map(round_to_ledger)
            .unwrap_or(cap);
        let clamped = raw > cap;
        let amount = raw.min(cap);

        if amount.is_zero() {
            return self.hold(
                epoch,
                total_supply,
                price,
                deviation,
                "correction smaller than ledger unit",
                now,
            );
        }

        let (action, new_supply, direction) = if deviation > Decimal::ZERO {
            (SupplyAction::Expand, total_supply + amount, "above")
        } else {
            (
                SupplyAction::Contract,
                (total_supply - amount).max(Decimal::ZERO),
                "below",
            )
        };

        let mut reason = format!(
            "price {price} {direction} target {} by {}%; {} supply by {amount}",
            self.config.target_price,
            (deviation.abs() * Decimal::ONE_HUNDRED).round_dp(4),
            if action == SupplyAction::Expand { "expanding" } else { "contracting" },
        );
        if clamped {
            reason.push_str(&format!(" (clamped from {raw} to epoch limit)"));
        }

        SupplyAdjustment {
            epoch,
            action,
            amount,
            reason,
            target_price: self.config.target_price,
            current_price: price,
            deviation,
            previous_supply: total_supply,
            new_supply,
            status: AdjustmentStatus::Skipped,
            timestamp: now,
        }
    }

    /// A hold decision with `reason`.
    pub fn hold(
        &self,
        epoch: u64,
        total_supply: Decimal,
        price: Decimal,
        deviation: Decimal,
        reason: &str,
        now: TimestampMs,
    ) -> SupplyAdjustment {
        SupplyAdjustment {
            epoch,
            action: SupplyAction::None,
            amount: Decimal::ZERO,
            reason: reason.to_string(),
            target_price: self.config.target_price,
            current_price: price,
            deviation,
            previous_supply: total_supply,
            new_supply: total_supply,
            status: AdjustmentStatus::Skipped,
            timestamp: now,
        }
    }
}

impl Default for SupplyController {
    fn default() -> Self {
        Self::new(StabilityConfig::default())
    }
}
