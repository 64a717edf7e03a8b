//! Stability controller configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Controller configuration read at every epoch boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StabilityConfig {
    /// Peg the controller tries to hold.
    #[serde(default = "default_target_price")]
    pub target_price: Decimal,
    /// Allowed fractional deviation before any supply action.
    #[serde(default = "default_tolerance_band")]
    pub tolerance_band: Decimal,
    /// Upper bound of one adjustment as a fraction of total supply.
    #[serde(default = "default_max_supply_change")]
    pub max_supply_change_per_epoch: Decimal,
    /// Epoch period of the scheduler.
    #[serde(default = "default_rebalance_interval_ms")]
    pub rebalance_interval_ms: u64,
    /// Multiplier applied to the deviation when sizing a correction.
    #[serde(default = "default_correction_gain")]
    pub correction_gain: Decimal,
}

/// Partial configuration update; `None` fields keep their current value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigUpdate {
    /// New peg; must be positive.
    pub target_price: Option<Decimal>,
    /// New band, strictly between 0 and 1.
    pub tolerance_band: Option<Decimal>,
    /// New per-epoch cap, in `(0, 1]`.
    pub max_supply_change_per_epoch: Option<Decimal>,
    /// New epoch period; must be non-zero.
    pub rebalance_interval_ms: Option<u64>,
    /// New correction multiplier; must be positive.
    pub correction_gain: Option<Decimal>,
}

fn default_target_price() -> Decimal {
    Decimal::ONE
}

fn default_tolerance_band() -> Decimal {
    // 2%
    Decimal::new(2, 2)
}

fn default_max_supply_change() -> Decimal {
    // 5%
    Decimal::new(5, 2)
}

fn default_rebalance_interval_ms() -> u64 {
    5 * 60 * 1000
}

fn default_correction_gain() -> Decimal {
    Decimal::new(15, 1)
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            target_price: default_target_price(),
            tolerance_band: default_tolerance_band(),
            max_supply_change_per_epoch: default_max_supply_change(),
            rebalance_interval_ms: default_rebalance_interval_ms(),
            correction_gain: default_correction_gain(),
        }
    }
}

impl StabilityConfig {
    /// Check every field against its allowed range.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::NonPositivePrice`] if `target_price <= 0`
    /// - [`ValidationError::OutOfRange`] for any other field out of range
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.target_price <= Decimal::ZERO {
            return Err(ValidationError::NonPositivePrice(self.target_price));
        }
        if self.tolerance_band <= Decimal::ZERO || self.tolerance_band >= Decimal::ONE {
            return Err(ValidationError::OutOfRange {
                field: "tolerance_band",
                reason: format!("must be in (0, 1), got {}", self.tolerance_band),
            });
        }
        if self.max_supply_change_per_epoch <= Decimal::ZERO
            || self.max_supply_change_per_epoch > Decimal::ONE
        {
            return Err(ValidationError::OutOfRange {
                field: "max_supply_change_per_epoch",
                reason: format!(
                    "must be in (0, 1], got {}",
                    self.max_supply_change_per_epoch
                ),
            });
        }
        if self.rebalance_interval_ms == 0 {
            return Err(ValidationError::OutOfRange {
                field: "rebalance_interval_ms",
                reason: "must be non-zero".to_string(),
            });
        }
        if self.correction_gain <= Decimal::ZERO {
            return Err(ValidationError::OutOfRange {
                field: "correction_gain",
                reason: format!("must be positive, got {}", self.correction_gain),
            });
        }
        Ok(())
    }

    /// Merge a partial update over this config and validate the result.
    pub fn merged(&self, update: &ConfigUpdate) -> Result<Self, ValidationError> {
        let merged = Self {
            target_price: update.target_price.unwrap_or(self.target_price),
            tolerance_band: update.tolerance_band.unwrap_or(self.tolerance_band),
            max_supply_change_per_epoch: update
                .max_supply_change_per_epoch
                .unwrap_or(self.max_supply_change_per_epoch),
            rebalance_interval_ms: update
                .rebalance_interval_ms
                .unwrap_or(self.rebalance_interval_ms),
            correction_gain: update.correction_gain.unwrap_or(self.correction_gain),
        };
        merged.validate()?;
        Ok(merged)
    }
}
