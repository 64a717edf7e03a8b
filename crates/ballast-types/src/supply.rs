//! Supply adjustment decisions.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::TimestampMs;

/// Direction of a supply adjustment.
///
/// Price above target expands supply; price below target contracts it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupplyAction {
    Expand,
    Contract,
    None,
}

/// Outcome of an epoch's adjustment in the audit trail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentStatus {
    /// The ledger batch committed.
    Applied,
    /// No action was needed or allowed.
    Skipped,
    /// The ledger batch failed and was rolled back.
    Failed,
}

/// One epoch's supply decision and its effect.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SupplyAdjustment {
    pub epoch: u64,
    pub action: SupplyAction,
    /// Unsigned magnitude, rounded to the ledger unit. Zero when `action` is `None`.
    pub amount: Decimal,
    pub reason: String,
    pub target_price: Decimal,
    pub current_price: Decimal,
    pub deviation: Decimal,
    pub previous_supply: Decimal,
    pub new_supply: Decimal,
    pub status: AdjustmentStatus,
    pub timestamp: TimestampMs,
}

impl SupplyAdjustment {
    /// Amount with the sign of its effect on total supply.
    pub fn signed_amount(&self) -> Decimal {
        match self.action {
            SupplyAction::Expand => self.amount,
            SupplyAction::Contract => -self.amount,
            SupplyAction::None => Decimal::ZERO,
        }
    }

    /// Whether this adjustment requires a ledger mutation.
    pub fn is_actionable(&self) -> bool {
        self.action != SupplyAction::None && !self.amount.is_zero()
    }
}

impl SupplyAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expand => "expand",
            Self::Contract => "contract",
            Self::None => "none",
        }
    }
}

impl AdjustmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SupplyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for AdjustmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SupplyAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "expand" => Ok(Self::Expand),
            "contract" => Ok(Self::Contract),
            "none" => Ok(Self::None),
            other => Err(format!("unknown supply action '{other}'")),
        }
    }
}

impl FromStr for AdjustmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "applied" => Ok(Self::Applied),
            "skipped" => Ok(Self::Skipped),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown adjustment status '{other}'")),
        }
    }
}
