//! Per-epoch metrics snapshots.

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

use crate::TimestampMs;

/// Point-in-time record written once per epoch. Never mutated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StabilityMetricsSnapshot {
    pub epoch: u64,
    pub timestamp: TimestampMs,
    pub total_supply: Decimal,
    pub reserve_pool: Decimal,
    pub current_price: Decimal,
    pub target_price: Decimal,
    pub deviation: Decimal,
    pub volatility: Decimal,
    pub confidence: Decimal,
    pub stability_score: Decimal,
}

/// Supply figures tracked by the engine.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SupplyInfo {
    /// Sum of every ledger balance, reserve included.
    pub total_supply: Decimal,
    pub reserve_pool: Decimal,
    pub holders: usize,
}

/// Score in `[0, 100]`: 100 at the peg with no volatility, scaled by confidence.
///
/// `score = clamp(100 - 1000*|deviation| - 500*volatility, 0, 100) * confidence`
pub fn stability_score(deviation: Decimal, volatility: Decimal, confidence: Decimal) -> Decimal {
    let raw = Decimal::ONE_HUNDRED
        - Decimal::ONE_THOUSAND * deviation.abs()
        - Decimal::from(500) * volatility.abs();
    let clamped = raw.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);
    (clamped * confidence.clamp(Decimal::ZERO, Decimal::ONE)).round_dp(2)
}
