//! Status and metrics reports returned by the service.

use ballast_types::config::StabilityConfig;
use ballast_types::metrics::{StabilityMetricsSnapshot, SupplyInfo};
use ballast_types::price::{OracleHealth, PriceStats};
use ballast_types::TimestampMs;
use serde::{Deserialize, Serialize};

/// Engine status.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub running: bool,
    /// Last completed epoch.
    pub epoch: u64,
    /// Configuration the controller is using now.
    pub config: StabilityConfig,
    /// Update staged for the next epoch boundary.
    pub pending_config: Option<StabilityConfig>,
    pub oracle_health: OracleHealth,
    pub last_rebalance_at: Option<TimestampMs>,
    /// Set when the last epoch ran on an unhealthy oracle or failed to commit.
    pub degraded: bool,
    pub last_error: Option<String>,
}

/// Metrics report.
///
/// `stability` is the last known-good snapshot; its timestamp makes staleness
/// visible after a failed epoch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineMetrics {
    pub stability: Option<StabilityMetricsSnapshot>,
    pub supply: SupplyInfo,
    pub price: Option<PriceStats>,
    pub oracle: OracleHealth,
}
