//! Engine event types pushed to subscribers.

use serde::{Deserialize, Serialize};

use crate::TimestampMs;

/// Envelope for all engine events.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    pub event_type: EventType,
    pub timestamp: TimestampMs,
    pub payload: serde_json::Value,
}

/// All engine event types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    // Lifecycle
    EngineStarted,
    EngineStopped,

    // Epoch outcomes
    RebalanceApplied,
    RebalanceSkipped,
    RebalanceFailed,

    // Oracle
    PriceOverridden,
    MarketShock,
    OracleDegraded,

    // Operations
    ConfigUpdated,
}

impl EventType {
    /// Coarse category used for subscription filtering.
    pub fn category(&self) -> &'static str {
        match self {
            Self::EngineStarted | Self::EngineStopped | Self::ConfigUpdated => "system",
            Self::RebalanceApplied | Self::RebalanceSkipped | Self::RebalanceFailed => "supply",
            Self::PriceOverridden | Self::MarketShock | Self::OracleDegraded => "oracle",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(EventType::EngineStarted.category(), "system");
        assert_eq!(EventType::RebalanceFailed.category(), "supply");
        assert_eq!(EventType::MarketShock.category(), "oracle");
    }

    #[test]
    fn test_event_type_serializes_snake_case() {
        let json = serde_json::to_string(&EventType::RebalanceApplied).expect("serialize");
        assert_eq!(json, "\"rebalance_applied\"");
    }
}
