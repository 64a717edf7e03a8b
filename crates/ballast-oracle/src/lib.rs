//! # ballast-oracle
//!
//! Price observation and aggregation for the stability engine.
//!
//! Samplers produce timestamped, confidence-weighted observations. The
//! aggregator keeps a bounded ring of them and derives rolling statistics
//! and a health verdict that the supply controller checks before acting.
//!
//! ## Modules
//!
//! - [`aggregator`]: bounded observation ring, window stats, health
//! - [`confidence`]: per-sample confidence scoring
//! - [`sampler`]: the [`sampler::PriceSampler`] trait plus simulated and static feeds
//! - [`stats`]: TWAP and volatility helpers

pub mod aggregator;
pub mod confidence;
pub mod sampler;
pub mod stats;

use rust_decimal::Decimal;

/// Error types for oracle operations.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// Price is zero or negative.
    #[error("invalid price: {0}")]
    InvalidPrice(Decimal),

    /// Insufficient observations for TWAP computation.
    #[error("insufficient observations: need {required}, have {available}")]
    InsufficientObservations {
        /// Number of observations required.
        required: usize,
        /// Number of observations available.
        available: usize,
    },

    /// Observation timestamp is not monotonically increasing.
    #[error("non-monotonic timestamp: {new} <= {last}")]
    NonMonotonicTimestamp {
        /// The new timestamp that violated monotonicity.
        new: u64,
        /// The last accepted timestamp.
        last: u64,
    },

    /// The TWAP window has zero duration.
    #[error("no observations in TWAP window")]
    EmptyWindow,

    /// Shock severity outside `[0, 1]`.
    #[error("invalid shock severity: {0}")]
    InvalidSeverity(Decimal),

    /// The underlying price source failed.
    #[error("sampler error: {0}")]
    Sampler(String),
}

impl From<ballast_types::ValidationError> for OracleError {
    fn from(err: ballast_types::ValidationError) -> Self {
        match err {
            ballast_types::ValidationError::NonPositivePrice(p) => Self::InvalidPrice(p),
            other => Self::Sampler(other.to_string()),
        }
    }
}

/// Convenience result type for oracle operations.
pub type Result<T> = std::result::Result<T, OracleError>;
