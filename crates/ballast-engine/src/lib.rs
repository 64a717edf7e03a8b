//! # ballast-engine
//!
//! The stability engine: one epoch worker driving
//! `sample -> decide -> distribute -> commit -> audit`, and the
//! [`service::StabilityService`] façade the surrounding application calls.
//!
//! ## Modules
//!
//! - [`events`]: broadcast event bus for subscribers
//! - [`scheduler`]: timer loop for oracle sampling and epochs
//! - [`service`]: engine instance with injected ledger and audit collaborators
//! - [`status`]: status and metrics reports

pub mod events;
pub mod scheduler;
pub mod service;
pub mod status;

use ballast_db::DbError;
use ballast_oracle::OracleError;
use ballast_supply::SupplyError;
use ballast_types::ValidationError;

/// Error types for engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Rejected configuration or argument.
    #[error("configuration error: {0}")]
    Configuration(#[from] ValidationError),

    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("supply error: {0}")]
    Supply(#[from] SupplyError),

    #[error("store error: {0}")]
    Store(#[from] DbError),

    /// A manual rebalance arrived while another epoch held the lock. Retryable.
    #[error("rebalance already in progress")]
    RebalanceInProgress,

    #[error("engine already running")]
    AlreadyRunning,

    #[error("not found: {0}")]
    NotFound(String),

    /// A blocking store call panicked or was cancelled.
    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, EngineError>;

pub use service::{EngineConfig, StabilityService};
pub use status::{EngineMetrics, EngineStatus};
