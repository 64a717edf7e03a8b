//! # ballast-supply
//!
//! Elastic supply control.
//!
//! The controller turns the oracle's view of the market into a bounded
//! supply adjustment each epoch; the distributor turns that adjustment into
//! a [`RebalanceBatch`](ballast_types::ledger::RebalanceBatch) spreading it
//! pro-rata over every holder, with rounding dust routed to the reserve.
//!
//! ## Modules
//!
//! - [`controller`]: expand / contract / hold decisions
//! - [`distributor`]: proportional redistribution planning

pub mod controller;
pub mod distributor;

/// Error types for supply operations.
#[derive(Debug, thiserror::Error)]
pub enum SupplyError {
    /// The adjustment carries no ledger mutation.
    #[error("adjustment is not actionable (action none or zero amount)")]
    NotActionable,

    /// No holder with a positive balance to distribute over.
    #[error("no eligible holders for distribution")]
    NoEligibleHolders,

    /// Decimal arithmetic overflowed.
    #[error("arithmetic overflow")]
    Overflow,
}

/// Convenience result type for supply operations.
pub type Result<T> = std::result::Result<T, SupplyError>;
