//! Database query functions organized by table.

pub mod adjustments;
pub mod balances;
pub mod metrics;
pub mod settings;
pub mod transactions;
