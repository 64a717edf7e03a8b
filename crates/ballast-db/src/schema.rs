//! SQL schema definitions.

/// Complete schema for the v1 database.
pub const SCHEMA_V1: &str = r#"
-- ============================================================
-- Ledger
-- ============================================================

CREATE TABLE IF NOT EXISTS holder_balances (
    account_id TEXT PRIMARY KEY,
    balance TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS stablecoin_transactions (
    id TEXT PRIMARY KEY,
    account_id TEXT NOT NULL REFERENCES holder_balances(account_id),
    kind TEXT NOT NULL,
    amount TEXT NOT NULL,
    price_at_time TEXT NOT NULL,
    status TEXT NOT NULL,
    epoch INTEGER NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_transactions_account
    ON stablecoin_transactions(account_id, created_at);

-- ============================================================
-- Audit trail
-- ============================================================

CREATE TABLE IF NOT EXISTS supply_adjustments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    epoch INTEGER NOT NULL,
    action TEXT NOT NULL,
    amount TEXT NOT NULL,
    reason TEXT NOT NULL,
    target_price TEXT NOT NULL,
    current_price TEXT NOT NULL,
    deviation TEXT NOT NULL,
    previous_supply TEXT NOT NULL,
    new_supply TEXT NOT NULL,
    status TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_adjustments_epoch ON supply_adjustments(epoch);

CREATE TABLE IF NOT EXISTS metrics_snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    epoch INTEGER NOT NULL,
    timestamp INTEGER NOT NULL,
    total_supply TEXT NOT NULL,
    reserve_pool TEXT NOT NULL,
    current_price TEXT NOT NULL,
    target_price TEXT NOT NULL,
    deviation TEXT NOT NULL,
    volatility TEXT NOT NULL,
    confidence TEXT NOT NULL,
    stability_score TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_metrics_epoch ON metrics_snapshots(epoch);

-- ============================================================
-- Settings
-- ============================================================

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;
