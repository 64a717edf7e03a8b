//! Storage collaborator traits and the SQLite implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use ballast_types::config::StabilityConfig;
use ballast_types::ledger::{HolderBalance, RebalanceBatch, StablecoinTransaction};
use ballast_types::metrics::StabilityMetricsSnapshot;
use ballast_types::supply::SupplyAdjustment;
use ballast_types::TimestampMs;
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::queries::{adjustments, balances, metrics, settings, transactions};
use crate::{DbError, Result};

/// Holder balances and the per-holder transaction log.
pub trait LedgerStore: Send + Sync {
    /// Every holder, including the reserve account, ordered by account id.
    fn load_balances(&self) -> Result<Vec<HolderBalance>>;

    /// One holder's balance, if the account exists.
    fn balance(&self, account_id: &str) -> Result<Option<HolderBalance>>;

    /// Create or overwrite a balance outside of a rebalance (genesis seeding).
    fn set_balance(&self, account_id: &str, balance: Decimal, now: TimestampMs) -> Result<()>;

    /// Apply every balance change and transaction record of `batch` atomically.
    ///
    /// Each change's `old_balance` must match the stored balance, and the
    /// ledger total must move by exactly `batch.applied`; otherwise the whole
    /// batch is rejected with [`DbError::Constraint`].
    fn commit_rebalance(&self, batch: &RebalanceBatch, now: TimestampMs) -> Result<()>;

    /// Transactions for one account, newest first.
    fn transactions_for(&self, account_id: &str, limit: u32) -> Result<Vec<StablecoinTransaction>>;

    /// Sum of every balance.
    fn total_supply(&self) -> Result<Decimal> {
        Ok(self.load_balances()?.iter().map(|h| h.balance).sum())
    }
}

/// Append-only audit trail plus the small amount of engine state that
/// survives restarts.
pub trait AuditSink: Send + Sync {
    /// Record an epoch's adjustment and snapshot together and advance `last_epoch`.
    fn record_epoch(
        &self,
        adjustment: &SupplyAdjustment,
        snapshot: &StabilityMetricsSnapshot,
    ) -> Result<()>;

    /// Most recent adjustments, newest first.
    fn supply_history(&self, limit: u32) -> Result<Vec<SupplyAdjustment>>;

    /// Most recent metrics snapshot.
    fn latest_metrics(&self) -> Result<Option<StabilityMetricsSnapshot>>;

    /// Last recorded epoch number (0 when nothing has run).
    fn last_epoch(&self) -> Result<u64>;

    fn save_config(&self, config: &StabilityConfig) -> Result<()>;

    fn load_config(&self) -> Result<Option<StabilityConfig>>;
}

/// SQLite-backed store. One connection guarded by a mutex; every multi-row
/// write runs inside a single SQL transaction.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (and migrate) the database file at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::from_connection(crate::open(path)?))
    }

    /// In-memory database, mostly for tests.
    pub fn open_memory() -> Result<Self> {
        Ok(Self::from_connection(crate::open_memory()?))
    }

    /// Wrap an already configured and migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::LockPoisoned)
    }
}

impl LedgerStore for SqliteStore {
    fn load_balances(&self) -> Result<Vec<HolderBalance>> {
        balances::list(&*self.conn()?)
    }

    fn balance(&self, account_id: &str) -> Result<Option<HolderBalance>> {
        balances::get(&*self.conn()?, account_id)
    }

    fn set_balance(&self, account_id: &str, balance: Decimal, now: TimestampMs) -> Result<()> {
        balances::upsert(&*self.conn()?, account_id, balance, now)
    }

    fn commit_rebalance(&self, batch: &RebalanceBatch, now: TimestampMs) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let total_before = balances::total(&tx)?;

        for change in &batch.changes {
            let stored = balances::get(&tx, &change.account_id)?
                .map(|h| h.balance)
                .unwrap_or(Decimal::ZERO);
            if stored != change.old_balance {
                return Err(DbError::Constraint(format!(
                    "balance of '{}' changed during rebalance: expected {}, found {stored}",
                    change.account_id, change.old_balance
                )));
            }
            balances::upsert(&tx, &change.account_id, change.new_balance, now)?;
        }
        for record in &batch.transactions {
            transactions::insert(&tx, record)?;
        }

        let moved = balances::total(&tx)? - total_before;
        if moved != batch.applied {
            return Err(DbError::Constraint(format!(
                "epoch {} moved supply by {moved}, batch applies {}",
                batch.epoch, batch.applied
            )));
        }

        tx.commit()?;
        tracing::debug!(
            epoch = batch.epoch,
            changes = batch.changes.len(),
            "rebalance batch committed"
        );
        Ok(())
    }

    fn transactions_for(&self, account_id: &str, limit: u32) -> Result<Vec<StablecoinTransaction>> {
        transactions::for_account(&*self.conn()?, account_id, limit)
    }

    fn total_supply(&self) -> Result<Decimal> {
        balances::total(&*self.conn()?)
    }
}

impl AuditSink for SqliteStore {
    fn record_epoch(
        &self,
        adjustment: &SupplyAdjustment,
        snapshot: &StabilityMetricsSnapshot,
    ) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        adjustments::insert(&tx, adjustment)?;
        metrics::insert(&tx, snapshot)?;
        settings::set(&tx, settings::LAST_EPOCH, &adjustment.epoch.to_string())?;
        tx.commit()?;
        Ok(())
    }

    fn supply_history(&self, limit: u32) -> Result<Vec<SupplyAdjustment>> {
        adjustments::recent(&*self.conn()?, limit)
    }

    fn latest_metrics(&self) -> Result<Option<StabilityMetricsSnapshot>> {
        metrics::latest(&*self.conn()?)
    }

    fn last_epoch(&self) -> Result<u64> {
        settings::get_u64(&*self.conn()?, settings::LAST_EPOCH, 0)
    }

    fn save_config(&self, config: &StabilityConfig) -> Result<()> {
        settings::set_json(&*self.conn()?, settings::STABILITY_CONFIG, config)
    }

    fn load_config(&self) -> Result<Option<StabilityConfig>> {
        settings::get_json(&*self.conn()?, settings::STABILITY_CONFIG)
    }
}
