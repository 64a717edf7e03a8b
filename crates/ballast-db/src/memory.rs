//! In-memory store for embedding and tests.
//!
//! Every write takes the single writer lock once, validates the whole batch
//! (stale balances, negative balances, duplicate ids, supply moved versus
//! `applied`), then applies it, so readers never observe a half-applied
//! rebalance.

use std::collections::{BTreeMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use ballast_types::config::StabilityConfig;
use ballast_types::ledger::{HolderBalance, RebalanceBatch, StablecoinTransaction};
use ballast_types::metrics::StabilityMetricsSnapshot;
use ballast_types::supply::SupplyAdjustment;
use ballast_types::TimestampMs;
use rust_decimal::Decimal;

use crate::store::{AuditSink, LedgerStore};
use crate::{DbError, Result};

#[derive(Default)]
struct State {
    balances: BTreeMap<String, Decimal>,
    transactions: Vec<StablecoinTransaction>,
    transaction_ids: HashSet<String>,
    adjustments: Vec<SupplyAdjustment>,
    metrics: Vec<StabilityMetricsSnapshot>,
    last_epoch: u64,
    config: Option<StabilityConfig>,
}

/// Volatile [`LedgerStore`] + [`AuditSink`].
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with the given balances.
    pub fn with_balances<I, S>(balances: I) -> Self
    where
        I: IntoIterator<Item = (S, Decimal)>,
        S: Into<String>,
    {
        let state = State {
            balances: balances.into_iter().map(|(id, b)| (id.into(), b)).collect(),
            ..State::default()
        };
        Self {
            state: RwLock::new(state),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state.read().map_err(|_| DbError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state.write().map_err(|_| DbError::LockPoisoned)
    }
}

impl LedgerStore for MemoryStore {
    fn load_balances(&self) -> Result<Vec<HolderBalance>> {
        Ok(self
            .read()?
            .balances
            .iter()
            .map(|(id, balance)| HolderBalance {
                account_id: id.clone(),
                balance: *balance,
            })
            .collect())
    }

    fn balance(&self, account_id: &str) -> Result<Option<HolderBalance>> {
        Ok(self.read()?.balances.get(account_id).map(|balance| HolderBalance {
            account_id: account_id.to_string(),
            balance: *balance,
        }))
    }

    fn set_balance(&self, account_id: &str, balance: Decimal, _now: TimestampMs) -> Result<()> {
        if balance < Decimal::ZERO {
            return Err(DbError::Constraint(format!(
                "negative balance {balance} for '{account_id}'"
            )));
        }
        self.write()?.balances.insert(account_id.to_string(), balance);
        Ok(())
    }

    fn commit_rebalance(&self, batch: &RebalanceBatch, _now: TimestampMs) -> Result<()> {
        let mut state = self.write()?;

        for change in &batch.changes {
            let stored = state
                .balances
                .get(&change.account_id)
                .copied()
                .unwrap_or(Decimal::ZERO);
            if stored != change.old_balance {
                return Err(DbError::Constraint(format!(
                    "balance of '{}' changed during rebalance: expected {}, found {stored}",
                    change.account_id, change.old_balance
                )));
            }
            if change.new_balance < Decimal::ZERO {
                return Err(DbError::Constraint(format!(
                    "negative balance {} for '{}'",
                    change.new_balance, change.account_id
                )));
            }
        }
        let moved: Decimal = batch
            .changes
            .iter()
            .map(|c| c.new_balance - c.old_balance)
            .sum();
        if moved != batch.applied {
            return Err(DbError::Constraint(format!(
                "epoch {} moves supply by {moved}, batch applies {}",
                batch.epoch, batch.applied
            )));
        }
        let mut batch_ids = HashSet::new();
        for record in &batch.transactions {
            if state.transaction_ids.contains(&record.id) || !batch_ids.insert(record.id.as_str()) {
                return Err(DbError::Constraint(format!(
                    "duplicate transaction id {}",
                    record.id
                )));
            }
        }

        for change in &batch.changes {
            state
                .balances
                .insert(change.account_id.clone(), change.new_balance);
        }
        for record in &batch.transactions {
            state.transaction_ids.insert(record.id.clone());
            state.transactions.push(record.clone());
        }
        Ok(())
    }

    fn transactions_for(&self, account_id: &str, limit: u32) -> Result<Vec<StablecoinTransaction>> {
        Ok(self
            .read()?
            .transactions
            .iter()
            .rev()
            .filter(|tx| tx.account_id == account_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

impl AuditSink for MemoryStore {
    fn record_epoch(
        &self,
        adjustment: &SupplyAdjustment,
        snapshot: &StabilityMetricsSnapshot,
    ) -> Result<()> {
        let mut state = self.write()?;
        state.adjustments.push(adjustment.clone());
        state.metrics.push(snapshot.clone());
        state.last_epoch = adjustment.epoch;
        Ok(())
    }

    fn supply_history(&self, limit: u32) -> Result<Vec<SupplyAdjustment>> {
        Ok(self
            .read()?
            .adjustments
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    fn latest_metrics(&self) -> Result<Option<StabilityMetricsSnapshot>> {
        Ok(self.read()?.metrics.last().cloned())
    }

    fn last_epoch(&self) -> Result<u64> {
        Ok(self.read()?.last_epoch)
    }

    fn save_config(&self, config: &StabilityConfig) -> Result<()> {
        self.write()?.config = Some(config.clone());
        Ok(())
    }

    fn load_config(&self) -> Result<Option<StabilityConfig>> {
        Ok(self.read()?.config.clone())
    }
}
