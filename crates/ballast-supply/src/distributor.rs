//! Proportional redistribution of a supply adjustment.
//!
//! ```text
//! exact_i  = amount * balance_i / eligible_total
//! delta_i  = floor(exact_i) + (one unit for the largest remainders)
//! residual = signed_amount - sum(delta_i)                -> reserve account
//! ```
//!
//! Shares are floored to the ledger unit and the units left over are handed
//! out one each to the holders with the largest remainders, so holder deltas
//! never sum past the requested amount. Contraction deltas are capped at
//! `-balance`, so no balance can go negative. The reserve account never takes
//! a proportional share; it only absorbs what holders could not, which keeps
//! `sum(new) - sum(old)` equal to the requested amount. When a contraction
//! residual would overdraw the reserve, the reserve stops at zero and the
//! batch reports the smaller `applied` amount.

use ballast_types::ledger::{
    BalanceChange, HolderBalance, RebalanceBatch, StablecoinTransaction, TransactionKind,
    TransactionStatus,
};
use ballast_types::supply::{SupplyAction, SupplyAdjustment};
use ballast_types::{floor_to_ledger, LEDGER_DECIMALS, RESERVE_ACCOUNT};
use rust_decimal::prelude::*;

use crate::{Result, SupplyError};

/// Deterministic transaction id for `(epoch, account, kind)`.
pub fn transaction_id(epoch: u64, account_id: &str, kind: TransactionKind) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&epoch.to_le_bytes());
    hasher.update(account_id.as_bytes());
    hasher.update(kind.as_str().as_bytes());
    let hash = hasher.finalize();
    hex::encode(&hash.as_bytes()[..16])
}

/// Plans the atomic batch for one rebalance.
#[derive(Debug, Clone)]
pub struct LedgerDistributor {
    reserve_account: String,
}

impl LedgerDistributor {
    pub fn new() -> Self {
        Self::with_reserve(RESERVE_ACCOUNT)
    }

    pub fn with_reserve(reserve_account: &str) -> Self {
        Self {
            reserve_account: reserve_account.to_string(),
        }
    }

    pub fn reserve_account(&self) -> &str {
        &self.reserve_account
    }

    /// Spread `adjustment` over `snapshot` pro-rata.
    ///
    /// # Errors
    ///
    /// - [`SupplyError::NotActionable`] for a hold or zero-amount adjustment
    /// - [`SupplyError::NoEligibleHolders`] if no non-reserve balance is positive
    /// - [`SupplyError::Overflow`] on decimal overflow
    pub fn distribute(
        &self,
        adjustment: &SupplyAdjustment,
        snapshot: &[HolderBalance],
    ) -> Result<RebalanceBatch> {
        if !adjustment.is_actionable() {
            return Err(SupplyError::NotActionable);
        }

        let eligible: Vec<&HolderBalance> = snapshot
            .iter()
            .filter(|h| h.account_id != self.reserve_account && h.balance > Decimal::ZERO)
            .collect();
        let eligible_total: Decimal = eligible.iter().map(|h| h.balance).sum();
        if eligible.is_empty() || eligible_total.is_zero() {
            return Err(SupplyError::NoEligibleHolders);
        }

        let contracting = adjustment.action == SupplyAction::Contract;
        let requested = adjustment.signed_amount();
        let epoch = adjustment.epoch;

        let allocations = allocate(adjustment.amount, &eligible, eligible_total)?;

        let mut changes = Vec::with_capacity(eligible.len() + 1);
        let mut transactions = Vec::with_capacity(eligible.len() + 1);
        let mut distributed = Decimal::ZERO;

        for (holder, allocation) in eligible.iter().zip(allocations) {
            let delta = if contracting {
                -allocation.min(holder.balance)
            } else {
                allocation
            };
            if delta.is_zero() {
                continue;
            }

            let new_balance = holder.balance + delta;
            distributed += delta;
            changes.push(BalanceChange {
                account_id: holder.account_id.clone(),
                old_balance: holder.balance,
                new_balance,
            });
            transactions.push(self.record(adjustment, &holder.account_id, delta));
        }

        let reserve_old = snapshot
            .iter()
            .find(|h| h.account_id == self.reserve_account)
            .map(|h| h.balance)
            .unwrap_or(Decimal::ZERO);
        let mut residual = requested - distributed;
        let mut applied = requested;
        if reserve_old + residual < Decimal::ZERO {
            let shortfall = -(reserve_old + residual);
            tracing::warn!(
                epoch,
                %shortfall,
                "distributor: residual exceeds reserve; reserve floored at zero"
            );
            residual = -reserve_old;
            applied = distributed + residual;
        }

        if !residual.is_zero() {
            changes.push(BalanceChange {
                account_id: self.reserve_account.clone(),
                old_balance: reserve_old,
                new_balance: reserve_old + residual,
            });
            transactions.push(self.record(adjustment, &self.reserve_account, residual));
        }

        tracing::debug!(
            epoch,
            holders = changes.len(),
            %requested,
            %applied,
            %residual,
            "distributor: batch planned"
        );

        Ok(RebalanceBatch {
            epoch,
            changes,
            transactions,
            requested,
            applied,
            residual,
        })
    }

    fn record(
        &self,
        adjustment: &SupplyAdjustment,
        account_id: &str,
        amount: Decimal,
    ) -> StablecoinTransaction {
        StablecoinTransaction {
            id: transaction_id(adjustment.epoch, account_id, TransactionKind::Rebalance),
            account_id: account_id.to_string(),
            kind: TransactionKind::Rebalance,
            amount,
            price_at_time: adjustment.current_price,
            status: TransactionStatus::Completed,
            epoch: adjustment.epoch,
            created_at: adjustment.timestamp,
        }
    }
}

/// Floor each pro-rata share to the ledger unit, then hand the leftover
/// units to the largest remainders. Ties go to the earlier holder.
fn allocate(
    amount: Decimal,
    eligible: &[&HolderBalance],
    eligible_total: Decimal,
) -> Result<Vec<Decimal>> {
    let unit = Decimal::new(1, LEDGER_DECIMALS);
    let mut floored = Vec::with_capacity(eligible.len());
    let mut remainders = Vec::with_capacity(eligible.len());
    for holder in eligible {
        let exact = amount
            .checked_mul(holder.balance)
            .and_then(|v| v.checked_div(eligible_total))
            .ok_or(SupplyError::Overflow)?;
        let share = floor_to_ledger(exact);
        remainders.push(exact - share);
        floored.push(share);
    }

    let allocated: Decimal = floored.iter().sum();
    let leftover_units = ((amount - allocated) / unit)
        .floor()
        .to_usize()
        .unwrap_or(0)
        .min(eligible.len());

    let mut order: Vec<usize> = (0..eligible.len()).collect();
    order.sort_by(|a, b| remainders[*b].cmp(&remainders[*a]));
    for index in order.into_iter().take(leftover_units) {
        floored[index] += unit;
    }
    Ok(floored)
}

impl Default for LedgerDistributor {
    fn default() -> Self {
        Self::new()
    }
}
