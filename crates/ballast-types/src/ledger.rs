//! Holder balances, per-holder transaction records and rebalance batches.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, TimestampMs};

/// A holder's balance as stored in the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderBalance {
    pub account_id: AccountId,
    pub balance: Decimal,
}

/// Kind of ledger movement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Rebalance,
    Mint,
    Burn,
    Transfer,
}

/// Settlement status of a transaction record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

/// Append-only record of one balance movement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StablecoinTransaction {
    pub id: String,
    pub account_id: AccountId,
    pub kind: TransactionKind,
    /// Signed amount: positive credits, negative debits.
    pub amount: Decimal,
    pub price_at_time: Decimal,
    pub status: TransactionStatus,
    pub epoch: u64,
    pub created_at: TimestampMs,
}

/// Planned balance change for one account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceChange {
    pub account_id: AccountId,
    pub old_balance: Decimal,
    pub new_balance: Decimal,
}

/// Every balance write and transaction record of one rebalance.
///
/// Committed as a single unit: either all changes become visible or none do.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RebalanceBatch {
    pub epoch: u64,
    pub changes: Vec<BalanceChange>,
    pub transactions: Vec<StablecoinTransaction>,
    /// Signed adjustment the controller asked for.
    pub requested: Decimal,
    /// Signed change in total supply once the batch commits.
    pub applied: Decimal,
    /// Signed amount routed to the reserve account.
    pub residual: Decimal,
}

impl RebalanceBatch {
    /// Net change in balances described by `changes`.
    pub fn net_change(&self) -> Decimal {
        self.changes
            .iter()
            .map(|c| c.new_balance - c.old_balance)
            .sum()
    }
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rebalance => "rebalance",
            Self::Mint => "mint",
            Self::Burn => "burn",
            Self::Transfer => "transfer",
        }
    }
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rebalance" => Ok(Self::Rebalance),
            "mint" => Ok(Self::Mint),
            "burn" => Ok(Self::Burn),
            "transfer" => Ok(Self::Transfer),
            other => Err(format!("unknown transaction kind '{other}'")),
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown transaction status '{other}'")),
        }
    }
}
