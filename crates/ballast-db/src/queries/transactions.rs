//! Append-only transaction record queries.

use ballast_types::ledger::StablecoinTransaction;
use rusqlite::Connection;

use crate::{decimal_at, parsed_at, Result};

/// Append a transaction record.
pub fn insert(conn: &Connection, tx: &StablecoinTransaction) -> Result<()> {
    conn.execute(
        "INSERT INTO stablecoin_transactions
             (id, account_id, kind, amount, price_at_time, status, epoch, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            tx.id,
            tx.account_id,
            tx.kind.as_str(),
            tx.amount.to_string(),
            tx.price_at_time.to_string(),
            tx.status.as_str(),
            tx.epoch as i64,
            tx.created_at as i64,
        ],
    )?;
    Ok(())
}

/// Most recent transactions for one account, newest first.
pub fn for_account(conn: &Connection, account_id: &str, limit: u32) -> Result<Vec<StablecoinTransaction>> {
    let mut stmt = conn.prepare(
        "SELECT id, account_id, kind, amount, price_at_time, status, epoch, created_at
         FROM stablecoin_transactions WHERE account_id = ?1
         ORDER BY created_at DESC, epoch DESC LIMIT ?2",
    )?;

    let rows = stmt
        .query_map(rusqlite::params![account_id, limit], |row| {
            Ok(StablecoinTransaction {
                id: row.get(0)?,
                account_id: row.get(1)?,
                kind: parsed_at(row, 2)?,
                amount: decimal_at(row, 3)?,
                price_at_time: decimal_at(row, 4)?,
                status: parsed_at(row, 5)?,
                epoch: row.get::<_, i64>(6)? as u64,
                created_at: row.get::<_, i64>(7)? as u64,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}
