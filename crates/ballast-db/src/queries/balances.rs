//! Holder balance queries.

use ballast_types::ledger::HolderBalance;
use rusqlite::{Connection, OptionalExtension};
use rust_decimal::Decimal;

use crate::{decimal_at, DbError, Result};

/// Get one holder's balance.
pub fn get(conn: &Connection, account_id: &str) -> Result<Option<HolderBalance>> {
    let row = conn
        .query_row(
            "SELECT account_id, balance FROM holder_balances WHERE account_id = ?1",
            [account_id],
            |row| {
                Ok(HolderBalance {
                    account_id: row.get(0)?,
                    balance: decimal_at(row, 1)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

/// List every holder, ordered by account id.
pub fn list(conn: &Connection) -> Result<Vec<HolderBalance>> {
    let mut stmt =
        conn.prepare("SELECT account_id, balance FROM holder_balances ORDER BY account_id")?;

    let rows = stmt
        .query_map([], |row| {
            Ok(HolderBalance {
                account_id: row.get(0)?,
                balance: decimal_at(row, 1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Insert or overwrite a holder's balance.
pub fn upsert(conn: &Connection, account_id: &str, balance: Decimal, updated_at: u64) -> Result<()> {
    if balance < Decimal::ZERO {
        return Err(DbError::Constraint(format!(
            "negative balance {balance} for '{account_id}'"
        )));
    }
    conn.execute(
        "INSERT INTO holder_balances (account_id, balance, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(account_id) DO UPDATE SET balance = excluded.balance, updated_at = excluded.updated_at",
        rusqlite::params![account_id, balance.to_string(), updated_at as i64],
    )?;
    Ok(())
}

/// Sum of every balance. Computed in Rust since balances are stored as TEXT.
pub fn total(conn: &Connection) -> Result<Decimal> {
    Ok(list(conn)?.iter().map(|h| h.balance).sum())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    #[test]
    fn test_missing_holder() {
        let conn = test_db();
        assert_eq!(get(&conn, "nobody").expect("get"), None);
    }

    #[test]
    fn test_upsert_and_total() {
        let conn = test_db();
        upsert(&conn, "alice", Decimal::new(1_500_000, 6), 1).expect("insert");
        upsert(&conn, "bob", Decimal::from(2), 1).expect("insert");
        assert_eq!(total(&conn).expect("total"), Decimal::new(3_500_000, 6));

        upsert(&conn, "alice", Decimal::from(10), 2).expect("update");
        let alice = get(&conn, "alice").expect("get").expect("present");
        assert_eq!(alice.balance, Decimal::from(10));
        assert_eq!(list(&conn).expect("list").len(), 2);
    }

    #[test]
    fn test_negative_balance_rejected() {
        let conn = test_db();
        let err = upsert(&conn, "alice", Decimal::NEGATIVE_ONE, 1).expect_err("negative");
        assert!(matches!(err, DbError::Constraint(_)));
    }

    #[test]
    fn test_list_ordered() {
        let conn = test_db();
        upsert(&conn, "zed", Decimal::ONE, 1).expect("insert");
        upsert(&conn, "amy", Decimal::ONE, 1).expect("insert");
        let ids: Vec<String> = list(&conn).expect("list").into_iter().map(|h| h.account_id).collect();
        assert_eq!(ids, vec!["amy".to_string(), "zed".to_string()]);
    }
}
