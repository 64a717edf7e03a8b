//! Metrics snapshot queries.

use ballast_types::metrics::StabilityMetricsSnapshot;
use rusqlite::{Connection, OptionalExtension};

use crate::{decimal_at, Result};

const COLUMNS: &str = "epoch, timestamp, total_supply, reserve_pool, current_price, target_price,
                       deviation, volatility, confidence, stability_score";

/// Append a snapshot.
pub fn insert(conn: &Connection, snap: &StabilityMetricsSnapshot) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO metrics_snapshots ({COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
        ),
        rusqlite::params![
            snap.epoch as i64,
            snap.timestamp as i64,
            snap.total_supply.to_string(),
            snap.reserve_pool.to_string(),
            snap.current_price.to_string(),
            snap.target_price.to_string(),
            snap.deviation.to_string(),
            snap.volatility.to_string(),
            snap.confidence.to_string(),
            snap.stability_score.to_string(),
        ],
    )?;
    Ok(())
}

fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StabilityMetricsSnapshot> {
    Ok(StabilityMetricsSnapshot {
        epoch: row.get::<_, i64>(0)? as u64,
        timestamp: row.get::<_, i64>(1)? as u64,
        total_supply: decimal_at(row, 2)?,
        reserve_pool: decimal_at(row, 3)?,
        current_price: decimal_at(row, 4)?,
        target_price: decimal_at(row, 5)?,
        deviation: decimal_at(row, 6)?,
        volatility: decimal_at(row, 7)?,
        confidence: decimal_at(row, 8)?,
        stability_score: decimal_at(row, 9)?,
    })
}

/// The most recent snapshot, if any.
pub fn latest(conn: &Connection) -> Result<Option<StabilityMetricsSnapshot>> {
    let snap = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM metrics_snapshots ORDER BY id DESC LIMIT 1"),
            [],
            from_row,
        )
        .optional()?;
    Ok(snap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn snapshot(epoch: u64) -> StabilityMetricsSnapshot {
        StabilityMetricsSnapshot {
            epoch,
            timestamp: 5_000 + epoch,
            total_supply: Decimal::from(1_000_000),
            reserve_pool: Decimal::new(3, 6),
            current_price: Decimal::new(101, 2),
            target_price: Decimal::ONE,
            deviation: Decimal::new(1, 2),
            volatility: Decimal::new(12, 4),
            confidence: Decimal::new(95, 2),
            stability_score: Decimal::new(8_455, 2),
        }
    }

    #[test]
    fn test_latest_empty() {
        let conn = crate::open_memory().expect("open");
        assert_eq!(latest(&conn).expect("latest"), None);
    }

    #[test]
    fn test_insert_then_latest() {
        let conn = crate::open_memory().expect("open");
        insert(&conn, &snapshot(1)).expect("insert");
        insert(&conn, &snapshot(2)).expect("insert");

        assert_eq!(latest(&conn).expect("latest"), Some(snapshot(2)));
    }
}
