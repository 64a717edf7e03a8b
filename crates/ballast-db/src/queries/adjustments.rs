//! Supply adjustment audit queries.

use ballast_types::supply::SupplyAdjustment;
use rusqlite::Connection;

use crate::{decimal_at, parsed_at, Result};

/// Append an adjustment record.
pub fn insert(conn: &Connection, adj: &SupplyAdjustment) -> Result<()> {
    conn.execute(
        "INSERT INTO supply_adjustments
             (epoch, action, amount, reason, target_price, current_price, deviation,
              previous_supply, new_supply, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        rusqlite::params![
            adj.epoch as i64,
            adj.action.as_str(),
            adj.amount.to_string(),
            adj.reason,
            adj.target_price.to_string(),
            adj.current_price.to_string(),
            adj.deviation.to_string(),
            adj.previous_supply.to_string(),
            adj.new_supply.to_string(),
            adj.status.as_str(),
            adj.timestamp as i64,
        ],
    )?;
    Ok(())
}

/// Most recent adjustments, newest first.
pub fn recent(conn: &Connection, limit: u32) -> Result<Vec<SupplyAdjustment>> {
    let mut stmt = conn.prepare(
        "SELECT epoch, action, amount, reason, target_price, current_price, deviation,
                previous_supply, new_supply, status, created_at
         FROM supply_adjustments ORDER BY id DESC LIMIT ?1",
    )?;

    let rows = stmt
        .query_map([limit], |row| {
            Ok(SupplyAdjustment {
                epoch: row.get::<_, i64>(0)? as u64,
                action: parsed_at(row, 1)?,
                amount: decimal_at(row, 2)?,
                reason: row.get(3)?,
                target_price: decimal_at(row, 4)?,
                current_price: decimal_at(row, 5)?,
                deviation: decimal_at(row, 6)?,
                previous_supply: decimal_at(row, 7)?,
                new_supply: decimal_at(row, 8)?,
                status: parsed_at(row, 9)?,
                timestamp: row.get::<_, i64>(10)? as u64,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballast_types::supply::{AdjustmentStatus, SupplyAction};
    use rust_decimal::Decimal;

    fn adjustment(epoch: u64, action: SupplyAction) -> SupplyAdjustment {
        SupplyAdjustment {
            epoch,
            action,
            amount: Decimal::from(50_000),
            reason: "price above target".to_string(),
            target_price: Decimal::ONE,
            current_price: Decimal::new(105, 2),
            deviation: Decimal::new(5, 2),
            previous_supply: Decimal::from(1_000_000),
            new_supply: Decimal::from(1_050_000),
            status: AdjustmentStatus::Applied,
            timestamp: 1_000 + epoch,
        }
    }

    #[test]
    fn test_insert_and_recent() {
        let conn = crate::open_memory().expect("open");
        insert(&conn, &adjustment(1, SupplyAction::Expand)).expect("insert");
        insert(&conn, &adjustment(2, SupplyAction::Contract)).expect("insert");

        let rows = recent(&conn, 10).expect("recent");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].epoch, 2);
        assert_eq!(rows[0].action, SupplyAction::Contract);
        assert_eq!(rows[1], adjustment(1, SupplyAction::Expand));
    }

    #[test]
    fn test_recent_limit() {
        let conn = crate::open_memory().expect("open");
        for epoch in 0..10 {
            insert(&conn, &adjustment(epoch, SupplyAction::None)).expect("insert");
        }
        assert_eq!(recent(&conn, 4).expect("recent").len(), 4);
    }
}
