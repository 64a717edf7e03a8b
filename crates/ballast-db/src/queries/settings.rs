//! Settings query functions.

use rusqlite::Connection;

use crate::{DbError, Result};

/// Key holding the last completed epoch number.
pub const LAST_EPOCH: &str = "last_epoch";

/// Key holding the active stability configuration as JSON.
pub const STABILITY_CONFIG: &str = "stability_config";

/// Get a setting value by key.
pub fn get(conn: &Connection, key: &str) -> Result<String> {
    conn.query_row(
        "SELECT value FROM settings WHERE key = ?1",
        [key],
        |row| row.get(0),
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => {
            DbError::NotFound(format!("setting '{key}'"))
        }
        other => DbError::Sqlite(other),
    })
}

/// Set a setting value.
pub fn set(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
        rusqlite::params![key, value],
    )?;
    Ok(())
}

/// Get a setting as u64, defaulting to `default` if not found.
pub fn get_u64(conn: &Connection, key: &str, default: u64) -> Result<u64> {
    match get(conn, key) {
        Ok(v) => v
            .parse()
            .map_err(|e: std::num::ParseIntError| DbError::Serialization(e.to_string())),
        Err(DbError::NotFound(_)) => Ok(default),
        Err(e) => Err(e),
    }
}

/// Get a JSON-encoded setting, or `None` if not set.
pub fn get_json<T: serde::de::DeserializeOwned>(conn: &Connection, key: &str) -> Result<Option<T>> {
    match get(conn, key) {
        Ok(v) => serde_json::from_str(&v)
            .map(Some)
            .map_err(|e| DbError::Serialization(e.to_string())),
        Err(DbError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Store a value as JSON.
pub fn set_json<T: serde::Serialize>(conn: &Connection, key: &str, value: &T) -> Result<()> {
    let encoded = serde_json::to_string(value).map_err(|e| DbError::Serialization(e.to_string()))?;
    set(conn, key, &encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballast_types::config::StabilityConfig;

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    #[test]
    fn test_default_last_epoch() {
        let conn = test_db();
        assert_eq!(get_u64(&conn, LAST_EPOCH, 99).expect("get"), 0);
    }

    #[test]
    fn test_set_and_get() {
        let conn = test_db();
        set(&conn, LAST_EPOCH, "42").expect("set");
        assert_eq!(get_u64(&conn, LAST_EPOCH, 0).expect("get"), 42);
    }

    #[test]
    fn test_get_nonexistent() {
        let conn = test_db();
        let result = get(&conn, "nonexistent");
        assert!(matches!(result, Err(DbError::NotFound(_))));
    }

    #[test]
    fn test_json_setting() {
        let conn = test_db();
        let missing: Option<StabilityConfig> = get_json(&conn, STABILITY_CONFIG).expect("get");
        assert!(missing.is_none());

        let config = StabilityConfig::default();
        set_json(&conn, STABILITY_CONFIG, &config).expect("set");
        let loaded: Option<StabilityConfig> = get_json(&conn, STABILITY_CONFIG).expect("get");
        assert_eq!(loaded, Some(config));
    }
}
