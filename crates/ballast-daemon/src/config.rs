//! Configuration file management.

use std::path::PathBuf;

use ballast_oracle::aggregator::OracleConfig;
use ballast_types::config::StabilityConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "BALLAST_DATA_DIR";

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Peg and controller settings.
    #[serde(default)]
    pub stability: StabilityConfig,
    /// Oracle thresholds.
    #[serde(default)]
    pub oracle: OracleConfig,
    /// Price feed settings.
    #[serde(default)]
    pub sampler: SamplerConfig,
    /// Storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Balances seeded into an empty ledger.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genesis: Vec<GenesisAllocation>,
}

/// Price feed configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// "simulated" | "static".
    #[serde(default = "default_sampler_kind")]
    pub kind: String,
    /// RNG seed for the simulated feed.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
    /// Database file name inside the data directory.
    #[serde(default = "default_db_file")]
    pub db_file: String,
    /// Keep everything in memory; nothing survives a restart.
    #[serde(default)]
    pub in_memory: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace" | "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// One initial ledger balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenesisAllocation {
    pub account: String,
    pub balance: Decimal,
}

// Default value functions

fn default_sampler_kind() -> String {
    "simulated".to_string()
}

fn default_seed() -> u64 {
    42
}

fn default_db_file() -> String {
    "ballast.db".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            kind: default_sampler_kind(),
            seed: default_seed(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: String::new(),
            db_file: default_db_file(),
            in_memory: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::parse(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate a TOML document.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: DaemonConfig = toml::from_str(content)?;
        config.stability.validate()?;
        Ok(config)
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> PathBuf {
        if self.storage.data_dir.is_empty() {
            Self::default_data_dir()
        } else {
            PathBuf::from(&self.storage.data_dir)
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir().join(&self.storage.db_file)
    }

    fn config_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }

    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            return PathBuf::from(dir);
        }
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".ballast"))
            .unwrap_or_else(|_| PathBuf::from("/tmp/ballast"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.stability.target_price, Decimal::ONE);
        assert_eq!(config.sampler.kind, "simulated");
        assert_eq!(config.storage.db_file, "ballast.db");
        assert_eq!(config.logging.level, "info");
        assert!(config.genesis.is_empty());
    }

    #[test]
    fn test_config_serialization() {
        let config = DaemonConfig::default();
        let toml_str = toml::to_string(&config).expect("serialize");
        let parsed = DaemonConfig::parse(&toml_str).expect("parse");
        assert_eq!(parsed.stability, config.stability);
    }

    #[test]
    fn test_partial_file() {
        let content = r#"
            [stability]
            tolerance_band = "0.01"

            [storage]
            in_memory = true

            [[genesis]]
            account = "alice"
            balance = "600000"

            [[genesis]]
            account = "bob"
            balance = "400000"
        "#;
        let config = DaemonConfig::parse(content).expect("parse");
        assert_eq!(config.stability.tolerance_band, Decimal::new(1, 2));
        assert_eq!(config.stability.max_supply_change_per_epoch, Decimal::new(5, 2));
        assert!(config.storage.in_memory);
        assert_eq!(config.genesis.len(), 2);
        assert_eq!(config.genesis[1].balance, Decimal::from(400_000));
    }

    #[test]
    fn test_invalid_stability_rejected() {
        let content = r#"
            [stability]
            tolerance_band = "0"
        "#;
        assert!(DaemonConfig::parse(content).is_err());
    }
}
