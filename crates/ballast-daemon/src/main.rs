//! ballastd: runs the stability engine as a standalone process.
//!
//! Loads `$BALLAST_DATA_DIR/config.toml`, opens the ledger database, seeds
//! genesis balances into an empty ledger, and runs epochs until Ctrl-C.

mod config;

use std::sync::Arc;

use ballast_db::memory::MemoryStore;
use ballast_db::store::{AuditSink, LedgerStore, SqliteStore};
use ballast_engine::{EngineConfig, StabilityService};
use ballast_oracle::sampler::{PriceSampler, SimulatedSampler, StaticSampler};
use ballast_types::unix_millis;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::config::DaemonConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = DaemonConfig::load()?;

    // 2. Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("ballast={}", config.logging.level).parse()?),
        )
        .init();

    info!("Ballast daemon starting");

    // 3. Open storage
    let (ledger, audit): (Arc<dyn LedgerStore>, Arc<dyn AuditSink>) = if config.storage.in_memory {
        info!("Using in-memory store");
        let store = Arc::new(MemoryStore::new());
        let ledger: Arc<dyn LedgerStore> = store.clone();
        let audit: Arc<dyn AuditSink> = store;
        (ledger, audit)
    } else {
        let data_dir = config.data_dir();
        std::fs::create_dir_all(&data_dir)?;
        let db_path = config.db_path();
        info!("Opening database at {:?}", db_path);
        let store = Arc::new(SqliteStore::open(&db_path)?);
        let ledger: Arc<dyn LedgerStore> = store.clone();
        let audit: Arc<dyn AuditSink> = store;
        (ledger, audit)
    };

    // 4. Seed genesis balances
    seed_genesis(ledger.as_ref(), &config)?;

    // 5. Build the engine. A persisted peg re-targets the sampler on start.
    let target = config.stability.target_price;
    let sampler: Box<dyn PriceSampler> = match config.sampler.kind.as_str() {
        "static" => Box::new(StaticSampler::new(target)),
        "simulated" => Box::new(SimulatedSampler::new(target, config.sampler.seed)),
        other => anyhow::bail!("unknown sampler kind '{other}'"),
    };
    let engine_config = EngineConfig {
        stability: config.stability.clone(),
        oracle: config.oracle.clone(),
        ..EngineConfig::default()
    };
    let service = Arc::new(StabilityService::new(ledger, audit, sampler, engine_config)?);

    // 6. Start and run until Ctrl-C
    let mut events = service.subscribe();
    service.start().await?;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => debug!(
                    event_type = ?event.event_type,
                    payload = %event.payload,
                    "engine event"
                ),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event log lagging"),
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, shutting down");
                break;
            }
        }
    }

    // Graceful shutdown
    service.stop().await;
    let status = service.status().await;
    info!(epoch = status.epoch, "Daemon stopped");
    Ok(())
}

fn seed_genesis(ledger: &dyn LedgerStore, config: &DaemonConfig) -> anyhow::Result<()> {
    if config.genesis.is_empty() || !ledger.load_balances()?.is_empty() {
        return Ok(());
    }
    let now = unix_millis();
    for allocation in &config.genesis {
        ledger.set_balance(&allocation.account, allocation.balance, now)?;
    }
    info!(
        holders = config.genesis.len(),
        total_supply = %ledger.total_supply()?,
        "Seeded genesis balances"
    );
    Ok(())
}
