//! Stability service.
//!
//! One engine instance owns the oracle, the controller and the distributor,
//! and is handed its [`LedgerStore`] and [`AuditSink`] at construction.
//! Timer-driven and manual rebalances share [`StabilityService::perform_rebalance`]'s
//! epoch body and the same mutual-exclusion lock, so only one
//! `decide -> apply -> audit` sequence is ever in flight.

use std::sync::Arc;

use ballast_db::store::{AuditSink, LedgerStore};
use ballast_oracle::aggregator::{OracleConfig, PriceAggregator};
use ballast_oracle::confidence::VOLATILITY_LOOKBACK;
use ballast_oracle::sampler::PriceSampler;
use ballast_supply::controller::SupplyController;
use ballast_supply::distributor::LedgerDistributor;
use ballast_supply::SupplyError;
use ballast_types::config::{ConfigUpdate, StabilityConfig};
use ballast_types::events::{Event, EventType};
use ballast_types::ledger::{HolderBalance, StablecoinTransaction};
use ballast_types::metrics::{stability_score, StabilityMetricsSnapshot, SupplyInfo};
use ballast_types::price::PriceObservation;
use ballast_types::supply::{AdjustmentStatus, SupplyAction, SupplyAdjustment};
use ballast_types::{unix_millis, TimestampMs};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex, MutexGuard, RwLock};
use tracing::{debug, error, info, warn};

use crate::events::{EventBus, DEFAULT_EVENT_CAPACITY};
use crate::scheduler::RebalanceScheduler;
use crate::status::{EngineMetrics, EngineStatus};
use crate::{EngineError, Result};

/// Largest page of per-account transactions returned.
pub const MAX_TRANSACTIONS_LIMIT: u32 = 100;

/// Largest page of supply history returned.
pub const MAX_HISTORY_LIMIT: u32 = 50;

/// Construction parameters for a [`StabilityService`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Initial controller config; a persisted one replaces it on restore.
    pub stability: StabilityConfig,
    /// Aggregator thresholds and sampling period.
    pub oracle: OracleConfig,
    /// Buffered events per subscriber before the slowest starts lagging.
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stability: StabilityConfig::default(),
            oracle: OracleConfig::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

#[derive(Debug, Default)]
struct EngineState {
    running: bool,
    epoch: u64,
    /// Persisted epoch counter, config and snapshot have been loaded.
    restored: bool,
    supply_loaded: bool,
    total_supply: Decimal,
    reserve_pool: Decimal,
    holders: usize,
    last_rebalance_at: Option<TimestampMs>,
    last_metrics: Option<StabilityMetricsSnapshot>,
    last_error: Option<String>,
    degraded: bool,
}

/// The engine façade.
pub struct StabilityService {
    ledger: Arc<dyn LedgerStore>,
    audit: Arc<dyn AuditSink>,
    oracle: RwLock<PriceAggregator>,
    sampler: Mutex<Box<dyn PriceSampler>>,
    controller: RwLock<SupplyController>,
    pending_config: RwLock<Option<StabilityConfig>>,
    distributor: LedgerDistributor,
    state: RwLock<EngineState>,
    rebalance_lock: Mutex<()>,
    scheduler: Mutex<Option<RebalanceScheduler>>,
    events: EventBus,
}

impl StabilityService {
    /// Build a stopped engine.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Configuration`] if `config.stability` is invalid
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        audit: Arc<dyn AuditSink>,
        sampler: Box<dyn PriceSampler>,
        config: EngineConfig,
    ) -> Result<Self> {
        config.stability.validate()?;
        Ok(Self {
            ledger,
            audit,
            oracle: RwLock::new(PriceAggregator::new(config.oracle)),
            sampler: Mutex::new(sampler),
            controller: RwLock::new(SupplyController::new(config.stability)),
            pending_config: RwLock::new(None),
            distributor: LedgerDistributor::new(),
            state: RwLock::new(EngineState::default()),
            rebalance_lock: Mutex::new(()),
            scheduler: Mutex::new(None),
            events: EventBus::new(config.event_capacity),
        })
    }

    // ---- lifecycle ----

    /// Load persisted state, take a first price sample and start the
    /// epoch timer.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        let mut scheduler = self.scheduler.lock().await;
        if scheduler.is_some() || self.state.read().await.running {
            return Err(EngineError::AlreadyRunning);
        }

        if self.state.read().await.restored {
            self.refresh_supply().await?;
        } else {
            self.restore().await?;
        }
        self.state.write().await.running = true;

        if let Err(e) = self.sample_price().await {
            warn!(error = %e, "initial price sample failed");
        }

        *scheduler = Some(RebalanceScheduler::spawn(Arc::clone(self)));

        let (epoch, total_supply) = {
            let state = self.state.read().await;
            (state.epoch, state.total_supply)
        };
        info!(epoch, %total_supply, "stability engine started");
        self.events.emit(
            EventType::EngineStarted,
            serde_json::json!({ "epoch": epoch, "total_supply": total_supply }),
        );
        Ok(())
    }

    /// Stop scheduling epochs. An epoch already executing runs to completion
    /// before this returns. Stopping a stopped engine is a no-op.
    pub async fn stop(&self) {
        let scheduler = self.scheduler.lock().await.take();
        let Some(scheduler) = scheduler else {
            return;
        };
        scheduler.shutdown().await;

        let epoch = {
            let mut state = self.state.write().await;
            state.running = false;
            state.epoch
        };
        info!(epoch, "stability engine stopped");
        self.events
            .emit(EventType::EngineStopped, serde_json::json!({ "epoch": epoch }));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    // ---- queries ----

    pub async fn status(&self) -> EngineStatus {
        let now = unix_millis();
        let oracle_health = self.oracle.read().await.health(now);
        let config = self.controller.read().await.config().clone();
        let pending_config = self.pending_config.read().await.clone();
        let state = self.state.read().await;
        EngineStatus {
            running: state.running,
            epoch: state.epoch,
            config,
            pending_config,
            oracle_health,
            last_rebalance_at: state.last_rebalance_at,
            degraded: state.degraded,
            last_error: state.last_error.clone(),
        }
    }

    pub async fn metrics(&self) -> EngineMetrics {
        let now = unix_millis();
        let (price, oracle) = {
            let oracle = self.oracle.read().await;
            (
                oracle.price_stats(oracle.config().stats_window_ms, now),
                oracle.health(now),
            )
        };
        let state = self.state.read().await;
        EngineMetrics {
            stability: state.last_metrics.clone(),
            supply: SupplyInfo {
                total_supply: state.total_supply,
                reserve_pool: state.reserve_pool,
                holders: state.holders,
            },
            price,
            oracle,
        }
    }

    /// # Errors
    ///
    /// - [`EngineError::NotFound`] if the account has no ledger entry
    pub async fn user_balance(&self, account_id: &str) -> Result<HolderBalance> {
        self.ledger
            .balance(account_id)?
            .ok_or_else(|| EngineError::NotFound(format!("account '{account_id}'")))
    }

    /// Newest first, at most [`MAX_TRANSACTIONS_LIMIT`].
    pub async fn user_transactions(
        &self,
        account_id: &str,
        limit: u32,
    ) -> Result<Vec<StablecoinTransaction>> {
        Ok(self
            .ledger
            .transactions_for(account_id, limit.min(MAX_TRANSACTIONS_LIMIT))?)
    }

    /// Newest first, at most [`MAX_HISTORY_LIMIT`].
    pub async fn supply_history(&self, limit: u32) -> Result<Vec<SupplyAdjustment>> {
        Ok(self.audit.supply_history(limit.min(MAX_HISTORY_LIMIT))?)
    }

    /// Active rebalance interval, re-read by the scheduler every epoch.
    pub async fn rebalance_interval_ms(&self) -> u64 {
        self.controller.read().await.config().rebalance_interval_ms
    }

    pub async fn sample_interval_ms(&self) -> u64 {
        self.oracle.read().await.config().sample_interval_ms
    }

    // ---- oracle ----

    /// Pull one observation from the sampler into the aggregator.
    pub async fn sample_price(&self) -> Result<PriceObservation> {
        let recent = self.oracle.read().await.recent_prices(VOLATILITY_LOOKBACK);
        let observation = self.sampler.lock().await.sample(unix_millis(), &recent)?;
        self.oracle
            .write()
            .await
            .add_observation(observation.clone())?;
        Ok(observation)
    }

    /// Emergency price override. The price is recorded with full confidence
    /// and the sampler continues from it.
    pub async fn set_price(&self, price: Decimal) -> Result<PriceObservation> {
        let observation = PriceObservation::new(price, unix_millis(), Decimal::ZERO, Decimal::ONE)?;
        self.oracle
            .write()
            .await
            .add_observation(observation.clone())?;
        self.sampler.lock().await.anchor(observation.price);

        warn!(price = %observation.price, "manual price override");
        self.events.emit(
            EventType::PriceOverridden,
            serde_json::json!({ "price": observation.price }),
        );
        Ok(observation)
    }

    /// Perturb the sampler by `severity` in `[0, 1]` and record the resulting
    /// price immediately.
    pub async fn simulate_market_shock(&self, severity: Decimal) -> Result<PriceObservation> {
        self.sampler.lock().await.shock(severity)?;
        let observation = self.sample_price().await?;

        warn!(%severity, price = %observation.price, "market shock simulated");
        self.events.emit(
            EventType::MarketShock,
            serde_json::json!({ "severity": severity, "price": observation.price }),
        );
        Ok(observation)
    }

    // ---- configuration ----

    /// Validate and stage a partial update. It becomes active, and is
    /// persisted, at the next epoch boundary. Successive updates before that
    /// boundary accumulate.
    pub async fn update_config(&self, update: ConfigUpdate) -> Result<StabilityConfig> {
        let mut pending = self.pending_config.write().await;
        let base = match pending.as_ref() {
            Some(staged) => staged.clone(),
            None => self.controller.read().await.config().clone(),
        };
        let merged = base.merged(&update)?;
        *pending = Some(merged.clone());

        info!(
            target_price = %merged.target_price,
            tolerance_band = %merged.tolerance_band,
            max_supply_change = %merged.max_supply_change_per_epoch,
            "stability config staged for next epoch"
        );
        self.events.emit(
            EventType::ConfigUpdated,
            serde_json::json!({ "staged": true, "config": merged }),
        );
        Ok(merged)
    }

    // ---- rebalancing ----

    /// Run one epoch now.
    ///
    /// The returned adjustment carries the epoch outcome in `status`; a ledger
    /// failure comes back as `AdjustmentStatus::Failed`, not as an error.
    ///
    /// # Errors
    ///
    /// - [`EngineError::RebalanceInProgress`] if another epoch holds the lock
    /// - [`EngineError::Store`] if ledger state cannot be loaded
    pub async fn perform_rebalance(&self) -> Result<SupplyAdjustment> {
        let guard = self
            .rebalance_lock
            .try_lock()
            .map_err(|_| EngineError::RebalanceInProgress)?;
        self.run_epoch(&guard).await
    }

    /// Timer path: waits for a manual epoch to finish instead of rejecting.
    pub(crate) async fn run_scheduled_epoch(&self) -> Result<SupplyAdjustment> {
        let guard = self.rebalance_lock.lock().await;
        self.run_epoch(&guard).await
    }

    /// Rescan the ledger and reset the tracked supply figures.
    pub async fn refresh_supply(&self) -> Result<SupplyInfo> {
        let ledger = Arc::clone(&self.ledger);
        let balances = blocking(move || Ok(ledger.load_balances()?)).await?;
        let info = supply_info(&balances, self.distributor.reserve_account());

        let mut state = self.state.write().await;
        state.total_supply = info.total_supply;
        state.reserve_pool = info.reserve_pool;
        state.holders = info.holders;
        state.supply_loaded = true;
        Ok(info)
    }

    /// Load the persisted epoch counter, stability config and last snapshot,
    /// then rescan supply. Runs once per instance, from `start()` or from the
    /// first epoch of an engine that was never started.
    async fn restore(&self) -> Result<()> {
        let audit = Arc::clone(&self.audit);
        let (persisted, last_epoch, last_metrics) = blocking(move || {
            Ok((audit.load_config()?, audit.last_epoch()?, audit.latest_metrics()?))
        })
        .await?;

        if let Some(persisted) = persisted {
            match persisted.validate() {
                Ok(()) => self.controller.write().await.set_config(persisted),
                Err(e) => warn!(error = %e, "ignoring invalid persisted stability config"),
            }
        }
        let target = self.controller.read().await.config().target_price;
        self.sampler.lock().await.set_target(target);
        self.refresh_supply().await?;

        let mut state = self.state.write().await;
        state.epoch = state.epoch.max(last_epoch);
        if last_metrics.is_some() {
            state.last_metrics = last_metrics;
        }
        state.restored = true;
        debug!(epoch = state.epoch, %target, "persisted engine state restored");
        Ok(())
    }

    async fn run_epoch(&self, _guard: &MutexGuard<'_, ()>) -> Result<SupplyAdjustment> {
        if !self.state.read().await.restored {
            self.restore().await?;
        }
        self.activate_pending_config().await;

        if !self.state.read().await.supply_loaded {
            self.refresh_supply().await?;
        }

        let now = unix_millis();
        let (epoch, total_supply, reserve_before) = {
            let state = self.state.read().await;
            (state.epoch + 1, state.total_supply, state.reserve_pool)
        };

        let (stats, health) = {
            let oracle = self.oracle.read().await;
            (
                oracle.price_stats(oracle.config().stats_window_ms, now),
                oracle.health(now),
            )
        };

        let mut adjustment = {
            let controller = self.controller.read().await;
            match stats.as_ref() {
                Some(stats) => controller.decide(epoch, total_supply, stats, &health, now),
                None => controller.hold(
                    epoch,
                    total_supply,
                    Decimal::ZERO,
                    Decimal::ZERO,
                    "no price data",
                    now,
                ),
            }
        };

        if !health.healthy {
            self.events.emit(
                EventType::OracleDegraded,
                serde_json::json!({ "epoch": epoch, "issues": health.issues }),
            );
        }

        let mut failure = None;
        let mut reserve_after = reserve_before;
        if adjustment.is_actionable() {
            match self.apply(&adjustment, now).await {
                Ok((applied, reserve)) => {
                    adjustment.status = AdjustmentStatus::Applied;
                    adjustment.new_supply = total_supply + applied;
                    reserve_after = reserve;
                }
                Err(EngineError::Supply(SupplyError::NoEligibleHolders)) => {
                    warn!(epoch, action = %adjustment.action, "no eligible holders; nothing moved");
                    adjustment.reason = format!("{}; no eligible holders", adjustment.reason);
                    adjustment.action = SupplyAction::None;
                    adjustment.amount = Decimal::ZERO;
                    adjustment.status = AdjustmentStatus::Skipped;
                    adjustment.new_supply = total_supply;
                }
                Err(e) => {
                    error!(epoch, error = %e, "rebalance commit failed; no balances changed");
                    adjustment.status = AdjustmentStatus::Failed;
                    adjustment.reason = format!("{}; ledger commit failed: {e}", adjustment.reason);
                    adjustment.new_supply = total_supply;
                    failure = Some(e.to_string());
                }
            }
        }

        let (volatility, confidence) = stats
            .as_ref()
            .map(|s| (s.volatility, s.confidence))
            .unwrap_or((Decimal::ZERO, Decimal::ZERO));
        let snapshot = StabilityMetricsSnapshot {
            epoch,
            timestamp: now,
            total_supply: adjustment.new_supply,
            reserve_pool: reserve_after,
            current_price: adjustment.current_price,
            target_price: adjustment.target_price,
            deviation: adjustment.deviation,
            volatility,
            confidence,
            stability_score: stability_score(adjustment.deviation, volatility, confidence),
        };

        let audit = Arc::clone(&self.audit);
        let (recorded, recorded_snapshot) = (adjustment.clone(), snapshot.clone());
        let written = blocking(move || Ok(audit.record_epoch(&recorded, &recorded_snapshot)?)).await;
        if let Err(e) = written {
            error!(epoch, error = %e, "failed to record epoch audit trail");
            if failure.is_none() {
                failure = Some(format!("audit write failed: {e}"));
            }
        }

        {
            let mut state = self.state.write().await;
            state.epoch = epoch;
            state.last_rebalance_at = Some(now);
            state.degraded = !health.healthy || failure.is_some();
            if adjustment.status == AdjustmentStatus::Applied {
                state.total_supply = adjustment.new_supply;
                state.reserve_pool = reserve_after;
            }
            if adjustment.status == AdjustmentStatus::Failed {
                // Resync from the ledger on the next epoch.
                state.supply_loaded = false;
            } else {
                state.last_metrics = Some(snapshot);
            }
            state.last_error = failure;
        }

        let event_type = match adjustment.status {
            AdjustmentStatus::Applied => {
                info!(
                    epoch,
                    action = %adjustment.action,
                    amount = %adjustment.amount,
                    new_supply = %adjustment.new_supply,
                    "rebalance applied"
                );
                EventType::RebalanceApplied
            }
            AdjustmentStatus::Skipped => {
                if health.healthy {
                    info!(epoch, reason = %adjustment.reason, "rebalance skipped");
                } else {
                    warn!(epoch, reason = %adjustment.reason, "rebalance skipped");
                }
                EventType::RebalanceSkipped
            }
            AdjustmentStatus::Failed => EventType::RebalanceFailed,
        };
        self.events.emit(
            event_type,
            serde_json::to_value(&adjustment).unwrap_or(serde_json::Value::Null),
        );

        Ok(adjustment)
    }

    /// Plan and commit the batch. Returns the applied signed amount and the
    /// reserve balance afterwards.
    async fn apply(
        &self,
        adjustment: &SupplyAdjustment,
        now: TimestampMs,
    ) -> Result<(Decimal, Decimal)> {
        let ledger = Arc::clone(&self.ledger);
        let distributor = self.distributor.clone();
        let adjustment = adjustment.clone();
        blocking(move || {
            let balances = ledger.load_balances()?;
            let batch = distributor.distribute(&adjustment, &balances)?;
            ledger.commit_rebalance(&batch, now)?;

            let reserve_account = distributor.reserve_account();
            let reserve = batch
                .changes
                .iter()
                .find(|c| c.account_id == reserve_account)
                .map(|c| c.new_balance)
                .unwrap_or_else(|| supply_info(&balances, reserve_account).reserve_pool);
            Ok((batch.applied, reserve))
        })
        .await
    }

    async fn activate_pending_config(&self) {
        let Some(config) = self.pending_config.write().await.take() else {
            return;
        };
        self.controller.write().await.set_config(config.clone());
        self.sampler.lock().await.set_target(config.target_price);

        let audit = Arc::clone(&self.audit);
        let persisted = config.clone();
        if let Err(e) = blocking(move || Ok(audit.save_config(&persisted)?)).await {
            warn!(error = %e, "failed to persist stability config");
        }

        info!(target_price = %config.target_price, "stability config activated");
        self.events.emit(
            EventType::ConfigUpdated,
            serde_json::json!({ "staged": false, "config": config }),
        );
    }
}

/// Run synchronous store I/O on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

fn supply_info(balances: &[HolderBalance], reserve_account: &str) -> SupplyInfo {
    let mut info = SupplyInfo::default();
    for holder in balances {
        info.total_supply += holder.balance;
        if holder.account_id == reserve_account {
            info.reserve_pool = holder.balance;
        } else {
            info.holders += 1;
        }
    }
    info
}
