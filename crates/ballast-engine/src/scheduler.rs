//! Epoch scheduler.
//!
//! A single task per engine. It samples the price feed every
//! `sample_interval_ms` and runs an epoch every `rebalance_interval_ms`,
//! re-reading the interval after each epoch so configuration changes take
//! effect from the next boundary. Shutdown is only observed between
//! iterations, so an epoch that has started always runs to completion.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::service::StabilityService;

/// Handle to a running scheduler task.
pub struct RebalanceScheduler {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl RebalanceScheduler {
    /// Spawn the scheduler loop for `service`.
    pub fn spawn(service: Arc<StabilityService>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run(service, shutdown_rx));
        Self {
            shutdown_tx,
            handle,
        }
    }

    /// Signal the loop to exit and wait for it, including any in-flight epoch.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.handle.await {
            warn!(error = %e, "scheduler task ended abnormally");
        }
    }
}

async fn run(service: Arc<StabilityService>, mut shutdown_rx: watch::Receiver<bool>) {
    let sample_every = Duration::from_millis(service.sample_interval_ms().await.max(1));
    let mut sample_tick = time::interval(sample_every);
    sample_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut next_epoch = Instant::now() + epoch_interval(&service).await;

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            _ = sample_tick.tick() => {
                if let Err(e) = service.sample_price().await {
                    warn!(error = %e, "price sample failed; keeping last known price");
                }
            }
            _ = time::sleep_until(next_epoch) => {
                match service.run_scheduled_epoch().await {
                    Ok(adjustment) => debug!(
                        epoch = adjustment.epoch,
                        status = %adjustment.status,
                        "scheduled epoch finished"
                    ),
                    Err(e) => warn!(error = %e, "scheduled epoch could not run"),
                }
                next_epoch = Instant::now() + epoch_interval(&service).await;
            }
        }
    }

    debug!("scheduler loop exited");
}

async fn epoch_interval(service: &StabilityService) -> Duration {
    Duration::from_millis(service.rebalance_interval_ms().await.max(1))
}
