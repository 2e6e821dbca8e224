// src/core/tasks/sweep.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::{log_store_error, ticker};
use crate::core::errors::OtuError;
use crate::core::metrics;
use crate::core::state::ServiceState;

/// What a single sweep cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Records found expired or zeroed.
    pub expired: usize,
    pub dropped: usize,
    /// Records whose drop failed; they stay in the store and are retried next tick.
    pub failed: usize,
}

/// Drops accounts whose expiry has passed and evicts them from the cache.
pub struct SweepTask {
    state: Arc<ServiceState>,
    period: Duration,
}

impl SweepTask {
    pub fn new(state: Arc<ServiceState>, period: Duration) -> Self {
        Self { state, period }
    }

    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!("Sweep task started. Cleanup interval: {:?}.", self.period);
        let mut interval = ticker(self.period);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.run_cycle().await {
                        Ok(report) => debug!("Sweep cycle finished: {:?}", report),
                        Err(e) => warn!("Sweep cycle could not list expired accounts: {}", e),
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Sweep task shutting down.");
                    return;
                }
            }
        }
    }

    pub async fn run_cycle(&self) -> Result<SweepReport, OtuError> {
        self.sweep_at(chrono::Utc::now().timestamp()).await
    }

    /// Sweeps everything due at `now` (unix seconds).
    pub async fn sweep_at(&self, now: i64) -> Result<SweepReport, OtuError> {
        let store = &self.state.store;
        match store.ping().await {
            Ok(()) => metrics::set_db_status(true),
            Err(e) => {
                metrics::set_db_status(false);
                warn!("Credential store ping failed: {}", e);
            }
        }

        let expired = store.list_expired(now).await.inspect_err(|e| {
            metrics::record_operation_error("list_expired");
            debug!("list_expired failed: {}", e);
        })?;
        let mut report = SweepReport {
            expired: expired.len(),
            ..Default::default()
        };

        for record in &expired {
            if let Err(e) = store.drop_account(record).await {
                log_store_error("drop_account", &record.to_string(), &e);
                report.failed += 1;
                continue;
            }
            self.state.cache.delete(&record.user);
            metrics::USERS_DROPPED_TOTAL.inc();
            report.dropped += 1;
            info!("Dropped user: {}", record);
        }

        Ok(report)
    }
}
