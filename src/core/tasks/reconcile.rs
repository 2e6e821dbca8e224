// src/core/tasks/reconcile.rs

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::{format_expiry, log_store_error, ticker};
use crate::core::errors::OtuError;
use crate::core::identity::IdentitySource;
use crate::core::metrics;
use crate::core::model::AccountIntent;
use crate::core::state::ServiceState;

/// What a single reconcile cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Account intents computed from the identity source.
    pub desired: usize,
    /// Store records whose expiry was zeroed because they are no longer desired.
    pub marked: u64,
    /// Accounts created and granted in this cycle.
    pub created: usize,
    /// Intents skipped because the cache already holds the username.
    pub cached: usize,
    /// Intents whose create or grant failed; retried next cycle.
    pub failed: usize,
}

/// Pulls desired state from the identity source and converges the store towards it.
pub struct ReconcileTask {
    state: Arc<ServiceState>,
    period: Duration,
}

impl ReconcileTask {
    pub fn new(state: Arc<ServiceState>, period: Duration) -> Self {
        Self { state, period }
    }

    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!("Reconcile task started. Poll interval: {:?}.", self.period);
        let mut interval = ticker(self.period);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.run_cycle().await {
                        Ok(report) => debug!("Reconcile cycle finished: {:?}", report),
                        Err(e) => {
                            metrics::RECONCILE_FAILURES_TOTAL.inc();
                            warn!("Reconcile cycle aborted, store left untouched: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Reconcile task shutting down.");
                    return;
                }
            }
        }
    }

    /// Runs one cycle. Only a failure to fetch desired state is returned as an error, and
    /// in that case neither the store nor the cache has been touched.
    pub async fn run_cycle(&self) -> Result<ReconcileReport, OtuError> {
        let intents = collect_intents(self.state.identity.as_ref()).await?;
        let mut report = ReconcileReport {
            desired: intents.len(),
            ..Default::default()
        };

        let keep: Vec<String> = intents
            .iter()
            .map(|intent| intent.username.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        match self.state.store.mark_not_intended(&keep).await {
            Ok(marked) => {
                if marked > 0 {
                    info!("Marked {} account(s) as no longer desired.", marked);
                }
                report.marked = marked;
            }
            Err(e) => log_store_error("mark_not_intended", "unwanted accounts", &e),
        }

        for intent in &intents {
            // Expiry changes for cached users are not applied here; the account is
            // recreated with the new expiry after the sweep drops it.
            if self.state.cache.exists(&intent.username) {
                report.cached += 1;
                continue;
            }
            if self.provision(intent).await.is_err() {
                report.failed += 1;
                continue;
            }
            self.state
                .cache
                .set(&intent.username, intent.expire_time);
            metrics::USERS_CREATED_TOTAL.inc();
            report.created += 1;
            info!(
                "Created user: '{}'@'{}' Expires: {}",
                intent.username,
                intent.host,
                format_expiry(intent.expire_time)
            );
        }

        Ok(report)
    }

    async fn provision(&self, intent: &AccountIntent) -> Result<(), OtuError> {
        let account = format!("'{}'@'{}'", intent.username, intent.host);
        let store = &self.state.store;
        store
            .create_account(
                &intent.host,
                &intent.username,
                &intent.password,
                intent.expire_time,
            )
            .await
            .inspect_err(|e| log_store_error("create_account", &account, e))?;
        store
            .grant(
                &intent.privilege_type,
                &intent.privilege_level,
                &intent.username,
                &intent.host,
            )
            .await
            .inspect_err(|e| log_store_error("grant", &account, e))
    }
}

/// Joins every group with each of its members into the desired account set.
///
/// Any fetch failure fails the whole collection; a partial desired set is never returned.
pub async fn collect_intents(
    source: &dyn IdentitySource,
) -> Result<Vec<AccountIntent>, OtuError> {
    let mut intents = Vec::new();
    for group in source.fetch_groups().await? {
        let target = group.grant_target();
        let members = source.fetch_members(&group.group_name).await?;
        debug!(
            "Group '{}' has {} member(s), granting {} ON {} at '{}'.",
            group.group_name,
            members.len(),
            target.privilege_type,
            target.privilege_level,
            target.host
        );
        intents.extend(members.iter().map(|member| AccountIntent::new(&target, member)));
    }
    Ok(intents)
}
