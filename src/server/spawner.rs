// src/server/spawner.rs

//! Spawns all of the service's long-running background tasks.

use super::context::ServiceContext;
use super::metrics_server;
use crate::core::tasks::{reconcile::ReconcileTask, sweep::SweepTask};
use anyhow::anyhow;
use tracing::info;

/// Spawns the reconcile task, the sweep task and, if enabled, the metrics server into the
/// context's JoinSet.
///
/// The loops only return after shutdown is broadcast, so their tasks report an error when
/// they do. The supervisor treats that as fatal unless it is already draining.
pub fn spawn_all(ctx: &mut ServiceContext) {
    let shutdown_tx = &ctx.shutdown_tx;
    let background_tasks = &mut ctx.background_tasks;

    // --- Metrics Server ---
    if ctx.config.metrics.enabled {
        let port = ctx.config.metrics.port;
        let shutdown_rx_metrics = shutdown_tx.subscribe();
        background_tasks.spawn(async move {
            metrics_server::run_metrics_server(port, shutdown_rx_metrics).await
        });
    } else {
        info!("Prometheus metrics server is disabled in the configuration.");
    }

    // --- Sweep Task ---
    let sweep = SweepTask::new(ctx.state.clone(), ctx.config.cleanup_interval);
    let shutdown_rx_sweep = shutdown_tx.subscribe();
    background_tasks.spawn(async move {
        sweep.run(shutdown_rx_sweep).await;
        Err(anyhow!("sweep task stopped"))
    });

    // --- Reconcile Task ---
    let reconcile = ReconcileTask::new(ctx.state.clone(), ctx.config.poll_interval);
    let shutdown_rx_reconcile = shutdown_tx.subscribe();
    background_tasks.spawn(async move {
        reconcile.run(shutdown_rx_reconcile).await;
        Err(anyhow!("reconcile task stopped"))
    });

    info!("All background tasks have been spawned.");
}
