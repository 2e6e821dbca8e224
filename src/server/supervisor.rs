// src/server/supervisor.rs

//! Waits for a shutdown signal or a failed task, then drains the background tasks.

use super::context::ServiceContext;
use anyhow::{Result, anyhow};
use std::time::Duration;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{error, info, warn};

/// How long in-flight cycles get to finish after shutdown is signaled.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Blocks until SIGINT/SIGTERM or until a background task fails or panics.
///
/// Failed tasks are not restarted: the error is returned so the process exits non-zero
/// and its supervisor can start a fresh one.
pub async fn run(mut ctx: ServiceContext) -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow!("Failed to register SIGINT handler: {}", e))?;
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow!("Failed to register SIGTERM handler: {}", e))?;

    let mut outcome = Ok(());
    loop {
        tokio::select! {
            biased;

            _ = sigint.recv() => {
                info!("SIGINT received, initiating graceful shutdown.");
                break;
            }
            _ = sigterm.recv() => {
                info!("SIGTERM received, initiating graceful shutdown.");
                break;
            }

            res = ctx.background_tasks.join_next() => {
                match res {
                    Some(Ok(Ok(()))) => warn!("A background task finished unexpectedly without an error."),
                    Some(Ok(Err(e))) => {
                        error!("CRITICAL: Background task failed: {}. Shutting down.", e);
                        outcome = Err(e);
                        break;
                    }
                    Some(Err(e)) => {
                        error!("CRITICAL: Background task panicked: {e:?}. Shutting down.");
                        outcome = Err(anyhow!("background task panicked: {e}"));
                        break;
                    }
                    None => {
                        outcome = Err(anyhow!("all background tasks have terminated"));
                        break;
                    }
                }
            }
        }
    }

    // Stop new ticks; cycles already running are allowed to finish.
    let _ = ctx.shutdown_tx.send(());

    info!("Waiting for background tasks to finish...");
    if tokio::time::timeout(DRAIN_TIMEOUT, async {
        while ctx.background_tasks.join_next().await.is_some() {}
    })
    .await
    .is_err()
    {
        warn!("Timed out waiting for background tasks to finish cleanly.");
    };
    info!("Shutting down...");
    outcome
}
