// src/server/mod.rs

use crate::config::Config;
use anyhow::Result;

mod context;
mod initialization;
mod metrics_server;
mod spawner;
mod supervisor;

/// The service startup function, orchestrating all setup phases.
pub async fn run(config: Config) -> Result<()> {
    // 1. Connect the store, build the identity client and the shared cache.
    let mut ctx = initialization::setup(config).await?;

    // 2. Spawn the reconcile and sweep tasks and the metrics server.
    spawner::spawn_all(&mut ctx);

    // 3. Wait for a signal or for a task to die, then drain.
    supervisor::run(ctx).await
}
