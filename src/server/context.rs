// src/server/context.rs

use crate::config::Config;
use crate::core::state::ServiceState;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinSet;

/// Holds all the initialized state required to run the service's tasks.
pub struct ServiceContext {
    pub config: Config,
    pub state: Arc<ServiceState>,
    pub shutdown_tx: broadcast::Sender<()>,
    pub background_tasks: JoinSet<Result<(), anyhow::Error>>,
}
