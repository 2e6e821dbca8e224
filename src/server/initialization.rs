// src/server/initialization.rs

//! Builds the credential store, the identity client and the shared state before any task
//! is started.

use super::context::ServiceContext;
use crate::config::{Config, StoreBackend};
use crate::core::identity::{HttpIdentitySource, IdentitySource};
use crate::core::metrics;
use crate::core::state::ServiceState;
use crate::core::store::{CredentialStore, MemoryStore, MySqlStore};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Initializes all service components. Any failure here is fatal.
pub async fn setup(config: Config) -> Result<ServiceContext> {
    log_startup_info(&config);
    let (shutdown_tx, _) = broadcast::channel(1);

    let store = setup_store(&config).await?;
    let identity: Arc<dyn IdentitySource> = Arc::new(
        HttpIdentitySource::new(&config.identity).context("Failed to build identity client")?,
    );

    let state = Arc::new(ServiceState::new(store, identity));
    info!("Service state initialized.");

    Ok(ServiceContext {
        config,
        state,
        shutdown_tx,
        background_tasks: JoinSet::new(),
    })
}

/// Connects to the configured backend and prepares its bookkeeping table.
async fn setup_store(config: &Config) -> Result<Arc<dyn CredentialStore>> {
    match config.database.backend {
        StoreBackend::Mysql => {
            let db = &config.database;
            let store = MySqlStore::connect(db).await.with_context(|| {
                format!("Failed to connect to MySQL at {}:{}", db.server, db.port)
            })?;
            store
                .prepare()
                .await
                .with_context(|| format!("Failed to prepare the '{}' database", db.schema))?;
            metrics::set_db_status(true);
            info!("Successfully prepared {} database...", db.schema);
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            warn!("Running with the in-memory store. No database accounts will be provisioned.");
            metrics::set_db_status(true);
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Logs key configuration parameters at startup. Secrets are never printed.
fn log_startup_info(config: &Config) {
    info!(
        "otu-sqlsync starting: store {:?} at {}:{}, identity API {} for group(s) [{}].",
        config.database.backend,
        config.database.server,
        config.database.port,
        config.identity.api_url,
        config.identity.ldap_groups.join(", ")
    );
    info!(
        "Poll interval {:?}, cleanup interval {:?}.",
        config.poll_interval, config.cleanup_interval
    );
}
