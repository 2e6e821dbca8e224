// src/main.rs

//! The main entry point for the otu-sqlsync service.

use anyhow::Result;
use otu_sqlsync::config::Config;
use otu_sqlsync::server;
use std::env;
use tracing::{error, warn};
use tracing_subscriber::{filter::EnvFilter, prelude::*, reload};

#[tokio::main]
async fn main() -> Result<()> {
    const VERSION: &str = env!("OTU_SQLSYNC_BUILD_VERSION");

    let args: Vec<String> = env::args().collect();

    if args.contains(&"--version".to_string()) {
        println!("otu-sqlsync version {VERSION}");
        return Ok(());
    }

    // RUST_LOG wins; otherwise start at info and switch to the configured level below.
    let rust_log = env::var("RUST_LOG").ok();
    let initial_log_level = rust_log.clone().unwrap_or_else(|| "info".to_string());
    let (filter, reload_handle) = reload::Layer::new(EnvFilter::new(initial_log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().compact().with_ansi(true))
        .init();

    // An explicit --config file is optional; the environment can carry everything.
    let config_path = match args.iter().position(|arg| arg == "--config") {
        Some(i) => match args.get(i + 1) {
            Some(path) => Some(path.as_str()),
            None => {
                eprintln!("--config flag requires a value");
                std::process::exit(1);
            }
        },
        None => None,
    };

    let config = match Config::load(config_path, |key| env::var(key).ok()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Invalid configuration: {e:#}");
            std::process::exit(1);
        }
    };

    if rust_log.is_none()
        && let Err(e) = reload_handle.reload(EnvFilter::new(&config.log_level))
    {
        warn!("Failed to apply log level '{}': {}", config.log_level, e);
    }

    if let Err(e) = server::run(config).await {
        error!("Service runtime error: {:#}", e);
        return Err(e);
    }

    Ok(())
}
