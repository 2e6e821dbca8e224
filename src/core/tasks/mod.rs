// src/core/tasks/mod.rs

//! The two long-running loops of the service. They run on independent timers and only
//! meet through the credential store and the presence cache.

pub mod reconcile;
pub mod sweep;

use crate::core::errors::OtuError;
use crate::core::metrics;
use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{error, warn};

/// A ticker whose first tick fires one full period after creation. Ticks missed while a
/// cycle overran are not replayed in a burst.
pub(crate) fn ticker(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Logs a failed store operation and counts it. Connectivity problems are warnings,
/// rejections are errors.
pub(crate) fn log_store_error(operation: &'static str, account: &str, e: &OtuError) {
    metrics::record_operation_error(operation);
    if e.is_transient() {
        warn!("{} failed for {}: {}", operation, account, e);
    } else {
        error!("{} failed for {}: {}", operation, account, e);
    }
}

/// Renders a unix timestamp for log lines.
pub fn format_expiry(expire_time: i64) -> String {
    chrono::DateTime::from_timestamp(expire_time, 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| expire_time.to_string())
}
