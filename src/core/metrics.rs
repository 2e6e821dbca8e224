// src/core/metrics.rs

//! Defines and registers Prometheus metrics for the reconcile and sweep tasks.
//!
//! This module uses `lazy_static` to ensure that metrics are registered only once
//! globally for the entire application lifecycle.

use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Gauge, TextEncoder, register_counter, register_counter_vec,
    register_gauge,
};

lazy_static! {
    /// 1 when the last ping of the credential store succeeded, 0 otherwise.
    pub static ref DB_STATUS: Gauge =
        register_gauge!("ps_otu_sqlsync_db_status", "Database connection status").unwrap();

    /// Accounts created and granted by the reconcile task.
    pub static ref USERS_CREATED_TOTAL: Counter =
        register_counter!("ps_otu_sqlsync_users_created_total", "The total number of users created").unwrap();
    /// Accounts dropped by the sweep task.
    pub static ref USERS_DROPPED_TOTAL: Counter =
        register_counter!("ps_otu_sqlsync_users_dropped_total", "The total number of users dropped").unwrap();
    /// Reconcile cycles abandoned because desired state could not be fetched.
    pub static ref RECONCILE_FAILURES_TOTAL: Counter =
        register_counter!("ps_otu_sqlsync_reconcile_failures_total", "Reconcile cycles aborted by identity source errors").unwrap();
    /// Failed store operations, labeled by operation name.
    pub static ref OPERATION_ERRORS_TOTAL: CounterVec =
        register_counter_vec!("ps_otu_sqlsync_operation_errors_total", "Failed credential store operations, labeled by operation.", &["operation"]).unwrap();
}

/// Gathers all registered metrics and encodes them in the Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_else(|e| format!("# failed to encode metrics: {e}\n"))
}

pub fn set_db_status(reachable: bool) {
    DB_STATUS.set(if reachable { 1.0 } else { 0.0 });
}

pub fn record_operation_error(operation: &str) {
    OPERATION_ERRORS_TOTAL.with_label_values(&[operation]).inc();
}
