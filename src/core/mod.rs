// src/core/mod.rs

//! The reconciliation engine: desired state from the identity source, durable state in
//! the credential store, and the two tasks that keep them converged.

pub mod cache;
pub mod errors;
pub mod identity;
pub mod metrics;
pub mod model;
pub mod state;
pub mod store;
pub mod tasks;

pub use cache::PresenceCache;
pub use errors::OtuError;
pub use state::ServiceState;
