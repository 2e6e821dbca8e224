// src/core/store/mod.rs

//! The credential store: a durable `(host, user) -> expire_time` table plus the account
//! primitives (create, grant, drop) of the database server that holds the real users.

use crate::core::errors::OtuError;
use crate::core::model::OtuRecord;
use async_trait::async_trait;

pub mod identifier;
pub mod memory;
pub mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

/// The operations the reconcile and sweep tasks drive against the store.
///
/// Record changes are transactional. The account primitives are not, so every operation
/// is written to be safe to repeat on the next cycle after a partial failure.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Inserts the bookkeeping record if absent, then provisions the account.
    /// Both halves are idempotent.
    async fn create_account(
        &self,
        host: &str,
        user: &str,
        password: &str,
        expire_time: i64,
    ) -> Result<(), OtuError>;

    /// Grants `privilege_type ON privilege_level` to an existing account.
    async fn grant(
        &self,
        privilege_type: &str,
        privilege_level: &str,
        user: &str,
        host: &str,
    ) -> Result<(), OtuError>;

    /// Returns every record with `expire_time <= now`, zeroed records included, in
    /// `(host, user)` order.
    async fn list_expired(&self, now: i64) -> Result<Vec<OtuRecord>, OtuError>;

    /// Zeroes the expiry of every record whose user is not in `keep`. An empty `keep`
    /// zeroes every record. Returns the row count reported by the backend.
    async fn mark_not_intended(&self, keep: &[String]) -> Result<u64, OtuError>;

    /// Removes the account, then deletes its record. The record survives if the account
    /// removal fails, so the next sweep retries it.
    async fn drop_account(&self, record: &OtuRecord) -> Result<(), OtuError>;

    /// Checks that the store is reachable.
    async fn ping(&self) -> Result<(), OtuError>;
}
