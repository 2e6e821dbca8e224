// src/core/cache.rs

//! An in-memory record of which accounts this process has already provisioned.

use parking_lot::Mutex;
use std::collections::HashMap;

/// Maps usernames to the expiry they were last provisioned with.
///
/// Presence means a create + grant already succeeded in this process, so the reconcile
/// task can skip the account. Absence means nothing: the cache starts empty on every boot
/// and the sweep task evicts entries concurrently. The credential store stays the source
/// of truth.
///
/// The lock is held for a single map operation only and never across an `.await`.
#[derive(Debug, Default)]
pub struct PresenceCache {
    users: Mutex<HashMap<String, i64>>,
}

impl PresenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exists(&self, username: &str) -> bool {
        self.users.lock().contains_key(username)
    }

    pub fn get(&self, username: &str) -> Option<i64> {
        self.users.lock().get(username).copied()
    }

    pub fn set(&self, username: &str, expire_time: i64) {
        self.users.lock().insert(username.to_string(), expire_time);
    }

    /// Removes an entry, returning the expiry it held.
    pub fn delete(&self, username: &str) -> Option<i64> {
        self.users.lock().remove(username)
    }

    /// Returns a copy of every entry. Later mutations are not reflected in it.
    pub fn snapshot(&self) -> HashMap<String, i64> {
        self.users.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.users.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.lock().is_empty()
    }
}
