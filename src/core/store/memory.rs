// src/core/store/memory.rs

//! A process-local credential store. Used for dry runs (`database.backend = "memory"`),
//! where accounts are only tracked, never provisioned, and by the test suite.

use super::CredentialStore;
use super::identifier::{account_name, normalize_privilege_type, validate_privilege_level};
use crate::core::errors::OtuError;
use crate::core::model::OtuRecord;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;

type AccountKey = (String, String);

/// A provisioned account and the grants applied to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryAccount {
    pub password: String,
    pub grants: Vec<String>,
}

#[derive(Debug, Default)]
struct MemoryState {
    /// Keyed by `(host, user)`, the same primary key as the MySQL table.
    records: BTreeMap<AccountKey, i64>,
    accounts: BTreeMap<AccountKey, MemoryAccount>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every bookkeeping record in `(host, user)` order.
    pub fn records(&self) -> Vec<OtuRecord> {
        self.state
            .lock()
            .records
            .iter()
            .map(|((host, user), expire_time)| OtuRecord {
                host: host.clone(),
                user: user.clone(),
                expire_time: *expire_time,
            })
            .collect()
    }

    pub fn record(&self, host: &str, user: &str) -> Option<OtuRecord> {
        self.state
            .lock()
            .records
            .get(&(host.to_string(), user.to_string()))
            .map(|expire_time| OtuRecord {
                host: host.to_string(),
                user: user.to_string(),
                expire_time: *expire_time,
            })
    }

    pub fn account(&self, host: &str, user: &str) -> Option<MemoryAccount> {
        self.state
            .lock()
            .accounts
            .get(&(host.to_string(), user.to_string()))
            .cloned()
    }

    /// Writes a record directly, bypassing account provisioning. Useful to model rows
    /// left behind by an earlier process.
    pub fn insert_record(&self, host: &str, user: &str, expire_time: i64) {
        self.state
            .lock()
            .records
            .insert((host.to_string(), user.to_string()), expire_time);
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn create_account(
        &self,
        host: &str,
        user: &str,
        password: &str,
        expire_time: i64,
    ) -> Result<(), OtuError> {
        account_name(user, host)?;
        let key = (host.to_string(), user.to_string());
        let mut state = self.state.lock();
        state.records.entry(key.clone()).or_insert(expire_time);
        state.accounts.entry(key).or_insert_with(|| MemoryAccount {
            password: password.to_string(),
            grants: Vec::new(),
        });
        Ok(())
    }

    async fn grant(
        &self,
        privilege_type: &str,
        privilege_level: &str,
        user: &str,
        host: &str,
    ) -> Result<(), OtuError> {
        let account = account_name(user, host)?;
        let privilege = normalize_privilege_type(privilege_type)?;
        let level = validate_privilege_level(privilege_level)?;

        let mut state = self.state.lock();
        let Some(entry) = state
            .accounts
            .get_mut(&(host.to_string(), user.to_string()))
        else {
            return Err(OtuError::GrantRejected(format!(
                "account {account} does not exist"
            )));
        };
        let grant = format!("{privilege} ON {level}");
        if !entry.grants.contains(&grant) {
            entry.grants.push(grant);
        }
        Ok(())
    }

    async fn list_expired(&self, now: i64) -> Result<Vec<OtuRecord>, OtuError> {
        Ok(self
            .records()
            .into_iter()
            .filter(|record| record.is_due(now))
            .collect())
    }

    async fn mark_not_intended(&self, keep: &[String]) -> Result<u64, OtuError> {
        let mut state = self.state.lock();
        let mut changed = 0;
        for ((_, user), expire_time) in state.records.iter_mut() {
            if !keep.contains(user) && *expire_time != 0 {
                *expire_time = 0;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn drop_account(&self, record: &OtuRecord) -> Result<(), OtuError> {
        account_name(&record.user, &record.host)?;
        let key = (record.host.clone(), record.user.clone());
        let mut state = self.state.lock();
        state.accounts.remove(&key);
        state.records.remove(&key);
        Ok(())
    }

    async fn ping(&self) -> Result<(), OtuError> {
        Ok(())
    }
}
