// src/core/model.rs

//! Data types exchanged between the identity source, the reconciliation engine and the
//! credential store.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Property key naming the MySQL host pattern an account is created for.
pub const PROP_HOST: &str = "host";
/// Property key naming the privilege type granted to members.
pub const PROP_PRIV_TYPE: &str = "priv_type";
/// Property key naming the privilege level (`db.table`) granted to members.
pub const PROP_PRIV_LEVEL: &str = "priv_level";

pub const DEFAULT_HOST: &str = "%";
pub const DEFAULT_PRIV_TYPE: &str = "SELECT";
pub const DEFAULT_PRIV_LEVEL: &str = "*.*";

/// A single free-form key/value attached to a group.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CustomProperty {
    pub key: String,
    pub value: String,
}

/// An authorizing group as reported by the identity API.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Group {
    pub group_name: String,
    #[serde(default)]
    pub ldap_group_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub custom_properties: Vec<CustomProperty>,
    #[serde(default)]
    pub lease_time: i64,
    #[serde(default)]
    pub create_time: i64,
    #[serde(default)]
    pub create_by: String,
}

/// Decodes a list that the API may send as `null` when it is empty.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Group {
    /// Collapses the property list into a map. Later duplicates win.
    pub fn properties(&self) -> HashMap<String, String> {
        self.custom_properties
            .iter()
            .map(|p| (p.key.clone(), p.value.clone()))
            .collect()
    }

    /// Resolves the grant target for this group, substituting the read-only defaults for
    /// any property the group does not set.
    pub fn grant_target(&self) -> GrantTarget {
        let mut props = self.properties();
        let mut take = |key: &str, default: &str| {
            props
                .remove(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        GrantTarget {
            host: take(PROP_HOST, DEFAULT_HOST),
            privilege_type: take(PROP_PRIV_TYPE, DEFAULT_PRIV_TYPE),
            privilege_level: take(PROP_PRIV_LEVEL, DEFAULT_PRIV_LEVEL),
        }
    }
}

/// A member of a group, carrying the credential to provision.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Member {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub group_name: String,
    /// Unix seconds after which the account must be dropped.
    pub expire_time: i64,
    #[serde(default)]
    pub create_time: i64,
    #[serde(default)]
    pub create_by: String,
}

/// Where and what a group's members are granted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantTarget {
    pub host: String,
    pub privilege_type: String,
    pub privilege_level: String,
}

impl Default for GrantTarget {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            privilege_type: DEFAULT_PRIV_TYPE.to_string(),
            privilege_level: DEFAULT_PRIV_LEVEL.to_string(),
        }
    }
}

/// One account the identity source says should exist right now.
#[derive(Clone, PartialEq, Eq)]
pub struct AccountIntent {
    pub username: String,
    pub password: String,
    pub host: String,
    pub privilege_type: String,
    pub privilege_level: String,
    pub expire_time: i64,
}

impl AccountIntent {
    pub fn new(target: &GrantTarget, member: &Member) -> Self {
        Self {
            username: member.username.clone(),
            password: member.password.clone(),
            host: target.host.clone(),
            privilege_type: target.privilege_type.clone(),
            privilege_level: target.privilege_level.clone(),
            expire_time: member.expire_time,
        }
    }
}

// Passwords never reach the logs.
impl std::fmt::Debug for AccountIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountIntent")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("privilege_type", &self.privilege_type)
            .field("privilege_level", &self.privilege_level)
            .field("expire_time", &self.expire_time)
            .finish()
    }
}

/// The durable bookkeeping row for a provisioned account, keyed by `(host, user)`.
///
/// An `expire_time` of zero means the account is no longer desired and is due for drop.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OtuRecord {
    pub host: String,
    pub user: String,
    pub expire_time: i64,
}

impl OtuRecord {
    pub fn is_due(&self, now: i64) -> bool {
        self.expire_time <= now
    }
}

impl std::fmt::Display for OtuRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}'@'{}'", self.user, self.host)
    }
}
