// src/core/identity/mod.rs

//! The read-only view of the identity API: which groups authorize database access and
//! who is currently a member of each.

use crate::core::errors::OtuError;
use crate::core::model::{Group, Member};
use async_trait::async_trait;

pub mod client;

pub use client::HttpIdentitySource;

/// A source of desired state.
///
/// Implementations fail with [`OtuError::SourceUnavailable`] for network problems and
/// timeouts and with [`OtuError::SourceProtocol`] for responses they cannot understand.
#[async_trait]
pub trait IdentitySource: Send + Sync {
    /// Lists the groups attached to every configured authorizing group identifier.
    async fn fetch_groups(&self) -> Result<Vec<Group>, OtuError>;

    /// Lists the members of one group.
    async fn fetch_members(&self, group_name: &str) -> Result<Vec<Member>, OtuError>;
}
