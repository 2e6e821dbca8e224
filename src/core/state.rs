// src/core/state.rs

use crate::core::cache::PresenceCache;
use crate::core::identity::IdentitySource;
use crate::core::store::CredentialStore;
use std::sync::Arc;

/// The collaborators shared by the reconcile and sweep tasks. The tasks never call each
/// other; the store and the cache are the only things they have in common.
#[derive(Clone)]
pub struct ServiceState {
    pub store: Arc<dyn CredentialStore>,
    pub identity: Arc<dyn IdentitySource>,
    pub cache: Arc<PresenceCache>,
}

impl ServiceState {
    pub fn new(store: Arc<dyn CredentialStore>, identity: Arc<dyn IdentitySource>) -> Self {
        Self {
            store,
            identity,
            cache: Arc::new(PresenceCache::new()),
        }
    }
}
