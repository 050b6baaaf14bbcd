//! In-process identity store

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::db::IdentityStore;
use crate::types::{GatehouseError, Identity, Result};

/// Identity store backed by a concurrent map keyed by handle
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    identities: DashMap<String, Identity>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// Drop the identity registered under `handle`
    pub fn remove(&self, handle: &str) -> Option<Identity> {
        self.identities.remove(handle).map(|(_, identity)| identity)
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn find_by_handle(&self, handle: &str) -> Result<Option<Identity>> {
        Ok(self.identities.get(handle).map(|entry| entry.value().clone()))
    }

    async fn save(&self, mut identity: Identity) -> Result<Identity> {
        match self.identities.entry(identity.email.clone()) {
            Entry::Occupied(_) => Err(GatehouseError::DuplicateIdentity(identity.email)),
            Entry::Vacant(slot) => {
                if identity.id.is_none() {
                    identity.id = Some(Uuid::new_v4().to_string());
                }
                slot.insert(identity.clone());
                Ok(identity)
            }
        }
    }
}
