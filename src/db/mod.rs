//! Identity storage for Gatehouse
//!
//! The store is the only place identities live. Two backends are provided:
//! an in-process map for development and tests, and MongoDB.

pub mod memory;
pub mod mongo;
pub mod schemas;

use async_trait::async_trait;

use crate::types::{Identity, Result};

pub use memory::MemoryIdentityStore;
pub use mongo::{MongoClient, MongoCollection, MongoIdentityStore};
pub use schemas::{IdentityDoc, Metadata};

/// Lookup-by-handle identity storage
///
/// Implementations synchronize internally; callers share one instance across
/// all requests.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Find the identity registered under `handle`
    async fn find_by_handle(&self, handle: &str) -> Result<Option<Identity>>;

    /// Persist a new identity, assigning its `id`.
    ///
    /// Fails with `DuplicateIdentity` if the handle is already taken.
    async fn save(&self, identity: Identity) -> Result<Identity>;
}
