//! MongoDB client, collection wrapper and identity store

use async_trait::async_trait;
use bson::{doc, Bson, DateTime, Document};
use mongodb::{error::ErrorKind, options::IndexOptions, Client, Collection, IndexModel};
use serde::{de::DeserializeOwned, Serialize};
use tracing::info;

use crate::db::schemas::{IdentityDoc, Metadata, IDENTITY_COLLECTION};
use crate::db::IdentityStore;
use crate::types::{GatehouseError, Identity, Result};

/// MongoDB server error code for unique index violations
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Connect and ping the database
    pub async fn new(uri: &str, db_name: &str) -> Result<Self> {
        info!("Connecting to MongoDB at {}", uri);

        // Use serverSelectionTimeoutMS to avoid hanging on unreachable MongoDB
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| GatehouseError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| GatehouseError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection, creating its indexes
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
{
    /// Open a collection and apply its schema indexes
    pub async fn new(client: &Client, db_name: &str, collection_name: &str) -> Result<Self> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    async fn apply_indexes(&self) -> Result<()> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| GatehouseError::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Insert a document, stamping its metadata
    ///
    /// Returns the raw driver error so callers can tell index violations apart.
    pub async fn insert_one(&self, mut item: T) -> std::result::Result<Bson, mongodb::error::Error> {
        let metadata = item.mut_metadata();
        metadata.is_deleted = false;
        metadata.created_at = Some(DateTime::now());
        metadata.updated_at = Some(DateTime::now());

        let result = self.inner.insert_one(item).await?;
        Ok(result.inserted_id)
    }

    /// Find one live (not soft-deleted) document by filter
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>> {
        let mut full_filter = filter;
        full_filter.insert("metadata.is_deleted", doc! { "$ne": true });

        self.inner
            .find_one(full_filter)
            .await
            .map_err(|e| GatehouseError::Database(format!("Find failed: {}", e)))
    }
}

/// Identity store on a MongoDB collection with a unique `email` index
#[derive(Clone)]
pub struct MongoIdentityStore {
    identities: MongoCollection<IdentityDoc>,
}

impl MongoIdentityStore {
    pub async fn new(client: &MongoClient) -> Result<Self> {
        let identities = client.collection::<IdentityDoc>(IDENTITY_COLLECTION).await?;
        Ok(Self { identities })
    }
}

#[async_trait]
impl IdentityStore for MongoIdentityStore {
    async fn find_by_handle(&self, handle: &str) -> Result<Option<Identity>> {
        let found = self.identities.find_one(doc! { "email": handle }).await?;
        Ok(found.map(Identity::from))
    }

    async fn save(&self, identity: Identity) -> Result<Identity> {
        let handle = identity.email.clone();
        let doc = IdentityDoc::from(identity.clone());

        match self.identities.insert_one(doc).await {
            Ok(inserted_id) => {
                let id = inserted_id.as_object_id().ok_or_else(|| {
                    GatehouseError::Database("Inserted identity has no ObjectId".into())
                })?;
                let mut saved = identity;
                saved.id = Some(id.to_hex());
                Ok(saved)
            }
            // The unique index settles concurrent registrations of one handle
            Err(e) if is_duplicate_key(&e) => Err(GatehouseError::DuplicateIdentity(handle)),
            Err(e) => Err(GatehouseError::Database(format!("Insert failed: {}", e))),
        }
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(mongodb::error::WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY_CODE
        }
        _ => err.to_string().contains("E11000"),
    }
}
