//! Identity document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::auth::Role;
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::types::Identity;

/// Collection name for identities
pub const IDENTITY_COLLECTION: &str = "identities";

/// Identity document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct IdentityDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub first_name: String,

    pub last_name: String,

    /// Unique handle
    pub email: String,

    /// Argon2 password hash
    pub password_hash: String,

    #[serde(default)]
    pub roles: Vec<Role>,
}

impl From<Identity> for IdentityDoc {
    fn from(identity: Identity) -> Self {
        let roles = identity.roles().iter().copied().collect();
        Self {
            _id: identity
                .id
                .as_deref()
                .and_then(|id| ObjectId::parse_str(id).ok()),
            metadata: Metadata::new(),
            first_name: identity.first_name,
            last_name: identity.last_name,
            email: identity.email,
            password_hash: identity.password_hash,
            roles,
        }
    }
}

impl From<IdentityDoc> for Identity {
    fn from(doc: IdentityDoc) -> Self {
        let mut identity = Identity::new(
            doc.first_name,
            doc.last_name,
            doc.email,
            doc.password_hash,
            doc.roles,
        );
        identity.id = doc._id.map(|id| id.to_hex());
        identity
    }
}

impl IntoIndexes for IdentityDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "email": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("email_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for IdentityDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
