//! Common metadata for stored documents
//!
//! Tracks creation and update timestamps and the soft-delete flag.

use bson::DateTime;
use serde::{Deserialize, Serialize};

/// Common metadata for all documents
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Metadata {
    /// Soft-deleted documents are invisible to lookups
    #[serde(default)]
    pub is_deleted: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
}

impl Metadata {
    /// Create new metadata stamped with the current time
    pub fn new() -> Self {
        let now = DateTime::now();
        Self {
            is_deleted: false,
            updated_at: Some(now),
            created_at: Some(now),
        }
    }
}
