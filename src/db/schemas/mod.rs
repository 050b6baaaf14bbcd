//! MongoDB document schemas

mod identity;
mod metadata;

pub use identity::{IdentityDoc, IDENTITY_COLLECTION};
pub use metadata::Metadata;
