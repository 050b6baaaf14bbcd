//! Shared types for Gatehouse

pub mod error;
pub mod identity;

pub use error::{GatehouseError, Result};
pub use identity::Identity;
