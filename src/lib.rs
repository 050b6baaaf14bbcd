//! Gatehouse - stateless bearer token authentication gateway
//!
//! Issues signed, self-contained tokens on registration and login, resolves
//! the caller's identity from the `Authorization` header on every request,
//! and enforces route-level and per-operation role rules before any handler
//! runs. No session state is kept between requests.

pub mod auth;
pub mod config;
pub mod db;
pub mod routes;
pub mod server;
pub mod services;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{GatehouseError, Result};
