//! Application services

pub mod auth;

pub use auth::{AuthResponse, AuthService, Authenticator, StoreAuthenticator};
