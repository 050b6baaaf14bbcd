//! Configuration for Gatehouse
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;

use crate::auth::JwtService;
use crate::types::GatehouseError;

/// Gatehouse - bearer token authentication gateway
#[derive(Parser, Debug, Clone)]
#[command(name = "gatehouse")]
#[command(about = "Stateless token authentication and role-based authorization gateway")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Enable development mode (built-in signing key, in-memory store allowed)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// MongoDB connection URI; the in-memory store is used when unset
    #[arg(long, env = "MONGODB_URI")]
    pub mongodb_uri: Option<String>,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "gatehouse")]
    pub mongodb_db: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,

    /// Bootstrap administrator
    #[command(flatten)]
    pub admin: AdminArgs,
}

/// Administrator created at startup when both values are set
#[derive(Parser, Debug, Clone, Default)]
pub struct AdminArgs {
    /// Email of the bootstrap administrator
    #[arg(long = "admin-email", env = "ADMIN_EMAIL")]
    pub email: Option<String>,

    /// Password of the bootstrap administrator
    #[arg(long = "admin-password", env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

impl AdminArgs {
    /// Email and password, if both are configured
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.email, &self.password) {
            (Some(email), Some(password)) => Some((email, password)),
            _ => None,
        }
    }
}

impl Args {
    /// Build the token service from the configured secret (dev key in dev mode)
    pub fn token_service(&self) -> Result<JwtService, GatehouseError> {
        match (&self.jwt_secret, self.dev_mode) {
            (Some(secret), _) => JwtService::new(secret),
            (None, true) => Ok(JwtService::new_dev()),
            (None, false) => Err(GatehouseError::Config(
                "JWT_SECRET is required in production mode".into(),
            )),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode && self.jwt_secret.is_none() {
            return Err("JWT_SECRET is required in production mode".to_string());
        }

        if self.admin.email.is_some() != self.admin.password.is_some() {
            return Err("ADMIN_EMAIL and ADMIN_PASSWORD must be set together".to_string());
        }

        Ok(())
    }
}
