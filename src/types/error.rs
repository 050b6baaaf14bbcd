//! Error types for Gatehouse
//!
//! Every failure a request can hit ends up as one of these variants and is
//! rendered by the response helpers in `server::response`.

use hyper::StatusCode;
use tracing::debug;

/// Main error type for Gatehouse operations
#[derive(Debug, thiserror::Error)]
pub enum GatehouseError {
    /// Malformed, forged or wrong-algorithm token
    #[error("Invalid token: {0}")]
    TokenInvalid(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Identity not found: {0}")]
    IdentityNotFound(String),

    #[error("Identity already exists: {0}")]
    DuplicateIdentity(String),

    #[error("Bad credentials")]
    BadCredentials,

    #[error("Unauthenticated")]
    Unauthenticated,

    #[error("Forbidden")]
    Forbidden,

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatehouseError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::TokenInvalid(_) | Self::TokenExpired => StatusCode::UNAUTHORIZED,
            Self::IdentityNotFound(_) => StatusCode::NOT_FOUND,
            Self::DuplicateIdentity(_) => StatusCode::CONFLICT,
            Self::BadCredentials => StatusCode::UNAUTHORIZED,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Config(_) | Self::Database(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show to a client.
    ///
    /// Infrastructure failures collapse to one generic sentence; their detail
    /// only goes to the log.
    pub fn public_message(&self) -> String {
        match self {
            Self::TokenInvalid(_) | Self::TokenExpired | Self::Unauthenticated => {
                "Not authenticated, or the token is invalid or expired.".to_string()
            }
            Self::IdentityNotFound(handle) => format!("No identity found with email: {handle}"),
            Self::DuplicateIdentity(handle) => {
                format!("An identity already exists with email: {handle}")
            }
            Self::BadCredentials => {
                "Invalid credentials. Check the email and password.".to_string()
            }
            Self::Forbidden => {
                "You do not have sufficient permissions to access this resource.".to_string()
            }
            Self::ValidationFailed(message) => message.clone(),
            Self::NotFound(path) => format!("No route for {path}"),
            Self::Config(_) | Self::Database(_) | Self::Internal(_) => {
                "An unexpected error occurred.".to_string()
            }
        }
    }

    /// Whether this error hides its detail behind the generic 500 message
    pub fn is_unexpected(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Database(_) | Self::Internal(_))
    }
}

impl From<serde_json::Error> for GatehouseError {
    fn from(err: serde_json::Error) -> Self {
        debug!("Rejecting request body: {}", err);
        Self::ValidationFailed("Malformed request body".to_string())
    }
}

impl From<mongodb::error::Error> for GatehouseError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<std::io::Error> for GatehouseError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Result type alias for Gatehouse operations
pub type Result<T> = std::result::Result<T, GatehouseError>;
