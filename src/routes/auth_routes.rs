//! HTTP Routes for Authentication
//!
//! - POST /api/auth/register     - Create an identity and get a token
//! - POST /api/auth/authenticate - Exchange email and password for a token
//! - GET  /api/auth/me           - Current identity from the token

use bytes::Bytes;
use chrono::{DateTime, Utc};
use hyper::{Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::auth::AuthContext;
use crate::server::{json_response, AppState, FullBody};
use crate::types::{GatehouseError, Result};

const PASSWORD_MIN: usize = 3;
const PASSWORD_MAX: usize = 20;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl RegisterRequest {
    /// First failing rule, if any
    pub fn validate(&self) -> Result<()> {
        require_non_blank(&self.first_name, "First name is required")?;
        require_non_blank(&self.last_name, "Last name is required")?;
        validate_email(&self.email)?;
        validate_password(&self.password)
    }
}

#[derive(Debug, Deserialize)]
pub struct AuthenticationRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl AuthenticationRequest {
    pub fn validate(&self) -> Result<()> {
        validate_email(&self.email)?;
        validate_password(&self.password)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub roles: Vec<String>,
    pub authorities: Vec<&'static str>,
    /// Lifetime of the token the request was made with
    pub token_issued_at: DateTime<Utc>,
    pub token_expires_at: DateTime<Utc>,
}

fn require_non_blank(value: &str, message: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(GatehouseError::ValidationFailed(message.to_string()));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<()> {
    require_non_blank(email, "Email is required")?;
    if !is_well_formed_email(email) {
        return Err(GatehouseError::ValidationFailed(
            "Email should be valid".to_string(),
        ));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<()> {
    require_non_blank(password, "Password is required")?;
    let len = password.chars().count();
    if !(PASSWORD_MIN..=PASSWORD_MAX).contains(&len) {
        return Err(GatehouseError::ValidationFailed(format!(
            "Password must be between {} and {} characters",
            PASSWORD_MIN, PASSWORD_MAX
        )));
    }
    Ok(())
}

/// `local@domain`, no whitespace, non-empty parts, no trailing dot in domain
fn is_well_formed_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

fn parse_json<'a, T: Deserialize<'a>>(body: &'a Bytes) -> Result<T> {
    Ok(serde_json::from_slice(body)?)
}

// =============================================================================
// Route Handlers
// =============================================================================

/// POST /api/auth/register
pub async fn handle_register(state: &AppState, body: &Bytes) -> Result<Response<FullBody>> {
    let request: RegisterRequest = parse_json(body)?;
    request.validate()?;

    let response = state
        .auth
        .register(
            request.first_name.trim(),
            request.last_name.trim(),
            &request.email,
            &request.password,
        )
        .await?;

    Ok(json_response(StatusCode::OK, &response))
}

/// POST /api/auth/authenticate
pub async fn handle_authenticate(state: &AppState, body: &Bytes) -> Result<Response<FullBody>> {
    let request: AuthenticationRequest = parse_json(body)?;
    request.validate()?;

    let response = state
        .auth
        .authenticate(&request.email, &request.password)
        .await?;

    Ok(json_response(StatusCode::OK, &response))
}

/// GET /api/auth/me
pub fn handle_me(context: Option<&AuthContext>) -> Result<Response<FullBody>> {
    let context = context.ok_or(GatehouseError::Unauthenticated)?;
    let identity = context.identity();
    let claims = context.claims();

    Ok(json_response(
        StatusCode::OK,
        &MeResponse {
            email: identity.handle().to_string(),
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
            roles: context.roles().iter().map(|r| r.name().to_string()).collect(),
            authorities: context.authorities(),
            token_issued_at: claims.issued_at(),
            token_expires_at: claims.expiration(),
        },
    ))
}
