//! Per-request bearer token authentication
//!
//! Runs before any authorization decision. Token problems never fail the
//! request here: the request simply continues without an identity and the
//! access policy decides whether that is acceptable for the route.

use hyper::header::{HeaderMap, AUTHORIZATION};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::auth::{extract_bearer_token, AuthContext, JwtService};
use crate::db::IdentityStore;
use crate::types::GatehouseError;

/// Establishes the request's [`AuthContext`] from its `Authorization` header
#[derive(Clone)]
pub struct AuthInterceptor {
    tokens: Arc<JwtService>,
    store: Arc<dyn IdentityStore>,
}

impl AuthInterceptor {
    pub fn new(tokens: Arc<JwtService>, store: Arc<dyn IdentityStore>) -> Self {
        Self { tokens, store }
    }

    /// Populate `context` from the request headers.
    ///
    /// Leaves `context` untouched when it is already set, when no bearer token
    /// is offered, or when the token does not check out.
    pub async fn authenticate(&self, headers: &HeaderMap, context: &mut Option<AuthContext>) {
        if context.is_some() {
            return;
        }

        let header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
        let Some(token) = extract_bearer_token(header) else {
            return;
        };

        match self.resolve(token).await {
            Ok(resolved) => {
                debug!(
                    "Authenticated {} with authorities {:?}",
                    resolved.handle(),
                    resolved.authorities()
                );
                *context = Some(resolved);
            }
            Err(GatehouseError::Database(e)) => {
                warn!("Identity lookup failed during authentication: {}", e);
            }
            Err(e) => {
                debug!("Continuing unauthenticated: {}", e);
            }
        }
    }

    async fn resolve(&self, token: &str) -> Result<AuthContext, GatehouseError> {
        let claims = self.tokens.verify(token)?;

        let identity = self
            .store
            .find_by_handle(claims.subject())
            .await?
            .ok_or_else(|| GatehouseError::IdentityNotFound(claims.subject().to_string()))?;

        self.tokens.check(&claims, &identity)?;

        Ok(AuthContext::new(identity, claims))
    }
}
