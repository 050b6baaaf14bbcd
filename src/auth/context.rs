//! Request-scoped authentication context
//!
//! Created by the interceptor at the start of a request and passed by value
//! down the pipeline. It is dropped with the request, on every path.

use std::collections::BTreeSet;

use crate::auth::{Claims, Role};
use crate::types::Identity;

/// Resolved identity for one request
#[derive(Debug, Clone)]
pub struct AuthContext {
    identity: Identity,
    claims: Claims,
}

impl AuthContext {
    pub fn new(identity: Identity, claims: Claims) -> Self {
        Self { identity, claims }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    pub fn handle(&self) -> &str {
        self.identity.handle()
    }

    /// Roles as currently stored, not as snapshotted in the token
    pub fn roles(&self) -> &BTreeSet<Role> {
        self.identity.roles()
    }

    pub fn authorities(&self) -> Vec<&'static str> {
        self.identity.authorities()
    }

    pub fn has_any_role(&self, required: &[Role]) -> bool {
        self.identity.has_any_role(required)
    }
}
