//! Route-level access policy
//!
//! Evaluated once per request, after authentication and before any handler:
//! 1. allowlisted routes are permitted outright
//! 2. every other route needs an authenticated context
//! 3. routes with a role rule need one of the listed roles
//!
//! The first decision reached is final.

use std::fmt;

use crate::auth::{AuthContext, Role};
use crate::types::GatehouseError;

/// Outcome of an access check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Permitted,
    Denied(Denial),
}

/// Why access was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// No identity on a protected route
    Unauthenticated,
    /// Identity lacks every acceptable role
    Forbidden,
}

impl Decision {
    /// `Ok` when permitted, the matching error otherwise
    pub fn into_result(self) -> Result<(), GatehouseError> {
        match self {
            Decision::Permitted => Ok(()),
            Decision::Denied(denial) => Err(denial.into()),
        }
    }
}

impl From<Denial> for GatehouseError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::Unauthenticated => GatehouseError::Unauthenticated,
            Denial::Forbidden => GatehouseError::Forbidden,
        }
    }
}

/// Path pattern with `*` (one segment) and trailing `/**` (any suffix) wildcards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<String>,
    any_suffix: bool,
}

impl PathPattern {
    pub fn new(pattern: &str) -> Self {
        let (base, any_suffix) = match pattern.strip_suffix("/**") {
            Some(base) => (base, true),
            None => (pattern, false),
        };
        Self {
            raw: pattern.to_string(),
            segments: split_path(base).map(str::to_string).collect(),
            any_suffix,
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        let parts: Vec<&str> = split_path(path).collect();

        if parts.len() < self.segments.len()
            || (!self.any_suffix && parts.len() != self.segments.len())
        {
            return false;
        }

        self.segments
            .iter()
            .zip(&parts)
            .all(|(pattern, part)| pattern == "*" || pattern == part)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('?')
        .next()
        .unwrap_or_default()
        .split('/')
        .filter(|segment| !segment.is_empty())
}

#[derive(Debug, Clone)]
struct RoleRule {
    pattern: PathPattern,
    roles: Vec<Role>,
}

/// Allowlist plus role rules, fixed at startup
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    public: Vec<PathPattern>,
    rules: Vec<RoleRule>,
}

impl AccessPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make routes matching `pattern` reachable without a token
    pub fn permit_all(mut self, pattern: &str) -> Self {
        self.public.push(PathPattern::new(pattern));
        self
    }

    /// Require one of `roles` on routes matching `pattern`
    pub fn require_any(mut self, pattern: &str, roles: &[Role]) -> Self {
        self.rules.push(RoleRule {
            pattern: PathPattern::new(pattern),
            roles: roles.to_vec(),
        });
        self
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.public.iter().any(|pattern| pattern.matches(path))
    }

    pub fn evaluate(&self, path: &str, context: Option<&AuthContext>) -> Decision {
        if self.is_public(path) {
            return Decision::Permitted;
        }

        let Some(context) = context else {
            return Decision::Denied(Denial::Unauthenticated);
        };

        match self.rules.iter().find(|rule| rule.pattern.matches(path)) {
            Some(rule) => check_roles(Some(context), &rule.roles),
            None => Decision::Permitted,
        }
    }
}

/// Per-operation guard: require an identity holding one of `required`.
///
/// An empty `required` list only demands authentication.
pub fn check_roles(context: Option<&AuthContext>, required: &[Role]) -> Decision {
    match context {
        None => Decision::Denied(Denial::Unauthenticated),
        Some(_) if required.is_empty() => Decision::Permitted,
        Some(ctx) if ctx.has_any_role(required) => Decision::Permitted,
        Some(_) => Decision::Denied(Denial::Forbidden),
    }
}
