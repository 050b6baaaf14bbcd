//! HTTP routes for Gatehouse
//!
//! The route table is the single place that declares, per route, which
//! handler runs and which roles it demands. The access policy's allowlist and
//! URL rules are declared next to it.

pub mod auth_routes;
pub mod greeting;
pub mod health;

use bytes::Bytes;
use hyper::{Method, Response};

use crate::auth::{check_roles, AccessPolicy, AuthContext, PathPattern, Role};
use crate::server::{AppState, FullBody};
use crate::types::{GatehouseError, Result};

pub use health::health_check;

/// Handlers known to the router
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Health,
    Register,
    Authenticate,
    Me,
    HelloPublic,
    HelloProtected,
    HelloAdmin,
    HelloModeration,
}

/// One entry of the route table
#[derive(Debug, Clone)]
pub struct Route {
    pub method: Method,
    pub pattern: PathPattern,
    /// Per-operation rule: `Some(&[])` demands authentication only
    pub roles: Option<&'static [Role]>,
    pub endpoint: Endpoint,
}

impl Route {
    fn new(method: Method, pattern: &str, endpoint: Endpoint) -> Self {
        Self {
            method,
            pattern: PathPattern::new(pattern),
            roles: None,
            endpoint,
        }
    }

    fn requires(mut self, roles: &'static [Role]) -> Self {
        self.roles = Some(roles);
        self
    }

    /// Run the per-operation role rule, if any
    pub fn guard(&self, context: Option<&AuthContext>) -> Result<()> {
        match self.roles {
            Some(required) => check_roles(context, required).into_result(),
            None => Ok(()),
        }
    }
}

/// Static route table
#[derive(Debug, Clone)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: vec![
                Route::new(Method::GET, "/health", Endpoint::Health),
                Route::new(Method::GET, "/healthz", Endpoint::Health),
                Route::new(Method::POST, "/api/auth/register", Endpoint::Register),
                Route::new(Method::POST, "/api/auth/authenticate", Endpoint::Authenticate),
                Route::new(Method::GET, "/api/auth/me", Endpoint::Me).requires(&[]),
                Route::new(Method::GET, "/api/greeting/sayHelloPublic", Endpoint::HelloPublic),
                Route::new(
                    Method::GET,
                    "/api/greeting/sayHelloProtected",
                    Endpoint::HelloProtected,
                ),
                Route::new(Method::GET, "/api/greeting/sayHelloAdmin/**", Endpoint::HelloAdmin),
                Route::new(
                    Method::GET,
                    "/api/greeting/sayHelloModeration",
                    Endpoint::HelloModeration,
                )
                .requires(&[Role::Moderator, Role::Admin]),
            ],
        }
    }

    /// Find the route for a request
    pub fn resolve(&self, method: &Method, path: &str) -> Result<&Route> {
        self.routes
            .iter()
            .find(|route| route.method == *method && route.pattern.matches(path))
            .ok_or_else(|| GatehouseError::NotFound(format!("{method} {path}")))
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

/// Allowlist and URL role rules for the routes above
pub fn access_policy() -> AccessPolicy {
    AccessPolicy::new()
        .permit_all("/health")
        .permit_all("/healthz")
        .permit_all("/api/auth/**")
        .permit_all("/api/greeting/sayHelloPublic")
        .require_any("/api/greeting/sayHelloAdmin/**", &[Role::Admin])
}

/// Run the handler for `route`
pub async fn dispatch(
    state: &AppState,
    route: &Route,
    body: Bytes,
    context: Option<&AuthContext>,
) -> Result<Response<FullBody>> {
    match route.endpoint {
        Endpoint::Health => Ok(health_check(state)),
        Endpoint::Register => auth_routes::handle_register(state, &body).await,
        Endpoint::Authenticate => auth_routes::handle_authenticate(state, &body).await,
        Endpoint::Me => auth_routes::handle_me(context),
        Endpoint::HelloPublic => Ok(greeting::say_hello_public()),
        Endpoint::HelloProtected => Ok(greeting::say_hello_protected()),
        Endpoint::HelloAdmin => Ok(greeting::say_hello_admin()),
        Endpoint::HelloModeration => Ok(greeting::say_hello_moderation()),
    }
}
