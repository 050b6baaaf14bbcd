//! Authentication and authorization for Gatehouse
//!
//! Provides:
//! - JWT token issuance and validation
//! - Per-request bearer token authentication
//! - Route and role based access policy
//! - Password hashing with Argon2

pub mod context;
pub mod interceptor;
pub mod jwt;
pub mod password;
pub mod policy;
pub mod roles;

pub use context::AuthContext;
pub use interceptor::AuthInterceptor;
pub use jwt::{extract_bearer_token, Claims, JwtService, TOKEN_TTL_SECONDS};
pub use password::{hash_password, verify_password};
pub use policy::{check_roles, AccessPolicy, Decision, Denial, PathPattern};
pub use roles::Role;
