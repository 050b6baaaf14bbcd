//! Token Service: signs and verifies compact identity tokens
//!
//! Security notes:
//! - Tokens are signed with HS256 (HMAC-SHA256); any other `alg` is rejected
//! - Lifetime is fixed at 24 hours from issuance
//! - Tokens are never stored; signature + expiration decide validity
//! - In production, JWT_SECRET should be a strong random value from environment

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{GatehouseError, Identity};

/// Fixed token lifetime
pub const TOKEN_TTL_SECONDS: i64 = 24 * 60 * 60;

const MIN_SECRET_LEN: usize = 32;

/// Claim names owned by the service; callers cannot override them
const RESERVED_CLAIMS: [&str; 5] = ["sub", "role", "roles", "iat", "exp"];

/// Payload stored in the token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Identity handle (email)
    pub sub: String,
    /// Authority label of the primary role
    pub role: String,
    /// Authority labels of every role at issuance
    #[serde(default)]
    pub roles: Vec<String>,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Caller-supplied claims
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    pub fn subject(&self) -> &str {
        &self.sub
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.iat, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    pub fn expiration(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// True iff the expiration is strictly before `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exp < now.timestamp()
    }
}

/// Token issuer and verifier
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtService {
    /// Create a token service from a shared secret
    ///
    /// Returns an error if the secret is empty or too short
    pub fn new(secret: &str) -> Result<Self, GatehouseError> {
        if secret.is_empty() {
            return Err(GatehouseError::Config(
                "JWT_SECRET is required in production mode".into(),
            ));
        }

        if secret.len() < MIN_SECRET_LEN {
            return Err(GatehouseError::Config(format!(
                "JWT_SECRET must be at least {MIN_SECRET_LEN} characters"
            )));
        }

        Ok(Self::from_secret(secret.as_bytes()))
    }

    /// Create a token service for dev mode
    pub fn new_dev() -> Self {
        Self::from_secret(b"dev-mode-secret-not-for-production-use-123456")
    }

    fn from_secret(secret: &[u8]) -> Self {
        // Expiry is checked separately so an expired token can be told apart
        // from a forged one.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["sub", "exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Issue a token for `identity`, valid for 24 hours from now
    pub fn issue(
        &self,
        identity: &Identity,
        extra_claims: Map<String, Value>,
    ) -> Result<String, GatehouseError> {
        self.issue_at(identity, extra_claims, Utc::now())
    }

    /// Issue a token with an explicit issuance time
    ///
    /// Identical inputs produce identical tokens.
    pub fn issue_at(
        &self,
        identity: &Identity,
        mut extra_claims: Map<String, Value>,
        issued_at: DateTime<Utc>,
    ) -> Result<String, GatehouseError> {
        for reserved in RESERVED_CLAIMS {
            extra_claims.remove(reserved);
        }

        let claims = Claims {
            sub: identity.handle().to_string(),
            role: identity.primary_role().authority().to_string(),
            roles: identity
                .authorities()
                .into_iter()
                .map(str::to_string)
                .collect(),
            iat: issued_at.timestamp(),
            exp: (issued_at + Duration::seconds(TOKEN_TTL_SECONDS)).timestamp(),
            extra: extra_claims,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| GatehouseError::Internal(format!("Failed to sign token: {e}")))
    }

    /// Decode a token and check its signature
    ///
    /// Does not look at expiration; see [`JwtService::is_expired`].
    pub fn verify(&self, token: &str) -> Result<Claims, GatehouseError> {
        use jsonwebtoken::errors::ErrorKind;

        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| {
                let reason = match err.kind() {
                    ErrorKind::InvalidSignature => "signature mismatch",
                    ErrorKind::InvalidAlgorithm => "unsupported algorithm",
                    ErrorKind::InvalidToken => "malformed token",
                    ErrorKind::MissingRequiredClaim(_) => "missing required claim",
                    ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
                        "undecodable token"
                    }
                    _ => "token validation failed",
                };
                GatehouseError::TokenInvalid(reason.to_string())
            })
    }

    /// True iff the claims expired strictly before the current time
    pub fn is_expired(&self, claims: &Claims) -> bool {
        claims.is_expired_at(Utc::now())
    }

    /// Check that verified claims belong to `identity` and are still live
    pub fn check(&self, claims: &Claims, identity: &Identity) -> Result<(), GatehouseError> {
        if claims.subject() != identity.handle() {
            return Err(GatehouseError::TokenInvalid("subject mismatch".into()));
        }
        if self.is_expired(claims) {
            return Err(GatehouseError::TokenExpired);
        }
        Ok(())
    }

    /// Verify a token and check it against `identity`
    pub fn validate(&self, token: &str, identity: &Identity) -> Result<Claims, GatehouseError> {
        let claims = self.verify(token)?;
        self.check(&claims, identity)?;
        Ok(claims)
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
///
/// Anything else, including other schemes and raw tokens, yields `None`.
pub fn extract_bearer_token(auth_header: Option<&str>) -> Option<&str> {
    let token = auth_header?.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
