//! Registration and login orchestration
//!
//! Bridges the identity store to token issuance:
//! - register: uniqueness check, hash, persist, issue
//! - authenticate: verify credential, re-fetch identity, issue

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Map;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{hash_password, verify_password, JwtService, Role};
use crate::db::IdentityStore;
use crate::types::{GatehouseError, Identity, Result};

/// Token envelope returned by register and authenticate
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Checks a raw credential for a handle
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// `Ok(())` if `password` matches; `BadCredentials` on mismatch or unknown handle
    async fn authenticate(&self, handle: &str, password: &str) -> Result<()>;
}

/// Authenticator that compares against the hash held in the identity store
pub struct StoreAuthenticator {
    store: Arc<dyn IdentityStore>,
}

impl StoreAuthenticator {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Authenticator for StoreAuthenticator {
    async fn authenticate(&self, handle: &str, password: &str) -> Result<()> {
        let Some(identity) = self.store.find_by_handle(handle).await? else {
            warn!("Login failed - unknown identity: {}", handle);
            return Err(GatehouseError::BadCredentials);
        };

        if verify_password(password, &identity.password_hash)? {
            Ok(())
        } else {
            warn!("Login failed - invalid password: {}", handle);
            Err(GatehouseError::BadCredentials)
        }
    }
}

/// Identity orchestrator
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn IdentityStore>,
    authenticator: Arc<dyn Authenticator>,
    tokens: Arc<JwtService>,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn IdentityStore>,
        authenticator: Arc<dyn Authenticator>,
        tokens: Arc<JwtService>,
    ) -> Self {
        Self {
            store,
            authenticator,
            tokens,
        }
    }

    /// Service wired to authenticate against the store it registers into
    pub fn with_store(store: Arc<dyn IdentityStore>, tokens: Arc<JwtService>) -> Self {
        let authenticator = Arc::new(StoreAuthenticator::new(Arc::clone(&store)));
        Self::new(store, authenticator, tokens)
    }

    /// Register a new identity with the default role and issue its first token
    pub async fn register(
        &self,
        first_name: &str,
        last_name: &str,
        handle: &str,
        password: &str,
    ) -> Result<AuthResponse> {
        if self.store.find_by_handle(handle).await?.is_some() {
            return Err(GatehouseError::DuplicateIdentity(handle.to_string()));
        }

        let identity = Identity::new(
            first_name,
            last_name,
            handle,
            hash_password(password)?,
            [Role::User],
        );
        let identity = self.store.save(identity).await?;

        info!("Registered new identity: {}", identity.handle());

        self.issue(&identity)
    }

    /// Verify a credential and issue a fresh token
    pub async fn authenticate(&self, handle: &str, password: &str) -> Result<AuthResponse> {
        self.authenticator.authenticate(handle, password).await?;

        // Identity data comes from the store, never from the request
        let identity = self
            .store
            .find_by_handle(handle)
            .await?
            .ok_or_else(|| GatehouseError::IdentityNotFound(handle.to_string()))?;

        info!("Login successful: {}", identity.handle());

        self.issue(&identity)
    }

    /// Create an identity with explicit roles unless the handle is taken.
    ///
    /// Returns whether an identity was created.
    pub async fn provision(
        &self,
        first_name: &str,
        last_name: &str,
        handle: &str,
        password: &str,
        roles: &[Role],
    ) -> Result<bool> {
        if self.store.find_by_handle(handle).await?.is_some() {
            return Ok(false);
        }

        let identity = Identity::new(
            first_name,
            last_name,
            handle,
            hash_password(password)?,
            roles.iter().copied(),
        );

        match self.store.save(identity).await {
            Ok(saved) => {
                info!("Provisioned identity {} with roles {:?}", saved.handle(), saved.roles());
                Ok(true)
            }
            Err(GatehouseError::DuplicateIdentity(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn issue(&self, identity: &Identity) -> Result<AuthResponse> {
        let token = self.tokens.issue(identity, Map::new())?;
        let expires_at = self.tokens.verify(&token)?.expiration();

        Ok(AuthResponse { token, expires_at })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryIdentityStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    /// Memory store that counts writes
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryIdentityStore,
        saves: AtomicUsize,
    }

    #[async_trait]
    impl IdentityStore for CountingStore {
        async fn find_by_handle(&self, handle: &str) -> Result<Option<Identity>> {
            self.inner.find_by_handle(handle).await
        }

        async fn save(&self, identity: Identity) -> Result<Identity> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            self.inner.save(identity).await
        }
    }

    /// Accepts any credential
    struct AcceptAll;

    #[async_trait]
    impl Authenticator for AcceptAll {
        async fn authenticate(&self, _handle: &str, _password: &str) -> Result<()> {
            Ok(())
        }
    }

    fn service(store: Arc<dyn IdentityStore>) -> (AuthService, Arc<JwtService>) {
        let tokens = Arc::new(JwtService::new_dev());
        (AuthService::with_store(store, Arc::clone(&tokens)), tokens)
    }

    #[tokio::test]
    async fn test_register_then_authenticate() {
        let (service, tokens) = service(Arc::new(MemoryIdentityStore::new()));

        let t1 = service
            .register("Ada", "Lovelace", "a@x.com", "secret123")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;
        let t2 = service.authenticate("a@x.com", "secret123").await.unwrap();

        let c1 = tokens.verify(&t1.token).unwrap();
        let c2 = tokens.verify(&t2.token).unwrap();
        assert_eq!(c1.subject(), "a@x.com");
        assert_eq!(c2.subject(), c1.subject());
        assert!(c2.iat > c1.iat);
        assert_eq!(t2.expires_at, c2.expiration());
    }

    #[tokio::test]
    async fn test_register_assigns_default_role_and_hashes() {
        let store = Arc::new(MemoryIdentityStore::new());
        let (service, tokens) = service(store.clone());

        let response = service
            .register("Ada", "Lovelace", "a@x.com", "secret123")
            .await
            .unwrap();

        let stored = store.find_by_handle("a@x.com").await.unwrap().unwrap();
        assert_eq!(stored.roles().iter().copied().collect::<Vec<_>>(), vec![Role::User]);
        assert_ne!(stored.password_hash, "secret123");
        assert!(verify_password("secret123", &stored.password_hash).unwrap());

        let claims = tokens.verify(&response.token).unwrap();
        assert_eq!(claims.role, "ROLE_USER");
    }

    #[tokio::test]
    async fn test_duplicate_register_performs_no_write() {
        let store = Arc::new(CountingStore::default());
        let (service, _) = service(store.clone());

        assert_ok!(service.register("A", "B", "dup@x.com", "secret123").await);
        let result = service.register("C", "D", "dup@x.com", "other-pass").await;

        assert!(matches!(result, Err(GatehouseError::DuplicateIdentity(h)) if h == "dup@x.com"));
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_handle_is_bad_credentials() {
        let (service, _) = service(Arc::new(MemoryIdentityStore::new()));

        let result = service.authenticate("missing@x.com", "x").await;
        assert!(matches!(result, Err(GatehouseError::BadCredentials)));
    }

    #[tokio::test]
    async fn test_wrong_password_is_bad_credentials() {
        let (service, _) = service(Arc::new(MemoryIdentityStore::new()));
        assert_ok!(service.register("A", "B", "a@x.com", "secret123").await);

        let result = service.authenticate("a@x.com", "secret124").await;
        assert!(matches!(result, Err(GatehouseError::BadCredentials)));
    }

    #[tokio::test]
    async fn test_vanished_identity_is_not_found() {
        let store = Arc::new(MemoryIdentityStore::new());
        let tokens = Arc::new(JwtService::new_dev());
        let service = AuthService::new(store, Arc::new(AcceptAll), tokens);

        let result = service.authenticate("ghost@x.com", "whatever").await;
        assert!(matches!(result, Err(GatehouseError::IdentityNotFound(h)) if h == "ghost@x.com"));
    }

    #[tokio::test]
    async fn test_provision_is_idempotent() {
        let store = Arc::new(MemoryIdentityStore::new());
        let (service, tokens) = service(store.clone());

        let created = service
            .provision("Root", "Admin", "root@x.com", "admin-pass", &[Role::Admin, Role::User])
            .await
            .unwrap();
        assert!(created);
        assert!(!service
            .provision("Root", "Admin", "root@x.com", "admin-pass", &[Role::Admin])
            .await
            .unwrap());

        let response = service.authenticate("root@x.com", "admin-pass").await.unwrap();
        let claims = tokens.verify(&response.token).unwrap();
        assert_eq!(claims.role, "ROLE_ADMIN");
        assert_err!(service.authenticate("root@x.com", "wrong").await);
    }
}
