//! End-to-end request pipeline tests
//!
//! Drives `server::handle_request` with in-memory bodies against the memory
//! identity store. No network or MongoDB required.

use bytes::Bytes;
use chrono::{Duration, Utc};
use clap::Parser;
use http_body_util::{BodyExt, Full};
use hyper::header::{AUTHORIZATION, CONTENT_TYPE};
use hyper::{Method, Request, Response, StatusCode};
use serde_json::{json, Map, Value};
use std::net::SocketAddr;
use std::sync::Arc;

use gatehouse::auth::{JwtService, Role};
use gatehouse::db::{IdentityStore, MemoryIdentityStore};
use gatehouse::config::Args;
use gatehouse::server::{handle_request, AppState, FullBody};

struct Harness {
    state: Arc<AppState>,
    store: Arc<MemoryIdentityStore>,
}

impl Harness {
    fn new() -> Self {
        let store = Arc::new(MemoryIdentityStore::new());
        let args = Args::parse_from(["gatehouse", "--dev-mode"]);
        let state = Arc::new(AppState::new(args, JwtService::new_dev(), store.clone()));
        Self { state, store }
    }

    async fn send(&self, req: Request<Full<Bytes>>) -> Response<FullBody> {
        let addr: SocketAddr = "127.0.0.1:50000".parse().unwrap();
        handle_request(Arc::clone(&self.state), addr, req).await
    }

    async fn get(&self, path: &str, token: Option<&str>) -> Response<FullBody> {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Full::new(Bytes::new())).unwrap()).await
    }

    async fn get_with_header(&self, path: &str, header: &str) -> Response<FullBody> {
        let req = Request::builder()
            .method(Method::GET)
            .uri(path)
            .header(AUTHORIZATION, header)
            .body(Full::new(Bytes::new()))
            .unwrap();
        self.send(req).await
    }

    async fn post(&self, path: &str, body: Value) -> Response<FullBody> {
        self.post_raw(path, body.to_string()).await
    }

    async fn post_raw(&self, path: &str, body: impl Into<Bytes>) -> Response<FullBody> {
        let req = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(body.into()))
            .unwrap();
        self.send(req).await
    }

    async fn register(&self, email: &str, password: &str) -> String {
        let response = self
            .post(
                "/api/auth/register",
                json!({
                    "firstName": "Test",
                    "lastName": "User",
                    "email": email,
                    "password": password,
                }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        token_of(response).await
    }

    async fn login(&self, email: &str, password: &str) -> Response<FullBody> {
        self.post(
            "/api/auth/authenticate",
            json!({ "email": email, "password": password }),
        )
        .await
    }

    async fn provision(&self, email: &str, roles: &[Role]) -> String {
        assert!(self
            .state
            .auth
            .provision("Staff", "Member", email, "staff-pass", roles)
            .await
            .unwrap());
        token_of(self.login(email, "staff-pass").await).await
    }
}

async fn body_bytes(response: Response<FullBody>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

async fn body_json(response: Response<FullBody>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

async fn body_text(response: Response<FullBody>) -> String {
    String::from_utf8(body_bytes(response).await.to_vec()).unwrap()
}

async fn token_of(response: Response<FullBody>) -> String {
    let body = body_json(response).await;
    body["token"].as_str().unwrap().to_string()
}

fn assert_error_shape(body: &Value, status: u16) {
    assert_eq!(body["status"], status);
    assert!(body["message"].is_string());
    assert!(body["timestamp"].is_string());
    assert_eq!(body.as_object().unwrap().len(), 3);
}

// =============================================================================
// Public routes
// =============================================================================

#[tokio::test]
async fn test_public_route_without_token() {
    let h = Harness::new();
    let response = h.get("/api/greeting/sayHelloPublic", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "Hello from api");
}

#[tokio::test]
async fn test_garbled_token_on_public_route_is_ignored() {
    let h = Harness::new();
    let response = h
        .get("/api/greeting/sayHelloPublic", Some("not.a.token"))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_health_is_public() {
    let h = Harness::new();
    let response = h.get("/health", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["healthy"], true);
    assert_eq!(body["mode"], "development");
}

// =============================================================================
// Protected routes
// =============================================================================

#[tokio::test]
async fn test_protected_route_without_token() {
    let h = Harness::new();
    let response = h.get("/api/greeting/sayHelloProtected", None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get(CONTENT_TYPE).unwrap(),
        "application/json"
    );
    let body = body_json(response).await;
    assert_error_shape(&body, 401);
}

#[tokio::test]
async fn test_protected_route_with_basic_scheme() {
    let h = Harness::new();
    h.register("a@x.com", "secret123").await;

    let response = h
        .get_with_header("/api/greeting/sayHelloProtected", "Basic YTpi")
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_with_registration_token() {
    let h = Harness::new();
    let token = h.register("a@x.com", "secret123").await;

    let response = h.get("/api/greeting/sayHelloProtected", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "Hello from api protected");
}

#[tokio::test]
async fn test_tampered_token_is_rejected() {
    let h = Harness::new();
    let token = h.register("a@x.com", "secret123").await;

    let mut tampered = token.into_bytes();
    let i = tampered.len() - 6;
    tampered[i] = if tampered[i] == b'A' { b'B' } else { b'A' };
    let tampered = String::from_utf8(tampered).unwrap();

    let response = h
        .get("/api/greeting/sayHelloProtected", Some(&tampered))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let h = Harness::new();
    h.register("a@x.com", "secret123").await;

    let identity = h.store.find_by_handle("a@x.com").await.unwrap().unwrap();
    let stale = h
        .state
        .tokens
        .issue_at(&identity, Map::new(), Utc::now() - Duration::hours(25))
        .unwrap();

    let response = h.get("/api/greeting/sayHelloProtected", Some(&stale)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_for_deleted_identity_is_rejected() {
    let h = Harness::new();
    let token = h.register("a@x.com", "secret123").await;
    h.store.remove("a@x.com");

    let response = h.get("/api/greeting/sayHelloProtected", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_requires_authentication() {
    let h = Harness::new();

    let response = h.get("/api/auth/me", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_error_shape(&body_json(response).await, 401);
}

#[tokio::test]
async fn test_me_returns_ambient_identity() {
    let h = Harness::new();
    let token = h.register("a@x.com", "secret123").await;

    let response = h.get("/api/auth/me", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["email"], "a@x.com");
    assert_eq!(body["firstName"], "Test");
    assert_eq!(body["roles"], json!(["USER"]));
    assert_eq!(body["authorities"], json!(["ROLE_USER"]));

    let claims = h.state.tokens.verify(&token).unwrap();
    let timestamp = |key: &str| {
        chrono::DateTime::parse_from_rfc3339(body[key].as_str().unwrap())
            .unwrap()
            .timestamp()
    };
    assert_eq!(timestamp("tokenExpiresAt"), claims.exp);
    assert_eq!(timestamp("tokenIssuedAt"), claims.iat);
}

#[tokio::test]
async fn test_unknown_route_when_authenticated_is_404() {
    let h = Harness::new();
    let token = h.register("a@x.com", "secret123").await;

    let response = h.get("/api/nowhere", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_error_shape(&body_json(response).await, 404);
}

// =============================================================================
// Roles
// =============================================================================

#[tokio::test]
async fn test_admin_route_forbidden_for_user() {
    let h = Harness::new();
    let token = h.register("a@x.com", "secret123").await;

    let response = h.get("/api/greeting/sayHelloAdmin", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_error_shape(&body_json(response).await, 403);
}

#[tokio::test]
async fn test_admin_route_without_token_is_401_not_403() {
    let h = Harness::new();

    let response = h.get("/api/greeting/sayHelloAdmin", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_route_for_admin() {
    let h = Harness::new();
    let token = h.provision("root@x.com", &[Role::Admin, Role::User]).await;

    let response = h.get("/api/greeting/sayHelloAdmin", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "Hello Admin");

    let response = h
        .get("/api/greeting/sayHelloAdmin/nested/path", Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_moderation_route() {
    let h = Harness::new();
    let user = h.register("a@x.com", "secret123").await;
    let moderator = h.provision("mod@x.com", &[Role::Moderator]).await;
    let admin = h.provision("root@x.com", &[Role::Admin]).await;

    let response = h
        .get("/api/greeting/sayHelloModeration", Some(&user))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_error_shape(&body_json(response).await, 403);

    for token in [&moderator, &admin] {
        let response = h
            .get("/api/greeting/sayHelloModeration", Some(token))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "Hello Moderator or Admin");
    }

    let response = h.get("/api/greeting/sayHelloModeration", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Registration and login
// =============================================================================

#[tokio::test]
async fn test_register_then_authenticate() {
    let h = Harness::new();
    let registered = h.register("a@x.com", "secret123").await;

    let response = h.login("a@x.com", "secret123").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let token = body["token"].as_str().unwrap();
    assert!(body["expiresAt"].is_string());

    let claims = h.state.tokens.verify(token).unwrap();
    let first = h.state.tokens.verify(&registered).unwrap();
    assert_eq!(claims.subject(), "a@x.com");
    assert_eq!(claims.subject(), first.subject());
}

#[tokio::test]
async fn test_duplicate_registration_is_409() {
    let h = Harness::new();
    h.register("dup@x.com", "secret123").await;

    let response = h
        .post(
            "/api/auth/register",
            json!({
                "firstName": "Other",
                "lastName": "Person",
                "email": "dup@x.com",
                "password": "different",
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = body_json(response).await;
    assert_error_shape(&body, 409);
    assert!(body["message"].as_str().unwrap().contains("dup@x.com"));
    assert_eq!(h.store.len(), 1);
}

#[tokio::test]
async fn test_unknown_email_is_bad_credentials() {
    let h = Harness::new();

    let response = h.login("missing@x.com", "whatever").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await["message"],
        "Invalid credentials. Check the email and password."
    );
}

#[tokio::test]
async fn test_wrong_password_is_bad_credentials() {
    let h = Harness::new();
    h.register("a@x.com", "secret123").await;

    let response = h.login("a@x.com", "secret124").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_validation_failures_are_400() {
    let h = Harness::new();

    let response = h
        .post(
            "/api/auth/register",
            json!({ "firstName": "", "lastName": "L", "email": "a@x.com", "password": "abc" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "First name is required");

    let response = h.login("a@x.com", "ab").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = h.post_raw("/api/auth/authenticate", "{oops").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_error_shape(&body, 400);
    assert_eq!(body["message"], "Malformed request body");

    assert!(h.store.is_empty());
}
