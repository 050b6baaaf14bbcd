//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling.
//!
//! Each request runs through a fixed pipeline:
//! 1. CORS preflight short-circuit
//! 2. bearer token authentication (never rejects)
//! 3. route access policy (denials written straight to the response)
//! 4. route lookup and per-operation role rule
//! 5. handler dispatch
//!
//! The authentication context lives only for the duration of one call to
//! [`handle_request`] and is dropped with it.

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::error::Error as StdError;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::auth::{AccessPolicy, AuthContext, AuthInterceptor, Decision, JwtService};
use crate::config::Args;
use crate::db::IdentityStore;
use crate::routes::{self, Router};
use crate::server::response::{
    error_response, preflight_response, write_error_response, FullBody,
};
use crate::services::AuthService;
use crate::types::{GatehouseError, Result};

/// Largest request body accepted, in bytes
pub const MAX_BODY_BYTES: usize = 10 * 1024;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub tokens: Arc<JwtService>,
    pub store: Arc<dyn IdentityStore>,
    pub interceptor: AuthInterceptor,
    pub policy: AccessPolicy,
    pub router: Router,
    pub auth: AuthService,
}

impl AppState {
    /// Wire the pipeline around a token service and an identity store
    pub fn new(args: Args, tokens: JwtService, store: Arc<dyn IdentityStore>) -> Self {
        let tokens = Arc::new(tokens);
        Self {
            args,
            interceptor: AuthInterceptor::new(Arc::clone(&tokens), Arc::clone(&store)),
            policy: routes::access_policy(),
            router: Router::new(),
            auth: AuthService::with_store(Arc::clone(&store), Arc::clone(&tokens)),
            tokens,
            store,
        }
    }
}

/// Run the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("Gatehouse listening on {}", state.args.listen);

    if state.args.dev_mode {
        warn!("Development mode enabled - tokens are signed with the built-in dev key");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { Ok::<_, Infallible>(handle_request(state, addr, req).await) }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Handle one request end to end
pub async fn handle_request<B>(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<B>,
) -> Response<FullBody>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let (parts, body) = req.into_parts();
    let path = parts.uri.path().to_string();

    info!("[{}] {} {}", addr, parts.method, path);

    if parts.method == Method::OPTIONS {
        return preflight_response();
    }

    let mut context: Option<AuthContext> = None;
    state.interceptor.authenticate(&parts.headers, &mut context).await;

    if let Decision::Denied(denial) = state.policy.evaluate(&path, context.as_ref()) {
        let err = GatehouseError::from(denial);
        debug!("[{}] {} denied by access policy: {}", addr, path, err);

        let mut response = Response::new(Full::new(Bytes::new()));
        write_error_response(&mut response, err.status_code(), &err.public_message());
        return response;
    }

    match process(&state, &parts.method, &path, body, context.as_ref()).await {
        Ok(response) => response,
        Err(e) => {
            debug!("[{}] {} failed: {}", addr, path, e);
            error_response(&e)
        }
    }
}

async fn process<B>(
    state: &AppState,
    method: &Method,
    path: &str,
    body: B,
    context: Option<&AuthContext>,
) -> Result<Response<FullBody>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let route = state.router.resolve(method, path)?;
    route.guard(context)?;

    let body = read_body(body).await?;
    routes::dispatch(state, route, body, context).await
}

/// Read at most [`MAX_BODY_BYTES`]; larger bodies are refused mid-stream
async fn read_body<B>(body: B) -> Result<Bytes>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let collected = Limited::new(body, MAX_BODY_BYTES).collect().await.map_err(|e| {
        if e.downcast_ref::<LengthLimitError>().is_some() {
            GatehouseError::ValidationFailed("Request body too large".into())
        } else {
            GatehouseError::ValidationFailed(format!("Failed to read body: {}", e))
        }
    })?;

    Ok(collected.to_bytes())
}
