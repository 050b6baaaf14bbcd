//! Health check endpoint
//!
//! Liveness only: returns 200 whenever the process is serving requests.

use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::server::{json_response, AppState, FullBody};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always true while the service answers
    pub healthy: bool,
    pub version: &'static str,
    pub timestamp: String,
    /// "development" or "production"
    pub mode: &'static str,
}

/// GET /health, /healthz
pub fn health_check(state: &AppState) -> Response<FullBody> {
    let response = HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
        mode: if state.args.dev_mode {
            "development"
        } else {
            "production"
        },
    };

    json_response(StatusCode::OK, &response)
}
