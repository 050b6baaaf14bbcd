//! Response helpers and error rendering
//!
//! Errors reach the client through one of two writers:
//! - [`error_response`] for failures returned by a handler
//! - [`write_error_response`] for denials raised before any handler runs,
//!   which write straight into a bare response
//!
//! Both emit the same [`ErrorBody`] shape and status codes.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http_body_util::Full;
use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, CONTENT_TYPE,
};
use hyper::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::types::GatehouseError;

pub type FullBody = Full<Bytes>;

/// Structured error payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status: u16,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorBody {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: status.as_u16(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

impl From<&GatehouseError> for ErrorBody {
    fn from(err: &GatehouseError) -> Self {
        Self::new(err.status_code(), err.public_message())
    }
}

/// Serialize `body` as a JSON response with CORS headers
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<FullBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    let mut response = Response::new(Full::new(Bytes::from(json)));
    *response.status_mut() = status;
    set_json_headers(&mut response);
    response
}

/// Plain text response with CORS headers
pub fn text_response(status: StatusCode, text: impl Into<String>) -> Response<FullBody> {
    let mut response = Response::new(Full::new(Bytes::from(text.into())));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    set_cors_headers(&mut response);
    response
}

/// Render an error returned from the handler pipeline
pub fn error_response(err: &GatehouseError) -> Response<FullBody> {
    if err.is_unexpected() {
        error!("Request failed: {}", err);
    }
    json_response(err.status_code(), &ErrorBody::from(err))
}

/// Overwrite `response` with an error payload
///
/// Used where no handler pipeline exists yet.
pub fn write_error_response(response: &mut Response<FullBody>, status: StatusCode, message: &str) {
    let body = ErrorBody::new(status, message);
    let json = serde_json::to_string(&body).unwrap_or_else(|_| "{}".to_string());

    *response.status_mut() = status;
    *response.body_mut() = Full::new(Bytes::from(json));
    set_json_headers(response);
}

/// CORS preflight response
pub fn preflight_response() -> Response<FullBody> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::NO_CONTENT;
    set_cors_headers(&mut response);
    response
        .headers_mut()
        .insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
    response
}

fn set_json_headers(response: &mut Response<FullBody>) {
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    set_cors_headers(response);
}

fn set_cors_headers(response: &mut Response<FullBody>) {
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
}
