//! Sample greeting endpoints, one per access level

use hyper::{Response, StatusCode};

use crate::server::{text_response, FullBody};

/// GET /api/greeting/sayHelloPublic
pub fn say_hello_public() -> Response<FullBody> {
    text_response(StatusCode::OK, "Hello from api")
}

/// GET /api/greeting/sayHelloProtected
pub fn say_hello_protected() -> Response<FullBody> {
    text_response(StatusCode::OK, "Hello from api protected")
}

/// GET /api/greeting/sayHelloAdmin/**
pub fn say_hello_admin() -> Response<FullBody> {
    text_response(StatusCode::OK, "Hello Admin")
}

/// GET /api/greeting/sayHelloModeration
pub fn say_hello_moderation() -> Response<FullBody> {
    text_response(StatusCode::OK, "Hello Moderator or Admin")
}
