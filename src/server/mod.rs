//! Server module - HTTP server and response rendering

pub mod http;
pub mod response;

pub use http::{handle_request, run, AppState, MAX_BODY_BYTES};
pub use response::{
    error_response, json_response, text_response, write_error_response, ErrorBody, FullBody,
};
