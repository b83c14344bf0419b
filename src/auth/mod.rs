//! Operator authentication for the admin API.
//!
//! When an admin key is configured, every `/api` request must present it either in the
//! `x-api-key` header or as a bearer token. Keys are compared in constant time.

use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::errors::AppError;

/// Header name for the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Middleware rejecting requests that do not carry the configured admin key.
pub async fn admin_key_layer(expected: Option<String>, request: Request, next: Next) -> Response {
    // No key configured: open access (local development)
    let Some(expected) = expected else {
        return next.run(request).await;
    };

    let rejection = match presented_key(request.headers()) {
        Some(key) if keys_match(key, &expected) => None,
        Some(_) => Some("Invalid API key"),
        None => Some("Missing API key"),
    };

    match rejection {
        None => next.run(request).await,
        Some(message) => AppError::Unauthorized(message.to_string()).into_response(),
    }
}

/// Key from `x-api-key`, falling back to `Authorization: Bearer`.
fn presented_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
        })
}

fn keys_match(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}
