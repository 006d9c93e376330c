//! API key authentication middleware.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::config::SecurityConfig;

/// Path that stays reachable without a key, for monitoring.
pub const HEALTH_PATH: &str = "/api/health";

/// API key authentication middleware.
///
/// Accepts the key in the `X-API-Key` header or as an
/// `Authorization: Bearer <key>` header. Returns 401 Unauthorized if the
/// key is missing or wrong.
pub async fn api_key_auth(
    headers: HeaderMap,
    State(config): State<Arc<SecurityConfig>>,
    request: Request,
    next: Next,
) -> Response {
    if !config.api_key_enabled || request.uri().path() == HEALTH_PATH {
        return next.run(request).await;
    }

    let valid = match (&config.api_key, provided_key(&headers)) {
        (Some(expected), Some(provided)) => {
            bool::from(expected.as_bytes().ct_eq(provided.as_bytes()))
        }
        _ => false,
    };

    if valid {
        next.run(request).await
    } else {
        warn!("API key authentication failed for {}", request.uri().path());
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": "Invalid or missing API key",
                "hint": "Provide a valid API key in the X-API-Key header or as a Bearer token"
            })),
        )
            .into_response()
    }
}

/// The key a client presented, if any.
fn provided_key(headers: &HeaderMap) -> Option<&str> {
    if let Some(key) = headers.get("X-API-Key").and_then(|v| v.to_str().ok()) {
        return Some(key);
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}
