//! Shared-secret request authentication.
//!
//! CRUD endpoints require the configured API key in the `X-API-Key`
//! header. The streaming endpoint stays open: the browser viewer fetches
//! document bytes directly and cannot attach custom headers there.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::web::WebState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Reject requests that don't carry the configured shared secret.
///
/// An unset secret never means open; guarded routes answer 503 until the
/// operator configures one.
pub async fn require_api_key(
    State(state): State<WebState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.api_key.as_deref() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": "API key is not configured"})),
        )
            .into_response();
    };

    let presented = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    match presented {
        Some(key) if key == expected => next.run(request).await,
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Unauthorized"})),
        )
            .into_response(),
    }
}
