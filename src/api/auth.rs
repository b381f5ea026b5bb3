use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::{ApiError, AppState};

/// Shared-secret check for the transport adapter.
///
/// Accepts the key from:
/// 1. `X-Api-Key` header
/// 2. `Authorization: Bearer <api_key>` header
///
/// When `server.api_key` is unset every request passes.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    let expected = state.config().read().await.server.api_key.clone();

    let Some(expected) = expected.filter(|k| !k.is_empty()) else {
        return next.run(request).await;
    };

    match extract_api_key(&headers) {
        Some(key) if key == expected => next.run(request).await,
        Some(_) => ApiError::Unauthorized("Invalid API key".to_string()).into_response(),
        None => ApiError::Unauthorized("Missing API key".to_string()).into_response(),
    }
}

fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    if let Some(api_key) = headers.get("X-Api-Key")
        && let Ok(key_str) = api_key.to_str()
    {
        return Some(key_str.to_string());
    }

    if let Some(auth_header) = headers.get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        return Some(token.trim().to_string());
    }

    None
}
