use axum::{Json, extract::State};
use std::sync::Arc;

use super::validation::{validate_inline_query, validate_user_id};
use super::{ApiError, ApiResponse, AppState, InlineQueryRequest};
use crate::models::InlineResponse;

/// `POST /api/inline`
///
/// Resolves one inline query. Missing credentials and provider failures come
/// back as notice items with a 200, not as errors.
pub async fn resolve_inline(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InlineQueryRequest>,
) -> Result<Json<ApiResponse<InlineResponse>>, ApiError> {
    let user_id = validate_user_id(request.user_id)?;
    let query = validate_inline_query(&request.query)?;

    tracing::Span::current().record("user_id", request.user_id);

    let response = state.resolver().resolve(user_id, query).await?;
    Ok(Json(ApiResponse::success(response)))
}
