use axum::{
    Json,
    extract::{Path, State},
};
use std::sync::Arc;

use super::validation::validate_user_id;
use super::{ApiError, ApiResponse, AppState, OnboardingInputRequest, OnboardingStatusDto};
use crate::services::Reply;

/// `POST /api/onboarding/{user_id}/begin`
pub async fn begin(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiResponse<Reply>>, ApiError> {
    let user_id = validate_user_id(user_id)?;
    Ok(Json(ApiResponse::success(
        state.onboarding().begin(user_id).await,
    )))
}

/// `POST /api/onboarding/{user_id}/input`
///
/// The transport calls this for free text whenever `GET /api/onboarding/{id}`
/// reports the user as awaiting.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Json(request): Json<OnboardingInputRequest>,
) -> Result<Json<ApiResponse<Reply>>, ApiError> {
    let user_id = validate_user_id(user_id)?;
    let reply = state.onboarding().submit(user_id, &request.text).await?;
    Ok(Json(ApiResponse::success(reply)))
}

/// `POST /api/onboarding/{user_id}/cancel`
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiResponse<Reply>>, ApiError> {
    let user_id = validate_user_id(user_id)?;
    Ok(Json(ApiResponse::success(
        state.onboarding().cancel(user_id).await,
    )))
}

/// `GET /api/onboarding/{user_id}`
pub async fn status(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiResponse<OnboardingStatusDto>>, ApiError> {
    let user_id = validate_user_id(user_id)?;
    let awaiting = state.onboarding().is_awaiting(user_id).await;
    Ok(Json(ApiResponse::success(OnboardingStatusDto {
        user_id,
        awaiting,
    })))
}
