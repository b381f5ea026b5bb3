use axum::{
    Json,
    extract::{Path, State},
};
use std::sync::Arc;

use super::validation::{validate_locale, validate_result_limit, validate_user_id};
use super::{ApiError, ApiResponse, AppState, PreferencesDto, UpdatePreferencesRequest};
use crate::models::PreferencesPatch;

/// `GET /api/preferences/{user_id}`
pub async fn get_preferences(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiResponse<PreferencesDto>>, ApiError> {
    let user_id = validate_user_id(user_id)?;
    let prefs = state.preferences().get(user_id).await?;
    Ok(Json(ApiResponse::success(PreferencesDto::new(
        user_id, &prefs,
    ))))
}

/// `PATCH /api/preferences/{user_id}`
pub async fn update_preferences(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Json(request): Json<UpdatePreferencesRequest>,
) -> Result<Json<ApiResponse<PreferencesDto>>, ApiError> {
    let user_id = validate_user_id(user_id)?;

    let patch = PreferencesPatch {
        show_thumbnail: request.show_thumbnail,
        result_limit: request.result_limit.map(validate_result_limit).transpose()?,
        locale: request.locale.as_deref().map(validate_locale).transpose()?,
    };

    if patch.is_empty() {
        return Err(ApiError::validation("No preference fields supplied"));
    }

    let prefs = state.preferences().update(user_id, &patch).await?;
    Ok(Json(ApiResponse::success(PreferencesDto::new(
        user_id, &prefs,
    ))))
}
