//! System API endpoints: health probes and cache maintenance.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, CachePurgeDto};

#[derive(Debug, Serialize)]
pub struct HealthLiveResponse {
    pub status: &'static str,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize)]
pub struct HealthReadinessChecks {
    pub database: bool,
    pub provider_configured: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthReadyResponse {
    pub ready: bool,
    pub checks: HealthReadinessChecks,
}

/// `GET /api/system/health/live`
pub async fn health_live(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::success(HealthLiveResponse {
        status: "alive",
        uptime_seconds: state.start_time.elapsed().as_secs(),
    }))
}

/// `GET /api/system/health/ready`
///
/// Ready when the database answers. A missing search engine id is reported
/// but does not fail readiness, since cached results can still be served.
pub async fn health_ready(State(state): State<Arc<AppState>>) -> Response {
    let db_ready = state.store().ping().await.is_ok();

    let provider_configured = !state
        .config()
        .read()
        .await
        .provider
        .collection_id
        .is_empty();

    let status = if db_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ApiResponse::success(HealthReadyResponse {
            ready: db_ready,
            checks: HealthReadinessChecks {
                database: db_ready,
                provider_configured,
            },
        })),
    )
        .into_response()
}

/// `DELETE /api/cache`
///
/// Removes expired cache entries. Fresh entries are never touched.
pub async fn purge_cache(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<CachePurgeDto>>, ApiError> {
    let removed = state.cache().purge_expired().await?;
    tracing::info!(removed, "Expired cache entries purged via API");
    Ok(Json(ApiResponse::success(CachePurgeDto { removed })))
}
