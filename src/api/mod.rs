use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post},
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Store;
use crate::services::{OnboardingFlow, PreferenceStore, QueryResolver, ResultCache};
use crate::state::SharedState;

pub mod auth;
mod error;
pub mod events;
mod inline;
mod observability;
mod onboarding;
mod preferences;
mod system;
mod types;
mod validation;

pub use crate::domain::events::NotificationEvent;
pub use error::ApiError;
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Arc<RwLock<Config>> {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.shared.store
    }

    #[must_use]
    pub fn event_bus(&self) -> &broadcast::Sender<NotificationEvent> {
        &self.shared.event_bus
    }

    #[must_use]
    pub fn resolver(&self) -> &QueryResolver {
        &self.shared.resolver
    }

    #[must_use]
    pub fn onboarding(&self) -> &OnboardingFlow {
        &self.shared.onboarding
    }

    #[must_use]
    pub fn preferences(&self) -> &dyn PreferenceStore {
        self.shared.preferences.as_ref()
    }

    #[must_use]
    pub fn cache(&self) -> &dyn ResultCache {
        self.shared.cache.as_ref()
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config().read().await.server.cors_allowed_origins.clone();

    let api_router = Router::new()
        .merge(create_protected_router(state.clone()))
        .route("/system/health/live", get(system::health_live))
        .route("/system/health/ready", get(system::health_ready))
        .with_state(state);

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/inline", post(inline::resolve_inline))
        .route("/onboarding/{user_id}", get(onboarding::status))
        .route("/onboarding/{user_id}/begin", post(onboarding::begin))
        .route("/onboarding/{user_id}/input", post(onboarding::submit))
        .route("/onboarding/{user_id}/cancel", post(onboarding::cancel))
        .route(
            "/preferences/{user_id}",
            get(preferences::get_preferences).patch(preferences::update_preferences),
        )
        .route("/cache", delete(system::purge_cache))
        .route("/metrics", get(observability::get_metrics))
        .merge(events::router())
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}
