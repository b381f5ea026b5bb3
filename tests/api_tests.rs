mod common;

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::Utc;
use common::{RecordingProvider, VALID_KEY, temp_db_url};
use http_body_util::BodyExt;
use searchgate::api::{self, NotificationEvent};
use searchgate::config::Config;
use searchgate::domain::UserId;
use searchgate::services::{ManualClock, ProviderError};
use searchgate::state::SharedState;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tower::ServiceExt;

const API_KEY: &str = "transport-secret";

struct TestApp {
    router: Router,
    shared: Arc<SharedState>,
    provider: Arc<RecordingProvider>,
}

async fn spawn_app_with(provider: Arc<RecordingProvider>, api_key: Option<&str>) -> TestApp {
    let mut config = Config::default();
    config.general.database_path = temp_db_url();
    config.server.api_key = api_key.map(str::to_string);
    config.notices.admin_contact = "@gatekeeper".to_string();

    let (event_bus, _) = broadcast::channel(16);
    let shared = Arc::new(
        SharedState::with_components(
            config,
            event_bus,
            provider.clone(),
            Arc::new(ManualClock::new(Utc::now())),
        )
        .await
        .expect("Failed to create shared state"),
    );
    let state = api::create_app_state(shared.clone(), None);
    TestApp {
        router: api::router(state).await,
        shared,
        provider,
    }
}

async fn spawn_app() -> TestApp {
    spawn_app_with(RecordingProvider::new(), None).await
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_health_is_public() {
    let app = spawn_app_with(RecordingProvider::new(), Some(API_KEY)).await;

    let (status, body) = send(&app.router, "GET", "/api/system/health/live", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "alive");

    let (status, body) = send(&app.router, "GET", "/api/system/health/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["ready"], true);
    assert_eq!(body["data"]["checks"]["database"], true);
}

#[tokio::test]
async fn test_api_key_is_enforced_when_configured() {
    let app = spawn_app_with(RecordingProvider::new(), Some(API_KEY)).await;
    let payload = json!({"user_id": 1, "query": "pizza"}).to_string();

    let without = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/inline")
                .header("Content-Type", "application/json")
                .body(Body::from(payload.clone()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(without.status(), StatusCode::UNAUTHORIZED);

    let wrong = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/inline")
                .header("Content-Type", "application/json")
                .header("X-Api-Key", "wrong-key")
                .body(Body::from(payload.clone()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let bearer = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/inline")
                .header("Content-Type", "application/json")
                .header("Authorization", format!("Bearer {API_KEY}"))
                .body(Body::from(payload))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(bearer.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_inline_without_credential_returns_registration_notice() {
    let app = spawn_app().await;

    let (status, body) = send(
        &app.router,
        "POST",
        "/api/inline",
        Some(json!({"user_id": 1, "query": "pizza"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], "need_token");
    assert_eq!(items[0]["kind"], "notice");
    assert_eq!(body["data"]["cache_time"], 1);
    assert_eq!(app.provider.call_count(), 0);
}

#[tokio::test]
async fn test_inline_rejects_invalid_requests() {
    let app = spawn_app().await;

    let (status, body) = send(
        &app.router,
        "POST",
        "/api/inline",
        Some(json!({"user_id": 0, "query": "pizza"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = send(
        &app.router,
        "POST",
        "/api/inline",
        Some(json!({"user_id": 5, "query": "x".repeat(300)})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_onboarding_then_search() {
    let app = spawn_app().await;

    let (status, body) = send(&app.router, "POST", "/api/onboarding/42/begin", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "awaiting_candidate");
    assert!(body["data"]["message"].as_str().unwrap().contains("API key"));

    let (_, body) = send(&app.router, "GET", "/api/onboarding/42", None).await;
    assert_eq!(body["data"]["awaiting"], true);

    let (_, body) = send(
        &app.router,
        "POST",
        "/api/onboarding/42/input",
        Some(json!({"text": "not a key"})),
    )
    .await;
    assert_eq!(body["data"]["status"], "invalid_format");

    let (_, body) = send(
        &app.router,
        "POST",
        "/api/onboarding/42/input",
        Some(json!({"text": VALID_KEY})),
    )
    .await;
    assert_eq!(body["data"]["status"], "committed");

    let (_, body) = send(&app.router, "GET", "/api/onboarding/42", None).await;
    assert_eq!(body["data"]["awaiting"], false);

    let (status, body) = send(
        &app.router,
        "POST",
        "/api/inline",
        Some(json!({"user_id": 42, "query": "pizza"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 5);
    assert!(items.iter().all(|i| i["kind"] == "result"));
    assert_eq!(items[0]["message_text"], items[0]["url"]);

    // Canary plus one search.
    assert_eq!(app.provider.call_count(), 2);
}

#[tokio::test]
async fn test_onboarding_input_without_session() {
    let app = spawn_app().await;

    let (status, body) = send(
        &app.router,
        "POST",
        "/api/onboarding/9/input",
        Some(json!({"text": VALID_KEY})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "not_awaiting");

    let (_, body) = send(&app.router, "POST", "/api/onboarding/9/cancel", None).await;
    assert_eq!(body["data"]["status"], "cancelled");
}

#[tokio::test]
async fn test_preferences_roundtrip() {
    let app = spawn_app().await;

    let (status, body) = send(&app.router, "GET", "/api/preferences/7", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["show_thumbnail"], true);
    assert_eq!(body["data"]["result_limit"], 5);
    assert!(body["data"]["locale"].is_null());

    let (status, body) = send(
        &app.router,
        "PATCH",
        "/api/preferences/7",
        Some(json!({"result_limit": 3, "locale": "DE"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["result_limit"], 3);
    assert_eq!(body["data"]["locale"], "de");
    assert_eq!(body["data"]["show_thumbnail"], true);

    let (_, body) = send(
        &app.router,
        "PATCH",
        "/api/preferences/7",
        Some(json!({"locale": ""})),
    )
    .await;
    assert!(body["data"]["locale"].is_null());
    assert_eq!(body["data"]["result_limit"], 3);
}

#[tokio::test]
async fn test_preferences_validation() {
    let app = spawn_app().await;

    let (status, _) = send(
        &app.router,
        "PATCH",
        "/api/preferences/7",
        Some(json!({"result_limit": 11})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app.router,
        "PATCH",
        "/api/preferences/7",
        Some(json!({"locale": "deu"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app.router, "PATCH", "/api/preferences/7", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_provider_failure_publishes_user_notice() {
    let provider = RecordingProvider::failing(ProviderError::http(429, "Quota exceeded"));
    let app = spawn_app_with(provider, None).await;
    let mut events = app.shared.event_bus.subscribe();

    app.shared
        .credentials
        .put(
            UserId::new(5),
            &searchgate::domain::Credential::parse(VALID_KEY).unwrap(),
        )
        .await
        .unwrap();

    let (status, body) = send(
        &app.router,
        "POST",
        "/api/inline",
        Some(json!({"user_id": 5, "query": "pizza"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"][0]["id"], "err");

    match events.try_recv().unwrap() {
        NotificationEvent::UserNotice { user_id, message } => {
            assert_eq!(user_id, UserId::new(5));
            assert!(message.contains("Quota exceeded"));
            assert!(message.contains("@gatekeeper"));
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn test_cache_purge_endpoint() {
    let app = spawn_app().await;

    let (status, body) = send(&app.router, "DELETE", "/api/cache", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["removed"], 0);
}

#[tokio::test]
async fn test_event_stream_filters_by_user() {
    let app = spawn_app().await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/events?user_id=2")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    app.shared
        .event_bus
        .send(NotificationEvent::UserNotice {
            user_id: UserId::new(1),
            message: "for someone else".to_string(),
        })
        .unwrap();
    app.shared
        .event_bus
        .send(NotificationEvent::UserNotice {
            user_id: UserId::new(2),
            message: "quota exceeded".to_string(),
        })
        .unwrap();

    let mut body = response.into_body();
    let frame = tokio::time::timeout(std::time::Duration::from_secs(2), body.frame())
        .await
        .expect("no event within 2s")
        .unwrap()
        .unwrap();
    let text = String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap();

    assert!(text.contains("event: user_notice"));
    assert!(text.contains("quota exceeded"));
    assert!(!text.contains("for someone else"));
}

#[tokio::test]
async fn test_event_stream_rejects_invalid_user() {
    let app = spawn_app().await;

    let (status, _) = send(&app.router, "GET", "/api/events?user_id=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
