//! Call control API Integration Tests

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt; // For `oneshot`
use voxlink::application::{
    CallDependencies, CallOrchestrator, CallOrchestratorHandle, OrchestratorConfig,
};
use voxlink::domain::call::CallState;
use voxlink::infrastructure::audio::{AudioPathController, LoopbackAudioSession};
use voxlink::infrastructure::backend::{FixedCallSetupBackend, InMemorySettings};
use voxlink::infrastructure::media::{LoopbackRoomConnector, MediaTransportClient};
use voxlink::infrastructure::telephony::TelephonyAdapter;
use voxlink::interface::api::build_router;

fn setup_api_test(backend: Arc<FixedCallSetupBackend>) -> (Router, CallOrchestratorHandle) {
    let deps = CallDependencies {
        telephony: Arc::new(TelephonyAdapter::bypass()),
        audio: Arc::new(AudioPathController::new(
            Arc::new(LoopbackAudioSession::new()),
            true,
        )),
        media: Arc::new(MediaTransportClient::new(Arc::new(
            LoopbackRoomConnector::new(),
        ))),
        backend,
        settings: Arc::new(InMemorySettings::new(true)),
    };
    let (handle, _task) = CallOrchestrator::spawn(OrchestratorConfig::default(), deps);

    let prometheus_handle = PrometheusBuilder::new().build_recorder().handle();
    (build_router(handle.clone(), prometheus_handle), handle)
}

fn default_backend() -> Arc<FixedCallSetupBackend> {
    Arc::new(FixedCallSetupBackend::new("ws://127.0.0.1:7880", "devkey"))
}

async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_api_health() {
    let (app, _handle) = setup_api_test(default_backend());

    let (status, json) = send(&app, "GET", "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"], "OK");
}

#[tokio::test]
async fn test_api_idle_status() {
    let (app, _handle) = setup_api_test(default_backend());

    let (status, json) = send(&app, "GET", "/call").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["state"], "idle");
    assert!(json["data"]["error"].is_null());
    assert_eq!(json["data"]["telephony_supported"], false);
}

#[tokio::test]
async fn test_api_start_and_end_call() {
    let (app, handle) = setup_api_test(default_backend());

    let (status, json) = send(&app, "POST", "/call/start").await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["success"], true);

    tokio::time::timeout(
        Duration::from_secs(5),
        handle.wait_for_state(CallState::Connected),
    )
    .await
    .unwrap()
    .unwrap();
    let (_, json) = send(&app, "GET", "/call").await;
    assert_eq!(json["data"]["state"], "connected");

    let (status, _) = send(&app, "POST", "/call/end").await;
    assert_eq!(status, StatusCode::ACCEPTED);
    tokio::time::timeout(Duration::from_secs(5), handle.wait_for_state(CallState::Idle))
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_api_reports_and_clears_error() {
    let backend = default_backend();
    backend.fail_with("maintenance");
    let (app, handle) = setup_api_test(backend);

    send(&app, "POST", "/call/start").await;
    let mut status = handle.watch_status();
    tokio::time::timeout(
        Duration::from_secs(5),
        status.wait_for(|status| status.error.is_some()),
    )
    .await
    .unwrap()
    .unwrap();

    let (_, json) = send(&app, "GET", "/call").await;
    assert_eq!(json["data"]["state"], "idle");
    assert_eq!(json["data"]["error_kind"], "setup");
    assert_eq!(
        json["data"]["error"],
        "Could not start the session: backend answered 503: maintenance"
    );

    let (status_code, _) = send(&app, "POST", "/call/error/clear").await;
    assert_eq!(status_code, StatusCode::ACCEPTED);
    tokio::time::timeout(
        Duration::from_secs(5),
        status.wait_for(|status| status.error.is_none()),
    )
    .await
    .unwrap()
    .unwrap();
}

#[tokio::test]
async fn test_api_metrics_endpoint() {
    let (app, _handle) = setup_api_test(default_backend());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_api_unknown_route() {
    let (app, _handle) = setup_api_test(default_backend());

    let (status, _) = send(&app, "GET", "/calls/unknown").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
