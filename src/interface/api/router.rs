//! API Router configuration

use super::call_handler::{clear_error, end_call, get_call_status, health_check, start_call};
use super::metrics_handler::metrics_handler;
use super::ws_handler::ws_handler;
use crate::application::CallOrchestratorHandle;
use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the API router
pub fn build_router(handle: CallOrchestratorHandle, prometheus_handle: PrometheusHandle) -> Router {
    let call_routes = Router::new()
        .route("/health", get(health_check))
        .route("/call", get(get_call_status))
        .route("/call/start", post(start_call))
        .route("/call/end", post(end_call))
        .route("/call/error/clear", post(clear_error))
        .route("/ws", get(ws_handler))
        .with_state(handle);

    // Metrics route (separate state)
    let metrics_routes = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(prometheus_handle);

    Router::new()
        .merge(call_routes)
        .merge(metrics_routes)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
