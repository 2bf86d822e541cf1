//! Prometheus metrics handler

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and describe the call metrics
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    describe_counter!(
        "voice_call_attempts_total",
        "Total number of calls requested"
    );
    describe_counter!(
        "voice_calls_connected_total",
        "Total number of calls that reached the connected state"
    );
    describe_counter!(
        "voice_calls_completed_total",
        "Total number of calls torn down after connecting or cancelling"
    );
    describe_counter!(
        "voice_call_failures_total",
        "Total number of published call errors, by reason"
    );
    describe_counter!(
        "voice_call_fallbacks_total",
        "Total number of calls that continued without telephony integration"
    );
    describe_counter!(
        "voice_call_stale_outcomes_total",
        "Total number of outcomes discarded because their call was abandoned"
    );
    describe_gauge!("voice_call_active", "Whether a call is currently connected");

    Ok(handle)
}

/// HTTP metrics handler
pub async fn metrics_handler(State(prometheus_handle): State<PrometheusHandle>) -> Response {
    (StatusCode::OK, prometheus_handle.render()).into_response()
}
