//! Call control API handlers

use super::dto::{ApiResponse, CallStatusResponse};
use crate::application::CallOrchestratorHandle;
use crate::domain::shared::error::DomainError;
use axum::{extract::State, http::StatusCode, Json};
use tracing::{error, info};

type CallResponse = (StatusCode, Json<ApiResponse<CallStatusResponse>>);

/// Health check
pub async fn health_check() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("OK"))
}

/// Current call state, error and capability
pub async fn get_call_status(
    State(handle): State<CallOrchestratorHandle>,
) -> Json<ApiResponse<CallStatusResponse>> {
    Json(ApiResponse::success(status_of(&handle)))
}

/// Request a call
pub async fn start_call(State(handle): State<CallOrchestratorHandle>) -> CallResponse {
    info!("API: Start call requested");
    accepted(&handle, handle.start_call().await)
}

/// Request the end of the call
pub async fn end_call(State(handle): State<CallOrchestratorHandle>) -> CallResponse {
    info!("API: End call requested");
    accepted(&handle, handle.end_call().await)
}

/// Dismiss the published error
pub async fn clear_error(State(handle): State<CallOrchestratorHandle>) -> CallResponse {
    accepted(&handle, handle.clear_error().await)
}

fn status_of(handle: &CallOrchestratorHandle) -> CallStatusResponse {
    CallStatusResponse::new(&handle.status(), handle.capability())
}

/// Commands are asynchronous: answer 202 with the status as of now
fn accepted(handle: &CallOrchestratorHandle, sent: Result<(), DomainError>) -> CallResponse {
    match sent {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(ApiResponse::success(status_of(handle))),
        ),
        Err(e) => {
            error!("Failed to deliver call command: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse::error(e.to_string())),
            )
        }
    }
}
