//! Data Transfer Objects for the call control API

use crate::application::CallStatus;
use crate::domain::call::{CallState, CapabilityProfile};
use serde::{Deserialize, Serialize};

/// Standard API response envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// Call status as shown to the user
#[derive(Debug, Serialize, Deserialize)]
pub struct CallStatusResponse {
    pub state: CallState,
    /// Displayable error message, if one is published
    pub error: Option<String>,
    /// Machine-readable error category
    pub error_kind: Option<String>,
    /// False while connecting or disconnecting
    pub controls_enabled: bool,
    pub telephony_supported: bool,
    pub telephony_reason: String,
}

impl CallStatusResponse {
    pub fn new(status: &CallStatus, capability: &CapabilityProfile) -> Self {
        Self {
            state: status.state,
            error: status.error_message(),
            error_kind: status.error.as_ref().map(|e| e.reason().to_string()),
            controls_enabled: !status.state.is_transitional(),
            telephony_supported: capability.telephony_supported(),
            telephony_reason: capability.reason().to_string(),
        }
    }
}
