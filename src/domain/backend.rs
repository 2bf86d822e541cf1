//! Call-setup backend and settings ports

use crate::domain::call::value_object::CallPurpose;
use crate::domain::shared::value_objects::MediaSessionId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SetupError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("backend answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Decode(String),
}

/// Body of the start-session call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    pub context: CallPurpose,
    pub logging_enabled: bool,
}

/// What the media transport needs to join the assistant's room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCredentials {
    pub session_id: MediaSessionId,
    #[serde(rename = "livekitUrl")]
    pub transport_url: String,
    #[serde(rename = "livekitToken")]
    pub transport_token: String,
    pub room_name: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CallSetupBackend: Send + Sync {
    async fn start_session(
        &self,
        request: StartSessionRequest,
    ) -> Result<SessionCredentials, SetupError>;

    async fn end_session(&self, session_id: MediaSessionId) -> Result<(), SetupError>;
}

/// Read-only user settings consulted once per call start
#[cfg_attr(test, mockall::automock)]
pub trait CallSettings: Send + Sync {
    fn logging_enabled(&self) -> bool;
}
