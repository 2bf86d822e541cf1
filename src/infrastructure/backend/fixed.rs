//! Call-setup backend for running without a session service
//!
//! Always hands out the configured transport endpoint and token with a fresh
//! session id.

use crate::domain::backend::{
    CallSetupBackend, SessionCredentials, SetupError, StartSessionRequest,
};
use crate::domain::shared::value_objects::MediaSessionId;
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

pub struct FixedCallSetupBackend {
    transport_url: String,
    transport_token: String,
    failure: Mutex<Option<String>>,
    start_delay: Mutex<Duration>,
    started: Mutex<Vec<StartSessionRequest>>,
    ended: Mutex<Vec<MediaSessionId>>,
}

impl FixedCallSetupBackend {
    pub fn new(transport_url: impl Into<String>, transport_token: impl Into<String>) -> Self {
        Self {
            transport_url: transport_url.into(),
            transport_token: transport_token.into(),
            failure: Mutex::new(None),
            start_delay: Mutex::new(Duration::ZERO),
            started: Mutex::new(Vec::new()),
            ended: Mutex::new(Vec::new()),
        }
    }

    /// Make subsequent start requests fail
    pub fn fail_with(&self, reason: impl Into<String>) {
        *self.failure.lock().unwrap() = Some(reason.into());
    }

    /// Delay the answer to subsequent start requests
    pub fn set_start_delay(&self, delay: Duration) {
        *self.start_delay.lock().unwrap() = delay;
    }

    pub fn started(&self) -> Vec<StartSessionRequest> {
        self.started.lock().unwrap().clone()
    }

    pub fn ended(&self) -> Vec<MediaSessionId> {
        self.ended.lock().unwrap().clone()
    }
}

#[async_trait]
impl CallSetupBackend for FixedCallSetupBackend {
    async fn start_session(
        &self,
        request: StartSessionRequest,
    ) -> Result<SessionCredentials, SetupError> {
        self.started.lock().unwrap().push(request);
        let delay = *self.start_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(reason) = self.failure.lock().unwrap().clone() {
            return Err(SetupError::Status {
                status: 503,
                body: reason,
            });
        }

        let session_id = MediaSessionId::new(Uuid::new_v4().to_string());
        debug!("Issued session {}", session_id);
        Ok(SessionCredentials {
            room_name: format!("assistant-{}", session_id),
            session_id,
            transport_url: self.transport_url.clone(),
            transport_token: self.transport_token.clone(),
        })
    }

    async fn end_session(&self, session_id: MediaSessionId) -> Result<(), SetupError> {
        self.ended.lock().unwrap().push(session_id);
        Ok(())
    }
}
