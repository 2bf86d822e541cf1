//! HTTP call-setup backend client

use crate::domain::backend::{
    CallSetupBackend, SessionCredentials, SetupError, StartSessionRequest,
};
use crate::domain::shared::value_objects::MediaSessionId;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EndSessionRequest {
    session_id: MediaSessionId,
}

pub struct HttpCallSetupBackend {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpCallSetupBackend {
    pub fn new(
        base_url: impl Into<String>,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, SetupError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SetupError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_token,
        })
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let request = self.client.post(format!("{}{}", self.base_url, path));
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, SetupError> {
        let response = self
            .post(path)
            .json(body)
            .send()
            .await
            .map_err(|e| SetupError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SetupError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl CallSetupBackend for HttpCallSetupBackend {
    async fn start_session(
        &self,
        request: StartSessionRequest,
    ) -> Result<SessionCredentials, SetupError> {
        debug!("Starting {} session", request.context.as_str());
        let response = self.send("/sessions/start", &request).await?;
        let credentials: SessionCredentials = response
            .json()
            .await
            .map_err(|e| SetupError::Decode(e.to_string()))?;

        info!(
            "Session {} assigned to room {}",
            credentials.session_id, credentials.room_name
        );
        Ok(credentials)
    }

    async fn end_session(&self, session_id: MediaSessionId) -> Result<(), SetupError> {
        self.send("/sessions/end", &EndSessionRequest { session_id })
            .await
            .map(|_| ())
    }
}
