//! Real-time media transport port
//!
//! Only the control plane is modelled here: rooms, tracks and their
//! lifecycle. Audio frames never cross this boundary.

use crate::domain::shared::value_objects::MediaSessionId;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("publishing microphone failed: {0}")]
    Publish(String),

    #[error("subscribing to {track} failed: {reason}")]
    Subscribe { track: String, reason: String },

    #[error("disconnect failed: {0}")]
    Disconnect(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

/// A track published by a remote participant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    pub sid: String,
    pub participant: String,
    pub kind: TrackKind,
    pub subscribed: bool,
}

impl RemoteTrack {
    pub fn audio(sid: impl Into<String>, participant: impl Into<String>) -> Self {
        Self {
            sid: sid.into(),
            participant: participant.into(),
            kind: TrackKind::Audio,
            subscribed: false,
        }
    }

    pub fn needs_subscription(&self) -> bool {
        self.kind == TrackKind::Audio && !self.subscribed
    }
}

/// Events raised by a connected room
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    /// Transport-level reconnect; subscriptions may have been lost
    Reconnected,
    TrackPublished(RemoteTrack),
    /// The room closed; `error` is set when it was not a clean close
    Disconnected { error: Option<String> },
}

/// Events the media-transport client reports to the orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    Lost {
        session: MediaSessionId,
        cause: Option<String>,
    },
}

/// A connected room
#[async_trait]
pub trait Room: Send + Sync {
    async fn publish_microphone(&self) -> Result<(), TransportError>;

    async fn remote_tracks(&self) -> Vec<RemoteTrack>;

    async fn subscribe(&self, track_sid: &str) -> Result<(), TransportError>;

    async fn disconnect(&self) -> Result<(), TransportError>;

    fn events(&self) -> broadcast::Receiver<RoomEvent>;
}

/// Opens rooms on the media server
#[async_trait]
pub trait RoomConnector: Send + Sync {
    async fn connect(&self, url: &str, token: &str) -> Result<Arc<dyn Room>, TransportError>;
}
