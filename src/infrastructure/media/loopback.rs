//! In-process media server
//!
//! Rooms live in memory. Connect latency and failures are scriptable so the
//! orchestrator can be exercised on a virtual clock.

use crate::domain::media::{RemoteTrack, Room, RoomConnector, RoomEvent, TransportError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

#[derive(Debug, Default, Clone)]
struct Script {
    connect_delay: Duration,
    connect_failure: Option<String>,
    publish_failure: Option<String>,
    disconnect_failure: Option<String>,
    remote_tracks: Vec<RemoteTrack>,
}

#[derive(Default)]
pub struct LoopbackRoomConnector {
    script: Mutex<Script>,
    rooms: Mutex<Vec<Arc<LoopbackRoom>>>,
    connect_attempts: AtomicUsize,
}

impl LoopbackRoomConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_connect_delay(&self, delay: Duration) {
        self.script.lock().unwrap().connect_delay = delay;
    }

    pub fn fail_connect(&self, reason: impl Into<String>) {
        self.script.lock().unwrap().connect_failure = Some(reason.into());
    }

    pub fn fail_publish(&self, reason: impl Into<String>) {
        self.script.lock().unwrap().publish_failure = Some(reason.into());
    }

    pub fn fail_disconnect(&self, reason: impl Into<String>) {
        self.script.lock().unwrap().disconnect_failure = Some(reason.into());
    }

    /// Track present in every room opened from now on
    pub fn add_remote_track(&self, track: RemoteTrack) {
        self.script.lock().unwrap().remote_tracks.push(track);
    }

    pub fn connect_attempts(&self) -> usize {
        self.connect_attempts.load(Ordering::SeqCst)
    }

    pub fn rooms(&self) -> Vec<Arc<LoopbackRoom>> {
        self.rooms.lock().unwrap().clone()
    }

    pub fn last_room(&self) -> Option<Arc<LoopbackRoom>> {
        self.rooms.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl RoomConnector for LoopbackRoomConnector {
    async fn connect(&self, url: &str, token: &str) -> Result<Arc<dyn Room>, TransportError> {
        self.connect_attempts.fetch_add(1, Ordering::SeqCst);
        let script = self.script.lock().unwrap().clone();

        tokio::time::sleep(script.connect_delay).await;
        if let Some(reason) = script.connect_failure {
            return Err(TransportError::Connect(reason));
        }
        if token.is_empty() {
            return Err(TransportError::Connect("missing access token".to_string()));
        }

        debug!("Loopback room opened at {}", url);
        let room = Arc::new(LoopbackRoom::new(
            url.to_string(),
            script.remote_tracks,
            script.publish_failure,
            script.disconnect_failure,
        ));
        self.rooms.lock().unwrap().push(room.clone());
        Ok(room)
    }
}

pub struct LoopbackRoom {
    url: String,
    tracks: RwLock<Vec<RemoteTrack>>,
    events: broadcast::Sender<RoomEvent>,
    microphone_published: AtomicBool,
    disconnected: AtomicBool,
    publish_failure: Option<String>,
    disconnect_failure: Option<String>,
}

impl LoopbackRoom {
    fn new(
        url: String,
        tracks: Vec<RemoteTrack>,
        publish_failure: Option<String>,
        disconnect_failure: Option<String>,
    ) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            url,
            tracks: RwLock::new(tracks),
            events,
            microphone_published: AtomicBool::new(false),
            disconnected: AtomicBool::new(false),
            publish_failure,
            disconnect_failure,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn microphone_published(&self) -> bool {
        self.microphone_published.load(Ordering::SeqCst)
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }

    pub async fn subscribed_tracks(&self) -> Vec<String> {
        self.tracks
            .read()
            .await
            .iter()
            .filter(|track| track.subscribed)
            .map(|track| track.sid.clone())
            .collect()
    }

    /// Transport reconnect that drops every subscription
    pub async fn simulate_reconnect(&self) {
        for track in self.tracks.write().await.iter_mut() {
            track.subscribed = false;
        }
        let _ = self.events.send(RoomEvent::Reconnected);
    }

    /// A remote participant publishes a new track
    pub async fn simulate_track(&self, track: RemoteTrack) {
        self.tracks.write().await.push(track.clone());
        let _ = self.events.send(RoomEvent::TrackPublished(track));
    }

    /// The server closes the room
    pub fn simulate_disconnect(&self, error: Option<String>) {
        self.disconnected.store(true, Ordering::SeqCst);
        let _ = self.events.send(RoomEvent::Disconnected { error });
    }
}

#[async_trait]
impl Room for LoopbackRoom {
    async fn publish_microphone(&self) -> Result<(), TransportError> {
        if let Some(reason) = &self.publish_failure {
            return Err(TransportError::Publish(reason.clone()));
        }
        self.microphone_published.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn remote_tracks(&self) -> Vec<RemoteTrack> {
        self.tracks.read().await.clone()
    }

    async fn subscribe(&self, track_sid: &str) -> Result<(), TransportError> {
        let mut tracks = self.tracks.write().await;
        match tracks.iter_mut().find(|track| track.sid == track_sid) {
            Some(track) => {
                track.subscribed = true;
                Ok(())
            }
            None => Err(TransportError::Subscribe {
                track: track_sid.to_string(),
                reason: "no such track".to_string(),
            }),
        }
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.disconnected.store(true, Ordering::SeqCst);
        match &self.disconnect_failure {
            Some(reason) => Err(TransportError::Disconnect(reason.clone())),
            None => Ok(()),
        }
    }

    fn events(&self) -> broadcast::Receiver<RoomEvent> {
        self.events.subscribe()
    }
}
