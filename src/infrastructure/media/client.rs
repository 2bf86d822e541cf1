//! Media-transport client
//!
//! Owns the connection to the assistant's room: connect, publish the local
//! microphone, subscribe to remote audio, and disconnect. A room watcher
//! re-subscribes after transport-level reconnects because subscriptions are
//! not guaranteed to survive them.

use crate::domain::media::{MediaEvent, Room, RoomConnector, RoomEvent, TransportError};
use crate::domain::shared::value_objects::MediaSessionId;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

struct ActiveRoom {
    session: MediaSessionId,
    room: Arc<dyn Room>,
    watcher: JoinHandle<()>,
}

impl ActiveRoom {
    /// Tear the room down; the handle is dropped even if the room errors
    async fn close(self) {
        self.watcher.abort();
        match self.room.disconnect().await {
            Ok(()) => info!("Disconnected from media session {}", self.session),
            Err(e) => warn!(
                "Error disconnecting media session {} (treated as disconnected): {}",
                self.session, e
            ),
        }
    }
}

pub struct MediaTransportClient {
    connector: Arc<dyn RoomConnector>,
    active: Mutex<Option<ActiveRoom>>,
    events: broadcast::Sender<MediaEvent>,
}

impl MediaTransportClient {
    pub fn new(connector: Arc<dyn RoomConnector>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            connector,
            active: Mutex::new(None),
            events,
        }
    }

    /// Join the room for `session`
    ///
    /// Operations are serialized: a disconnect issued while this runs waits
    /// for it and then tears the new room down. A live room of another
    /// session is never evicted; its owner has to leave it first.
    pub async fn connect(
        &self,
        session: MediaSessionId,
        url: &str,
        token: &str,
    ) -> Result<(), TransportError> {
        let mut active = self.active.lock().await;
        if let Some(held) = active.as_ref() {
            if held.session != session && !held.watcher.is_finished() {
                return Err(TransportError::Connect(format!(
                    "media session {} is still active",
                    held.session
                )));
            }
        }
        if let Some(stale) = active.take() {
            warn!("Closing stale media session {} before connecting", stale.session);
            stale.close().await;
        }

        info!("Connecting media session {} to {}", session, url);
        let room = self.connector.connect(url, token).await?;
        let room_events = room.events();

        if let Err(e) = room.publish_microphone().await {
            if let Err(disconnect_err) = room.disconnect().await {
                debug!("Disconnect after failed publish also failed: {}", disconnect_err);
            }
            return Err(e);
        }

        let subscribed = subscribe_remote_audio(room.as_ref()).await;
        debug!("Subscribed to {} remote audio track(s)", subscribed);

        let watcher = tokio::spawn(watch_room(
            room.clone(),
            room_events,
            session.clone(),
            self.events.clone(),
        ));

        *active = Some(ActiveRoom {
            session,
            room,
            watcher,
        });
        Ok(())
    }

    /// Leave the current room. Never fails.
    pub async fn disconnect(&self) {
        let mut active = self.active.lock().await;
        if let Some(room) = active.take() {
            room.close().await;
        }
    }

    /// Leave the room only if it belongs to `session`
    pub async fn disconnect_session(&self, session: &MediaSessionId) {
        let mut active = self.active.lock().await;
        if active.as_ref().is_some_and(|room| room.session == *session) {
            if let Some(room) = active.take() {
                room.close().await;
            }
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.active.lock().await.is_some()
    }

    pub async fn current_session(&self) -> Option<MediaSessionId> {
        self.active.lock().await.as_ref().map(|room| room.session.clone())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MediaEvent> {
        self.events.subscribe()
    }
}

/// Subscribe to every remote audio track not yet subscribed
///
/// Per-track failures are logged; returns the number of new subscriptions.
async fn subscribe_remote_audio(room: &dyn Room) -> usize {
    let mut subscribed = 0;
    for track in room.remote_tracks().await {
        if !track.needs_subscription() {
            continue;
        }
        match room.subscribe(&track.sid).await {
            Ok(()) => subscribed += 1,
            Err(e) => warn!(
                "Could not subscribe to audio from {}: {}",
                track.participant, e
            ),
        }
    }
    subscribed
}

async fn watch_room(
    room: Arc<dyn Room>,
    mut room_events: broadcast::Receiver<RoomEvent>,
    session: MediaSessionId,
    events: broadcast::Sender<MediaEvent>,
) {
    loop {
        match room_events.recv().await {
            Ok(RoomEvent::Reconnected) => {
                let count = subscribe_remote_audio(room.as_ref()).await;
                info!(
                    "Media session {} reconnected, resubscribed {} track(s)",
                    session, count
                );
            }
            Ok(RoomEvent::TrackPublished(track)) => {
                if track.needs_subscription() {
                    if let Err(e) = room.subscribe(&track.sid).await {
                        warn!("Could not subscribe to {}: {}", track.sid, e);
                    }
                }
            }
            Ok(RoomEvent::Disconnected { error }) => {
                info!("Media session {} closed by transport ({:?})", session, error);
                let _ = events.send(MediaEvent::Lost {
                    session,
                    cause: error,
                });
                break;
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Room watcher lagged, {} event(s) skipped", skipped);
                // A missed reconnect would leave audio unsubscribed
                subscribe_remote_audio(room.as_ref()).await;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
