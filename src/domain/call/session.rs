//! Call session entity

use crate::domain::call::value_object::{CallPurpose, ReservationStatus};
use crate::domain::shared::value_objects::{MediaSessionId, ReservationId, SessionId};
use chrono::{DateTime, Utc};

/// State held only while a call attempt or call is alive
///
/// Created on a start-call request. Destroyed when teardown completes or the
/// telephony provider resets. A timed-out session stays recorded, flagged,
/// until the next start-call replaces it.
#[derive(Debug, Clone)]
pub struct CallSession {
    id: SessionId,
    purpose: CallPurpose,
    /// Snapshot of the recording/logging setting taken at start
    logging_enabled: bool,
    reservation_id: Option<ReservationId>,
    reservation: ReservationStatus,
    media_session: Option<MediaSessionId>,
    /// Media session that dropped before its join was reported, with its cause
    early_loss: Option<(MediaSessionId, Option<String>)>,
    audio_active: bool,
    timed_out: bool,
    started_at: DateTime<Utc>,
    connected_at: Option<DateTime<Utc>>,
}

impl CallSession {
    pub fn new(purpose: CallPurpose, logging_enabled: bool) -> Self {
        Self {
            id: SessionId::new(),
            purpose,
            logging_enabled,
            reservation_id: None,
            reservation: ReservationStatus::Pending,
            media_session: None,
            early_loss: None,
            audio_active: false,
            timed_out: false,
            started_at: Utc::now(),
            connected_at: None,
        }
    }

    /// Record the reservation issued for this session
    pub fn reservation_issued(&mut self, id: ReservationId) {
        self.reservation_id = Some(id);
        self.reservation = ReservationStatus::Pending;
    }

    /// Resolve the pending reservation as granted
    pub fn grant(&mut self, id: ReservationId) {
        self.reservation_id = Some(id);
        self.reservation = ReservationStatus::Granted;
    }

    /// Resolve the pending reservation as a fallback; no platform call is held
    pub fn fall_back(&mut self) {
        self.reservation_id = None;
        self.reservation = ReservationStatus::FellBack;
    }

    pub fn mark_timed_out(&mut self) {
        self.timed_out = true;
    }

    pub fn set_audio_active(&mut self, active: bool) {
        self.audio_active = active;
    }

    pub fn set_media_session(&mut self, media_session: MediaSessionId) {
        self.media_session = Some(media_session);
    }

    /// Remember a media session lost while the join was still in flight
    pub fn record_early_loss(&mut self, media_session: MediaSessionId, cause: Option<String>) {
        self.early_loss = Some((media_session, cause));
    }

    /// The recorded loss, if it concerns `media_session`
    pub fn take_early_loss(&mut self, media_session: &MediaSessionId) -> Option<Option<String>> {
        match self.early_loss.take() {
            Some((lost, cause)) if lost == *media_session => Some(cause),
            other => {
                self.early_loss = other;
                None
            }
        }
    }

    pub fn mark_connected(&mut self) {
        self.connected_at = Some(Utc::now());
    }

    /// Whether an outcome tagged with `id` still belongs to this session
    pub fn accepts(&self, id: &SessionId) -> bool {
        self.id == *id && !self.timed_out
    }

    /// Whether a platform event for `reservation` matches the pending request
    pub fn awaits_reservation(&self, reservation: &ReservationId) -> bool {
        !self.timed_out
            && self.reservation == ReservationStatus::Pending
            && self.reservation_id.as_ref() == Some(reservation)
    }

    // Getters
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn purpose(&self) -> CallPurpose {
        self.purpose
    }

    pub fn logging_enabled(&self) -> bool {
        self.logging_enabled
    }

    pub fn reservation_id(&self) -> Option<&ReservationId> {
        self.reservation_id.as_ref()
    }

    pub fn reservation(&self) -> ReservationStatus {
        self.reservation
    }

    pub fn media_session(&self) -> Option<&MediaSessionId> {
        self.media_session.as_ref()
    }

    pub fn audio_active(&self) -> bool {
        self.audio_active
    }

    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    pub fn started_at(&self) -> &DateTime<Utc> {
        &self.started_at
    }

    pub fn connected_at(&self) -> Option<&DateTime<Utc>> {
        self.connected_at.as_ref()
    }

    /// Talk time so far, if the call reached Connected
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.connected_at.map(|connected| Utc::now() - connected)
    }
}
