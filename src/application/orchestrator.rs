//! Call orchestrator
//!
//! A single actor task owns the call state, the current session and the
//! published error. The telephony reservation, audio path and media transport
//! all report back into its mailbox, tagged with the session they were issued
//! for; anything tagged with a superseded session is discarded.
//!
//! Bring-up order: reservation, audio path, call-setup backend, media
//! transport, then "connected" to the telephony layer. Teardown order: media
//! transport, telephony release, then audio path.

use crate::application::events::CallEventBroadcaster;
use crate::domain::backend::{CallSettings, CallSetupBackend, StartSessionRequest};
use crate::domain::call::{
    CallError, CallEvent, CallPurpose, CallSession, CallState, CapabilityProfile,
    ReservationStatus,
};
use crate::domain::media::MediaEvent;
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{MediaSessionId, ReservationId, SessionId};
use crate::domain::telephony::{ProviderEvent, ReservationOutcome, TelephonyError};
use crate::infrastructure::audio::AudioPathController;
use crate::infrastructure::media::MediaTransportClient;
use crate::infrastructure::telephony::TelephonyAdapter;
use metrics::{counter, gauge};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Upper bound on the telephony reservation, which has no platform guarantee
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub connect_timeout: Duration,
    pub purpose: CallPurpose,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            purpose: CallPurpose::Phone,
        }
    }
}

/// Collaborators injected into the orchestrator
#[derive(Clone)]
pub struct CallDependencies {
    pub telephony: Arc<TelephonyAdapter>,
    pub audio: Arc<AudioPathController>,
    pub media: Arc<MediaTransportClient>,
    pub backend: Arc<dyn CallSetupBackend>,
    pub settings: Arc<dyn CallSettings>,
}

/// What observers see: the call state and the current error, if any
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallStatus {
    pub state: CallState,
    pub error: Option<CallError>,
}

impl CallStatus {
    fn idle() -> Self {
        Self {
            state: CallState::Idle,
            error: None,
        }
    }

    /// Human-readable error for display
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.to_string())
    }
}

#[derive(Debug)]
enum Command {
    StartCall,
    EndCall,
    ClearError,
}

#[derive(Debug)]
enum Outcome {
    Reservation {
        session: SessionId,
        outcome: ReservationOutcome,
    },
    MediaReady {
        session: SessionId,
        media_session: Option<MediaSessionId>,
        result: std::result::Result<(), CallError>,
    },
    TeardownFinished {
        session: SessionId,
    },
}

/// Cloneable handle used by the presentation layer
#[derive(Clone)]
pub struct CallOrchestratorHandle {
    commands: mpsc::Sender<Command>,
    status: watch::Receiver<CallStatus>,
    events: CallEventBroadcaster,
    capability: CapabilityProfile,
}

impl CallOrchestratorHandle {
    /// Request a call. A no-op unless the call is idle.
    pub async fn start_call(&self) -> Result<()> {
        self.send(Command::StartCall).await
    }

    /// Request the end of the call. A no-op when idle or already disconnecting.
    pub async fn end_call(&self) -> Result<()> {
        self.send(Command::EndCall).await
    }

    /// Dismiss the published error
    pub async fn clear_error(&self) -> Result<()> {
        self.send(Command::ClearError).await
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| DomainError::Unavailable("call orchestrator has stopped".to_string()))
    }

    pub fn status(&self) -> CallStatus {
        self.status.borrow().clone()
    }

    pub fn state(&self) -> CallState {
        self.status.borrow().state
    }

    pub fn error(&self) -> Option<CallError> {
        self.status.borrow().error.clone()
    }

    pub fn capability(&self) -> &CapabilityProfile {
        &self.capability
    }

    pub fn watch_status(&self) -> watch::Receiver<CallStatus> {
        self.status.clone()
    }

    /// Every state change, published error and fallback, in order
    pub fn subscribe(&self) -> broadcast::Receiver<CallEvent> {
        self.events.subscribe()
    }

    /// Wait until the call reaches `state`
    pub async fn wait_for_state(&self, state: CallState) -> Result<CallStatus> {
        let mut status = self.status.clone();
        let reached = status
            .wait_for(|status| status.state == state)
            .await
            .map_err(|_| DomainError::Unavailable("call orchestrator has stopped".to_string()))?;
        Ok(reached.clone())
    }
}

struct Mailboxes {
    commands: mpsc::Receiver<Command>,
    outcomes: mpsc::UnboundedReceiver<Outcome>,
    provider_events: Option<mpsc::UnboundedReceiver<ProviderEvent>>,
    media_events: Option<broadcast::Receiver<MediaEvent>>,
}

pub struct CallOrchestrator {
    config: OrchestratorConfig,
    deps: CallDependencies,
    state: CallState,
    error: Option<CallError>,
    session: Option<CallSession>,
    /// Armed while the reservation is pending
    deadline: Option<Instant>,
    /// Credential fetch and room join of the current session
    bring_up: Option<JoinHandle<()>>,
    status_tx: watch::Sender<CallStatus>,
    events: CallEventBroadcaster,
    outcomes_tx: mpsc::UnboundedSender<Outcome>,
}

impl CallOrchestrator {
    /// Start the orchestrator task
    ///
    /// The capability profile is read from the telephony adapter once, here.
    /// The task stops when every handle has been dropped.
    pub fn spawn(
        config: OrchestratorConfig,
        deps: CallDependencies,
    ) -> (CallOrchestratorHandle, JoinHandle<()>) {
        let (orchestrator, handle, mailboxes) = Self::new(config, deps);
        (handle, tokio::spawn(orchestrator.run(mailboxes)))
    }

    fn new(
        config: OrchestratorConfig,
        deps: CallDependencies,
    ) -> (Self, CallOrchestratorHandle, Mailboxes) {
        let (commands_tx, commands_rx) = mpsc::channel(32);
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(CallStatus::idle());
        let events = CallEventBroadcaster::default();
        let capability = deps.telephony.capability().clone();

        let mailboxes = Mailboxes {
            commands: commands_rx,
            outcomes: outcomes_rx,
            provider_events: deps.telephony.take_events(),
            media_events: Some(deps.media.subscribe()),
        };

        info!(
            "Call orchestrator starting (telephony integration: {}, timeout: {:?})",
            capability.telephony_supported(),
            config.connect_timeout
        );

        let orchestrator = Self {
            config,
            deps,
            state: CallState::Idle,
            error: None,
            session: None,
            deadline: None,
            bring_up: None,
            status_tx,
            events: events.clone(),
            outcomes_tx,
        };

        let handle = CallOrchestratorHandle {
            commands: commands_tx,
            status: status_rx,
            events,
            capability,
        };

        (orchestrator, handle, mailboxes)
    }

    async fn run(mut self, mut mailboxes: Mailboxes) {
        loop {
            let deadline = self.deadline;
            tokio::select! {
                // Outcomes win ties against the deadline
                biased;

                command = mailboxes.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(outcome) = mailboxes.outcomes.recv() => self.handle_outcome(outcome),
                Some(event) = next_provider_event(&mut mailboxes.provider_events) => {
                    self.on_provider_event(event)
                }
                Some(event) = next_media_event(&mut mailboxes.media_events) => {
                    self.on_media_event(event)
                }
                _ = reservation_deadline(deadline) => self.on_reservation_timeout(),
            }
        }

        self.shutdown().await;
        info!("Call orchestrator stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::StartCall => self.start_call(),
            Command::EndCall => self.end_call(),
            Command::ClearError => self.clear_error(),
        }
    }

    fn handle_outcome(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Reservation { session, outcome } => self.on_reservation(session, outcome),
            Outcome::MediaReady {
                session,
                media_session,
                result,
            } => self.on_media_ready(session, media_session, result),
            Outcome::TeardownFinished { session } => self.on_teardown_finished(session),
        }
    }

    fn start_call(&mut self) {
        if self.state != CallState::Idle {
            debug!("Start-call ignored while {}", self.state);
            return;
        }

        let mut session = CallSession::new(self.config.purpose, self.deps.settings.logging_enabled());
        let reservation = self.deps.telephony.reserve_call();
        session.reservation_issued(reservation.id());
        let session_id = *session.id();

        info!("Starting call {} (reservation {})", session_id, reservation.id());
        self.session = Some(session);
        self.deadline = Some(Instant::now() + self.config.connect_timeout);
        self.transition_to(CallState::Connecting);
        counter!("voice_call_attempts_total").increment(1);

        let outcomes = self.outcomes_tx.clone();
        tokio::spawn(async move {
            let outcome = reservation.outcome().await;
            let _ = outcomes.send(Outcome::Reservation {
                session: session_id,
                outcome,
            });
        });
    }

    fn on_reservation(&mut self, session_id: SessionId, outcome: ReservationOutcome) {
        let current = self.state == CallState::Connecting
            && self.session.as_ref().is_some_and(|session| {
                session.accepts(&session_id) && session.reservation() == ReservationStatus::Pending
            });

        if !current {
            self.discard_reservation(outcome);
            return;
        }

        match outcome {
            ReservationOutcome::Granted(id) => self.reservation_granted(id),
            ReservationOutcome::Rejected(e) => self.reservation_rejected(e),
        }
    }

    fn discard_reservation(&self, outcome: ReservationOutcome) {
        match outcome {
            ReservationOutcome::Granted(id) if self.holds_granted_reservation(&id) => {
                // Completion arriving after the platform's start action
                debug!("Reservation {} already resolved", id);
            }
            ReservationOutcome::Granted(id) => {
                info!("Releasing reservation {} granted after its call was abandoned", id);
                counter!("voice_call_stale_outcomes_total").increment(1);
                self.release_in_background(id);
            }
            ReservationOutcome::Rejected(e) => {
                debug!("Discarding late reservation rejection: {}", e);
                counter!("voice_call_stale_outcomes_total").increment(1);
            }
        }
    }

    fn holds_granted_reservation(&self, id: &ReservationId) -> bool {
        self.session.as_ref().is_some_and(|session| {
            !session.timed_out()
                && session.reservation() == ReservationStatus::Granted
                && session.reservation_id() == Some(id)
        })
    }

    fn reservation_granted(&mut self, id: ReservationId) {
        self.deadline = None;
        if let Some(session) = self.session.as_mut() {
            session.grant(id);
        }
        info!("Call reservation {} granted", id);
        self.bring_up_media();
    }

    fn reservation_rejected(&mut self, error: TelephonyError) {
        self.deadline = None;
        let cause = CallError::TelephonyRejected(error.to_string());
        if !cause.is_recoverable() {
            self.fail(cause);
            return;
        }
        warn!("{}; continuing without call integration", cause);

        if let Some(session) = self.session.as_mut() {
            session.fall_back();
        }
        counter!("voice_call_fallbacks_total").increment(1);
        self.events.publish(CallEvent::fallback_taken(error.to_string()));
        self.bring_up_media();
    }

    /// Activate the audio path, then open the media transport in the background
    fn bring_up_media(&mut self) {
        if let Err(e) = self.deps.audio.activate() {
            error!("Error configuring audio session: {}", e);
            self.fail(CallError::AudioConfigurationFailed(e.to_string()));
            return;
        }

        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.set_audio_active(true);

        let request = StartSessionRequest {
            context: session.purpose(),
            logging_enabled: session.logging_enabled(),
        };
        let session_id = *session.id();
        self.bring_up = Some(tokio::spawn(establish_media(
            self.deps.backend.clone(),
            self.deps.media.clone(),
            request,
            session_id,
            self.outcomes_tx.clone(),
        )));
    }

    /// Stop a bring-up that no longer has a call to join
    fn cancel_bring_up(&mut self) {
        if let Some(task) = self.bring_up.take() {
            if !task.is_finished() {
                debug!("Cancelling media bring-up in flight");
                task.abort();
            }
        }
    }

    fn on_media_ready(
        &mut self,
        session_id: SessionId,
        media_session: Option<MediaSessionId>,
        result: std::result::Result<(), CallError>,
    ) {
        let current = self.state == CallState::Connecting
            && self
                .session
                .as_ref()
                .is_some_and(|session| session.accepts(&session_id));

        if !current {
            counter!("voice_call_stale_outcomes_total").increment(1);
            if let Some(media_session) = media_session {
                debug!("Cleaning up media session {} of an abandoned call", media_session);
                self.close_media_session_in_background(media_session);
            }
            return;
        }

        self.bring_up = None;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let mut result = result;
        if let Some(media_session) = media_session {
            if let Some(cause) = session.take_early_loss(&media_session) {
                if result.is_ok() {
                    result = Err(CallError::TransportFailed(
                        cause.unwrap_or_else(|| "media session closed during setup".to_string()),
                    ));
                }
            }
            session.set_media_session(media_session);
        }

        match result {
            Ok(()) => {
                session.mark_connected();
                if session.reservation() == ReservationStatus::Granted {
                    if let Some(id) = session.reservation_id() {
                        self.deps.telephony.report_connected(*id);
                    }
                }
                counter!("voice_calls_connected_total").increment(1);
                gauge!("voice_call_active").set(1.0);
                self.transition_to(CallState::Connected);
            }
            Err(e) => {
                error!("Call bring-up failed: {}", e);
                self.fail(e);
            }
        }
    }

    fn on_reservation_timeout(&mut self) {
        self.deadline = None;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let pending = self.state == CallState::Connecting
            && session.reservation() == ReservationStatus::Pending;
        if !pending {
            return;
        }

        warn!(
            "Call reservation timed out after {:?}",
            self.config.connect_timeout
        );
        session.mark_timed_out();
        counter!("voice_call_failures_total", "reason" => CallError::Timeout.reason()).increment(1);
        self.publish_error(CallError::Timeout);
        self.transition_to(CallState::Idle);
    }

    fn end_call(&mut self) {
        match self.state {
            CallState::Connecting | CallState::Connected => {
                info!("Ending call");
                self.begin_teardown(true);
            }
            CallState::Idle | CallState::Disconnecting => {
                debug!("End-call ignored while {}", self.state)
            }
        }
    }

    /// Move to Disconnecting and tear media and telephony down in the background
    ///
    /// `release_platform_call` is false when the platform already ended the call.
    fn begin_teardown(&mut self, release_platform_call: bool) {
        self.cancel_bring_up();
        let Some(session) = self.session.as_ref() else {
            return;
        };
        self.deadline = None;

        let session_id = *session.id();
        let reservation = if release_platform_call
            && session.reservation() == ReservationStatus::Granted
            && self.deps.telephony.uses_platform()
        {
            session.reservation_id().copied()
        } else {
            None
        };
        let media_session = session.media_session().cloned();

        self.transition_to(CallState::Disconnecting);

        let telephony = self.deps.telephony.clone();
        let media = self.deps.media.clone();
        let backend = self.deps.backend.clone();
        let outcomes = self.outcomes_tx.clone();
        tokio::spawn(async move {
            media.disconnect().await;

            if let Some(id) = reservation {
                if let Err(e) = telephony.release_call(id).await {
                    warn!("Error ending call {}: {}", id, e);
                }
            }

            if let Some(media_session) = media_session {
                if let Err(e) = backend.end_session(media_session.clone()).await {
                    warn!("Could not close session {}: {}", media_session, e);
                }
            }

            let _ = outcomes.send(Outcome::TeardownFinished {
                session: session_id,
            });
        });
    }

    fn on_teardown_finished(&mut self, session_id: SessionId) {
        let current = self.state == CallState::Disconnecting
            && self
                .session
                .as_ref()
                .is_some_and(|session| *session.id() == session_id);
        if !current {
            debug!("Ignoring teardown completion for call {}", session_id);
            return;
        }

        if let Some(session) = self.session.take() {
            if session.audio_active() {
                self.deps.audio.deactivate();
            }
            if let Some(duration) = session.duration() {
                info!("Call {} ended after {}s", session_id, duration.num_seconds());
            }
        }

        counter!("voice_calls_completed_total").increment(1);
        gauge!("voice_call_active").set(0.0);
        self.transition_to(CallState::Idle);
    }

    /// Fatal bring-up failure: release everything synchronously and go idle
    fn fail(&mut self, error: CallError) {
        self.deadline = None;
        self.cancel_bring_up();
        counter!("voice_call_failures_total", "reason" => error.reason()).increment(1);

        if let Some(session) = self.session.take() {
            if session.audio_active() {
                self.deps.audio.deactivate();
            }
            if session.reservation() == ReservationStatus::Granted {
                if let Some(id) = session.reservation_id() {
                    self.release_in_background(*id);
                }
            }
            if let Some(media_session) = session.media_session() {
                self.close_media_session_in_background(media_session.clone());
            }
        }

        self.publish_error(error);
        self.transition_to(CallState::Idle);
    }

    fn on_provider_event(&mut self, event: ProviderEvent) {
        match event {
            ProviderEvent::PerformStart(id) => {
                let pending = self.state == CallState::Connecting
                    && self
                        .session
                        .as_ref()
                        .is_some_and(|session| session.awaits_reservation(&id));
                if pending {
                    info!("Platform performed start for reservation {}", id);
                    self.reservation_granted(id);
                } else {
                    debug!("Ignoring start action for reservation {}", id);
                }
            }
            ProviderEvent::PerformEnd(id) => {
                let ours = self.session.as_ref().is_some_and(|session| {
                    !session.timed_out() && session.reservation_id() == Some(&id)
                });
                match self.state {
                    CallState::Connecting | CallState::Connected if ours => {
                        info!("Call {} ended from the system call interface", id);
                        self.begin_teardown(false);
                    }
                    _ => debug!("Ignoring end action for reservation {}", id),
                }
            }
            ProviderEvent::Reset => self.on_provider_reset(),
        }
    }

    fn on_provider_reset(&mut self) {
        warn!("Telephony provider reset");
        self.deadline = None;
        self.cancel_bring_up();

        if let Some(session) = self.session.take() {
            if session.audio_active() {
                self.deps.audio.deactivate();
            }
            if let Some(media_session) = session.media_session().cloned() {
                self.close_media_session_in_background(media_session);
            }
        }

        if self.state != CallState::Idle {
            gauge!("voice_call_active").set(0.0);
            self.transition_to(CallState::Idle);
        }
    }

    fn on_media_event(&mut self, event: MediaEvent) {
        match event {
            MediaEvent::Lost { session, cause } => {
                let current_media = self
                    .session
                    .as_ref()
                    .and_then(|current| current.media_session());
                let ours = self.state == CallState::Connected && current_media == Some(&session);
                if self.state == CallState::Connecting && current_media.is_none() {
                    // The join may not have been reported yet
                    if let Some(current) = self.session.as_mut() {
                        debug!("Media session {} lost during setup", session);
                        current.record_early_loss(session, cause);
                    }
                    return;
                }
                if !ours {
                    debug!("Ignoring loss of media session {}", session);
                    return;
                }

                match cause {
                    Some(cause) => {
                        error!("Media transport lost: {}", cause);
                        let error = CallError::TransportFailed(cause);
                        counter!("voice_call_failures_total", "reason" => error.reason())
                            .increment(1);
                        self.publish_error(error);
                    }
                    None => info!("Assistant closed media session {}", session),
                }
                self.begin_teardown(true);
            }
        }
    }

    fn clear_error(&mut self) {
        if self.error.take().is_some() {
            self.events.publish(CallEvent::error_cleared());
            self.publish_status();
        }
    }

    fn publish_error(&mut self, error: CallError) {
        self.error = Some(error.clone());
        self.events.publish(CallEvent::error_published(error));
        self.publish_status();
    }

    fn transition_to(&mut self, new_state: CallState) {
        if !self.state.can_transition_to(&new_state) {
            let e = DomainError::InvalidStateTransition(format!(
                "Cannot transition from {} to {}",
                self.state, new_state
            ));
            error!("{}", e);
            return;
        }

        let old_state = std::mem::replace(&mut self.state, new_state);
        info!("Call state {} -> {}", old_state, new_state);
        self.events.publish(CallEvent::state_changed(old_state, new_state));
        self.publish_status();
    }

    fn publish_status(&self) {
        self.status_tx.send_replace(CallStatus {
            state: self.state,
            error: self.error.clone(),
        });
    }

    fn release_in_background(&self, id: ReservationId) {
        let telephony = self.deps.telephony.clone();
        tokio::spawn(async move {
            if let Err(e) = telephony.release_call(id).await {
                warn!("Error releasing reservation {}: {}", id, e);
            }
        });
    }

    /// Leave the room of `media_session`, if still joined, and end it on the backend
    fn close_media_session_in_background(&self, media_session: MediaSessionId) {
        let media = self.deps.media.clone();
        let stale = media_session.clone();
        tokio::spawn(async move { media.disconnect_session(&stale).await });
        self.end_backend_session_in_background(media_session);
    }

    fn end_backend_session_in_background(&self, media_session: MediaSessionId) {
        let backend = self.deps.backend.clone();
        tokio::spawn(async move {
            if let Err(e) = backend.end_session(media_session.clone()).await {
                warn!("Could not close session {}: {}", media_session, e);
            }
        });
    }

    /// Every handle is gone; leave nothing held
    async fn shutdown(&mut self) {
        self.deadline = None;
        self.cancel_bring_up();
        let Some(session) = self.session.take() else {
            return;
        };
        info!("Tearing down call {} on shutdown", session.id());

        self.deps.media.disconnect().await;
        if session.reservation() == ReservationStatus::Granted {
            if let Some(id) = session.reservation_id() {
                if let Err(e) = self.deps.telephony.release_call(*id).await {
                    warn!("Error ending call {}: {}", id, e);
                }
            }
        }
        if session.audio_active() {
            self.deps.audio.deactivate();
        }
        if let Some(media_session) = session.media_session() {
            if let Err(e) = self.deps.backend.end_session(media_session.clone()).await {
                warn!("Could not close session {}: {}", media_session, e);
            }
        }
    }
}

/// Fetch credentials from the call-setup backend and join the room
async fn establish_media(
    backend: Arc<dyn CallSetupBackend>,
    media: Arc<MediaTransportClient>,
    request: StartSessionRequest,
    session: SessionId,
    outcomes: mpsc::UnboundedSender<Outcome>,
) {
    let credentials = match backend.start_session(request).await {
        Ok(credentials) => credentials,
        Err(e) => {
            let _ = outcomes.send(Outcome::MediaReady {
                session,
                media_session: None,
                result: Err(CallError::SetupFailed(e.to_string())),
            });
            return;
        }
    };

    let media_session = credentials.session_id.clone();
    let result = media
        .connect(
            media_session.clone(),
            &credentials.transport_url,
            &credentials.transport_token,
        )
        .await
        .map_err(|e| CallError::TransportFailed(e.to_string()));

    let _ = outcomes.send(Outcome::MediaReady {
        session,
        media_session: Some(media_session),
        result,
    });
}

async fn reservation_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn next_provider_event(
    events: &mut Option<mpsc::UnboundedReceiver<ProviderEvent>>,
) -> Option<ProviderEvent> {
    let Some(receiver) = events.as_mut() else {
        return std::future::pending().await;
    };
    let event = receiver.recv().await;
    if event.is_none() {
        debug!("Telephony provider event stream closed");
        *events = None;
    }
    event
}

async fn next_media_event(
    events: &mut Option<broadcast::Receiver<MediaEvent>>,
) -> Option<MediaEvent> {
    let Some(receiver) = events.as_mut() else {
        return std::future::pending().await;
    };
    loop {
        match receiver.recv().await {
            Ok(event) => return Some(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Missed {} media event(s)", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    *events = None;
    None
}
