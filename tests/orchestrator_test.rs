//! Call orchestrator scenarios on a virtual clock
//!
//! Every collaborator is an in-process double with scripted latency, so the
//! reservation timeout race is reproduced deterministically.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use voxlink::application::{
    CallDependencies, CallOrchestrator, CallOrchestratorHandle, OrchestratorConfig,
};
use voxlink::domain::call::{CallError, CallEvent, CallPurpose, CallState, CapabilityProfile};
use voxlink::domain::telephony::{ProviderConfiguration, ProviderEvent};
use voxlink::infrastructure::audio::{AudioPathController, LoopbackAudioSession};
use voxlink::infrastructure::backend::{FixedCallSetupBackend, InMemorySettings};
use voxlink::infrastructure::media::{LoopbackRoomConnector, MediaTransportClient};
use voxlink::infrastructure::telephony::{
    LoopbackTelephonyProvider, ReservationBehavior, TelephonyAdapter,
};

struct Harness {
    handle: CallOrchestratorHandle,
    events: broadcast::Receiver<CallEvent>,
    telephony: Arc<LoopbackTelephonyProvider>,
    audio: Arc<LoopbackAudioSession>,
    connector: Arc<LoopbackRoomConnector>,
    backend: Arc<FixedCallSetupBackend>,
    settings: Arc<InMemorySettings>,
}

struct Setup {
    behavior: ReservationBehavior,
    connect_delay: Duration,
    platform: bool,
}

impl Setup {
    fn granting_after(after: Duration) -> Self {
        Self {
            behavior: ReservationBehavior::Grant { after },
            connect_delay: Duration::ZERO,
            platform: true,
        }
    }

    fn rejecting_after(after: Duration) -> Self {
        Self {
            behavior: ReservationBehavior::Reject {
                after,
                reason: "denied by platform".to_string(),
            },
            connect_delay: Duration::ZERO,
            platform: true,
        }
    }

    fn hanging() -> Self {
        Self {
            behavior: ReservationBehavior::Hang,
            connect_delay: Duration::ZERO,
            platform: true,
        }
    }

    fn connect_after(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    fn bypassed(mut self) -> Self {
        self.platform = false;
        self
    }

    fn spawn(self) -> Harness {
        let telephony = Arc::new(LoopbackTelephonyProvider::new(
            ProviderConfiguration::default(),
            self.behavior,
        ));
        let audio = Arc::new(LoopbackAudioSession::new());
        let connector = Arc::new(LoopbackRoomConnector::new());
        connector.set_connect_delay(self.connect_delay);
        let backend = Arc::new(FixedCallSetupBackend::new(
            "wss://media.example.com",
            "token",
        ));
        let settings = Arc::new(InMemorySettings::new(true));

        let adapter = if self.platform {
            TelephonyAdapter::new(
                CapabilityProfile::supported("test device"),
                Some(telephony.clone()),
            )
        } else {
            TelephonyAdapter::bypass()
        };

        let deps = CallDependencies {
            telephony: Arc::new(adapter),
            audio: Arc::new(AudioPathController::new(audio.clone(), true)),
            media: Arc::new(MediaTransportClient::new(connector.clone())),
            backend: backend.clone(),
            settings: settings.clone(),
        };

        let (handle, _task) = CallOrchestrator::spawn(OrchestratorConfig::default(), deps);
        let events = handle.subscribe();

        Harness {
            handle,
            events,
            telephony,
            audio,
            connector,
            backend,
            settings,
        }
    }
}

impl Harness {
    /// Let every pending timer and task run for `duration` of virtual time
    async fn advance(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn drain(&mut self) -> Vec<CallEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            drained.push(event);
        }
        drained
    }
}

/// States observed from an Idle start
fn state_trace(events: &[CallEvent]) -> Vec<CallState> {
    let mut trace = vec![CallState::Idle];
    for event in events {
        if let CallEvent::StateChanged { to, .. } = event {
            trace.push(*to);
        }
    }
    trace
}

fn published_errors(events: &[CallEvent]) -> Vec<CallError> {
    events
        .iter()
        .filter_map(|event| match event {
            CallEvent::ErrorPublished { error, .. } => Some(error.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_granted_call_connects() {
    let mut h = Setup::granting_after(Duration::from_secs(2))
        .connect_after(Duration::from_secs(1))
        .spawn();
    let started = Instant::now();

    h.handle.start_call().await.unwrap();
    let status = h.handle.wait_for_state(CallState::Connected).await.unwrap();

    assert_eq!(started.elapsed(), Duration::from_secs(3));
    assert!(status.error.is_none());

    h.advance(Duration::from_secs(1)).await;
    let events = h.drain();
    assert_eq!(
        state_trace(&events),
        vec![CallState::Idle, CallState::Connecting, CallState::Connected]
    );
    assert!(published_errors(&events).is_empty());

    let reservation = h.telephony.start_requests()[0];
    assert_eq!(h.telephony.connected_reports(), vec![reservation]);
    assert!(h.audio.is_active());
    let room = h.connector.last_room().unwrap();
    assert!(room.microphone_published());
    assert_eq!(room.url(), "wss://media.example.com");
}

#[tokio::test(start_paused = true)]
async fn test_reservation_timeout_publishes_one_error() {
    let mut h = Setup::granting_after(Duration::from_secs(11)).spawn();
    let mut status = h.handle.watch_status();
    let started = Instant::now();

    h.handle.start_call().await.unwrap();
    status
        .wait_for(|status| status.error.is_some())
        .await
        .unwrap();
    assert_eq!(started.elapsed(), Duration::from_secs(10));
    assert_eq!(h.handle.state(), CallState::Idle);
    assert_eq!(h.handle.error(), Some(CallError::Timeout));

    let events = h.drain();
    assert_eq!(
        state_trace(&events),
        vec![CallState::Idle, CallState::Connecting, CallState::Idle]
    );
    assert_eq!(published_errors(&events), vec![CallError::Timeout]);

    // The platform grants at 11s; the orchestrator releases it and moves on
    h.advance(Duration::from_secs(5)).await;
    assert!(h.drain().is_empty());
    assert_eq!(h.handle.state(), CallState::Idle);
    let reservation = h.telephony.start_requests()[0];
    assert_eq!(h.telephony.end_requests(), vec![reservation]);
    assert!(h.telephony.active_calls().is_empty());
    assert_eq!(h.connector.connect_attempts(), 0);
    assert_eq!(h.audio.activations(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_reservation_falls_back() {
    let mut h = Setup::rejecting_after(Duration::from_secs(1))
        .connect_after(Duration::from_secs(1))
        .spawn();
    let started = Instant::now();

    h.handle.start_call().await.unwrap();
    h.handle.wait_for_state(CallState::Connected).await.unwrap();
    assert_eq!(started.elapsed(), Duration::from_secs(2));

    h.advance(Duration::from_secs(1)).await;
    let events = h.drain();
    assert_eq!(
        state_trace(&events),
        vec![CallState::Idle, CallState::Connecting, CallState::Connected]
    );
    assert!(published_errors(&events).is_empty());
    assert!(events
        .iter()
        .any(|event| matches!(event, CallEvent::FallbackTaken { .. })));
    assert!(h.handle.error().is_none());
    assert!(h.telephony.connected_reports().is_empty());

    // Nothing to release on the platform side after a fallback
    h.handle.end_call().await.unwrap();
    h.handle.wait_for_state(CallState::Idle).await.unwrap();
    assert!(h.telephony.end_requests().is_empty());
    assert_eq!(h.audio.deactivations(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_double_start_is_idempotent() {
    let h = Setup::granting_after(Duration::from_secs(1)).spawn();

    h.handle.start_call().await.unwrap();
    h.handle.start_call().await.unwrap();
    h.handle.wait_for_state(CallState::Connected).await.unwrap();
    h.handle.start_call().await.unwrap();
    h.advance(Duration::from_secs(1)).await;

    assert_eq!(h.telephony.start_requests().len(), 1);
    assert_eq!(h.connector.connect_attempts(), 1);
    assert_eq!(h.backend.started().len(), 1);
    assert_eq!(h.handle.state(), CallState::Connected);
}

#[tokio::test(start_paused = true)]
async fn test_audio_deactivated_once_when_teardown_errors() {
    let mut h = Setup::granting_after(Duration::from_millis(100)).spawn();
    h.telephony.fail_end_requests("platform busy");
    h.connector.fail_disconnect("socket already closed");
    h.audio.fail_deactivation("session in use");

    h.handle.start_call().await.unwrap();
    h.handle.wait_for_state(CallState::Connected).await.unwrap();
    h.handle.end_call().await.unwrap();
    h.handle.end_call().await.unwrap();
    h.handle.wait_for_state(CallState::Idle).await.unwrap();
    h.advance(Duration::from_secs(1)).await;

    assert_eq!(h.audio.deactivations(), 1);
    assert_eq!(h.telephony.end_requests().len(), 1);
    assert!(h.connector.last_room().unwrap().is_disconnected());
    let events = h.drain();
    assert_eq!(
        state_trace(&events),
        vec![
            CallState::Idle,
            CallState::Connecting,
            CallState::Connected,
            CallState::Disconnecting,
            CallState::Idle,
        ]
    );
    assert!(published_errors(&events).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_completed_call_releases_everything() {
    let h = Setup::granting_after(Duration::from_millis(100)).spawn();

    h.handle.start_call().await.unwrap();
    h.handle.wait_for_state(CallState::Connected).await.unwrap();
    let reservation = h.telephony.start_requests()[0];

    h.handle.end_call().await.unwrap();
    h.handle.wait_for_state(CallState::Idle).await.unwrap();
    h.advance(Duration::from_secs(1)).await;

    assert_eq!(h.telephony.end_requests(), vec![reservation]);
    assert!(h.telephony.active_calls().is_empty());
    assert!(!h.audio.is_active());
    assert_eq!(h.backend.ended().len(), 1);
    assert!(h.connector.last_room().unwrap().is_disconnected());
    assert!(h.handle.error().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_bypassed_telephony_still_connects() {
    let h = Setup::granting_after(Duration::from_secs(1))
        .bypassed()
        .spawn();
    assert!(!h.handle.capability().telephony_supported());

    h.handle.start_call().await.unwrap();
    h.handle.wait_for_state(CallState::Connected).await.unwrap();
    h.handle.end_call().await.unwrap();
    h.handle.wait_for_state(CallState::Idle).await.unwrap();

    assert!(h.telephony.start_requests().is_empty());
    assert!(h.telephony.end_requests().is_empty());
    assert_eq!(h.audio.activations(), 1);
    assert_eq!(h.audio.deactivations(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_audio_failure_is_fatal() {
    let mut h = Setup::granting_after(Duration::from_millis(100)).spawn();
    h.audio.fail_category("input unavailable");
    let mut status = h.handle.watch_status();

    h.handle.start_call().await.unwrap();
    status
        .wait_for(|status| status.error.is_some())
        .await
        .unwrap();
    h.advance(Duration::from_secs(1)).await;

    assert_eq!(h.handle.state(), CallState::Idle);
    let error = h.handle.error().unwrap();
    assert!(matches!(error, CallError::AudioConfigurationFailed(_)));
    assert!(error
        .to_string()
        .starts_with("Could not configure audio: "));

    assert_eq!(h.connector.connect_attempts(), 0);
    assert!(h.backend.started().is_empty());
    let reservation = h.telephony.start_requests()[0];
    assert_eq!(h.telephony.end_requests(), vec![reservation]);
    assert_eq!(published_errors(&h.drain()).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_transport_failure_is_fatal() {
    let h = Setup::granting_after(Duration::from_millis(100)).spawn();
    h.connector.fail_connect("server unreachable");
    let mut status = h.handle.watch_status();

    h.handle.start_call().await.unwrap();
    status
        .wait_for(|status| status.error.is_some() && status.state == CallState::Idle)
        .await
        .unwrap();
    h.advance(Duration::from_secs(1)).await;

    assert!(matches!(
        h.handle.error(),
        Some(CallError::TransportFailed(_))
    ));
    assert_eq!(h.audio.activations(), 1);
    assert_eq!(h.audio.deactivations(), 1);
    assert_eq!(h.backend.ended().len(), 1);
    assert_eq!(h.telephony.end_requests().len(), 1);
    assert!(h.telephony.connected_reports().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_backend_failure_is_fatal() {
    let h = Setup::granting_after(Duration::from_millis(100)).spawn();
    h.backend.fail_with("maintenance");
    let mut status = h.handle.watch_status();

    h.handle.start_call().await.unwrap();
    status
        .wait_for(|status| status.error.is_some() && status.state == CallState::Idle)
        .await
        .unwrap();

    assert_eq!(
        h.handle.status().error_message().as_deref(),
        Some("Could not start the session: backend answered 503: maintenance")
    );
    assert_eq!(h.connector.connect_attempts(), 0);
    assert_eq!(h.audio.deactivations(), 1);
    assert!(h.backend.ended().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_clear_error_then_retry() {
    let mut h = Setup::hanging().spawn();
    let mut status = h.handle.watch_status();

    h.handle.start_call().await.unwrap();
    status
        .wait_for(|status| status.error.is_some())
        .await
        .unwrap();

    h.handle.clear_error().await.unwrap();
    status
        .wait_for(|status| status.error.is_none())
        .await
        .unwrap();
    assert!(h
        .drain()
        .iter()
        .any(|event| matches!(event, CallEvent::ErrorCleared { .. })));

    h.telephony.set_behavior(ReservationBehavior::Grant {
        after: Duration::from_secs(1),
    });
    h.handle.start_call().await.unwrap();
    h.handle.wait_for_state(CallState::Connected).await.unwrap();

    assert!(h.handle.error().is_none());
    assert_eq!(h.telephony.start_requests().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_stale_grant_leaves_new_call_alone() {
    let h = Setup::granting_after(Duration::from_secs(11)).spawn();
    let mut status = h.handle.watch_status();

    h.handle.start_call().await.unwrap();
    status
        .wait_for(|status| status.error.is_some())
        .await
        .unwrap();
    let first = h.telephony.start_requests()[0];

    // Second attempt at 10s; the first grant lands at 11s, the second at 12s
    h.telephony.set_behavior(ReservationBehavior::Grant {
        after: Duration::from_secs(2),
    });
    h.handle.start_call().await.unwrap();
    h.handle.wait_for_state(CallState::Connected).await.unwrap();
    h.advance(Duration::from_secs(1)).await;

    let second = h.telephony.start_requests()[1];
    assert_eq!(h.handle.state(), CallState::Connected);
    assert_eq!(h.telephony.end_requests(), vec![first]);
    assert_eq!(h.telephony.active_calls(), vec![second]);
    assert_eq!(h.telephony.connected_reports(), vec![second]);
    assert_eq!(h.connector.connect_attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_while_connecting() {
    let mut h = Setup::hanging().spawn();

    h.handle.start_call().await.unwrap();
    h.advance(Duration::from_secs(2)).await;
    h.handle.end_call().await.unwrap();
    h.handle.wait_for_state(CallState::Idle).await.unwrap();

    // The deadline was disarmed with the attempt
    h.advance(Duration::from_secs(20)).await;
    let events = h.drain();
    assert_eq!(
        state_trace(&events),
        vec![
            CallState::Idle,
            CallState::Connecting,
            CallState::Disconnecting,
            CallState::Idle,
        ]
    );
    assert!(published_errors(&events).is_empty());
    assert!(h.telephony.end_requests().is_empty());
    assert_eq!(h.audio.activations(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_setup_leaves_next_call_alone() {
    let h = Setup::hanging().bypassed().spawn();
    h.backend.set_start_delay(Duration::from_secs(5));

    // End the first call while the backend is still answering
    h.handle.start_call().await.unwrap();
    h.advance(Duration::from_secs(1)).await;
    assert_eq!(h.handle.state(), CallState::Connecting);
    h.handle.end_call().await.unwrap();
    h.handle.wait_for_state(CallState::Idle).await.unwrap();

    h.backend.set_start_delay(Duration::ZERO);
    h.handle.start_call().await.unwrap();
    h.handle.wait_for_state(CallState::Connected).await.unwrap();

    // Well past the point where the first setup would have answered
    h.advance(Duration::from_secs(10)).await;

    assert_eq!(h.handle.state(), CallState::Connected);
    assert!(h.handle.error().is_none());
    assert_eq!(h.backend.started().len(), 2);
    assert_eq!(h.connector.connect_attempts(), 1);
    assert!(!h.connector.last_room().unwrap().is_disconnected());
}

#[tokio::test(start_paused = true)]
async fn test_provider_reset_drops_call() {
    let h = Setup::granting_after(Duration::from_millis(100)).spawn();

    h.handle.start_call().await.unwrap();
    h.handle.wait_for_state(CallState::Connected).await.unwrap();

    h.telephony.emit(ProviderEvent::Reset);
    h.handle.wait_for_state(CallState::Idle).await.unwrap();
    h.advance(Duration::from_secs(1)).await;

    assert_eq!(h.audio.deactivations(), 1);
    assert!(h.connector.last_room().unwrap().is_disconnected());
    assert_eq!(h.backend.ended().len(), 1);
    assert!(h.telephony.end_requests().is_empty());
    assert!(h.handle.error().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_call_ended_from_system_ui() {
    let h = Setup::granting_after(Duration::from_millis(100)).spawn();

    h.handle.start_call().await.unwrap();
    h.handle.wait_for_state(CallState::Connected).await.unwrap();
    let reservation = h.telephony.start_requests()[0];

    h.telephony.emit(ProviderEvent::PerformEnd(reservation));
    h.handle.wait_for_state(CallState::Idle).await.unwrap();
    h.advance(Duration::from_secs(1)).await;

    assert!(h.telephony.end_requests().is_empty());
    assert!(h.connector.last_room().unwrap().is_disconnected());
    assert_eq!(h.audio.deactivations(), 1);
    assert!(h.handle.error().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_media_loss_ends_call() {
    let h = Setup::granting_after(Duration::from_millis(100)).spawn();

    h.handle.start_call().await.unwrap();
    h.handle.wait_for_state(CallState::Connected).await.unwrap();

    h.connector
        .last_room()
        .unwrap()
        .simulate_disconnect(Some("server shut down".to_string()));
    h.handle.wait_for_state(CallState::Idle).await.unwrap();
    h.advance(Duration::from_secs(1)).await;

    assert_eq!(
        h.handle.error(),
        Some(CallError::TransportFailed("server shut down".to_string()))
    );
    assert_eq!(h.telephony.end_requests().len(), 1);
    assert_eq!(h.audio.deactivations(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_assistant_hangup_is_not_an_error() {
    let h = Setup::granting_after(Duration::from_millis(100)).spawn();

    h.handle.start_call().await.unwrap();
    h.handle.wait_for_state(CallState::Connected).await.unwrap();

    h.connector.last_room().unwrap().simulate_disconnect(None);
    h.handle.wait_for_state(CallState::Idle).await.unwrap();

    assert!(h.handle.error().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_logging_preference_snapshot() {
    let h = Setup::granting_after(Duration::from_millis(100)).spawn();
    h.settings.set_logging_enabled(false);

    h.handle.start_call().await.unwrap();
    h.handle.wait_for_state(CallState::Connected).await.unwrap();
    h.settings.set_logging_enabled(true);
    h.handle.end_call().await.unwrap();
    h.handle.wait_for_state(CallState::Idle).await.unwrap();

    h.handle.start_call().await.unwrap();
    h.handle.wait_for_state(CallState::Connected).await.unwrap();

    let started = h.backend.started();
    assert_eq!(started.len(), 2);
    assert!(!started[0].logging_enabled);
    assert!(started[1].logging_enabled);
    assert_eq!(started[0].context, CallPurpose::Phone);
}
