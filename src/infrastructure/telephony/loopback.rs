//! In-process telephony provider
//!
//! Stands in for a platform call facility. Each reservation follows a
//! scripted behaviour so callers can reproduce slow, refused or hanging
//! platforms on a virtual clock.

use crate::domain::shared::value_objects::ReservationId;
use crate::domain::telephony::{
    ProviderConfiguration, ProviderEvent, TelephonyError, TelephonyProvider,
};
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// How the loopback platform answers a start request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReservationBehavior {
    /// Grant after a delay, then perform the start action
    Grant { after: Duration },
    /// Refuse after a delay
    Reject { after: Duration, reason: String },
    /// Never answer
    Hang,
}

impl Default for ReservationBehavior {
    fn default() -> Self {
        ReservationBehavior::Grant {
            after: Duration::from_millis(50),
        }
    }
}

#[derive(Debug, Default)]
struct Ledger {
    start_requests: Vec<ReservationId>,
    end_requests: Vec<ReservationId>,
    connected_reports: Vec<ReservationId>,
    active: Vec<ReservationId>,
}

pub struct LoopbackTelephonyProvider {
    configuration: ProviderConfiguration,
    behavior: Mutex<ReservationBehavior>,
    end_failure: Mutex<Option<String>>,
    ledger: Mutex<Ledger>,
    events_tx: mpsc::UnboundedSender<ProviderEvent>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<ProviderEvent>>>,
}

impl LoopbackTelephonyProvider {
    pub fn new(configuration: ProviderConfiguration, behavior: ReservationBehavior) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        info!(
            "Loopback call facility ready (display name: {})",
            configuration.display_name
        );
        Self {
            configuration,
            behavior: Mutex::new(behavior),
            end_failure: Mutex::new(None),
            ledger: Mutex::new(Ledger::default()),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
        }
    }

    pub fn configuration(&self) -> &ProviderConfiguration {
        &self.configuration
    }

    pub fn set_behavior(&self, behavior: ReservationBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    /// Make every subsequent end request fail with `reason`
    pub fn fail_end_requests(&self, reason: impl Into<String>) {
        *self.end_failure.lock().unwrap() = Some(reason.into());
    }

    /// Inject a platform-driven lifecycle event
    pub fn emit(&self, event: ProviderEvent) {
        if let ProviderEvent::Reset = event {
            self.ledger.lock().unwrap().active.clear();
        }
        let _ = self.events_tx.send(event);
    }

    pub fn start_requests(&self) -> Vec<ReservationId> {
        self.ledger.lock().unwrap().start_requests.clone()
    }

    pub fn end_requests(&self) -> Vec<ReservationId> {
        self.ledger.lock().unwrap().end_requests.clone()
    }

    pub fn connected_reports(&self) -> Vec<ReservationId> {
        self.ledger.lock().unwrap().connected_reports.clone()
    }

    /// Calls the platform currently believes are in progress
    pub fn active_calls(&self) -> Vec<ReservationId> {
        self.ledger.lock().unwrap().active.clone()
    }
}

#[async_trait]
impl TelephonyProvider for LoopbackTelephonyProvider {
    async fn request_start(&self, id: ReservationId) -> Result<(), TelephonyError> {
        self.ledger.lock().unwrap().start_requests.push(id);
        let behavior = self.behavior.lock().unwrap().clone();
        debug!("Start request {} answered with {:?}", id, behavior);

        match behavior {
            ReservationBehavior::Grant { after } => {
                tokio::time::sleep(after).await;
                self.ledger.lock().unwrap().active.push(id);
                let _ = self.events_tx.send(ProviderEvent::PerformStart(id));
                Ok(())
            }
            ReservationBehavior::Reject { after, reason } => {
                tokio::time::sleep(after).await;
                Err(TelephonyError::Refused(reason))
            }
            ReservationBehavior::Hang => std::future::pending().await,
        }
    }

    async fn request_end(&self, id: ReservationId) -> Result<(), TelephonyError> {
        let failure = self.end_failure.lock().unwrap().clone();
        let known = {
            let mut ledger = self.ledger.lock().unwrap();
            ledger.end_requests.push(id);
            let known = ledger.active.contains(&id);
            ledger.active.retain(|active| *active != id);
            known
        };

        if let Some(reason) = failure {
            return Err(TelephonyError::Refused(reason));
        }
        if !known {
            return Err(TelephonyError::UnknownCall(id));
        }

        let _ = self.events_tx.send(ProviderEvent::PerformEnd(id));
        Ok(())
    }

    fn report_connected(&self, id: ReservationId) {
        self.ledger.lock().unwrap().connected_reports.push(id);
    }

    fn take_events(&self) -> Option<mpsc::UnboundedReceiver<ProviderEvent>> {
        self.events_rx.lock().unwrap().take()
    }
}
