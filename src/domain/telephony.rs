//! Telephony-integration port
//!
//! The platform call facility gives the call system affordances: ringing UI,
//! lock-screen controls and audio-route arbitration. It does not carry audio.

use crate::domain::shared::value_objects::ReservationId;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TelephonyError {
    #[error("request refused: {0}")]
    Refused(String),

    #[error("call facility unavailable: {0}")]
    Unavailable(String),

    #[error("unknown call {0}")]
    UnknownCall(ReservationId),
}

/// Lifecycle events driven by the platform rather than by our requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderEvent {
    /// The platform performed the start action for a reservation
    PerformStart(ReservationId),
    /// The platform ended a call (lock screen, headset, or our own request)
    PerformEnd(ReservationId),
    /// The platform dropped every call it knew about
    Reset,
}

/// Outcome of a reservation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReservationOutcome {
    Granted(ReservationId),
    Rejected(TelephonyError),
}

/// How the system call UI identifies the remote party
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandleType {
    #[default]
    Generic,
    PhoneNumber,
    EmailAddress,
}

/// Static description handed to the platform facility
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfiguration {
    /// Name shown by the system call UI
    pub display_name: String,
    pub supports_video: bool,
    pub max_calls_per_group: u32,
    pub handle_type: HandleType,
}

impl Default for ProviderConfiguration {
    fn default() -> Self {
        Self {
            display_name: "AI Assistant".to_string(),
            supports_video: false,
            max_calls_per_group: 1,
            handle_type: HandleType::Generic,
        }
    }
}

/// Platform call-management facility
///
/// Implementations must never block; requests resolve asynchronously and may
/// never resolve at all.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TelephonyProvider: Send + Sync {
    /// Ask the platform to start an outgoing call
    async fn request_start(&self, id: ReservationId) -> Result<(), TelephonyError>;

    /// Ask the platform to end a call
    async fn request_end(&self, id: ReservationId) -> Result<(), TelephonyError>;

    /// Tell the platform the outgoing call is connected
    fn report_connected(&self, id: ReservationId);

    /// Hand over the lifecycle event stream; only the first call returns it
    fn take_events(&self) -> Option<mpsc::UnboundedReceiver<ProviderEvent>>;
}
