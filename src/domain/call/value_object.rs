//! Call value objects

use serde::{Deserialize, Serialize};
use std::fmt;

/// User-visible call state
///
/// Owned exclusively by the call orchestrator; everything else observes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallState {
    /// No call in progress
    Idle,
    /// Reservation, audio path and media transport are being brought up
    Connecting,
    /// Audio is flowing to and from the assistant
    Connected,
    /// Teardown in progress
    Disconnecting,
}

impl CallState {
    /// Check if state transition is valid
    pub fn can_transition_to(&self, new_state: &CallState) -> bool {
        use CallState::*;

        match (self, new_state) {
            (Idle, Connecting) => true,

            // Connected only after audio and media are up; Idle on timeout,
            // fatal failure or provider reset; Disconnecting on cancel.
            (Connecting, Connected) => true,
            (Connecting, Idle) => true,
            (Connecting, Disconnecting) => true,

            (Connected, Disconnecting) => true,
            // Provider reset
            (Connected, Idle) => true,

            (Disconnecting, Idle) => true,

            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CallState::Idle => "idle",
            CallState::Connecting => "connecting",
            CallState::Connected => "connected",
            CallState::Disconnecting => "disconnecting",
        }
    }

    /// Whether a call attempt or an active call currently exists
    pub fn is_busy(&self) -> bool {
        !matches!(self, CallState::Idle)
    }

    /// Transitional states; the call button is disabled while in these
    pub fn is_transitional(&self) -> bool {
        matches!(self, CallState::Connecting | CallState::Disconnecting)
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Purpose tag sent to the call-setup backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallPurpose {
    #[default]
    Phone,
    Carplay,
}

impl CallPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallPurpose::Phone => "phone",
            CallPurpose::Carplay => "carplay",
        }
    }
}

/// Progress of the telephony reservation for one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationStatus {
    /// Request issued, no outcome yet; the connect deadline is armed
    Pending,
    /// Reservation granted (real or synthetic)
    Granted,
    /// Reservation rejected; the call proceeds without telephony integration
    FellBack,
}
