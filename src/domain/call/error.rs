//! Errors published by the call orchestrator

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error signal observed by the presentation layer
///
/// Clearing it is a separate user action; the orchestrator never clears it on
/// its own.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "cause", rename_all = "snake_case")]
pub enum CallError {
    #[error("Call setup timed out. Please try again.")]
    Timeout,

    #[error("Could not configure audio: {0}")]
    AudioConfigurationFailed(String),

    #[error("Could not connect to the assistant: {0}")]
    TransportFailed(String),

    #[error("Could not start the session: {0}")]
    SetupFailed(String),

    /// Absorbed by the fallback path, never published
    #[error("Call integration refused the call: {0}")]
    TelephonyRejected(String),
}

impl CallError {
    /// Recoverable errors are converted into a fallback instead of failing the call
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CallError::TelephonyRejected(_))
    }

    /// Short label used for metrics
    pub fn reason(&self) -> &'static str {
        match self {
            CallError::Timeout => "timeout",
            CallError::AudioConfigurationFailed(_) => "audio",
            CallError::TransportFailed(_) => "transport",
            CallError::SetupFailed(_) => "setup",
            CallError::TelephonyRejected(_) => "telephony",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_human_readable() {
        assert_eq!(
            CallError::Timeout.to_string(),
            "Call setup timed out. Please try again."
        );
        assert_eq!(
            CallError::AudioConfigurationFailed("category rejected".into()).to_string(),
            "Could not configure audio: category rejected"
        );
    }

    #[test]
    fn test_only_telephony_rejection_is_recoverable() {
        assert!(CallError::TelephonyRejected("denied".into()).is_recoverable());
        assert!(!CallError::Timeout.is_recoverable());
        assert!(!CallError::TransportFailed("x".into()).is_recoverable());
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(CallError::TransportFailed("refused".into())).unwrap();
        assert_eq!(json["kind"], "transport_failed");
        assert_eq!(json["cause"], "refused");
    }
}
