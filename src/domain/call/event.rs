//! Call domain events

use crate::domain::call::error::CallError;
use crate::domain::call::value_object::CallState;
use crate::domain::shared::events::{DomainEvent, EventMetadata};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Events published by the call orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallEvent {
    StateChanged {
        metadata: EventMetadata,
        from: CallState,
        to: CallState,
    },
    ErrorPublished {
        metadata: EventMetadata,
        error: CallError,
        message: String,
    },
    ErrorCleared {
        metadata: EventMetadata,
    },
    /// The telephony layer refused the call and the media path went ahead alone
    FallbackTaken {
        metadata: EventMetadata,
        cause: String,
    },
}

impl CallEvent {
    pub fn state_changed(from: CallState, to: CallState) -> Self {
        CallEvent::StateChanged {
            metadata: EventMetadata::new(),
            from,
            to,
        }
    }

    pub fn error_published(error: CallError) -> Self {
        CallEvent::ErrorPublished {
            metadata: EventMetadata::new(),
            message: error.to_string(),
            error,
        }
    }

    pub fn error_cleared() -> Self {
        CallEvent::ErrorCleared {
            metadata: EventMetadata::new(),
        }
    }

    pub fn fallback_taken(cause: impl Into<String>) -> Self {
        CallEvent::FallbackTaken {
            metadata: EventMetadata::new(),
            cause: cause.into(),
        }
    }

    pub fn metadata(&self) -> &EventMetadata {
        match self {
            CallEvent::StateChanged { metadata, .. }
            | CallEvent::ErrorPublished { metadata, .. }
            | CallEvent::ErrorCleared { metadata }
            | CallEvent::FallbackTaken { metadata, .. } => metadata,
        }
    }
}

impl DomainEvent for CallEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CallEvent::StateChanged { .. } => "call.state_changed",
            CallEvent::ErrorPublished { .. } => "call.error_published",
            CallEvent::ErrorCleared { .. } => "call.error_cleared",
            CallEvent::FallbackTaken { .. } => "call.fallback_taken",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.metadata().occurred_at
    }
}
