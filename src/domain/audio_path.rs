//! Device audio session port
//!
//! The audio session is a process-wide exclusive resource.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AudioError {
    #[error("failed to set category: {0}")]
    Category(String),

    #[error("failed to change activation: {0}")]
    Activation(String),

    #[error("failed to override output route: {0}")]
    Route(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCategory {
    PlayAndRecord,
    Playback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioMode {
    VoiceChat,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputPort {
    Speaker,
    Receiver,
}

/// Routes the session may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RouteOptions {
    pub bluetooth_hfp: bool,
    pub bluetooth_a2dp: bool,
    pub airplay: bool,
    pub default_to_speaker: bool,
}

impl RouteOptions {
    /// Every route a hands-free voice conversation can use
    pub fn voice_call() -> Self {
        Self {
            bluetooth_hfp: true,
            bluetooth_a2dp: true,
            airplay: true,
            default_to_speaker: true,
        }
    }
}

/// Platform audio session
#[cfg_attr(test, mockall::automock)]
pub trait AudioSession: Send + Sync {
    fn set_category(
        &self,
        category: AudioCategory,
        mode: AudioMode,
        options: RouteOptions,
    ) -> Result<(), AudioError>;

    /// Activate or deactivate; `notify_others` lets other consumers resume
    fn set_active(&self, active: bool, notify_others: bool) -> Result<(), AudioError>;

    fn override_output(&self, port: OutputPort) -> Result<(), AudioError>;
}
