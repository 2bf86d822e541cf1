//! Domain layer - Core call rules and the ports to the outside world
//!
//! This layer contains:
//! - The call context: state machine, session entity, errors and events
//! - Ports for telephony integration, the audio path and the media transport
//! - The call-setup backend and settings ports

pub mod audio_path;
pub mod backend;
pub mod call;
pub mod media;
pub mod shared;
pub mod telephony;

// Re-export commonly used types
pub use shared::{DomainError, Result};
