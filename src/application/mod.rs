//! Application layer - the call use cases
//!
//! The orchestrator sequences the telephony, audio and media leaves and owns
//! the one authoritative call state.

pub mod events;
pub mod orchestrator;

pub use events::CallEventBroadcaster;
pub use orchestrator::{
    CallDependencies, CallOrchestrator, CallOrchestratorHandle, CallStatus, OrchestratorConfig,
};
