//! Voxlink - voice calls to an AI assistant
//!
//! Coordinates three independently failing subsystems for one call: the
//! platform telephony integration, the device audio path and the real-time
//! media transport. Layered the DDD way: domain ports and rules, loopback and
//! HTTP adapters, the call orchestrator, and an HTTP control surface.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interface;

// Re-export commonly used types
pub use domain::shared::error::DomainError;
pub use domain::shared::result::Result;
