//! Interface layer - External interfaces
//!
//! This layer handles:
//! - REST endpoints controlling the call
//! - WebSocket streaming of call events
//! - Prometheus metrics exposition

pub mod api;
