//! Real-time media transport

pub mod client;
pub mod loopback;

pub use client::MediaTransportClient;
pub use loopback::{LoopbackRoom, LoopbackRoomConnector};
