//! Infrastructure layer - Technical implementations
//!
//! This layer contains:
//! - The telephony adapter and an in-process call facility
//! - The audio path controller
//! - The media transport client and in-process rooms
//! - Call-setup backend clients and settings

pub mod audio;
pub mod backend;
pub mod media;
pub mod telephony;
