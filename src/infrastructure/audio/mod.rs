//! Device audio path

pub mod controller;
pub mod loopback;

pub use controller::AudioPathController;
pub use loopback::LoopbackAudioSession;
