//! Call-setup backend clients and user settings

pub mod fixed;
pub mod http;
pub mod settings;

pub use fixed::FixedCallSetupBackend;
pub use http::HttpCallSetupBackend;
pub use settings::InMemorySettings;
