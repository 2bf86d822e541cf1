//! Configuration management
//!
//! Layered with the `config` crate: built-in defaults, then an optional file,
//! then `VOXLINK__SECTION__KEY` environment variables.

use crate::domain::call::{CallPurpose, DeviceInfo, InterfaceIdiom, TelephonyMode};
use config::{ConfigError, Environment, File, Map};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Environment variable naming the configuration file
pub const CONFIG_PATH_ENV: &str = "VOXLINK_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub call: CallConfig,
    pub telephony: TelephonyConfig,
    pub audio: AudioConfig,
    pub backend: BackendConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CallConfig {
    /// Upper bound on the telephony reservation
    pub connect_timeout_secs: u64,
    pub purpose: CallPurpose,
    /// Initial value of the user's logging preference
    pub logging_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelephonyConfig {
    pub mode: TelephonyMode,
    pub hardware_model: String,
    pub interface_idiom: InterfaceIdiom,
    /// Name the system call UI shows for the assistant
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub prefer_speaker: bool,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Session service; a fixed endpoint is used when unset
    pub base_url: Option<String>,
    pub auth_token: Option<String>,
    pub request_timeout_secs: u64,
    pub transport_url: String,
    pub transport_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            purpose: CallPurpose::Phone,
            logging_enabled: true,
        }
    }
}

impl Default for TelephonyConfig {
    fn default() -> Self {
        Self {
            mode: TelephonyMode::Auto,
            hardware_model: "iPhone".to_string(),
            interface_idiom: InterfaceIdiom::Phone,
            display_name: "AI Assistant".to_string(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            prefer_speaker: true,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            auth_token: None,
            request_timeout_secs: 15,
            transport_url: "ws://127.0.0.1:7880".to_string(),
            transport_token: "devkey".to_string(),
        }
    }
}

// Credentials stay out of logged configuration
impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const REDACTED: &str = "<redacted>";
        f.debug_struct("BackendConfig")
            .field("base_url", &self.base_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| REDACTED))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("transport_url", &self.transport_url)
            .field("transport_token", &REDACTED)
            .finish()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load defaults, then `path` if it exists, then the environment
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        Self::build(path, None)
    }

    fn build(path: Option<&str>, env: Option<Map<String, String>>) -> Result<Self, ConfigError> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Config::default())?);

        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(false));
        }

        builder
            .add_source(
                Environment::with_prefix("VOXLINK")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.call.connect_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "call.connect_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.telephony.display_name.trim().is_empty() {
            return Err(ConfigError::Message(
                "telephony.display_name must not be empty".to_string(),
            ));
        }
        if self.backend.request_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "backend.request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.call.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.request_timeout_secs)
    }

    pub fn device(&self) -> DeviceInfo {
        DeviceInfo::new(
            self.telephony.hardware_model.clone(),
            self.telephony.interface_idiom,
        )
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
