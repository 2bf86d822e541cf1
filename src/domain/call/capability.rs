//! Device capability profile for telephony integration

use serde::{Deserialize, Serialize};

/// How telephony integration is selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TelephonyMode {
    /// Probe the hardware class
    #[default]
    Auto,
    /// Always use the platform call facility
    Platform,
    /// Never use it
    Bypass,
}

/// Interface idiom reported by the platform
///
/// Compatibility modes can report a phone idiom on tablet hardware, so the
/// idiom is never used for capability decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceIdiom {
    #[default]
    Phone,
    Pad,
    Desktop,
}

/// Facts about the device the process runs on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Hardware model name, e.g. "iPhone" or "iPad"
    pub hardware_model: String,
    pub interface_idiom: InterfaceIdiom,
}

impl DeviceInfo {
    pub fn new(hardware_model: impl Into<String>, interface_idiom: InterfaceIdiom) -> Self {
        Self {
            hardware_model: hardware_model.into(),
            interface_idiom,
        }
    }

    /// Tablet hardware has no platform call facility
    pub fn is_tablet_hardware(&self) -> bool {
        self.hardware_model.to_ascii_lowercase().contains("ipad")
    }
}

/// Whether the telephony-integration layer is usable on this hardware
///
/// Computed once and immutable for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityProfile {
    telephony_supported: bool,
    reason: String,
}

impl CapabilityProfile {
    pub fn detect(device: &DeviceInfo, mode: TelephonyMode) -> Self {
        match mode {
            TelephonyMode::Platform => Self::supported("forced by configuration"),
            TelephonyMode::Bypass => Self::unsupported("bypassed by configuration"),
            TelephonyMode::Auto if device.is_tablet_hardware() => Self::unsupported(format!(
                "hardware model {} has no call integration",
                device.hardware_model
            )),
            TelephonyMode::Auto => Self::supported(format!(
                "hardware model {} supports call integration",
                device.hardware_model
            )),
        }
    }

    pub fn supported(reason: impl Into<String>) -> Self {
        Self {
            telephony_supported: true,
            reason: reason.into(),
        }
    }

    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self {
            telephony_supported: false,
            reason: reason.into(),
        }
    }

    pub fn telephony_supported(&self) -> bool {
        self.telephony_supported
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tablet_hardware_is_unsupported_regardless_of_idiom() {
        // Phone-only apps on tablets report a phone idiom
        let device = DeviceInfo::new("iPad", InterfaceIdiom::Phone);
        let profile = CapabilityProfile::detect(&device, TelephonyMode::Auto);
        assert!(!profile.telephony_supported());
    }

    #[test]
    fn test_phone_hardware_is_supported() {
        let device = DeviceInfo::new("iPhone", InterfaceIdiom::Pad);
        let profile = CapabilityProfile::detect(&device, TelephonyMode::Auto);
        assert!(profile.telephony_supported());
    }

    #[test]
    fn test_mode_overrides_detection() {
        let tablet = DeviceInfo::new("iPad Pro", InterfaceIdiom::Pad);
        assert!(CapabilityProfile::detect(&tablet, TelephonyMode::Platform).telephony_supported());

        let phone = DeviceInfo::new("iPhone", InterfaceIdiom::Phone);
        assert!(!CapabilityProfile::detect(&phone, TelephonyMode::Bypass).telephony_supported());
    }
}
