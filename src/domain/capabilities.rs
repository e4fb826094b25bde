//! Capability declarations and the connection mode.

use serde::{Deserialize, Serialize};

/// Optional remote control features.
///
/// Baseline operations (shutter, bulb, time/location sync and the
/// battery/storage/mode/capture/exposure/drive observations) are always
/// available and have no entry here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    HalfPressAf,
    ManualFocus,
    ZoomStepping,
    CustomButtons,
    TouchAf,
    ExposureLocks,
    LiveView,
    VideoRecording,
    FocusStatus,
    ShutterStatus,
    RecordingStatus,
    ZoomLevel,
    Wifi,
}

impl Feature {
    /// Features that only work over the high-bandwidth link.
    pub fn requires_full(self) -> bool {
        matches!(self, Self::LiveView | Self::TouchAf)
    }
}

/// Link state of a delegate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionMode {
    /// Low-power link only; baseline features.
    #[default]
    BleOnly,
    /// Low-power link plus the camera's access point.
    Full,
}

/// Static per-vendor declaration of optional features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteControlCapabilities {
    features: &'static [Feature],
}

impl RemoteControlCapabilities {
    pub const fn new(features: &'static [Feature]) -> Self {
        Self { features }
    }

    /// Declared for the vendor, regardless of mode.
    pub fn declares(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }

    /// Declared and usable in the given mode.
    pub fn supports(&self, feature: Feature, mode: ConnectionMode) -> bool {
        self.declares(feature) && (!feature.requires_full() || mode == ConnectionMode::Full)
    }

    pub fn features(&self) -> &'static [Feature] {
        self.features
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAPS: RemoteControlCapabilities =
        RemoteControlCapabilities::new(&[Feature::LiveView, Feature::HalfPressAf]);

    #[test]
    fn test_wifi_only_features_need_full_mode() {
        assert!(!CAPS.supports(Feature::LiveView, ConnectionMode::BleOnly));
        assert!(CAPS.supports(Feature::LiveView, ConnectionMode::Full));
    }

    #[test]
    fn test_undeclared_feature_never_supported() {
        assert!(!CAPS.supports(Feature::TouchAf, ConnectionMode::Full));
        assert!(CAPS.supports(Feature::HalfPressAf, ConnectionMode::BleOnly));
    }
}
