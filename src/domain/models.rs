use crate::vendor::Vendor;
use bytes::Bytes;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A device seen during discovery and recognised as a supported camera.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Camera {
    pub id: String,
    pub name: String,
    pub address: String,
    pub vendor: Vendor,
}

/// Paired device record owned by the external store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairedDevice {
    pub address: String,
    pub name: String,
    pub vendor_id: String,
    pub enabled: bool,
    pub firmware_version: Option<String>,
    pub latest_firmware_version: Option<String>,
    #[serde(default)]
    pub update_notification_shown: bool,
}

/// A single advertisement report from the discovery collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Advertisement {
    pub address: String,
    pub name: Option<String>,
    pub service_ids: Vec<Uuid>,
    /// Manufacturer-specific data keyed by company identifier.
    pub manufacturer_data: HashMap<u16, Vec<u8>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerSource {
    Battery,
    External,
    Unknown(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryPack {
    pub position: u8,
    pub enabled: bool,
    pub status: u8,
    pub remaining_percent: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatteryInfo {
    pub packs: Vec<BatteryPack>,
    pub power_source: Option<PowerSource>,
}

impl BatteryInfo {
    /// Remaining charge of the first enabled pack.
    pub fn primary_percent(&self) -> Option<u32> {
        self.packs
            .iter()
            .find(|p| p.enabled)
            .map(|p| p.remaining_percent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageStatus {
    Ready,
    NoMedia,
    Full,
    Error,
    Unknown(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageSlot {
    pub slot: u8,
    pub status: StorageStatus,
    pub remaining_shots: u32,
    pub remaining_seconds: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageInfo {
    pub slots: Vec<StorageSlot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMode {
    Still,
    Movie,
    Playback,
    Other(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStatus {
    Idle,
    Capturing,
    Processing,
    Other(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExposureMode {
    Auto,
    Program,
    Aperture,
    Shutter,
    Manual,
    Bulb,
    Other(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveMode {
    Single,
    Continuous,
    SelfTimer,
    Interval,
    Other(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusStatus {
    Acquired,
    Lost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutterStatus {
    Active,
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingStatus {
    Recording,
    Stopped,
}

/// Zoom position, 0 (wide) to 100 (tele).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomLevel(pub u8);

/// One JPEG frame of the live view feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveViewFrame {
    pub jpeg: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusDirection {
    Near,
    Far,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    Tele,
    Wide,
}

/// A stepping command; `Stop` ends continuous movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<D> {
    Move { direction: D, speed: u8 },
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomButton {
    C1,
    C2,
    C3,
    C4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExposureLock {
    Ae,
    Fe,
    Awb,
}

/// Normalised touch position in [0, 1] on both axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    pub x: f32,
    pub y: f32,
}

/// Position fix pushed to the camera for geo-tagging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub timestamp: DateTime<Utc>,
}

/// Local time pushed to the camera clock.
pub type CameraTime = DateTime<FixedOffset>;

#[derive(Debug, Clone)]
pub enum CameraEvent {
    /// Advertisement recognised as a supported camera
    CameraDiscovered(Camera),
    ConnectionStatus(ConnectionStatus),
    LogMessage(StatusMessage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub message: String,
    pub severity: MessageSeverity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSeverity {
    Info,
    Success,
    Warning,
    Error,
}
