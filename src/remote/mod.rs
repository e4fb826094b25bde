//! Remote control delegate
//!
//! One [`RemoteControlDelegate`] exists per live camera connection. It gates
//! every optional operation on the vendor's [`RemoteControlCapabilities`] and
//! the current [`ConnectionMode`], then routes to the vendor remote.
//!
//! ```text
//!            connect_wifi()
//!   BleOnly ───────────────▶ Full
//!      ▲                      │
//!      └──────────────────────┘
//!            disconnect_wifi()
//! ```

pub mod wifi;

pub use wifi::{HighBandwidthChannel, WifiCredentials, WifiLink};

use crate::domain::capabilities::{ConnectionMode, Feature, RemoteControlCapabilities};
use crate::domain::models::{
    BatteryInfo, CameraMode, CameraTime, CaptureStatus, CustomButton, DriveMode, ExposureLock,
    ExposureMode, FocusDirection, FocusStatus, GeoLocation, LiveViewFrame, RecordingStatus,
    ShutterStatus, Step, StorageInfo, TouchPoint, ZoomDirection, ZoomLevel,
};
use crate::error::{ProtocolError, RemoteControlError};
use crate::infrastructure::bluetooth::{GattClient, NotificationStream};
use crate::protocol::StatusUpdate;
use crate::vendor::ricoh::RicohRemote;
use crate::vendor::sony::SonyRemote;
use crate::vendor::Vendor;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub type UpdateStream = BoxStream<'static, StatusUpdate>;

/// Which status value an observation wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    Battery,
    Storage,
    Mode,
    Capture,
    Exposure,
    Drive,
    Zoom,
    Focus,
    Shutter,
    Recording,
}

/// Decode raw notifications, logging and dropping malformed samples.
pub(crate) fn decoded_updates<F, I>(
    raw: NotificationStream,
    source: &'static str,
    decode: F,
) -> UpdateStream
where
    F: Fn(&[u8]) -> Result<I, ProtocolError> + Send + 'static,
    I: IntoIterator<Item = StatusUpdate>,
{
    raw.flat_map(move |payload| {
        let updates: Vec<StatusUpdate> = match decode(&payload) {
            Ok(updates) => updates.into_iter().collect(),
            Err(e) => {
                warn!(
                    "Dropping malformed {} notification {:02X?}: {}",
                    source, payload, e
                );
                Vec::new()
            }
        };
        futures::stream::iter(updates)
    })
    .boxed()
}

fn select<T: Send + 'static>(
    updates: UpdateStream,
    pick: fn(StatusUpdate) -> Option<T>,
) -> BoxStream<'static, T> {
    updates
        .filter_map(move |update| futures::future::ready(pick(update)))
        .boxed()
}

/// Result of an optional observation.
pub enum Observation<T> {
    Available(BoxStream<'static, T>),
    /// The vendor or current mode does not offer this observation.
    NotAvailable,
}

impl<T> Observation<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    pub fn into_stream(self) -> Option<BoxStream<'static, T>> {
        match self {
            Self::Available(stream) => Some(stream),
            Self::NotAvailable => None,
        }
    }
}

impl<T> fmt::Debug for Observation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available(_) => f.write_str("Available(..)"),
            Self::NotAvailable => f.write_str("NotAvailable"),
        }
    }
}

/// Vendor command surface behind the delegate.
pub enum VendorRemote {
    Ricoh(RicohRemote),
    Sony(SonyRemote),
}

impl VendorRemote {
    /// Sony-only extended command set.
    fn sony(&self, feature: Feature) -> Result<&SonyRemote, RemoteControlError> {
        match self {
            Self::Sony(remote) => Ok(remote),
            Self::Ricoh(_) => Err(RemoteControlError::Unsupported(feature)),
        }
    }

    async fn trigger_shutter(&self) -> Result<(), RemoteControlError> {
        match self {
            Self::Ricoh(r) => r.trigger_shutter().await,
            Self::Sony(s) => s.trigger_shutter().await,
        }
    }

    async fn start_bulb(&self) -> Result<(), RemoteControlError> {
        match self {
            Self::Ricoh(r) => r.start_bulb().await,
            Self::Sony(s) => s.start_bulb().await,
        }
    }

    async fn stop_bulb(&self) -> Result<(), RemoteControlError> {
        match self {
            Self::Ricoh(r) => r.stop_bulb().await,
            Self::Sony(s) => s.stop_bulb().await,
        }
    }

    async fn sync_date_time(&self, time: &CameraTime) -> Result<(), RemoteControlError> {
        match self {
            Self::Ricoh(r) => r.sync_date_time(time).await,
            Self::Sony(s) => s.sync_date_time(time).await,
        }
    }

    async fn sync_location(&self, location: &GeoLocation) -> Result<(), RemoteControlError> {
        match self {
            Self::Ricoh(r) => r.sync_location(location).await,
            Self::Sony(s) => s.sync_location(location).await,
        }
    }

    async fn firmware_version(&self) -> Result<String, RemoteControlError> {
        match self {
            Self::Ricoh(r) => r.firmware_version().await,
            Self::Sony(s) => s.firmware_version().await,
        }
    }

    async fn status_updates(&self, kind: UpdateKind) -> Result<UpdateStream, RemoteControlError> {
        match self {
            Self::Ricoh(r) => r.status_updates().await,
            Self::Sony(s) => s.status_updates(kind).await,
        }
    }

    async fn enable_access_point(&self) -> Result<(), RemoteControlError> {
        match self {
            Self::Ricoh(r) => r.enable_access_point().await,
            Self::Sony(s) => s.enable_access_point().await,
        }
    }

    async fn disable_access_point(&self) -> Result<(), RemoteControlError> {
        match self {
            Self::Ricoh(r) => r.disable_access_point().await,
            Self::Sony(s) => s.disable_access_point().await,
        }
    }

    async fn wifi_credentials(&self) -> Result<WifiCredentials, RemoteControlError> {
        match self {
            Self::Ricoh(r) => r.wifi_credentials().await,
            Self::Sony(s) => s.wifi_credentials().await,
        }
    }
}

enum LinkState {
    BleOnly,
    Full(Arc<dyn HighBandwidthChannel>),
}

impl LinkState {
    fn mode(&self) -> ConnectionMode {
        match self {
            Self::BleOnly => ConnectionMode::BleOnly,
            Self::Full(_) => ConnectionMode::Full,
        }
    }
}

pub struct RemoteControlDelegate {
    vendor: Vendor,
    capabilities: RemoteControlCapabilities,
    remote: VendorRemote,
    gatt: GattClient,
    wifi: Arc<dyn WifiLink>,
    link: Mutex<LinkState>,
}

impl RemoteControlDelegate {
    pub fn new(
        vendor: Vendor,
        capabilities: RemoteControlCapabilities,
        remote: VendorRemote,
        gatt: GattClient,
        wifi: Arc<dyn WifiLink>,
    ) -> Self {
        Self {
            vendor,
            capabilities,
            remote,
            gatt,
            wifi,
            link: Mutex::new(LinkState::BleOnly),
        }
    }

    pub fn vendor(&self) -> Vendor {
        self.vendor
    }

    pub fn capabilities(&self) -> RemoteControlCapabilities {
        self.capabilities
    }

    pub async fn connection_mode(&self) -> ConnectionMode {
        self.link.lock().await.mode()
    }

    /// Whether `feature` can be used right now.
    pub async fn supports(&self, feature: Feature) -> bool {
        self.capabilities
            .supports(feature, self.connection_mode().await)
    }

    async fn require(&self, feature: Feature) -> Result<(), RemoteControlError> {
        if self.supports(feature).await {
            Ok(())
        } else {
            debug!("{:?} not supported by {} delegate", feature, self.vendor.id());
            Err(RemoteControlError::Unsupported(feature))
        }
    }

    // --- Connection mode ---

    /// Escalate to the full link.
    ///
    /// On any failure the delegate stays in `BleOnly` and the error is
    /// returned. Calling while already `Full` is a no-op.
    pub async fn connect_wifi(&self) -> Result<(), RemoteControlError> {
        if !self.capabilities.declares(Feature::Wifi) {
            return Err(RemoteControlError::Unsupported(Feature::Wifi));
        }

        let mut link = self.link.lock().await;
        if matches!(*link, LinkState::Full(_)) {
            return Ok(());
        }

        info!("Escalating {} to full connection", self.gatt.address());
        self.remote.enable_access_point().await?;

        match self.join_access_point().await {
            Ok(channel) => {
                *link = LinkState::Full(channel);
                info!("{} connection mode is now Full", self.gatt.address());
                Ok(())
            }
            Err(e) => {
                warn!("Wi-Fi escalation for {} failed: {}", self.gatt.address(), e);
                if let Err(disable) = self.remote.disable_access_point().await {
                    warn!("Could not disable camera access point: {}", disable);
                }
                Err(e)
            }
        }
    }

    async fn join_access_point(&self) -> Result<Arc<dyn HighBandwidthChannel>, RemoteControlError> {
        let credentials = self.remote.wifi_credentials().await?;
        debug!("Joining camera access point '{}'", credentials.ssid);
        self.wifi
            .join(&credentials)
            .await
            .map_err(|e| RemoteControlError::Wifi(format!("{:#}", e)))
    }

    /// Drop back to `BleOnly`. Safe to call in any mode.
    pub async fn disconnect_wifi(&self) {
        let mut link = self.link.lock().await;
        let LinkState::Full(channel) = std::mem::replace(&mut *link, LinkState::BleOnly) else {
            debug!("{} already BleOnly", self.gatt.address());
            return;
        };

        if let Err(e) = channel.close().await {
            warn!("Closing high-bandwidth channel failed: {:#}", e);
        }
        if let Err(e) = self.wifi.leave().await {
            warn!("Leaving camera access point failed: {:#}", e);
        }
        if let Err(e) = self.remote.disable_access_point().await {
            warn!("Could not disable camera access point: {}", e);
        }
        info!("{} connection mode is now BleOnly", self.gatt.address());
    }

    // --- Baseline commands ---

    pub async fn trigger_shutter(&self) -> Result<(), RemoteControlError> {
        self.remote.trigger_shutter().await
    }

    pub async fn start_bulb(&self) -> Result<(), RemoteControlError> {
        self.remote.start_bulb().await
    }

    pub async fn stop_bulb(&self) -> Result<(), RemoteControlError> {
        self.remote.stop_bulb().await
    }

    pub async fn sync_date_time(&self, time: &CameraTime) -> Result<(), RemoteControlError> {
        self.remote.sync_date_time(time).await
    }

    pub async fn sync_location(&self, location: &GeoLocation) -> Result<(), RemoteControlError> {
        self.remote.sync_location(location).await
    }

    pub async fn firmware_version(&self) -> Result<String, RemoteControlError> {
        self.remote.firmware_version().await
    }

    // --- Baseline observations ---

    async fn observe<T: Send + 'static>(
        &self,
        kind: UpdateKind,
        pick: fn(StatusUpdate) -> Option<T>,
    ) -> Result<BoxStream<'static, T>, RemoteControlError> {
        let updates = self.remote.status_updates(kind).await?;
        Ok(select(updates, pick))
    }

    pub async fn observe_battery(&self) -> Result<BoxStream<'static, BatteryInfo>, RemoteControlError> {
        self.observe(UpdateKind::Battery, |u| match u {
            StatusUpdate::Battery(v) => Some(v),
            _ => None,
        })
        .await
    }

    pub async fn observe_storage(&self) -> Result<BoxStream<'static, StorageInfo>, RemoteControlError> {
        self.observe(UpdateKind::Storage, |u| match u {
            StatusUpdate::Storage(v) => Some(v),
            _ => None,
        })
        .await
    }

    pub async fn observe_mode(&self) -> Result<BoxStream<'static, CameraMode>, RemoteControlError> {
        self.observe(UpdateKind::Mode, |u| match u {
            StatusUpdate::Mode(v) => Some(v),
            _ => None,
        })
        .await
    }

    pub async fn observe_capture_status(
        &self,
    ) -> Result<BoxStream<'static, CaptureStatus>, RemoteControlError> {
        self.observe(UpdateKind::Capture, |u| match u {
            StatusUpdate::Capture(v) => Some(v),
            _ => None,
        })
        .await
    }

    pub async fn observe_exposure_mode(
        &self,
    ) -> Result<BoxStream<'static, ExposureMode>, RemoteControlError> {
        self.observe(UpdateKind::Exposure, |u| match u {
            StatusUpdate::Exposure(v) => Some(v),
            _ => None,
        })
        .await
    }

    pub async fn observe_drive_mode(&self) -> Result<BoxStream<'static, DriveMode>, RemoteControlError> {
        self.observe(UpdateKind::Drive, |u| match u {
            StatusUpdate::Drive(v) => Some(v),
            _ => None,
        })
        .await
    }

    // --- Extended commands ---

    pub async fn half_press_af(&self, pressed: bool) -> Result<(), RemoteControlError> {
        self.require(Feature::HalfPressAf).await?;
        self.remote.sony(Feature::HalfPressAf)?.half_press(pressed).await
    }

    pub async fn focus_step(&self, step: Step<FocusDirection>) -> Result<(), RemoteControlError> {
        self.require(Feature::ManualFocus).await?;
        self.remote.sony(Feature::ManualFocus)?.focus_step(step).await
    }

    pub async fn zoom_step(&self, step: Step<ZoomDirection>) -> Result<(), RemoteControlError> {
        self.require(Feature::ZoomStepping).await?;
        self.remote.sony(Feature::ZoomStepping)?.zoom_step(step).await
    }

    pub async fn custom_button(
        &self,
        button: CustomButton,
        pressed: bool,
    ) -> Result<(), RemoteControlError> {
        self.require(Feature::CustomButtons).await?;
        self.remote
            .sony(Feature::CustomButtons)?
            .custom_button(button, pressed)
            .await
    }

    pub async fn toggle_exposure_lock(&self, lock: ExposureLock) -> Result<(), RemoteControlError> {
        self.require(Feature::ExposureLocks).await?;
        self.remote.sony(Feature::ExposureLocks)?.toggle_lock(lock).await
    }

    pub async fn toggle_recording(&self) -> Result<(), RemoteControlError> {
        self.require(Feature::VideoRecording).await?;
        self.remote.sony(Feature::VideoRecording)?.toggle_recording().await
    }

    /// Touch-to-focus over the high-bandwidth channel.
    pub async fn touch_af(&self, point: TouchPoint) -> Result<(), RemoteControlError> {
        let link = self.link.lock().await;
        let LinkState::Full(channel) = &*link else {
            return Err(RemoteControlError::Unsupported(Feature::TouchAf));
        };
        if !self.capabilities.declares(Feature::TouchAf) {
            return Err(RemoteControlError::Unsupported(Feature::TouchAf));
        }
        channel
            .touch_af(point)
            .await
            .map_err(|e| RemoteControlError::Wifi(format!("{:#}", e)))
    }

    // --- Optional observations ---

    async fn observe_optional<T: Send + 'static>(
        &self,
        feature: Feature,
        kind: UpdateKind,
        pick: fn(StatusUpdate) -> Option<T>,
    ) -> Result<Observation<T>, RemoteControlError> {
        if !self.supports(feature).await {
            return Ok(Observation::NotAvailable);
        }
        Ok(Observation::Available(self.observe(kind, pick).await?))
    }

    pub async fn observe_focus_status(&self) -> Result<Observation<FocusStatus>, RemoteControlError> {
        self.observe_optional(Feature::FocusStatus, UpdateKind::Focus, |u| match u {
            StatusUpdate::Focus(v) => Some(v),
            _ => None,
        })
        .await
    }

    pub async fn observe_shutter_status(
        &self,
    ) -> Result<Observation<ShutterStatus>, RemoteControlError> {
        self.observe_optional(Feature::ShutterStatus, UpdateKind::Shutter, |u| match u {
            StatusUpdate::Shutter(v) => Some(v),
            _ => None,
        })
        .await
    }

    pub async fn observe_recording_status(
        &self,
    ) -> Result<Observation<RecordingStatus>, RemoteControlError> {
        self.observe_optional(Feature::RecordingStatus, UpdateKind::Recording, |u| match u {
            StatusUpdate::Recording(v) => Some(v),
            _ => None,
        })
        .await
    }

    pub async fn observe_zoom_level(&self) -> Result<Observation<ZoomLevel>, RemoteControlError> {
        self.observe_optional(Feature::ZoomLevel, UpdateKind::Zoom, |u| match u {
            StatusUpdate::Zoom(v) => Some(v),
            _ => None,
        })
        .await
    }

    /// Live view frames; only offered in `Full` mode.
    pub async fn observe_live_view(&self) -> Result<Observation<LiveViewFrame>, RemoteControlError> {
        let link = self.link.lock().await;
        let LinkState::Full(channel) = &*link else {
            return Ok(Observation::NotAvailable);
        };
        if !self.capabilities.declares(Feature::LiveView) {
            return Ok(Observation::NotAvailable);
        }

        let frames = channel
            .live_view()
            .await
            .map_err(|e| RemoteControlError::Wifi(format!("{:#}", e)))?;
        let token = self.gatt.cancellation();
        Ok(Observation::Available(
            frames
                .take_until(async move { token.cancelled().await })
                .boxed(),
        ))
    }
}
