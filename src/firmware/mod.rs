//! Firmware update checks
//!
//! Ricoh models are checked either against a cached static dataset
//! ([`legacy`]) or a live backend ([`modern`]); which one is fixed by the
//! model name. Sony devices have no checker.

pub mod legacy;
pub mod modern;
pub mod service;
pub mod version;

pub use modern::PhoneInfo;
pub use service::{FirmwareUpdateService, PairedDeviceStore, WidgetRefresher};

use crate::domain::models::PairedDevice;
use crate::domain::settings::FirmwareSettings;
use crate::infrastructure::http::HttpClient;
use crate::vendor::Vendor;
use chrono::{DateTime, Utc};
use legacy::LegacyChecker;
use modern::ModernChecker;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FirmwareUpdateCheckResult {
    NoUpdateAvailable,
    UpdateAvailable {
        current_version: String,
        latest_version: String,
        model_name: String,
    },
    CheckFailed {
        reason: String,
    },
}

impl FirmwareUpdateCheckResult {
    pub(crate) fn failed(reason: impl Into<String>) -> Self {
        Self::CheckFailed {
            reason: reason.into(),
        }
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Legacy,
    Modern,
}

const BRANDS: [&str; 2] = ["RICOH", "PENTAX"];

/// Model name as the firmware sources spell it: brand prefix removed
///
/// The brand must be a whole word: `"RICOH"` alone is absent, `"RICOHGR"` is kept.
pub fn model_name(device_name: &str) -> Option<String> {
    let trimmed = device_name.trim();
    let (first, rest) = trimmed
        .split_once(char::is_whitespace)
        .unwrap_or((trimmed, ""));
    let model = if BRANDS.iter().any(|brand| first.eq_ignore_ascii_case(brand)) {
        rest.trim()
    } else {
        trimmed
    };
    (!model.is_empty()).then(|| model.to_string())
}

/// Static per-vendor classification; `None` when the vendor has no checker.
pub fn strategy_for(vendor: Vendor, model_name: &str) -> Option<Strategy> {
    match vendor {
        Vendor::Ricoh => {
            let is_gr_iv = model_name
                .to_ascii_uppercase()
                .split(|c: char| !c.is_ascii_alphanumeric())
                .collect::<Vec<_>>()
                .windows(2)
                .any(|pair| pair == ["GR", "IV"]);
            Some(if is_gr_iv {
                Strategy::Modern
            } else {
                Strategy::Legacy
            })
        }
        Vendor::Sony => None,
    }
}

/// Entry point for a single device check
pub struct FirmwareUpdateChecker {
    legacy: LegacyChecker,
    modern: ModernChecker,
}

impl FirmwareUpdateChecker {
    /// `phone` is reported to the firmware backend with every query.
    pub fn new(
        http: Arc<dyn HttpClient>,
        clock: Arc<dyn Clock>,
        settings: &FirmwareSettings,
        phone: PhoneInfo,
    ) -> Self {
        Self {
            legacy: LegacyChecker::new(http.clone(), clock, settings),
            modern: ModernChecker::new(http, settings, phone),
        }
    }

    /// Whether `device` has a checker at all.
    pub fn supports(&self, device: &PairedDevice) -> bool {
        Vendor::from_id(&device.vendor_id).is_some_and(|vendor| {
            strategy_for(vendor, &model_name(&device.name).unwrap_or_default()).is_some()
        })
    }

    /// Never fails; every problem becomes `CheckFailed`.
    pub async fn check_for_update(
        &self,
        device: &PairedDevice,
        current_version: Option<&str>,
    ) -> FirmwareUpdateCheckResult {
        let Some(current) = current_version.map(str::trim).filter(|v| !v.is_empty()) else {
            return FirmwareUpdateCheckResult::failed("Current firmware version unknown");
        };
        let Some(model) = model_name(&device.name) else {
            return FirmwareUpdateCheckResult::failed("Camera model unknown");
        };
        let Some(vendor) = Vendor::from_id(&device.vendor_id) else {
            return FirmwareUpdateCheckResult::failed(format!(
                "Unknown vendor '{}'",
                device.vendor_id
            ));
        };

        match strategy_for(vendor, &model) {
            Some(Strategy::Legacy) => {
                debug!("Checking {} firmware against dataset", model);
                self.legacy.check(&model, current).await
            }
            Some(Strategy::Modern) => {
                debug!("Checking {} firmware against backend", model);
                self.modern.check(&model, current).await
            }
            None => FirmwareUpdateCheckResult::failed(format!(
                "No firmware checker for {}",
                vendor.id()
            )),
        }
    }
}
