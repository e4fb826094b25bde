//! Backend-backed checks for current models.

use super::{version, FirmwareUpdateCheckResult};
use crate::domain::settings::FirmwareSettings;
use crate::infrastructure::http::HttpClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

pub const API_KEY_HEADER: &str = "X-Api-Key";
pub const APP_ID_HEADER: &str = "X-App-Id";

/// Exact model name to backend model code.
const MODEL_CODES: &[(&str, &str)] = &[("GR IV", "GR4"), ("GR IV HDF", "GR4HDF")];

pub fn model_code(model_name: &str) -> Option<&'static str> {
    MODEL_CODES
        .iter()
        .find(|(name, _)| *name == model_name)
        .map(|(_, code)| *code)
}

/// Phone metadata sent with every backend query
///
/// The default only knows the OS family; embedders pass the real values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneInfo {
    pub model: String,
    pub os: String,
    pub os_version: String,
    pub language: String,
}

impl Default for PhoneInfo {
    fn default() -> Self {
        Self {
            model: "unknown".to_string(),
            os: std::env::consts::OS.to_string(),
            os_version: "unknown".to_string(),
            language: "en".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct FirmwareRequest<'a> {
    phone_model: &'a str,
    phone_os: &'a str,
    phone_os_version: &'a str,
    phone_language: &'a str,
    phone_app_ver: &'a str,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct FirmwareResponse {
    #[serde(default)]
    version: String,
}

pub struct ModernChecker {
    http: Arc<dyn HttpClient>,
    endpoint: Option<String>,
    api_key: String,
    app_id: String,
    app_version: String,
    phone: PhoneInfo,
}

impl ModernChecker {
    pub fn new(http: Arc<dyn HttpClient>, settings: &FirmwareSettings, phone: PhoneInfo) -> Self {
        Self {
            http,
            endpoint: settings.modern_endpoint.clone(),
            api_key: settings.api_key.clone(),
            app_id: settings.app_id.clone(),
            app_version: settings.app_version.clone(),
            phone,
        }
    }

    pub async fn check(&self, model_name: &str, current: &str) -> FirmwareUpdateCheckResult {
        let Some(code) = model_code(model_name) else {
            return FirmwareUpdateCheckResult::failed(format!(
                "No backend model code for {}",
                model_name
            ));
        };
        let Some(endpoint) = &self.endpoint else {
            return FirmwareUpdateCheckResult::failed("Firmware backend endpoint not configured");
        };

        let request = FirmwareRequest {
            phone_model: &self.phone.model,
            phone_os: &self.phone.os,
            phone_os_version: &self.phone.os_version,
            phone_language: &self.phone.language,
            phone_app_ver: &self.app_version,
            model: code,
        };
        let body = match serde_json::to_value(&request) {
            Ok(body) => body,
            Err(e) => return FirmwareUpdateCheckResult::failed(format!("Invalid request: {}", e)),
        };
        let headers = [
            (API_KEY_HEADER, self.api_key.as_str()),
            (APP_ID_HEADER, self.app_id.as_str()),
        ];

        debug!("Querying firmware backend for model code {}", code);
        let response = match self
            .http
            .post_json(endpoint, &headers, &body)
            .await
            .and_then(|response| response.into_success_body())
        {
            Ok(body) => body,
            Err(e) => return FirmwareUpdateCheckResult::failed(format!("Network error: {}", e)),
        };

        let parsed: FirmwareResponse = match serde_json::from_str(&response) {
            Ok(parsed) => parsed,
            Err(e) => {
                return FirmwareUpdateCheckResult::failed(format!(
                    "Failed to parse response: {}",
                    e
                ))
            }
        };

        let latest = parsed.version.trim();
        if latest.is_empty() {
            return FirmwareUpdateCheckResult::failed("Backend returned an empty version");
        }

        if version::is_newer(latest, current) {
            info!("Firmware {} available for {} (current {})", latest, model_name, current);
            FirmwareUpdateCheckResult::UpdateAvailable {
                current_version: current.to_string(),
                latest_version: latest.to_string(),
                model_name: model_name.to_string(),
            }
        } else {
            FirmwareUpdateCheckResult::NoUpdateAvailable
        }
    }
}
