//! Dataset-backed checks for models without a firmware backend
//!
//! The dataset is a static JSON document mapping model names to the latest
//! published version. It is cached on disk and refreshed once the cached copy
//! is older than the validity window.

use super::{version, Clock, FirmwareUpdateCheckResult};
use crate::domain::settings::FirmwareSettings;
use crate::infrastructure::http::HttpClient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const CACHE_FILE_NAME: &str = "ricoh_firmware.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareDataset {
    #[serde(default)]
    pub last_updated: Option<String>,
    pub cameras: BTreeMap<String, String>,
}

impl FirmwareDataset {
    /// Most specific key contained in `model_name`, with its version
    ///
    /// Keys are tried longest first so `GR IIIx` wins over `GR III`.
    pub fn find(&self, model_name: &str) -> Option<(&str, &str)> {
        let model = model_name.to_lowercase();
        let mut keys: Vec<&String> = self.cameras.keys().collect();
        keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        keys.into_iter()
            .find(|key| !key.is_empty() && model.contains(&key.to_lowercase()))
            .and_then(|key| {
                self.cameras
                    .get(key)
                    .map(|version| (key.as_str(), version.trim()))
            })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEnvelope {
    fetched_at: DateTime<Utc>,
    dataset: FirmwareDataset,
}

pub struct LegacyChecker {
    http: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
    dataset_url: Option<String>,
    cache_path: Option<PathBuf>,
    validity: chrono::Duration,
}

impl LegacyChecker {
    pub fn new(http: Arc<dyn HttpClient>, clock: Arc<dyn Clock>, settings: &FirmwareSettings) -> Self {
        Self {
            http,
            clock,
            dataset_url: settings.legacy_dataset_url.clone(),
            cache_path: settings
                .resolved_cache_dir()
                .map(|dir| dir.join(CACHE_FILE_NAME)),
            validity: settings.cache_validity(),
        }
    }

    pub async fn check(&self, model_name: &str, current: &str) -> FirmwareUpdateCheckResult {
        let dataset = match self.dataset().await {
            Ok(dataset) => dataset,
            Err(reason) => return FirmwareUpdateCheckResult::failed(reason),
        };

        let Some((key, latest)) = dataset.find(model_name) else {
            return FirmwareUpdateCheckResult::failed(format!(
                "No firmware information for {}",
                model_name
            ));
        };

        if version::is_newer(latest, current) {
            info!("Firmware {} available for {} (current {})", latest, key, current);
            FirmwareUpdateCheckResult::UpdateAvailable {
                current_version: current.to_string(),
                latest_version: latest.to_string(),
                model_name: key.to_string(),
            }
        } else {
            FirmwareUpdateCheckResult::NoUpdateAvailable
        }
    }

    /// Fresh cache, else network, else a stale cache.
    async fn dataset(&self) -> Result<FirmwareDataset, String> {
        let cached = self.read_cache().await;
        if let Some(envelope) = &cached {
            if self.clock.now() - envelope.fetched_at < self.validity {
                debug!("Using cached firmware dataset from {}", envelope.fetched_at);
                return Ok(envelope.dataset.clone());
            }
        }

        match self.fetch().await {
            Ok(dataset) => {
                self.write_cache(&dataset).await;
                Ok(dataset)
            }
            Err(reason) => match cached {
                Some(stale) => {
                    warn!("{}; falling back to stale firmware dataset", reason);
                    Ok(stale.dataset)
                }
                None => Err(reason),
            },
        }
    }

    async fn fetch(&self) -> Result<FirmwareDataset, String> {
        let Some(url) = &self.dataset_url else {
            return Err("Firmware dataset URL not configured".to_string());
        };

        let body = self
            .http
            .get(url)
            .await
            .and_then(|response| response.into_success_body())
            .map_err(|e| format!("Network error: {}", e))?;
        serde_json::from_str(&body).map_err(|e| format!("Failed to parse response: {}", e))
    }

    async fn read_cache(&self) -> Option<CacheEnvelope> {
        let path = self.cache_path.as_ref()?;
        let content = tokio::fs::read_to_string(path).await.ok()?;
        match serde_json::from_str(&content) {
            Ok(envelope) => Some(envelope),
            Err(e) => {
                warn!("Ignoring unreadable firmware cache {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Best effort; a failed write never fails the check.
    async fn write_cache(&self, dataset: &FirmwareDataset) {
        let Some(path) = &self.cache_path else {
            return;
        };
        let envelope = CacheEnvelope {
            fetched_at: self.clock.now(),
            dataset: dataset.clone(),
        };

        let result = async {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let content = serde_json::to_string_pretty(&envelope)?;
            tokio::fs::write(path, content).await?;
            anyhow::Ok(())
        }
        .await;

        if let Err(e) = result {
            warn!("Failed to write firmware cache {}: {}", path.display(), e);
        }
    }
}
