use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_true")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_true")]
    pub show_file_line: bool,
    #[serde(default = "default_false")]
    pub show_thread_ids: bool,
    #[serde(default = "default_true")]
    pub show_target: bool,
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "minutely", "never"
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            file_logging_enabled: default_true(),
            console_logging_enabled: default_true(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            show_file_line: default_true(),
            show_thread_ids: default_false(),
            show_target: default_true(),
            ansi_colors: default_true(),
            rotation: default_rotation(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_prefix() -> String {
    "camsync".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BleSettings {
    /// Upper bound for any single read/write/subscribe
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,
    /// Pause between the two writes of a press/release pair
    #[serde(default = "default_command_delay_ms")]
    pub command_delay_ms: u64,
}

impl BleSettings {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    pub fn command_delay(&self) -> Duration {
        Duration::from_millis(self.command_delay_ms)
    }
}

impl Default for BleSettings {
    fn default() -> Self {
        Self {
            operation_timeout_ms: default_operation_timeout_ms(),
            command_delay_ms: default_command_delay_ms(),
        }
    }
}

fn default_operation_timeout_ms() -> u64 {
    5000
}
fn default_command_delay_ms() -> u64 {
    50
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FirmwareSettings {
    /// Static JSON dataset used by the legacy strategy
    #[serde(default)]
    pub legacy_dataset_url: Option<String>,
    /// Directory of the legacy dataset cache; platform cache dir when unset
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    #[serde(default = "default_cache_validity_hours")]
    pub cache_validity_hours: u64,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    // Modern backend
    #[serde(default)]
    pub modern_endpoint: Option<String>,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub app_id: String,
    #[serde(default = "default_app_version")]
    pub app_version: String,

    #[serde(default = "default_periodic_interval_hours")]
    pub periodic_interval_hours: u64,
}

impl FirmwareSettings {
    pub fn cache_validity(&self) -> chrono::Duration {
        chrono::Duration::hours(self.cache_validity_hours as i64)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Zero hours falls back to the daily default.
    pub fn periodic_interval(&self) -> Duration {
        let hours = if self.periodic_interval_hours == 0 {
            warn!(
                "periodic_interval_hours must be non-zero, using {}",
                default_periodic_interval_hours()
            );
            default_periodic_interval_hours()
        } else {
            self.periodic_interval_hours
        };
        Duration::from_secs(hours * 60 * 60)
    }

    /// Resolved cache directory.
    pub fn resolved_cache_dir(&self) -> Option<PathBuf> {
        self.cache_dir
            .clone()
            .or_else(|| dirs::cache_dir().map(|p| p.join("camsync")))
    }
}

impl Default for FirmwareSettings {
    fn default() -> Self {
        Self {
            legacy_dataset_url: None,
            cache_dir: None,
            cache_validity_hours: default_cache_validity_hours(),
            http_timeout_secs: default_http_timeout_secs(),
            modern_endpoint: None,
            api_key: String::new(),
            app_id: String::new(),
            app_version: default_app_version(),
            periodic_interval_hours: default_periodic_interval_hours(),
        }
    }
}

fn default_cache_validity_hours() -> u64 {
    24
}
fn default_http_timeout_secs() -> u64 {
    10
}
fn default_app_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
fn default_periodic_interval_hours() -> u64 {
    24
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    // Logging Settings
    #[serde(default)]
    pub log_settings: LogSettings,

    // BLE Settings
    #[serde(default)]
    pub ble: BleSettings,

    // Firmware Settings
    #[serde(default)]
    pub firmware: FirmwareSettings,
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new() -> anyhow::Result<Self> {
        let settings_path = Self::get_settings_path()?;
        Ok(Self::with_path(settings_path))
    }

    /// Settings backed by an explicit file; defaults when it is missing or unreadable.
    pub fn with_path(settings_path: PathBuf) -> Self {
        let settings = Self::load_from_file(&settings_path).unwrap_or_default();
        Self {
            settings,
            settings_path,
        }
    }

    fn get_settings_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("camsync");
        fs::create_dir_all(&path)?;
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &Path) -> anyhow::Result<Settings> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.settings_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        Ok(())
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn get_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"firmware": {"api_key": "k"}}"#).unwrap();
        assert_eq!(settings.firmware.api_key, "k");
        assert_eq!(settings.firmware.cache_validity_hours, 24);
        assert_eq!(settings.firmware.http_timeout_secs, 10);
        assert_eq!(settings.ble.operation_timeout_ms, 5000);
        assert_eq!(settings.log_settings.level, "info");
    }

    #[test]
    fn test_zero_periodic_interval_uses_default() {
        let firmware: FirmwareSettings =
            serde_json::from_str(r#"{"periodic_interval_hours": 0}"#).unwrap();
        assert_eq!(firmware.periodic_interval(), Duration::from_secs(24 * 60 * 60));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut service = SettingsService::with_path(path.clone());
        assert_eq!(service.get(), &Settings::default());

        service.get_mut().firmware.legacy_dataset_url = Some("https://example.com/fw.json".into());
        service.save().unwrap();

        let reloaded = SettingsService::with_path(path);
        assert_eq!(
            reloaded.get().firmware.legacy_dataset_url.as_deref(),
            Some("https://example.com/fw.json")
        );
    }

    #[test]
    fn test_corrupt_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();
        let service = SettingsService::with_path(path);
        assert_eq!(service.get(), &Settings::default());
    }
}
