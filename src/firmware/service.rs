//! Scheduled firmware checks over all paired devices.

use super::{Clock, FirmwareUpdateCheckResult, FirmwareUpdateChecker, PhoneInfo};
use crate::domain::models::PairedDevice;
use crate::domain::settings::FirmwareSettings;
use crate::infrastructure::http::HttpClient;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Persistent paired-device records.
#[async_trait]
pub trait PairedDeviceStore: Send + Sync {
    async fn list(&self) -> anyhow::Result<Vec<PairedDevice>>;

    async fn set_firmware_info(
        &self,
        address: &str,
        latest_version: Option<String>,
    ) -> anyhow::Result<()>;
}

/// Signals the home-screen widgets to redraw.
pub trait WidgetRefresher: Send + Sync {
    fn refresh(&self);
}

/// Outcome of one pass over the paired devices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckSummary {
    pub checked: usize,
    pub updates_available: usize,
    pub failed: usize,
    pub changed: usize,
}

pub struct FirmwareUpdateService {
    store: Arc<dyn PairedDeviceStore>,
    widgets: Arc<dyn WidgetRefresher>,
    checker: FirmwareUpdateChecker,
    periodic_interval: Duration,
    one_time: Mutex<Option<JoinHandle<()>>>,
}

impl FirmwareUpdateService {
    pub fn new(
        store: Arc<dyn PairedDeviceStore>,
        widgets: Arc<dyn WidgetRefresher>,
        clock: Arc<dyn Clock>,
        settings: &FirmwareSettings,
        http: Arc<dyn HttpClient>,
        phone: PhoneInfo,
    ) -> Self {
        Self {
            store,
            widgets,
            checker: FirmwareUpdateChecker::new(http, clock, settings, phone),
            periodic_interval: settings.periodic_interval(),
            one_time: Mutex::new(None),
        }
    }

    /// Check every enabled device concurrently and store the results
    ///
    /// Only a failure to list devices is an error; per-device failures are
    /// logged and leave that device's stored state untouched.
    pub async fn run_check(&self) -> anyhow::Result<CheckSummary> {
        let devices: Vec<PairedDevice> = self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|d| d.enabled && self.checker.supports(d))
            .collect();
        debug!("Checking firmware for {} devices", devices.len());

        let outcomes = futures::future::join_all(devices.iter().map(|device| async move {
            let result = self
                .checker
                .check_for_update(device, device.firmware_version.as_deref())
                .await;
            let changed = self.apply(device, &result).await;
            (result, changed)
        }))
        .await;

        let mut summary = CheckSummary {
            checked: outcomes.len(),
            ..Default::default()
        };
        for (result, changed) in &outcomes {
            match result {
                FirmwareUpdateCheckResult::UpdateAvailable { .. } => summary.updates_available += 1,
                FirmwareUpdateCheckResult::CheckFailed { .. } => summary.failed += 1,
                FirmwareUpdateCheckResult::NoUpdateAvailable => {}
            }
            if *changed {
                summary.changed += 1;
            }
        }

        if summary.changed > 0 {
            self.widgets.refresh();
        }
        info!(
            "Firmware check done: {} checked, {} updates, {} failed",
            summary.checked, summary.updates_available, summary.failed
        );
        Ok(summary)
    }

    /// Persist one result; true when the stored state changed.
    async fn apply(&self, device: &PairedDevice, result: &FirmwareUpdateCheckResult) -> bool {
        let latest = match result {
            FirmwareUpdateCheckResult::UpdateAvailable { latest_version, .. } => {
                Some(latest_version.clone())
            }
            FirmwareUpdateCheckResult::NoUpdateAvailable => None,
            FirmwareUpdateCheckResult::CheckFailed { reason } => {
                warn!("Firmware check for {} failed: {}", device.name, reason);
                return false;
            }
        };
        if device.latest_firmware_version == latest {
            return false;
        }

        match self.store.set_firmware_info(&device.address, latest).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Could not store firmware info for {}: {:#}", device.address, e);
                false
            }
        }
    }

    /// Run a check every `interval` (the configured daily interval when `None`).
    pub fn spawn_periodic(self: &Arc<Self>, interval: Option<Duration>) -> JoinHandle<()> {
        let interval = match interval {
            Some(interval) if interval.is_zero() => {
                warn!(
                    "Periodic firmware interval must be non-zero, using {:?}",
                    self.periodic_interval
                );
                self.periodic_interval
            }
            Some(interval) => interval,
            None => self.periodic_interval,
        };
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            loop {
                ticker.tick().await;
                if let Err(e) = service.run_check().await {
                    warn!("Periodic firmware check failed: {:#}", e);
                }
            }
        })
    }

    /// Run one check after `delay`, replacing any pending one-time run.
    pub fn schedule_one_time(self: &Arc<Self>, delay: Duration) {
        let service = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = service.run_check().await {
                warn!("One-time firmware check failed: {:#}", e);
            }
        });

        let mut pending = self.one_time.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = pending.replace(handle) {
            if !previous.is_finished() {
                debug!("Replacing pending one-time firmware check");
            }
            previous.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firmware::tests::{device, FixedClock};
    use crate::firmware::legacy::CACHE_FILE_NAME;
    use crate::infrastructure::http::fake::FakeHttpClient;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct MemoryStore {
        devices: Mutex<Vec<PairedDevice>>,
        writes: AtomicUsize,
    }

    #[async_trait]
    impl PairedDeviceStore for MemoryStore {
        async fn list(&self) -> anyhow::Result<Vec<PairedDevice>> {
            Ok(self.devices.lock().unwrap().clone())
        }

        async fn set_firmware_info(
            &self,
            address: &str,
            latest_version: Option<String>,
        ) -> anyhow::Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            let mut devices = self.devices.lock().unwrap();
            if let Some(d) = devices.iter_mut().find(|d| d.address == address) {
                d.latest_firmware_version = latest_version;
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingRefresher(AtomicUsize);

    impl WidgetRefresher for CountingRefresher {
        fn refresh(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        store: Arc<MemoryStore>,
        widgets: Arc<CountingRefresher>,
        http: Arc<FakeHttpClient>,
        service: Arc<FirmwareUpdateService>,
    }

    fn fixture(devices: Vec<PairedDevice>) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let now = Utc.with_ymd_and_hms(2026, 10, 14, 9, 0, 0).unwrap();
        let cache = serde_json::json!({
            "fetched_at": now,
            "dataset": {"cameras": {"GR III": "1.91", "GR IIIx": "2.00"}},
        });
        std::fs::write(dir.path().join(CACHE_FILE_NAME), cache.to_string()).unwrap();

        let store = Arc::new(MemoryStore {
            devices: Mutex::new(devices),
            ..Default::default()
        });
        let widgets = Arc::new(CountingRefresher::default());
        let http = Arc::new(FakeHttpClient::default());
        let settings = FirmwareSettings {
            cache_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let service = Arc::new(FirmwareUpdateService::new(
            store.clone(),
            widgets.clone(),
            Arc::new(FixedClock::at(now)),
            &settings,
            http.clone(),
            PhoneInfo::default(),
        ));
        Fixture {
            _dir: dir,
            store,
            widgets,
            http,
            service,
        }
    }

    fn latest(store: &MemoryStore, name: &str) -> Option<String> {
        store
            .devices
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.name == name)
            .and_then(|d| d.latest_firmware_version.clone())
    }

    #[tokio::test]
    async fn test_run_check_stores_update() {
        let f = fixture(vec![device("RICOH GR IIIx", "ricoh", Some("1.91"))]);

        let summary = f.service.run_check().await.unwrap();
        assert_eq!(summary.updates_available, 1);
        assert_eq!(latest(&f.store, "RICOH GR IIIx").as_deref(), Some("2.00"));
        assert_eq!(f.widgets.0.load(Ordering::SeqCst), 1);
        assert!(f.http.requests().is_empty());

        // Same result again: nothing changes, no refresh
        f.service.run_check().await.unwrap();
        assert_eq!(f.store.writes.load(Ordering::SeqCst), 1);
        assert_eq!(f.widgets.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_keeps_known_update() {
        let mut unknown = device("RICOH GR Digital", "ricoh", Some("4.00"));
        unknown.latest_firmware_version = Some("4.10".into());
        let f = fixture(vec![unknown]);

        let summary = f.service.run_check().await.unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(latest(&f.store, "RICOH GR Digital").as_deref(), Some("4.10"));
        assert_eq!(f.widgets.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_update_clears_flag() {
        let mut current = device("RICOH GR III", "ricoh", Some("1.91"));
        current.latest_firmware_version = Some("1.91".into());
        let f = fixture(vec![current]);

        f.service.run_check().await.unwrap();
        assert_eq!(latest(&f.store, "RICOH GR III"), None);
        assert_eq!(f.widgets.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_skips_sony_and_disabled_devices() {
        let mut disabled = device("RICOH GR IIIx", "ricoh", Some("1.00"));
        disabled.enabled = false;
        let f = fixture(vec![device("ILCE-7M4", "sony", Some("2.00")), disabled]);

        let summary = f.service.run_check().await.unwrap();
        assert_eq!(summary.checked, 0);
        assert_eq!(f.store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_zero_periodic_interval_keeps_running() {
        let f = fixture(vec![device("RICOH GR IIIx", "ricoh", Some("1.91"))]);

        let handle = f.service.spawn_periodic(Some(Duration::ZERO));
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(!handle.is_finished());
        assert_eq!(f.store.writes.load(Ordering::SeqCst), 0);
        handle.abort();
    }

    #[tokio::test]
    async fn test_periodic_run_checks_devices() {
        let f = fixture(vec![device("RICOH GR IIIx", "ricoh", Some("1.91"))]);

        let handle = f.service.spawn_periodic(Some(Duration::from_millis(10)));
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.abort();

        assert_eq!(latest(&f.store, "RICOH GR IIIx").as_deref(), Some("2.00"));
    }

    #[tokio::test]
    async fn test_one_time_run_replaces_pending() {
        let f = fixture(vec![device("RICOH GR IIIx", "ricoh", Some("1.91"))]);

        f.service.schedule_one_time(Duration::from_secs(3600));
        f.service.schedule_one_time(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(f.store.writes.load(Ordering::SeqCst), 1);
        assert_eq!(latest(&f.store, "RICOH GR IIIx").as_deref(), Some("2.00"));
    }
}
