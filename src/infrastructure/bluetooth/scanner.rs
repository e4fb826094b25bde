//! BLE Scanner Module
//!
//! Watches advertisements and reports the ones a registered vendor recognises.

use super::format_address;
use super::winrt::buffer_bytes;
use crate::domain::models::{Advertisement, CameraEvent, MessageSeverity, StatusMessage};
use crate::vendor::VendorRegistry;
use anyhow::Result;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{info, trace};
use uuid::Uuid;
use windows::Devices::Bluetooth::Advertisement::{
    BluetoothLEAdvertisement, BluetoothLEAdvertisementReceivedEventArgs,
    BluetoothLEAdvertisementWatcher, BluetoothLEScanningMode,
};
use windows::Foundation::TypedEventHandler;

/// Advertisement watcher for supported cameras
pub struct BleScanner {
    watcher: Option<BluetoothLEAdvertisementWatcher>,
    registry: VendorRegistry,
    event_sender: mpsc::UnboundedSender<CameraEvent>,
}

impl BleScanner {
    pub fn new(registry: VendorRegistry, event_sender: mpsc::UnboundedSender<CameraEvent>) -> Self {
        Self {
            watcher: None,
            registry,
            event_sender,
        }
    }

    /// Start scanning
    ///
    /// The watcher runs unfiltered; vendor matching happens on each report so
    /// name prefixes and manufacturer masks apply together.
    pub fn start(&mut self) -> Result<()> {
        self.stop()?;

        let filters = self.registry.aggregated_scan_filters();
        info!(
            "Starting BLE scan: {} service ids, {} name prefixes, {} manufacturer filters",
            filters.service_ids.len(),
            filters.name_prefixes.len(),
            filters.manufacturer_filters.len()
        );
        self.send_log("Scanning for cameras...", MessageSeverity::Info);

        let watcher = BluetoothLEAdvertisementWatcher::new()?;
        watcher.SetScanningMode(BluetoothLEScanningMode::Active)?;

        let sender = self.event_sender.clone();
        let registry = self.registry.clone();
        let handler = TypedEventHandler::new(
            move |_: windows::core::Ref<BluetoothLEAdvertisementWatcher>,
                  args: windows::core::Ref<BluetoothLEAdvertisementReceivedEventArgs>| {
                if let Some(args) = args.as_ref() {
                    let advertisement =
                        to_advertisement(args.BluetoothAddress()?, &args.Advertisement()?)?;
                    if let Some(camera) = registry.recognize(&advertisement) {
                        let _ = sender.send(CameraEvent::CameraDiscovered(camera));
                    }
                }
                Ok(())
            },
        );

        watcher.Received(&handler)?;
        watcher.Start()?;
        self.watcher = Some(watcher);

        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        if let Some(watcher) = self.watcher.take() {
            info!("Stopping BLE scan...");
            self.send_log("Scan stopped.", MessageSeverity::Info);
            watcher.Stop()?;
        }
        Ok(())
    }

    pub fn is_scanning(&self) -> bool {
        self.watcher.is_some()
    }

    fn send_log(&self, message: &str, severity: MessageSeverity) {
        let _ = self.event_sender.send(CameraEvent::LogMessage(StatusMessage {
            message: message.to_string(),
            severity,
        }));
    }
}

impl Drop for BleScanner {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn to_advertisement(
    address: u64,
    adv: &BluetoothLEAdvertisement,
) -> windows::core::Result<Advertisement> {
    let name = adv.LocalName()?.to_string();

    let uuids = adv.ServiceUuids()?;
    let mut service_ids = Vec::new();
    for i in 0..uuids.Size()? {
        service_ids.push(Uuid::from_u128(uuids.GetAt(i)?.to_u128()));
    }

    let sections = adv.ManufacturerData()?;
    let mut manufacturer_data = HashMap::new();
    for i in 0..sections.Size()? {
        let section = sections.GetAt(i)?;
        manufacturer_data.insert(section.CompanyId()?, buffer_bytes(&section.Data()?)?);
    }

    let advertisement = Advertisement {
        address: format_address(address),
        name: (!name.is_empty()).then_some(name),
        service_ids,
        manufacturer_data,
    };
    trace!("Advertisement from {}", advertisement.address);
    Ok(advertisement)
}
