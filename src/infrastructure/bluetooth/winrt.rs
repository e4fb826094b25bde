//! WinRT GATT Transport
//!
//! [`BleTransport`] over `Windows.Devices.Bluetooth`.

use super::fanout::NotifyFanout;
use super::{format_address, BleTransport, CharacteristicRef, NotificationStream, WriteMode};
use crate::error::TransportError;
use async_trait::async_trait;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;
use windows::core::GUID;
use windows::Devices::Bluetooth::GenericAttributeProfile::{
    GattCharacteristic, GattClientCharacteristicConfigurationDescriptorValue,
    GattCommunicationStatus, GattValueChangedEventArgs, GattWriteOption,
};
use windows::Devices::Bluetooth::{BluetoothCacheMode, BluetoothConnectionStatus, BluetoothLEDevice};
use windows::Foundation::TypedEventHandler;
use windows::Storage::Streams::{DataReader, DataWriter, IBuffer};

fn gatt_error(e: windows::core::Error) -> TransportError {
    TransportError::Gatt(e.message().to_string())
}

fn check(status: GattCommunicationStatus, operation: &str) -> Result<(), TransportError> {
    match status {
        GattCommunicationStatus::Success => Ok(()),
        GattCommunicationStatus::Unreachable => Err(TransportError::Disconnected),
        other => Err(TransportError::Gatt(format!("{} returned {:?}", operation, other))),
    }
}

fn guid(uuid: Uuid) -> GUID {
    GUID::from_u128(uuid.as_u128())
}

pub(crate) fn buffer_bytes(buffer: &IBuffer) -> windows::core::Result<Vec<u8>> {
    let reader = DataReader::FromBuffer(buffer)?;
    let mut bytes = vec![0u8; reader.UnconsumedBufferLength()? as usize];
    reader.ReadBytes(&mut bytes)?;
    Ok(bytes)
}

/// One registered `ValueChanged` handler and its subscribers.
struct Subscription {
    characteristic: GattCharacteristic,
    token: i64,
    fanout: NotifyFanout,
}

pub struct WinRtTransport {
    address: String,
    device: BluetoothLEDevice,
    characteristics: Mutex<HashMap<CharacteristicRef, GattCharacteristic>>,
    subscriptions: Mutex<HashMap<CharacteristicRef, Subscription>>,
}

impl WinRtTransport {
    /// Connect to a device by Bluetooth address
    pub async fn connect(address: u64) -> Result<Self, TransportError> {
        info!("Connecting to Bluetooth device: {:#X}", address);
        let device = BluetoothLEDevice::FromBluetoothAddressAsync(address)
            .map_err(gatt_error)?
            .await
            .map_err(gatt_error)?;

        Ok(Self {
            address: format_address(address),
            device,
            characteristics: Mutex::new(HashMap::new()),
            subscriptions: Mutex::new(HashMap::new()),
        })
    }

    async fn resolve(&self, target: CharacteristicRef) -> Result<GattCharacteristic, TransportError> {
        if let Some(found) = self
            .characteristics
            .lock()
            .ok()
            .and_then(|cache| cache.get(&target).cloned())
        {
            return Ok(found);
        }

        let not_found = TransportError::CharacteristicNotFound {
            service: target.service,
            characteristic: target.characteristic,
        };

        let services = self
            .device
            .GetGattServicesForUuidAsync(guid(target.service))
            .map_err(gatt_error)?
            .await
            .map_err(gatt_error)?;
        check(services.Status().map_err(gatt_error)?, "service discovery")?;
        let services = services.Services().map_err(gatt_error)?;
        if services.Size().map_err(gatt_error)? == 0 {
            return Err(not_found);
        }
        let service = services.GetAt(0).map_err(gatt_error)?;

        let chars = service
            .GetCharacteristicsForUuidAsync(guid(target.characteristic))
            .map_err(gatt_error)?
            .await
            .map_err(gatt_error)?;
        check(chars.Status().map_err(gatt_error)?, "characteristic discovery")?;
        let chars = chars.Characteristics().map_err(gatt_error)?;
        if chars.Size().map_err(gatt_error)? == 0 {
            return Err(not_found);
        }
        let characteristic = chars.GetAt(0).map_err(gatt_error)?;

        debug!("Resolved characteristic {}", target.characteristic);
        if let Ok(mut cache) = self.characteristics.lock() {
            cache.insert(target, characteristic.clone());
        }
        Ok(characteristic)
    }
}

#[async_trait]
impl BleTransport for WinRtTransport {
    fn address(&self) -> &str {
        &self.address
    }

    async fn is_connected(&self) -> bool {
        self.device
            .ConnectionStatus()
            .map(|s| s == BluetoothConnectionStatus::Connected)
            .unwrap_or(false)
    }

    async fn ensure_characteristics(
        &self,
        characteristics: &[CharacteristicRef],
    ) -> Result<(), TransportError> {
        for characteristic in characteristics {
            self.resolve(*characteristic).await?;
        }
        Ok(())
    }

    async fn read(&self, characteristic: CharacteristicRef) -> Result<Vec<u8>, TransportError> {
        let target = self.resolve(characteristic).await?;
        let result = target
            .ReadValueWithCacheModeAsync(BluetoothCacheMode::Uncached)
            .map_err(gatt_error)?
            .await
            .map_err(gatt_error)?;
        check(result.Status().map_err(gatt_error)?, "read")?;
        buffer_bytes(&result.Value().map_err(gatt_error)?).map_err(gatt_error)
    }

    async fn write(
        &self,
        characteristic: CharacteristicRef,
        value: &[u8],
        mode: WriteMode,
    ) -> Result<(), TransportError> {
        let target = self.resolve(characteristic).await?;
        let buffer = {
            let writer = DataWriter::new().map_err(gatt_error)?;
            writer.WriteBytes(value).map_err(gatt_error)?;
            writer.DetachBuffer().map_err(gatt_error)?
        };
        let option = match mode {
            WriteMode::WithResponse => GattWriteOption::WriteWithResponse,
            WriteMode::WithoutResponse => GattWriteOption::WriteWithoutResponse,
        };
        let status = target
            .WriteValueWithOptionAsync(&buffer, option)
            .map_err(gatt_error)?
            .await
            .map_err(gatt_error)?;
        check(status, "write")
    }

    /// Subscribers share one handler per characteristic.
    async fn subscribe(
        &self,
        characteristic: CharacteristicRef,
    ) -> Result<NotificationStream, TransportError> {
        let existing = self
            .subscriptions
            .lock()
            .ok()
            .and_then(|subs| subs.get(&characteristic).map(|s| s.fanout.clone()));
        if let Some(fanout) = existing {
            return Ok(fanout.subscribe());
        }

        let target = self.resolve(characteristic).await?;
        let status = target
            .WriteClientCharacteristicConfigurationDescriptorAsync(
                GattClientCharacteristicConfigurationDescriptorValue::Notify,
            )
            .map_err(gatt_error)?
            .await
            .map_err(gatt_error)?;
        check(status, "enable notifications")?;

        let fanout = NotifyFanout::default();
        let publisher = fanout.clone();
        let handler = TypedEventHandler::new(
            move |_: windows::core::Ref<GattCharacteristic>,
                  args: windows::core::Ref<GattValueChangedEventArgs>| {
                if let Some(args) = args.as_ref() {
                    publisher.publish(&buffer_bytes(&args.CharacteristicValue()?)?);
                }
                Ok(())
            },
        );
        let token = target.ValueChanged(&handler).map_err(gatt_error)?;

        let mut subscriptions = self.subscriptions.lock().unwrap_or_else(|e| e.into_inner());
        match subscriptions.entry(characteristic) {
            Entry::Occupied(current) => {
                // A concurrent subscribe registered first
                if let Err(e) = target.RemoveValueChanged(token) {
                    warn!("Failed to remove notification handler: {}", e.message());
                }
                Ok(current.get().fanout.subscribe())
            }
            Entry::Vacant(slot) => {
                let stream = fanout.subscribe();
                slot.insert(Subscription {
                    characteristic: target,
                    token,
                    fanout,
                });
                Ok(stream)
            }
        }
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        let subscriptions = self
            .subscriptions
            .lock()
            .map(|mut subs| std::mem::take(&mut *subs))
            .unwrap_or_default();
        for (_, subscription) in subscriptions {
            if let Err(e) = subscription
                .characteristic
                .RemoveValueChanged(subscription.token)
            {
                warn!("Failed to remove notification handler: {}", e.message());
            }
            subscription.fanout.close();
        }
        if let Ok(mut cache) = self.characteristics.lock() {
            cache.clear();
        }
        self.device.Close().map_err(gatt_error)?;
        info!("Closed Bluetooth device {}", self.address);
        Ok(())
    }
}
