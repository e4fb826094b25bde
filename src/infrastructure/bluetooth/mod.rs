//! Bluetooth Module
//!
//! Provides the BLE transport seam and the per-device connection lifecycle.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    CameraConnection                      │
//! │  (owns one session, caches the remote control delegate)  │
//! └─────────────────────┬───────────────────────────────────┘
//!                       │
//!         ┌─────────────┼─────────────┐
//!         │             │             │
//!         ▼             ▼             ▼
//! ┌───────────┐  ┌────────────┐  ┌──────────────┐
//! │  Scanner  │  │ GattClient │  │ BleTransport │
//! │           │  │            │  │              │
//! │ - filters │  │ - timeouts │  │ - read/write │
//! │ - vendor  │  │ - cancel   │  │ - notify     │
//! │   lookup  │  │            │  │ - disconnect │
//! └───────────┘  └────────────┘  └──────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`connection`] - Camera connection and delegate lifecycle
//! - [`gatt`] - Timeout and cancellation wrapper over a transport
//! - `fanout` - One notification handler shared by many subscribers
//! - `scanner` / `winrt` - Windows advertisement watcher and GATT transport

pub mod connection;
#[cfg(any(windows, test))]
mod fanout;
pub mod gatt;

#[cfg(windows)]
pub mod scanner;
#[cfg(windows)]
pub mod winrt;

#[cfg(test)]
pub(crate) mod fake;

pub use connection::CameraConnection;
pub use gatt::GattClient;

use crate::error::TransportError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use uuid::Uuid;

/// Address of one characteristic inside one service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CharacteristicRef {
    pub service: Uuid,
    pub characteristic: Uuid,
}

impl CharacteristicRef {
    pub const fn new(service: Uuid, characteristic: Uuid) -> Self {
        Self {
            service,
            characteristic,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    WithResponse,
    WithoutResponse,
}

/// Notification values in delivery order; ends when the link drops.
pub type NotificationStream = BoxStream<'static, Vec<u8>>;

/// Generic low-energy link to one connected device.
#[async_trait]
pub trait BleTransport: Send + Sync {
    /// Link address of the peer.
    fn address(&self) -> &str;

    async fn is_connected(&self) -> bool;

    /// Fails with `CharacteristicNotFound` for the first missing entry.
    async fn ensure_characteristics(
        &self,
        characteristics: &[CharacteristicRef],
    ) -> Result<(), TransportError>;

    async fn read(&self, characteristic: CharacteristicRef) -> Result<Vec<u8>, TransportError>;

    async fn write(
        &self,
        characteristic: CharacteristicRef,
        value: &[u8],
        mode: WriteMode,
    ) -> Result<(), TransportError>;

    async fn subscribe(
        &self,
        characteristic: CharacteristicRef,
    ) -> Result<NotificationStream, TransportError>;

    async fn disconnect(&self) -> Result<(), TransportError>;
}

/// Format a 48-bit address as `AA:BB:CC:DD:EE:FF`.
pub fn format_address(address: u64) -> String {
    let bytes = address.to_be_bytes();
    bytes[2..]
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_address() {
        assert_eq!(format_address(0x0000_A1B2_C3D4_E5F6), "A1:B2:C3:D4:E5:F6");
    }
}
