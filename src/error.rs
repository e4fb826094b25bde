//! Error types shared across the camera communication layer.

use crate::domain::capabilities::Feature;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Failures of the underlying low-energy link.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The link has dropped or was never established.
    #[error("Transport unavailable: device disconnected")]
    Disconnected,

    /// An operation did not complete in time.
    #[error("Transport operation '{operation}' timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    /// The connection was torn down while the operation was in flight.
    #[error("Transport operation cancelled")]
    Cancelled,

    /// The device does not expose the requested characteristic.
    #[error("Characteristic {characteristic} not found in service {service}")]
    CharacteristicNotFound { service: Uuid, characteristic: Uuid },

    /// The platform stack reported a failure.
    #[error("GATT operation failed: {0}")]
    Gatt(String),
}

impl TransportError {
    /// True when the error means the link itself is gone.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Disconnected | Self::Timeout { .. } | Self::Cancelled)
    }
}

/// Malformed or truncated payloads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Payload ended before a required field.
    #[error("Truncated payload: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// A header carried an unexpected type tag.
    #[error("Unexpected type tag: expected 0x{expected:04X}, got 0x{actual:04X}")]
    UnexpectedTag { expected: u16, actual: u16 },

    /// Declared length disagrees with the payload.
    #[error("Length mismatch: header declares {declared} bytes, payload has {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    /// A field held a value outside its documented range.
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },

    /// Text characteristic was not valid UTF-8.
    #[error("Invalid UTF-8 in {0}")]
    InvalidText(&'static str),
}

/// Errors surfaced by a remote control delegate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemoteControlError {
    /// The feature is not declared for this vendor or connection mode.
    #[error("Unsupported operation: {0:?}")]
    Unsupported(Feature),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A step of the Wi-Fi escalation failed.
    #[error("Wi-Fi connection failed: {0}")]
    Wifi(String),
}

impl RemoteControlError {
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }

    pub fn is_transport_unavailable(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_unavailable())
    }
}

/// Reasons a vendor could not build a delegate for a connection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DelegateError {
    #[error("Delegate creation failed: {0}")]
    Transport(#[from] TransportError),

    #[error("Connection has been torn down")]
    ConnectionClosed,
}

/// Failures of the HTTP seam used by firmware checks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("request timed out")]
    Timeout,

    #[error("server returned HTTP {0}")]
    Status(u16),
}
