//! Vendor-abstracted camera communication over Bluetooth LE
//!
//! - [`vendor`] recognises cameras and builds per-vendor delegates
//! - [`protocol`] holds the byte-level codecs
//! - [`infrastructure::bluetooth`] owns transports and connections
//! - [`remote`] is the capability-gated remote control surface
//! - [`firmware`] checks paired cameras for firmware updates

pub mod domain;
pub mod error;
pub mod firmware;
pub mod infrastructure;
pub mod protocol;
pub mod remote;
pub mod vendor;

pub use domain::capabilities::{ConnectionMode, Feature, RemoteControlCapabilities};
pub use domain::models::{Camera, CameraEvent, PairedDevice};
pub use error::{DelegateError, ProtocolError, RemoteControlError, TransportError};
pub use infrastructure::bluetooth::{BleTransport, CameraConnection};
pub use remote::{Observation, RemoteControlDelegate};
pub use vendor::{Vendor, VendorRegistry};
