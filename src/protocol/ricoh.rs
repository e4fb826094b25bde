//! Ricoh GR / PENTAX BLE protocol
//!
//! GATT identifiers and payload codecs for the Ricoh camera services.

use super::tlv::{self, TlvRecord};
use super::{put_calendar, read_calendar, OperationRequest, Reader, StatusUpdate};
use crate::domain::models::{
    BatteryInfo, BatteryPack, CameraMode, CaptureStatus, DriveMode, ExposureMode, GeoLocation,
    PowerSource, StorageInfo, StorageSlot, StorageStatus,
};
use crate::error::ProtocolError;
use bytes::BufMut;
use chrono::{NaiveDateTime, TimeZone, Utc};
use tracing::trace;
use uuid::Uuid;

/// Camera service: date/time, state notifications, power
pub const CAMERA_SERVICE_UUID: Uuid = Uuid::from_u128(0x4b445988_caa0_4dd3_941d_37b4f52aca86);
pub const DATE_TIME_CHAR_UUID: Uuid = Uuid::from_u128(0xfa46bbdd_8a8f_4796_8cf3_aa58949b3ac9);
pub const CAMERA_STATE_CHAR_UUID: Uuid = Uuid::from_u128(0xa3c51525_de3e_4777_a1c2_699e28736fcf);
pub const CAMERA_POWER_CHAR_UUID: Uuid = Uuid::from_u128(0xb58ce84c_0666_4de9_bec8_2d27b27b3211);

/// Shooting service: operation requests
pub const SHOOTING_SERVICE_UUID: Uuid = Uuid::from_u128(0x9f00f387_8345_4bbc_8b92_b87b52e3091a);
pub const OPERATION_REQUEST_CHAR_UUID: Uuid =
    Uuid::from_u128(0x559644b8_e0bc_4011_929b_5cf9199851e7);

/// GPS control service
pub const GEO_TAG_SERVICE_UUID: Uuid = Uuid::from_u128(0x84a0dd62_e8aa_4d0f_91db_819b6724c69e);
pub const GEO_TAG_CHAR_UUID: Uuid = Uuid::from_u128(0x28f59d60_8b8e_4fcd_a81f_61bdb46595a9);

/// WLAN control service
pub const WLAN_SERVICE_UUID: Uuid = Uuid::from_u128(0xf37f568f_9071_445d_a938_5441f2e82399);
pub const NETWORK_TYPE_CHAR_UUID: Uuid = Uuid::from_u128(0x9111cdd0_9f01_45c4_a2d4_e09e8fb0424d);
pub const SSID_CHAR_UUID: Uuid = Uuid::from_u128(0x90638e5a_e77d_409d_b550_78f7e1ca5ab4);
pub const PASSPHRASE_CHAR_UUID: Uuid = Uuid::from_u128(0x0f38279c_fe9e_461b_8596_81287e8c9a81);

/// Standard Device Information service / Firmware Revision String
pub const DEVICE_INFO_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000180a_0000_1000_8000_00805f9b34fb);
pub const FIRMWARE_REVISION_CHAR_UUID: Uuid =
    Uuid::from_u128(0x00002a26_0000_1000_8000_00805f9b34fb);

pub const MANUFACTURER_ID: u16 = 0x065F;

/// Operation request opcodes
pub mod opcode {
    pub const START_SHOOTING: u8 = 0x01;
    pub const STOP_SHOOTING: u8 = 0x02;
}

/// Start-shooting parameters
pub mod shooting {
    pub const NO_AF: u8 = 0x00;
    pub const AF: u8 = 0x01;
}

/// Camera state tags
pub mod tag {
    pub const BATTERY: u16 = 0x0001;
    pub const STORAGE: u16 = 0x0002;
    pub const CAPTURE_MODE: u16 = 0x0003;
    pub const CAPTURE_STATUS: u16 = 0x0004;
    pub const EXPOSURE_MODE: u16 = 0x0005;
    pub const DRIVE_MODE: u16 = 0x0006;
}

pub const WLAN_ENABLE: [u8; 1] = [0x01];
pub const WLAN_DISABLE: [u8; 1] = [0x00];

/// Ricoh has no half-press: a shot is start-with-AF then stop
pub const SHUTTER_SEQUENCE: [OperationRequest; 2] = [
    OperationRequest::new(opcode::START_SHOOTING, shooting::AF),
    OperationRequest::new(opcode::STOP_SHOOTING, 0x00),
];

pub const BULB_START: OperationRequest =
    OperationRequest::new(opcode::START_SHOOTING, shooting::NO_AF);
pub const BULB_STOP: OperationRequest = OperationRequest::new(opcode::STOP_SHOOTING, 0x00);

/// Parse a camera-state notification
///
/// ```text
/// TLV records, tag:u16 len:u8 value
/// 0x0001 battery   [level:u8][power_source:u8]?
/// 0x0002 storage   [status:u8][remaining_shots:u32]
/// 0x0003 mode      [u8]
/// 0x0004 capture   [u8]
/// 0x0005 exposure  [u8]
/// 0x0006 drive     [u8]
/// ```
pub fn decode_camera_state(payload: &[u8]) -> Result<Vec<StatusUpdate>, ProtocolError> {
    let mut updates = Vec::new();

    for record in tlv::parse(payload)? {
        let update = match record.tag {
            tag::BATTERY => StatusUpdate::Battery(decode_battery(&record)?),
            tag::STORAGE => StatusUpdate::Storage(decode_storage(&record)?),
            tag::CAPTURE_MODE => StatusUpdate::Mode(match record.as_u8()? {
                0 => CameraMode::Still,
                1 => CameraMode::Movie,
                2 => CameraMode::Playback,
                other => CameraMode::Other(other),
            }),
            tag::CAPTURE_STATUS => StatusUpdate::Capture(match record.as_u8()? {
                0 => CaptureStatus::Idle,
                1 => CaptureStatus::Capturing,
                2 => CaptureStatus::Processing,
                other => CaptureStatus::Other(other),
            }),
            tag::EXPOSURE_MODE => StatusUpdate::Exposure(match record.as_u8()? {
                0 => ExposureMode::Program,
                1 => ExposureMode::Aperture,
                2 => ExposureMode::Shutter,
                3 => ExposureMode::Manual,
                4 => ExposureMode::Bulb,
                5 => ExposureMode::Auto,
                other => ExposureMode::Other(other),
            }),
            tag::DRIVE_MODE => StatusUpdate::Drive(match record.as_u8()? {
                0 => DriveMode::Single,
                1 => DriveMode::Continuous,
                2 => DriveMode::SelfTimer,
                3 => DriveMode::Interval,
                other => DriveMode::Other(other),
            }),
            unknown => {
                trace!("Skipping unknown camera state tag 0x{:04X}", unknown);
                continue;
            }
        };
        updates.push(update);
    }

    Ok(updates)
}

fn decode_battery(record: &TlvRecord<'_>) -> Result<BatteryInfo, ProtocolError> {
    let mut reader = Reader::new(record.value);
    let level = reader.u8()?;
    if level > 100 {
        return Err(ProtocolError::InvalidValue {
            field: "battery level",
            value: level.to_string(),
        });
    }
    let power_source = if reader.remaining() > 0 {
        Some(match reader.u8()? {
            0 => PowerSource::Battery,
            1 => PowerSource::External,
            other => PowerSource::Unknown(other),
        })
    } else {
        None
    };
    reader.finish()?;

    Ok(BatteryInfo {
        packs: vec![BatteryPack {
            position: 0,
            enabled: true,
            status: 0,
            remaining_percent: level as u32,
        }],
        power_source,
    })
}

fn decode_storage(record: &TlvRecord<'_>) -> Result<StorageInfo, ProtocolError> {
    let mut reader = Reader::new(record.value);
    let status = match reader.u8()? {
        0 => StorageStatus::Ready,
        1 => StorageStatus::NoMedia,
        2 => StorageStatus::Full,
        3 => StorageStatus::Error,
        other => StorageStatus::Unknown(other),
    };
    let remaining_shots = reader.u32()?;
    reader.finish()?;

    Ok(StorageInfo {
        slots: vec![StorageSlot {
            slot: 1,
            status,
            remaining_shots,
            remaining_seconds: None,
        }],
    })
}

/// `[year:u16][month][day][hour][minute][second]`, camera local time
pub fn encode_date_time(local: &NaiveDateTime) -> Vec<u8> {
    let mut buf = Vec::with_capacity(7);
    put_calendar(&mut buf, local);
    buf
}

pub fn decode_date_time(payload: &[u8]) -> Result<NaiveDateTime, ProtocolError> {
    let mut reader = Reader::new(payload);
    let time = read_calendar(&mut reader)?;
    reader.finish()?;
    Ok(time)
}

/// Geo-tag write
///
/// ```text
/// [0-7]   latitude  f64
/// [8-15]  longitude f64
/// [16-23] altitude  f64
/// [24-30] UTC calendar
/// [31]    datum (0 = WGS84)
/// ```
pub fn encode_geo_tag(location: &GeoLocation) -> Vec<u8> {
    let mut buf = Vec::with_capacity(32);
    buf.put_f64(location.latitude);
    buf.put_f64(location.longitude);
    buf.put_f64(location.altitude);
    put_calendar(&mut buf, &location.timestamp.naive_utc());
    buf.put_u8(0x00);
    buf
}

pub fn decode_geo_tag(payload: &[u8]) -> Result<GeoLocation, ProtocolError> {
    let mut reader = Reader::new(payload);
    let latitude = reader.f64()?;
    let longitude = reader.f64()?;
    let altitude = reader.f64()?;
    let time = read_calendar(&mut reader)?;
    let datum = reader.u8()?;
    reader.finish()?;

    if datum != 0 {
        return Err(ProtocolError::InvalidValue {
            field: "geo datum",
            value: datum.to_string(),
        });
    }
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(ProtocolError::InvalidValue {
            field: "coordinates",
            value: format!("{}, {}", latitude, longitude),
        });
    }

    Ok(GeoLocation {
        latitude,
        longitude,
        altitude,
        timestamp: Utc.from_utc_datetime(&time),
    })
}
