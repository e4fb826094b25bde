//! Sony Alpha / ZV BLE protocol
//!
//! Remote commands are `[opcode, parameter]` writes; status arrives as
//! 3-byte remote notifications, fixed-layout battery/storage reports, and a
//! TLV camera-status characteristic.

use super::tlv;
use super::{put_calendar, read_calendar, OperationRequest, Reader, StatusUpdate};
use crate::domain::models::{
    BatteryInfo, BatteryPack, CameraMode, CaptureStatus, CustomButton, DriveMode, ExposureLock,
    ExposureMode, FocusDirection, FocusStatus, PowerSource, RecordingStatus, ShutterStatus, Step,
    StorageInfo, StorageSlot, StorageStatus, ZoomDirection, ZoomLevel,
};
use crate::error::ProtocolError;
use bytes::BufMut;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use tracing::trace;
use uuid::Uuid;

pub const REMOTE_SERVICE_UUID: Uuid = Uuid::from_u128(0x8000ff00_ff00_ffff_ffff_ffffffffffff);
pub const REMOTE_COMMAND_CHAR_UUID: Uuid = Uuid::from_u128(0x0000ff01_0000_1000_8000_00805f9b34fb);
pub const REMOTE_NOTIFY_CHAR_UUID: Uuid = Uuid::from_u128(0x0000ff02_0000_1000_8000_00805f9b34fb);

pub const CAMERA_CONTROL_SERVICE_UUID: Uuid =
    Uuid::from_u128(0x8000cc00_cc00_ffff_ffff_ffffffffffff);
pub const WIFI_SSID_CHAR_UUID: Uuid = Uuid::from_u128(0x0000cc06_0000_1000_8000_00805f9b34fb);
pub const WIFI_PASSWORD_CHAR_UUID: Uuid = Uuid::from_u128(0x0000cc07_0000_1000_8000_00805f9b34fb);
pub const ACCESS_POINT_CHAR_UUID: Uuid = Uuid::from_u128(0x0000cc08_0000_1000_8000_00805f9b34fb);
pub const CAMERA_STATUS_CHAR_UUID: Uuid = Uuid::from_u128(0x0000cc09_0000_1000_8000_00805f9b34fb);
pub const STORAGE_INFO_CHAR_UUID: Uuid = Uuid::from_u128(0x0000cc0f_0000_1000_8000_00805f9b34fb);
pub const BATTERY_INFO_CHAR_UUID: Uuid = Uuid::from_u128(0x0000cc10_0000_1000_8000_00805f9b34fb);
pub const POWER_CHAR_UUID: Uuid = Uuid::from_u128(0x0000cc11_0000_1000_8000_00805f9b34fb);
pub const DATE_TIME_CHAR_UUID: Uuid = Uuid::from_u128(0x0000cc13_0000_1000_8000_00805f9b34fb);

pub const LOCATION_SERVICE_UUID: Uuid = Uuid::from_u128(0x8000dd00_dd00_ffff_ffff_ffffffffffff);
pub const LOCATION_CHAR_UUID: Uuid = Uuid::from_u128(0x0000dd11_0000_1000_8000_00805f9b34fb);

pub const DEVICE_INFO_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000180a_0000_1000_8000_00805f9b34fb);
pub const FIRMWARE_REVISION_CHAR_UUID: Uuid =
    Uuid::from_u128(0x00002a26_0000_1000_8000_00805f9b34fb);

pub const MANUFACTURER_ID: u16 = 0x012D;
/// Product type "camera" in the manufacturer data
pub const MANUFACTURER_PREFIX: [u8; 2] = [0x03, 0x00];

pub const ACCESS_POINT_ENABLE: [u8; 1] = [0x01];
pub const ACCESS_POINT_DISABLE: [u8; 1] = [0x00];

/// Remote command opcodes
pub mod opcode {
    pub const BUTTON: u8 = 0x01;
    pub const FOCUS_NEAR: u8 = 0x6B;
    pub const FOCUS_FAR: u8 = 0x6D;
    pub const ZOOM_TELE: u8 = 0x45;
    pub const ZOOM_WIDE: u8 = 0x47;
}

/// Parameters of [`opcode::BUTTON`]
pub mod button {
    pub const HALF_UP: u8 = 0x06;
    pub const HALF_DOWN: u8 = 0x07;
    pub const FULL_UP: u8 = 0x08;
    pub const FULL_DOWN: u8 = 0x09;
    pub const RECORD_UP: u8 = 0x0E;
    pub const RECORD_DOWN: u8 = 0x0F;
    pub const AEL_UP: u8 = 0x14;
    pub const AEL_DOWN: u8 = 0x15;
    pub const FEL_UP: u8 = 0x16;
    pub const FEL_DOWN: u8 = 0x17;
    pub const AWBL_UP: u8 = 0x18;
    pub const AWBL_DOWN: u8 = 0x19;
    /// C1 down; C1 up is +1, each further button adds 2
    pub const CUSTOM_BASE: u8 = 0x20;
}

/// Maximum stepping speed; 0 is reserved for stop
pub const MAX_STEP_SPEED: u8 = 0x7F;

const NOTIFY_PREFIX: u8 = 0x02;
const KIND_FOCUS: u8 = 0x3F;
const KIND_SHUTTER: u8 = 0xA0;
const KIND_RECORDING: u8 = 0xD5;
const VALUE_ON: u8 = 0x20;
const VALUE_OFF: u8 = 0x00;

pub const BATTERY_INFO_TAG: u16 = 0x1001;
pub const STORAGE_INFO_TAG: u16 = 0x1002;
pub const LOCATION_TAG: u16 = 0x0802;

const BATTERY_PACK_LEN: usize = 7;
const STORAGE_SLOT_LEN: usize = 10;
const LOCATION_FLAG_TIMEZONE: u8 = 0x01;

/// Camera status tags
pub mod tag {
    pub const MODE: u16 = 0x0101;
    pub const CAPTURE_STATUS: u16 = 0x0102;
    pub const EXPOSURE_MODE: u16 = 0x0103;
    pub const DRIVE_MODE: u16 = 0x0104;
    pub const ZOOM_POSITION: u16 = 0x0105;
}

pub fn half_press(pressed: bool) -> OperationRequest {
    OperationRequest::new(
        opcode::BUTTON,
        if pressed {
            button::HALF_DOWN
        } else {
            button::HALF_UP
        },
    )
}

pub fn full_press(pressed: bool) -> OperationRequest {
    OperationRequest::new(
        opcode::BUTTON,
        if pressed {
            button::FULL_DOWN
        } else {
            button::FULL_UP
        },
    )
}

pub fn record_button(pressed: bool) -> OperationRequest {
    OperationRequest::new(
        opcode::BUTTON,
        if pressed {
            button::RECORD_DOWN
        } else {
            button::RECORD_UP
        },
    )
}

pub fn custom_button(which: CustomButton, pressed: bool) -> OperationRequest {
    let index = match which {
        CustomButton::C1 => 0,
        CustomButton::C2 => 1,
        CustomButton::C3 => 2,
        CustomButton::C4 => 3,
    };
    let down = button::CUSTOM_BASE + index * 2;
    OperationRequest::new(opcode::BUTTON, if pressed { down } else { down + 1 })
}

pub fn lock_button(lock: ExposureLock, pressed: bool) -> OperationRequest {
    let (down, up) = match lock {
        ExposureLock::Ae => (button::AEL_DOWN, button::AEL_UP),
        ExposureLock::Fe => (button::FEL_DOWN, button::FEL_UP),
        ExposureLock::Awb => (button::AWBL_DOWN, button::AWBL_UP),
    };
    OperationRequest::new(opcode::BUTTON, if pressed { down } else { up })
}

/// `Stop` is sent on the opcode of the last movement direction
pub fn focus_step(step: Step<FocusDirection>, last: FocusDirection) -> OperationRequest {
    let opcode_for = |d: FocusDirection| match d {
        FocusDirection::Near => opcode::FOCUS_NEAR,
        FocusDirection::Far => opcode::FOCUS_FAR,
    };
    match step {
        Step::Move { direction, speed } => {
            OperationRequest::new(opcode_for(direction), clamp_speed(speed))
        }
        Step::Stop => OperationRequest::new(opcode_for(last), OperationRequest::STOP),
    }
}

pub fn zoom_step(step: Step<ZoomDirection>, last: ZoomDirection) -> OperationRequest {
    let opcode_for = |d: ZoomDirection| match d {
        ZoomDirection::Tele => opcode::ZOOM_TELE,
        ZoomDirection::Wide => opcode::ZOOM_WIDE,
    };
    match step {
        Step::Move { direction, speed } => {
            OperationRequest::new(opcode_for(direction), clamp_speed(speed))
        }
        Step::Stop => OperationRequest::new(opcode_for(last), OperationRequest::STOP),
    }
}

fn clamp_speed(speed: u8) -> u8 {
    speed.clamp(1, MAX_STEP_SPEED)
}

/// Parse a remote notification `[0x02][kind][value]`
pub fn decode_remote_notification(payload: &[u8]) -> Result<Option<StatusUpdate>, ProtocolError> {
    let [prefix, kind, value] = payload else {
        return Err(ProtocolError::LengthMismatch {
            declared: 3,
            actual: payload.len(),
        });
    };
    if *prefix != NOTIFY_PREFIX {
        return Err(ProtocolError::InvalidValue {
            field: "notification prefix",
            value: format!("0x{:02X}", prefix),
        });
    }

    let on = match *value {
        VALUE_ON => true,
        VALUE_OFF => false,
        other => {
            return Err(ProtocolError::InvalidValue {
                field: "notification value",
                value: format!("0x{:02X}", other),
            })
        }
    };

    Ok(match *kind {
        KIND_FOCUS => Some(StatusUpdate::Focus(if on {
            FocusStatus::Acquired
        } else {
            FocusStatus::Lost
        })),
        KIND_SHUTTER => Some(StatusUpdate::Shutter(if on {
            ShutterStatus::Active
        } else {
            ShutterStatus::Idle
        })),
        KIND_RECORDING => Some(StatusUpdate::Recording(if on {
            RecordingStatus::Recording
        } else {
            RecordingStatus::Stopped
        })),
        unknown => {
            trace!("Ignoring remote notification kind 0x{:02X}", unknown);
            None
        }
    })
}

/// Reads `[total_len][tag:u16][count]` and checks the declared length.
fn read_report_header<'a>(
    payload: &'a [u8],
    expected_tag: u16,
) -> Result<(Reader<'a>, u8), ProtocolError> {
    let mut reader = Reader::new(payload);
    let declared = reader.u8()? as usize;
    if declared + 1 > payload.len() {
        return Err(ProtocolError::Truncated {
            expected: declared + 1,
            actual: payload.len(),
        });
    }
    if declared + 1 < payload.len() {
        return Err(ProtocolError::LengthMismatch {
            declared: declared + 1,
            actual: payload.len(),
        });
    }
    let tag = reader.u16()?;
    if tag != expected_tag {
        return Err(ProtocolError::UnexpectedTag {
            expected: expected_tag,
            actual: tag,
        });
    }
    let count = reader.u8()?;
    Ok((reader, count))
}

/// Parse a battery report
///
/// ```text
/// [0]     total length (bytes after this one)
/// [1-2]   type tag 0x1001
/// [3]     pack count N
/// N x 7:  [enable bitmask][position][status][remaining % : u32]
/// [opt]   power source
/// ```
pub fn decode_battery_info(payload: &[u8]) -> Result<BatteryInfo, ProtocolError> {
    let (mut reader, count) = read_report_header(payload, BATTERY_INFO_TAG)?;

    let mut packs = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let enable = reader.u8()?;
        let position = reader.u8()?;
        let status = reader.u8()?;
        let remaining_percent = reader.u32()?;
        if remaining_percent > 100 {
            return Err(ProtocolError::InvalidValue {
                field: "battery percent",
                value: remaining_percent.to_string(),
            });
        }
        packs.push(BatteryPack {
            position,
            enabled: enable & 0x01 != 0,
            status,
            remaining_percent,
        });
    }

    let power_source = match reader.remaining() {
        0 => None,
        1 => Some(match reader.u8()? {
            0x01 => PowerSource::Battery,
            0x02 => PowerSource::External,
            other => PowerSource::Unknown(other),
        }),
        extra => {
            return Err(ProtocolError::LengthMismatch {
                declared: payload.len() - extra,
                actual: payload.len(),
            })
        }
    };

    Ok(BatteryInfo {
        packs,
        power_source,
    })
}

pub fn encode_battery_info(info: &BatteryInfo) -> Vec<u8> {
    let mut body = Vec::new();
    body.put_u16(BATTERY_INFO_TAG);
    body.put_u8(info.packs.len() as u8);
    for pack in &info.packs {
        body.put_u8(if pack.enabled { 0x01 } else { 0x00 });
        body.put_u8(pack.position);
        body.put_u8(pack.status);
        body.put_u32(pack.remaining_percent);
    }
    if let Some(source) = info.power_source {
        body.put_u8(match source {
            PowerSource::Battery => 0x01,
            PowerSource::External => 0x02,
            PowerSource::Unknown(v) => v,
        });
    }
    with_length_prefix(body)
}

/// Parse a storage report
///
/// ```text
/// [0]     total length
/// [1-2]   type tag 0x1002
/// [3]     slot count N
/// N x 10: [slot][status][remaining shots : u32][remaining seconds : u32]
/// ```
pub fn decode_storage_info(payload: &[u8]) -> Result<StorageInfo, ProtocolError> {
    let (mut reader, count) = read_report_header(payload, STORAGE_INFO_TAG)?;

    let mut slots = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let slot = reader.u8()?;
        let status = match reader.u8()? {
            0x01 => StorageStatus::Ready,
            0x02 => StorageStatus::NoMedia,
            0x03 => StorageStatus::Full,
            0x04 => StorageStatus::Error,
            other => StorageStatus::Unknown(other),
        };
        let remaining_shots = reader.u32()?;
        let remaining_seconds = reader.u32()?;
        slots.push(StorageSlot {
            slot,
            status,
            remaining_shots,
            remaining_seconds: Some(remaining_seconds),
        });
    }
    reader.finish()?;

    Ok(StorageInfo { slots })
}

pub fn encode_storage_info(info: &StorageInfo) -> Vec<u8> {
    let mut body = Vec::new();
    body.put_u16(STORAGE_INFO_TAG);
    body.put_u8(info.slots.len() as u8);
    for slot in &info.slots {
        body.put_u8(slot.slot);
        body.put_u8(match slot.status {
            StorageStatus::Ready => 0x01,
            StorageStatus::NoMedia => 0x02,
            StorageStatus::Full => 0x03,
            StorageStatus::Error => 0x04,
            StorageStatus::Unknown(v) => v,
        });
        body.put_u32(slot.remaining_shots);
        body.put_u32(slot.remaining_seconds.unwrap_or(0));
    }
    with_length_prefix(body)
}

fn with_length_prefix(body: Vec<u8>) -> Vec<u8> {
    let mut buf = Vec::with_capacity(body.len() + 1);
    buf.put_u8(body.len() as u8);
    buf.extend_from_slice(&body);
    buf
}

/// Parse the TLV camera status characteristic
pub fn decode_camera_status(payload: &[u8]) -> Result<Vec<StatusUpdate>, ProtocolError> {
    let mut updates = Vec::new();

    for record in tlv::parse(payload)? {
        let update = match record.tag {
            tag::MODE => StatusUpdate::Mode(match record.as_u8()? {
                0x01 => CameraMode::Still,
                0x02 => CameraMode::Movie,
                0x03 => CameraMode::Playback,
                other => CameraMode::Other(other),
            }),
            tag::CAPTURE_STATUS => StatusUpdate::Capture(match record.as_u8()? {
                0x00 => CaptureStatus::Idle,
                0x01 => CaptureStatus::Capturing,
                0x02 => CaptureStatus::Processing,
                other => CaptureStatus::Other(other),
            }),
            tag::EXPOSURE_MODE => StatusUpdate::Exposure(match record.as_u8()? {
                0x01 => ExposureMode::Program,
                0x02 => ExposureMode::Aperture,
                0x03 => ExposureMode::Shutter,
                0x04 => ExposureMode::Manual,
                0x05 => ExposureMode::Bulb,
                0x06 => ExposureMode::Auto,
                other => ExposureMode::Other(other),
            }),
            tag::DRIVE_MODE => StatusUpdate::Drive(match record.as_u8()? {
                0x01 => DriveMode::Single,
                0x02 => DriveMode::Continuous,
                0x03 => DriveMode::SelfTimer,
                0x04 => DriveMode::Interval,
                other => DriveMode::Other(other),
            }),
            tag::ZOOM_POSITION => {
                let position = record.as_u8()?;
                if position > 100 {
                    return Err(ProtocolError::InvalidValue {
                        field: "zoom position",
                        value: position.to_string(),
                    });
                }
                StatusUpdate::Zoom(ZoomLevel(position))
            }
            unknown => {
                trace!("Skipping unknown camera status tag 0x{:04X}", unknown);
                continue;
            }
        };
        updates.push(update);
    }

    Ok(updates)
}

/// Date/time write
///
/// ```text
/// [0-2]   0x0C 0x00 0x00
/// [3-9]   local calendar
/// [10]    DST flag
/// [11-12] UTC offset in minutes (i16)
/// ```
pub fn encode_date_time(time: &DateTime<FixedOffset>, dst: bool) -> Vec<u8> {
    let mut buf = Vec::with_capacity(13);
    buf.put_slice(&[0x0C, 0x00, 0x00]);
    put_calendar(&mut buf, &time.naive_local());
    buf.put_u8(dst as u8);
    buf.put_i16((time.offset().local_minus_utc() / 60) as i16);
    buf
}

pub fn decode_date_time(payload: &[u8]) -> Result<(DateTime<FixedOffset>, bool), ProtocolError> {
    let mut reader = Reader::new(payload);
    let header = reader.bytes(3)?;
    if header != [0x0C, 0x00, 0x00] {
        return Err(ProtocolError::InvalidValue {
            field: "date/time header",
            value: format!("{:02X?}", header),
        });
    }
    let local = read_calendar(&mut reader)?;
    let dst = reader.u8()? != 0;
    let offset_minutes = reader.i16()?;
    reader.finish()?;

    let time = fixed_offset(offset_minutes)?
        .from_local_datetime(&local)
        .single()
        .ok_or_else(|| ProtocolError::InvalidValue {
            field: "local time",
            value: local.to_string(),
        })?;
    Ok((time, dst))
}

fn fixed_offset(minutes: i16) -> Result<FixedOffset, ProtocolError> {
    FixedOffset::east_opt(minutes as i32 * 60).ok_or_else(|| ProtocolError::InvalidValue {
        field: "utc offset",
        value: minutes.to_string(),
    })
}

/// Location record written to the location service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SonyLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
    /// Present when the timezone flag is set
    pub utc_offset_minutes: Option<i16>,
    pub dst_offset_minutes: Option<i16>,
}

/// Location write
///
/// ```text
/// [0]     total length
/// [1-2]   type tag 0x0802
/// [3]     flags (bit 0: timezone fields present)
/// [4-7]   latitude  i32, 1e-7 degrees
/// [8-11]  longitude i32, 1e-7 degrees
/// [12-18] UTC calendar
/// [19-20] UTC offset minutes (opt)
/// [21-22] DST offset minutes (opt)
/// ```
pub fn encode_location(location: &SonyLocation) -> Vec<u8> {
    let with_tz = location.utc_offset_minutes.is_some();
    let mut body = Vec::with_capacity(22);
    body.put_u16(LOCATION_TAG);
    body.put_u8(if with_tz { LOCATION_FLAG_TIMEZONE } else { 0 });
    body.put_i32((location.latitude * 1e7).round() as i32);
    body.put_i32((location.longitude * 1e7).round() as i32);
    put_calendar(&mut body, &location.timestamp.naive_utc());
    if with_tz {
        body.put_i16(location.utc_offset_minutes.unwrap_or(0));
        body.put_i16(location.dst_offset_minutes.unwrap_or(0));
    }
    with_length_prefix(body)
}

pub fn decode_location(payload: &[u8]) -> Result<SonyLocation, ProtocolError> {
    let mut reader = Reader::new(payload);
    let declared = reader.u8()? as usize;
    if declared + 1 != payload.len() {
        return Err(ProtocolError::LengthMismatch {
            declared: declared + 1,
            actual: payload.len(),
        });
    }
    let tag = reader.u16()?;
    if tag != LOCATION_TAG {
        return Err(ProtocolError::UnexpectedTag {
            expected: LOCATION_TAG,
            actual: tag,
        });
    }
    let flags = reader.u8()?;
    let latitude = reader.i32()? as f64 / 1e7;
    let longitude = reader.i32()? as f64 / 1e7;
    let time: NaiveDateTime = read_calendar(&mut reader)?;
    let (utc_offset_minutes, dst_offset_minutes) = if flags & LOCATION_FLAG_TIMEZONE != 0 {
        (Some(reader.i16()?), Some(reader.i16()?))
    } else {
        (None, None)
    };
    reader.finish()?;

    Ok(SonyLocation {
        latitude,
        longitude,
        timestamp: Utc.from_utc_datetime(&time),
        utc_offset_minutes,
        dst_offset_minutes,
    })
}

/// SSID / password characteristics carry a 3-byte header before the text.
pub fn decode_wifi_text(payload: &[u8], field: &'static str) -> Result<String, ProtocolError> {
    let mut reader = Reader::new(payload);
    reader.bytes(3)?;
    let text = reader.bytes(reader.remaining())?;
    super::decode_text(text, field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn battery_payload() -> Vec<u8> {
        vec![
            0x12, // 18 bytes follow
            0x10, 0x01, // tag
            0x02, // two packs
            0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x4B, // enabled, pos 0, 75 %
            0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, // absent grip
            0x02, // external power
        ]
    }

    #[test]
    fn test_battery_info_layout() {
        let info = decode_battery_info(&battery_payload()).unwrap();
        assert_eq!(info.packs.len(), 2);
        assert!(info.packs[0].enabled);
        assert_eq!(info.packs[0].remaining_percent, 75);
        assert!(!info.packs[1].enabled);
        assert_eq!(info.packs[1].position, 1);
        assert_eq!(info.power_source, Some(PowerSource::External));
        assert_eq!(info.primary_percent(), Some(75));
        assert_eq!(encode_battery_info(&info), battery_payload());
    }

    #[test]
    fn test_battery_info_without_power_source() {
        let mut payload = battery_payload();
        payload.pop();
        payload[0] = 0x11;
        let info = decode_battery_info(&payload).unwrap();
        assert_eq!(info.power_source, None);
    }

    #[test]
    fn test_battery_info_truncated() {
        let payload = battery_payload();
        let err = decode_battery_info(&payload[..10]).unwrap_err();
        assert!(matches!(err, ProtocolError::Truncated { .. }));
    }

    #[test]
    fn test_battery_info_wrong_tag() {
        let mut payload = battery_payload();
        payload[2] = 0x02;
        assert_eq!(
            decode_battery_info(&payload),
            Err(ProtocolError::UnexpectedTag {
                expected: 0x1001,
                actual: 0x1002
            })
        );
    }

    #[test]
    fn test_storage_info_layout() {
        let payload = vec![
            0x0D, 0x10, 0x02, 0x01, // header, one slot
            0x01, 0x01, 0x00, 0x00, 0x01, 0xF4, 0x00, 0x00, 0x0E, 0x10,
        ];
        let info = decode_storage_info(&payload).unwrap();
        assert_eq!(info.slots[0].status, StorageStatus::Ready);
        assert_eq!(info.slots[0].remaining_shots, 500);
        assert_eq!(info.slots[0].remaining_seconds, Some(3600));
        assert_eq!(encode_storage_info(&info), payload);
    }

    #[test]
    fn test_remote_notifications() {
        assert_eq!(
            decode_remote_notification(&[0x02, 0x3F, 0x20]).unwrap(),
            Some(StatusUpdate::Focus(FocusStatus::Acquired))
        );
        assert_eq!(
            decode_remote_notification(&[0x02, 0xD5, 0x00]).unwrap(),
            Some(StatusUpdate::Recording(RecordingStatus::Stopped))
        );
        assert_eq!(decode_remote_notification(&[0x02, 0x11, 0x20]).unwrap(), None);
        assert!(decode_remote_notification(&[0x02, 0x3F]).is_err());
        assert!(decode_remote_notification(&[0x02, 0x3F, 0x42]).is_err());
    }

    #[test]
    fn test_stepping_commands() {
        let near = focus_step(
            Step::Move {
                direction: FocusDirection::Near,
                speed: 0,
            },
            FocusDirection::Near,
        );
        assert_eq!(near.as_bytes(), [0x6B, 0x01]);

        let stop = zoom_step(Step::Stop, ZoomDirection::Wide);
        assert_eq!(stop.as_bytes(), [0x47, 0x00]);

        let fast = zoom_step(
            Step::Move {
                direction: ZoomDirection::Tele,
                speed: 0xFF,
            },
            ZoomDirection::Wide,
        );
        assert_eq!(fast.as_bytes(), [0x45, 0x7F]);
    }

    #[test]
    fn test_custom_button_codes() {
        assert_eq!(custom_button(CustomButton::C1, true).as_bytes(), [0x01, 0x20]);
        assert_eq!(custom_button(CustomButton::C1, false).as_bytes(), [0x01, 0x21]);
        assert_eq!(custom_button(CustomButton::C3, true).as_bytes(), [0x01, 0x24]);
    }

    #[test]
    fn test_camera_status_with_zoom() {
        let payload = tlv::encode(&[
            tlv::TlvRecord {
                tag: tag::ZOOM_POSITION,
                value: &[40],
            },
            tlv::TlvRecord {
                tag: 0x0F0F,
                value: &[],
            },
            tlv::TlvRecord {
                tag: tag::DRIVE_MODE,
                value: &[0x02],
            },
        ]);
        let updates = decode_camera_status(&payload).unwrap();
        assert_eq!(
            updates,
            vec![
                StatusUpdate::Zoom(ZoomLevel(40)),
                StatusUpdate::Drive(DriveMode::Continuous)
            ]
        );
    }

    #[test]
    fn test_date_time_round_trip() {
        let offset = FixedOffset::east_opt(9 * 3600).unwrap();
        let time = offset
            .from_local_datetime(
                &NaiveDate::from_ymd_opt(2025, 12, 31)
                    .unwrap()
                    .and_hms_opt(23, 59, 30)
                    .unwrap(),
            )
            .unwrap();
        let bytes = encode_date_time(&time, false);
        assert_eq!(bytes.len(), 13);
        assert_eq!(&bytes[..5], &[0x0C, 0x00, 0x00, 0x07, 0xE9]);
        assert_eq!(&bytes[11..], &[0x02, 0x1C]);
        assert_eq!(decode_date_time(&bytes).unwrap(), (time, false));
    }

    #[test]
    fn test_location_round_trip() {
        let location = SonyLocation {
            latitude: 48.8583701,
            longitude: -2.2944813,
            timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap(),
            utc_offset_minutes: Some(120),
            dst_offset_minutes: Some(60),
        };
        let bytes = encode_location(&location);
        assert_eq!(bytes[0] as usize, bytes.len() - 1);
        assert_eq!(&bytes[1..4], &[0x08, 0x02, 0x01]);

        let decoded = decode_location(&bytes).unwrap();
        assert!((decoded.latitude - location.latitude).abs() < 1e-7);
        assert!((decoded.longitude - location.longitude).abs() < 1e-7);
        assert_eq!(decoded.timestamp, location.timestamp);
        assert_eq!(decoded.utc_offset_minutes, Some(120));
        assert_eq!(decoded.dst_offset_minutes, Some(60));
    }

    #[test]
    fn test_location_without_timezone() {
        let location = SonyLocation {
            latitude: 1.0,
            longitude: 2.0,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            utc_offset_minutes: None,
            dst_offset_minutes: None,
        };
        let bytes = encode_location(&location);
        assert_eq!(bytes.len(), 19);
        assert_eq!(decode_location(&bytes).unwrap().utc_offset_minutes, None);
    }

    #[test]
    fn test_wifi_text_header_skipped() {
        let mut payload = vec![0x00, 0x00, 0x0C];
        payload.extend_from_slice(b"DIRECT-a1B2:ILCE-7M4");
        assert_eq!(
            decode_wifi_text(&payload, "ssid").unwrap(),
            "DIRECT-a1B2:ILCE-7M4"
        );
        assert!(decode_wifi_text(&[0x00], "ssid").is_err());
    }
}
