//! Camera wire protocols
//!
//! Shared byte-level helpers plus one codec module per vendor. All multi-byte
//! integers are big-endian unless a layout says otherwise.

pub mod ricoh;
pub mod sony;
pub mod tlv;

use crate::domain::models::{
    BatteryInfo, CameraMode, CaptureStatus, DriveMode, ExposureMode, FocusStatus, RecordingStatus,
    ShutterStatus, StorageInfo, ZoomLevel,
};
use crate::error::ProtocolError;
use bytes::{Buf, BufMut};
use chrono::{NaiveDate, NaiveDateTime};

/// Two-byte `[opcode, parameter]` command write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationRequest {
    pub opcode: u8,
    pub parameter: u8,
}

impl OperationRequest {
    /// Parameter value that ends a continuous focus/zoom movement
    pub const STOP: u8 = 0x00;

    pub const fn new(opcode: u8, parameter: u8) -> Self {
        Self { opcode, parameter }
    }

    pub fn as_bytes(&self) -> [u8; 2] {
        [self.opcode, self.parameter]
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        match bytes {
            [opcode, parameter] => Ok(Self::new(*opcode, *parameter)),
            _ => Err(ProtocolError::LengthMismatch {
                declared: 2,
                actual: bytes.len(),
            }),
        }
    }
}

/// A decoded status value, independent of which characteristic carried it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    Battery(BatteryInfo),
    Storage(StorageInfo),
    Mode(CameraMode),
    Capture(CaptureStatus),
    Exposure(ExposureMode),
    Drive(DriveMode),
    Zoom(ZoomLevel),
    Focus(FocusStatus),
    Shutter(ShutterStatus),
    Recording(RecordingStatus),
}

/// Bounds-checked big-endian cursor over a payload.
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    total: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            total: buf.len(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    pub fn position(&self) -> usize {
        self.total - self.buf.len()
    }

    fn need(&self, n: usize) -> Result<(), ProtocolError> {
        if self.buf.remaining() < n {
            return Err(ProtocolError::Truncated {
                expected: self.position() + n,
                actual: self.total,
            });
        }
        Ok(())
    }

    pub fn u8(&mut self) -> Result<u8, ProtocolError> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn u16(&mut self) -> Result<u16, ProtocolError> {
        self.need(2)?;
        Ok(self.buf.get_u16())
    }

    pub fn i16(&mut self) -> Result<i16, ProtocolError> {
        self.need(2)?;
        Ok(self.buf.get_i16())
    }

    pub fn u32(&mut self) -> Result<u32, ProtocolError> {
        self.need(4)?;
        Ok(self.buf.get_u32())
    }

    pub fn i32(&mut self) -> Result<i32, ProtocolError> {
        self.need(4)?;
        Ok(self.buf.get_i32())
    }

    pub fn f64(&mut self) -> Result<f64, ProtocolError> {
        self.need(8)?;
        Ok(self.buf.get_f64())
    }

    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        self.need(n)?;
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    /// Fails when unread bytes remain.
    pub fn finish(self) -> Result<(), ProtocolError> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::LengthMismatch {
                declared: self.position(),
                actual: self.total,
            })
        }
    }
}

/// `year:u16, month, day, hour, minute, second`
pub(crate) fn put_calendar(buf: &mut Vec<u8>, time: &NaiveDateTime) {
    use chrono::{Datelike, Timelike};
    buf.put_u16(time.year().clamp(0, u16::MAX as i32) as u16);
    buf.put_u8(time.month() as u8);
    buf.put_u8(time.day() as u8);
    buf.put_u8(time.hour() as u8);
    buf.put_u8(time.minute() as u8);
    buf.put_u8(time.second() as u8);
}

pub(crate) fn read_calendar(reader: &mut Reader<'_>) -> Result<NaiveDateTime, ProtocolError> {
    let year = reader.u16()?;
    let month = reader.u8()?;
    let day = reader.u8()?;
    let hour = reader.u8()?;
    let minute = reader.u8()?;
    let second = reader.u8()?;

    NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .and_then(|d| d.and_hms_opt(hour as u32, minute as u32, second as u32))
        .ok_or_else(|| ProtocolError::InvalidValue {
            field: "calendar",
            value: format!(
                "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                year, month, day, hour, minute, second
            ),
        })
}

pub(crate) fn decode_text(bytes: &[u8], field: &'static str) -> Result<String, ProtocolError> {
    let text = std::str::from_utf8(bytes).map_err(|_| ProtocolError::InvalidText(field))?;
    Ok(text.trim_end_matches('\0').trim().to_string())
}
