//! Tag-length-value records
//!
//! ```text
//! [tag: u16][len: u8][value: len bytes] ...
//! ```

use super::Reader;
use crate::error::ProtocolError;
use bytes::BufMut;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlvRecord<'a> {
    pub tag: u16,
    pub value: &'a [u8],
}

/// Split a payload into records. Tag meaning is left to the caller so unknown
/// tags can be skipped; a truncated record fails the whole payload.
pub fn parse(payload: &[u8]) -> Result<Vec<TlvRecord<'_>>, ProtocolError> {
    let mut reader = Reader::new(payload);
    let mut records = Vec::new();

    while reader.remaining() > 0 {
        let tag = reader.u16()?;
        let len = reader.u8()? as usize;
        let value = reader.bytes(len)?;
        records.push(TlvRecord { tag, value });
    }

    Ok(records)
}

pub fn encode(records: &[TlvRecord<'_>]) -> Vec<u8> {
    let mut buf = Vec::new();
    for record in records {
        buf.put_u16(record.tag);
        buf.put_u8(record.value.len() as u8);
        buf.put_slice(record.value);
    }
    buf
}

impl TlvRecord<'_> {
    /// Single-byte value.
    pub fn as_u8(&self) -> Result<u8, ProtocolError> {
        match self.value {
            [v] => Ok(*v),
            _ => Err(ProtocolError::LengthMismatch {
                declared: 1,
                actual: self.value.len(),
            }),
        }
    }
}
