//! The tag/type header in front of every value.
//!
//! One byte `(tag << 4) | type` for tags up to 14. Larger tags write `0xF`
//! into the tag nibble and follow with the tag as a full byte.

use jce_buffers::{Reader, Writer};

use crate::constants::{WireType, MAX_INLINE_TAG};
use crate::error::{JceError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub tag: u8,
    pub wire_type: WireType,
}

/// Reads one header. On failure the cursor is left where it was.
pub fn read_header(reader: &mut Reader<'_>) -> Result<Header> {
    let mut probe = reader.clone();
    let start = probe.position();
    let byte = probe.try_u8()?;
    let type_id = byte & 0x0f;
    let wire_type = WireType::try_from(type_id)
        .map_err(|_| JceError::malformed(start, format!("unknown type {type_id}")))?;
    let mut tag = byte >> 4;
    if tag == 0x0f {
        tag = probe.try_u8()?;
    }
    *reader = probe;
    Ok(Header { tag, wire_type })
}

/// Reads the next header without advancing.
pub fn peek_header(reader: &Reader<'_>) -> Result<Header> {
    read_header(&mut reader.clone())
}

/// Writes a header, spilling tags above 14 into a second byte.
pub fn write_header(writer: &mut Writer, tag: u8, wire_type: WireType) {
    let ty = u8::from(wire_type);
    if tag <= MAX_INLINE_TAG {
        writer.u8((tag << 4) | ty);
    } else {
        writer.u8(0xf0 | ty);
        writer.u8(tag);
    }
}
