//! Length-prefixed framing for JCE payloads on byte streams.
//!
//! Each frame is a 1, 2 or 4 byte length followed by the body. The length
//! either counts the prefix too (inclusive) or only the body.

use std::sync::Arc;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;
use tracing::{debug, warn};

use crate::classify::classify_struct;
use crate::config::JceConfig;
use crate::decoder::{reader_for, GenericDecoder};
use crate::encoder::JceEncoder;
use crate::error::Result;
use crate::schema::{JceRecord, Schema};
use crate::schema_decoder::SchemaDecoder;
use crate::schema_encoder::encode_record;
use crate::value::{Fields, JceValue};

/// Default cap on a single frame and on the reader's buffer (10 MiB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 10 * 1024 * 1024;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame length {0} is invalid (less than header length {1})")]
    InvalidLength(usize, usize),
    #[error("frame length {0} exceeds limit {1}")]
    FrameTooLarge(usize, usize),
    #[error("buffering {0} bytes would exceed limit {1}")]
    BufferOverflow(usize, usize),
    #[error("length prefix must be 1, 2 or 4 bytes, got {0}")]
    InvalidPrefix(u8),
}

/// Frame boundary detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Framer {
    length_type: u8,
    inclusive_length: bool,
    little_endian: bool,
    max_frame_size: usize,
}

impl Default for Framer {
    /// 4-byte big-endian inclusive prefix, 10 MiB frames.
    fn default() -> Self {
        Self {
            length_type: 4,
            inclusive_length: true,
            little_endian: false,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

impl Framer {
    pub fn new(
        length_type: u8,
        inclusive_length: bool,
        little_endian: bool,
        max_frame_size: usize,
    ) -> Result<Self, FrameError> {
        if !matches!(length_type, 1 | 2 | 4) {
            return Err(FrameError::InvalidPrefix(length_type));
        }
        Ok(Self {
            length_type,
            inclusive_length,
            little_endian,
            max_frame_size,
        })
    }

    /// Width of the length prefix in bytes.
    pub fn header_len(&self) -> usize {
        usize::from(self.length_type)
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Looks for a complete frame at the start of `buffer`.
    ///
    /// Returns the total frame size (prefix included) once the whole frame is
    /// buffered, `None` while more bytes are needed.
    pub fn check_frame(&self, buffer: &[u8]) -> Result<Option<usize>, FrameError> {
        let header_len = self.header_len();
        if buffer.len() < header_len {
            return Ok(None);
        }
        let prefix = &buffer[..header_len];
        let length = match (self.length_type, self.little_endian) {
            (1, _) => usize::from(prefix[0]),
            (2, true) => usize::from(LittleEndian::read_u16(prefix)),
            (2, false) => usize::from(BigEndian::read_u16(prefix)),
            (_, true) => LittleEndian::read_u32(prefix) as usize,
            (_, false) => BigEndian::read_u32(prefix) as usize,
        };
        let packet_size = if self.inclusive_length {
            if length < header_len {
                return Err(FrameError::InvalidLength(length, header_len));
            }
            length
        } else {
            length + header_len
        };
        if packet_size > self.max_frame_size {
            return Err(FrameError::FrameTooLarge(packet_size, self.max_frame_size));
        }
        Ok((buffer.len() >= packet_size).then_some(packet_size))
    }

    /// Prefixes `body` with its length.
    pub fn frame(&self, body: &[u8]) -> Result<Bytes, FrameError> {
        let header_len = self.header_len();
        let total = body.len() + header_len;
        if total > self.max_frame_size {
            return Err(FrameError::FrameTooLarge(total, self.max_frame_size));
        }
        let length = if self.inclusive_length { total } else { body.len() };
        let width_max = match self.length_type {
            1 => usize::from(u8::MAX),
            2 => usize::from(u16::MAX),
            _ => u32::MAX as usize,
        };
        if length > width_max {
            return Err(FrameError::FrameTooLarge(length, width_max));
        }
        let mut out = BytesMut::with_capacity(total);
        match (self.length_type, self.little_endian) {
            (1, _) => out.put_u8(length as u8),
            (2, true) => out.put_u16_le(length as u16),
            (2, false) => out.put_u16(length as u16),
            (_, true) => out.put_u32_le(length as u32),
            (_, false) => out.put_u32(length as u32),
        }
        out.extend_from_slice(body);
        Ok(out.freeze())
    }
}

/// Incremental reader: feed stream bytes, pull decoded frames.
///
/// A frame is removed from the buffer only once its body decodes. A frame
/// that fails to decode stays put until [`FrameReader::discard_frame`].
pub struct FrameReader {
    framer: Framer,
    config: JceConfig,
    schema: Option<Arc<Schema>>,
    buffer: BytesMut,
    max_buffer_size: usize,
}

impl FrameReader {
    pub fn new(framer: Framer, config: JceConfig) -> Self {
        Self {
            framer,
            config,
            schema: None,
            buffer: BytesMut::with_capacity(4096),
            max_buffer_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Decodes frame bodies against `schema` instead of generically.
    pub fn with_schema(mut self, schema: Arc<Schema>) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_max_buffer_size(mut self, max_buffer_size: usize) -> Self {
        self.max_buffer_size = max_buffer_size;
        self
    }

    /// Bytes buffered and not yet consumed.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Appends bytes to the buffer. Fails without buffering anything if the buffer would exceed its limit.
    pub fn feed(&mut self, data: &[u8]) -> Result<(), FrameError> {
        let wanted = self.buffer.len() + data.len();
        if wanted > self.max_buffer_size {
            return Err(FrameError::BufferOverflow(wanted, self.max_buffer_size));
        }
        self.buffer.extend_from_slice(data);
        Ok(())
    }

    /// Decodes the next complete frame.
    ///
    /// Generic frames come back as a classified [`JceValue::Struct`], frames
    /// read with a schema as a [`JceValue::Record`].
    pub fn next_value(&mut self) -> Result<Option<JceValue<'static>>> {
        let schema = self.schema.clone();
        let config = self.config.clone();
        self.take_frame(|body| match &schema {
            Some(schema) => {
                let mut reader = reader_for(body, config.option);
                let fields = SchemaDecoder::new(&mut reader, &config).decode_to_fields(schema)?;
                Ok(JceValue::Record(fields).into_owned())
            }
            None => {
                let mut reader = reader_for(body, config.option);
                let fields = GenericDecoder::new(&mut reader, config.option).decode()?;
                let fields = classify_struct(fields, config.bytes_mode, config.option);
                Ok(JceValue::Struct(fields).into_owned())
            }
        })
    }

    /// Decodes the next complete frame as a record type.
    pub fn next_record<T: JceRecord>(&mut self) -> Result<Option<T>> {
        let config = self.config.clone();
        self.take_frame(|body| {
            let mut reader = reader_for(body, config.option);
            SchemaDecoder::new(&mut reader, &config).decode_record::<T>()
        })
    }

    /// Drops the next complete frame without decoding it. Returns whether a
    /// frame was dropped.
    pub fn discard_frame(&mut self) -> Result<bool> {
        match self.framer.check_frame(&self.buffer)? {
            Some(size) => {
                self.buffer.advance(size);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn take_frame<R>(&mut self, decode: impl FnOnce(&[u8]) -> Result<R>) -> Result<Option<R>> {
        let Some(size) = self.framer.check_frame(&self.buffer)? else {
            return Ok(None);
        };
        let body = &self.buffer[self.framer.header_len()..size];
        match decode(body) {
            Ok(out) => {
                self.buffer.advance(size);
                debug!(size, buffered = self.buffer.len(), "frame decoded");
                Ok(Some(out))
            }
            Err(err) => {
                warn!(size, error = %err, "frame body failed to decode");
                Err(err)
            }
        }
    }
}

/// Encodes values and wraps them in frames.
pub struct FrameWriter {
    framer: Framer,
    config: JceConfig,
}

impl FrameWriter {
    pub fn new(framer: Framer, config: JceConfig) -> Self {
        Self { framer, config }
    }

    /// Encodes a value and prefixes its length.
    pub fn write_value(&self, value: &JceValue<'_>) -> Result<Bytes> {
        let body = JceEncoder::new(self.config.option).encode(value)?;
        Ok(self.framer.frame(&body)?)
    }

    pub fn write_fields(&self, schema: &Schema, fields: &Fields<'_>) -> Result<Bytes> {
        let body = encode_record(schema, fields, &self.config)?;
        Ok(self.framer.frame(&body)?)
    }

    pub fn write_record<T: JceRecord>(&self, record: &T) -> Result<Bytes> {
        self.write_fields(&T::schema(), &record.to_fields())
    }
}
