//! `JceEncoder` — writes [`JceValue`] trees as JCE.

use indexmap::IndexMap;
use jce_buffers::Writer;
use tracing::debug;

use crate::constants::{WireType, MAX_CONTAINER_SIZE, MAX_STRING_LENGTH};
use crate::error::{JceError, Result};
use crate::header::write_header;
use crate::options::JceOption;
use crate::value::{JceKey, JceStruct, JceValue};

/// Schema-less encoder over an owned [`Writer`].
pub struct JceEncoder {
    writer: Writer,
    option: JceOption,
}

impl Default for JceEncoder {
    fn default() -> Self {
        Self::new(JceOption::NONE)
    }
}

impl JceEncoder {
    /// Encoder writing in the byte order `option` selects.
    pub fn new(option: JceOption) -> Self {
        Self {
            writer: Writer::with_endianness(option.little_endian()),
            option,
        }
    }

    pub fn option(&self) -> JceOption {
        self.option
    }

    /// The output buffer, for callers writing headers directly.
    pub fn writer(&mut self) -> &mut Writer {
        &mut self.writer
    }

    /// Takes everything written so far.
    pub fn finish(&mut self) -> Vec<u8> {
        self.writer.flush()
    }

    /// Encodes one value.
    ///
    /// A struct is written as its bare field sequence, with no surrounding
    /// `StructBegin`/`StructEnd`. Any other value is written as field 0.
    pub fn encode(&mut self, value: &JceValue<'_>) -> Result<Vec<u8>> {
        let result = match value {
            JceValue::Struct(fields) => self.write_fields(fields),
            other => self.write_value(0, other),
        };
        match result {
            Ok(()) => {
                let out = self.finish();
                debug!(len = out.len(), "encoded value");
                Ok(out)
            }
            Err(err) => {
                self.writer.reset();
                Err(err)
            }
        }
    }

    /// Writes struct fields in ascending tag order.
    pub fn write_fields(&mut self, fields: &JceStruct<'_>) -> Result<()> {
        let mut tags: Vec<u8> = fields.keys().copied().collect();
        tags.sort_unstable();
        for tag in tags {
            if let Some(value) = fields.get(&tag) {
                self.write_value(tag, value)?;
            }
        }
        Ok(())
    }

    /// Writes one tagged value using the narrowest wire type.
    pub fn write_value(&mut self, tag: u8, value: &JceValue<'_>) -> Result<()> {
        match value {
            JceValue::Int(i) => self.write_int(tag, *i),
            JceValue::Float(f) => self.write_float(tag, *f),
            JceValue::Double(d) => self.write_double(tag, *d),
            JceValue::Str(s) => return self.write_string(tag, s.as_bytes()),
            JceValue::Bytes(b) => return self.write_bytes(tag, b),
            JceValue::List(items) => {
                self.begin_list(tag, items.len())?;
                for item in items {
                    self.write_value(0, item)?;
                }
            }
            JceValue::Map(map) => return self.write_map(tag, map),
            JceValue::Struct(fields) => {
                self.begin_struct(tag);
                self.write_fields(fields)?;
                self.end_struct();
            }
            JceValue::Record(_) => {
                return Err(JceError::unencodable(
                    "record has no wire form without a schema",
                ))
            }
        }
        Ok(())
    }

    /// Writes an integer in the narrowest encoding that holds it.
    pub fn write_int(&mut self, tag: u8, value: i64) {
        if value == 0 {
            write_header(&mut self.writer, tag, WireType::ZeroTag);
        } else if let Ok(v) = i8::try_from(value) {
            write_header(&mut self.writer, tag, WireType::Int1);
            self.writer.i8(v);
        } else if let Ok(v) = i16::try_from(value) {
            write_header(&mut self.writer, tag, WireType::Int2);
            self.writer.i16(v);
        } else if let Ok(v) = i32::try_from(value) {
            write_header(&mut self.writer, tag, WireType::Int4);
            self.writer.i32(v);
        } else {
            write_header(&mut self.writer, tag, WireType::Int8);
            self.writer.i64(value);
        }
    }

    pub fn write_float(&mut self, tag: u8, value: f32) {
        write_header(&mut self.writer, tag, WireType::Float);
        self.writer.f32(value);
    }

    pub fn write_double(&mut self, tag: u8, value: f64) {
        write_header(&mut self.writer, tag, WireType::Double);
        self.writer.f64(value);
    }

    /// Writes a string payload, `String1` up to 255 bytes and `String4` above.
    pub fn write_string(&mut self, tag: u8, data: &[u8]) -> Result<()> {
        if let Ok(len) = u8::try_from(data.len()) {
            write_header(&mut self.writer, tag, WireType::String1);
            self.writer.u8(len);
        } else {
            if data.len() > MAX_STRING_LENGTH {
                return Err(JceError::unencodable(format!(
                    "string of {} bytes exceeds {MAX_STRING_LENGTH}",
                    data.len()
                )));
            }
            write_header(&mut self.writer, tag, WireType::String4);
            self.writer.u32(data.len() as u32);
        }
        self.writer.buf(data);
        Ok(())
    }

    /// Writes raw bytes as a simple list.
    pub fn write_bytes(&mut self, tag: u8, data: &[u8]) -> Result<()> {
        check_count(data.len())?;
        write_header(&mut self.writer, tag, WireType::SimpleList);
        write_header(&mut self.writer, 0, WireType::Int1);
        self.write_int(0, data.len() as i64);
        self.writer.buf(data);
        Ok(())
    }

    /// Writes a map with keys at tag 0 and values at tag 1.
    pub fn write_map(&mut self, tag: u8, map: &IndexMap<JceKey, JceValue<'_>>) -> Result<()> {
        self.begin_map(tag, map.len())?;
        for (key, value) in map {
            self.write_value(0, &key.to_value())?;
            self.write_value(1, value)?;
        }
        Ok(())
    }

    /// Writes a list header and element count. Elements follow at tag 0.
    pub fn begin_list(&mut self, tag: u8, len: usize) -> Result<()> {
        check_count(len)?;
        write_header(&mut self.writer, tag, WireType::List);
        self.write_int(0, len as i64);
        Ok(())
    }

    /// Writes a map header and entry count. Keys follow at tag 0, values at
    /// tag 1.
    pub fn begin_map(&mut self, tag: u8, len: usize) -> Result<()> {
        check_count(len)?;
        write_header(&mut self.writer, tag, WireType::Map);
        self.write_int(0, len as i64);
        Ok(())
    }

    /// Opens a nested struct. Pair with [`end_struct`](Self::end_struct).
    pub fn begin_struct(&mut self, tag: u8) {
        write_header(&mut self.writer, tag, WireType::StructBegin);
    }

    pub fn end_struct(&mut self) {
        write_header(&mut self.writer, 0, WireType::StructEnd);
    }
}

fn check_count(len: usize) -> Result<()> {
    if len > MAX_CONTAINER_SIZE {
        return Err(JceError::unencodable(format!(
            "container of {len} elements exceeds {MAX_CONTAINER_SIZE}"
        )));
    }
    Ok(())
}
