//! `GenericDecoder` — schema-less JCE decoder with skip and validation.
//!
//! Produces a tag-keyed [`JceStruct`]. Nested decoders (schema, node,
//! classifier) reuse the same reader and depth counter through
//! [`GenericDecoder::with_depth`].

use std::borrow::Cow;

use indexmap::IndexMap;
use jce_buffers::Reader;
use tracing::{debug, warn};

use crate::constants::{WireType, MAX_CONTAINER_SIZE, MAX_DEPTH, MAX_STRING_LENGTH};
use crate::error::{JceError, Result};
use crate::header::{read_header, Header};
use crate::options::JceOption;
use crate::value::{JceStruct, JceValue, KeyFreezer};

/// Creates a reader with the byte order selected by `option`.
pub fn reader_for(data: &[u8], option: JceOption) -> Reader<'_> {
    Reader::with_endianness(data, option.little_endian())
}

/// Schema-less decoder producing tag-keyed structs.
pub struct GenericDecoder<'r, 'a> {
    reader: &'r mut Reader<'a>,
    option: JceOption,
    depth: usize,
    freezer: KeyFreezer,
}

impl<'r, 'a> GenericDecoder<'r, 'a> {
    /// Decoder at nesting depth zero.
    pub fn new(reader: &'r mut Reader<'a>, option: JceOption) -> Self {
        Self::with_depth(reader, option, 0)
    }

    /// Starts at an existing nesting depth, for decoding inside another
    /// decoder's container.
    pub fn with_depth(reader: &'r mut Reader<'a>, option: JceOption, depth: usize) -> Self {
        Self {
            reader,
            option,
            depth,
            freezer: KeyFreezer::new(),
        }
    }

    /// Current container nesting depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The underlying cursor.
    pub fn reader(&mut self) -> &mut Reader<'a> {
        &mut *self.reader
    }

    /// Flags this decoder was created with.
    pub fn option(&self) -> JceOption {
        self.option
    }

    /// Decodes fields until the input ends.
    ///
    /// A `StructEnd` header at this level stops decoding early and the bytes
    /// after it are left unread.
    pub fn decode(&mut self) -> Result<JceStruct<'a>> {
        let start = self.reader.position();
        debug!(offset = start, len = self.reader.len(), "generic decode start");
        let result = self.decode_fields();
        match &result {
            Ok(fields) => debug!(
                fields = fields.len(),
                consumed = self.reader.position() - start,
                "generic decode done"
            ),
            Err(err) => warn!(error = %err, "generic decode failed"),
        }
        result
    }

    fn decode_fields(&mut self) -> Result<JceStruct<'a>> {
        let mut fields = JceStruct::new();
        while !self.reader.is_eof() {
            let Header { tag, wire_type } = read_header(self.reader)?;
            if wire_type == WireType::StructEnd {
                break;
            }
            let value = self.read_value(wire_type)?;
            fields.insert(tag, value);
        }
        Ok(fields)
    }

    /// Reads fields up to and including the closing `StructEnd`.
    pub fn read_struct_body(&mut self) -> Result<JceStruct<'a>> {
        let mut fields = JceStruct::new();
        loop {
            let Header { tag, wire_type } = read_header(self.reader)?;
            if wire_type == WireType::StructEnd {
                return Ok(fields);
            }
            let value = self.read_value(wire_type)?;
            fields.insert(tag, value);
        }
    }

    /// Reads the payload of a value whose header was already consumed.
    pub fn read_value(&mut self, wire_type: WireType) -> Result<JceValue<'a>> {
        match wire_type {
            WireType::ZeroTag
            | WireType::Int1
            | WireType::Int2
            | WireType::Int4
            | WireType::Int8 => self.read_int(wire_type).map(JceValue::Int),
            WireType::Float => Ok(JceValue::Float(self.reader.try_f32()?)),
            WireType::Double => Ok(JceValue::Double(self.reader.try_f64()?)),
            WireType::String1 | WireType::String4 => {
                let len = self.read_string_length(wire_type)?;
                Ok(JceValue::Bytes(self.read_bytes(len)?))
            }
            WireType::List => {
                self.enter()?;
                let count = self.read_length()?;
                let mut items = Vec::with_capacity(count.min(self.reader.remaining()));
                for _ in 0..count {
                    let header = read_header(self.reader)?;
                    items.push(self.read_value(header.wire_type)?);
                }
                self.leave();
                Ok(JceValue::List(items))
            }
            WireType::Map => {
                self.enter()?;
                let count = self.read_length()?;
                let mut map = IndexMap::with_capacity(count.min(self.reader.remaining()));
                for _ in 0..count {
                    let key_type = self.read_entry_header(0)?;
                    let key = self.read_value(key_type)?;
                    let key = self.freezer.freeze(&key);
                    let value_type = self.read_entry_header(1)?;
                    let value = self.read_value(value_type)?;
                    map.insert(key, value);
                }
                self.leave();
                Ok(JceValue::Map(map))
            }
            WireType::StructBegin => {
                self.enter()?;
                let fields = self.read_struct_body()?;
                self.leave();
                Ok(JceValue::Struct(fields))
            }
            WireType::SimpleList => {
                let len = self.read_simple_list_length()?;
                Ok(JceValue::Bytes(self.read_bytes(len)?))
            }
            WireType::StructEnd => Err(JceError::malformed(
                self.reader.position(),
                "unexpected struct end",
            )),
        }
    }

    /// Reads an integer payload of any integer wire type.
    pub fn read_int(&mut self, wire_type: WireType) -> Result<i64> {
        Ok(match wire_type {
            WireType::ZeroTag => 0,
            WireType::Int1 => i64::from(self.reader.try_i8()?),
            WireType::Int2 => i64::from(self.reader.try_i16()?),
            WireType::Int4 => i64::from(self.reader.try_i32()?),
            WireType::Int8 => self.reader.try_i64()?,
            other => {
                return Err(JceError::malformed(
                    self.reader.position(),
                    format!("expected integer, found {other:?}"),
                ))
            }
        })
    }

    /// Reads a headered container length and checks it against the cap.
    pub fn read_length(&mut self) -> Result<usize> {
        let offset = self.reader.position();
        let header = read_header(self.reader)?;
        let n = self.read_int(header.wire_type)?;
        if !(0..=MAX_CONTAINER_SIZE as i64).contains(&n) {
            return Err(JceError::malformed(
                offset,
                format!("container size {n} outside 0..={MAX_CONTAINER_SIZE}"),
            ));
        }
        Ok(n as usize)
    }

    /// Reads the length prefix of a string payload.
    pub fn read_string_length(&mut self, wire_type: WireType) -> Result<usize> {
        if wire_type == WireType::String1 {
            return Ok(usize::from(self.reader.try_u8()?));
        }
        let offset = self.reader.position();
        let n = self.reader.try_i32()?;
        if !(0..=MAX_STRING_LENGTH as i64).contains(&i64::from(n)) {
            return Err(JceError::malformed(
                offset,
                format!("string length {n} outside 0..={MAX_STRING_LENGTH}"),
            ));
        }
        Ok(n as usize)
    }

    /// Reads the element header and byte count of a simple list.
    pub fn read_simple_list_length(&mut self) -> Result<usize> {
        let offset = self.reader.position();
        let element = read_header(self.reader)?;
        if element.wire_type != WireType::Int1 {
            return Err(JceError::malformed(
                offset,
                format!(
                    "simple list element must be Int1, found {:?}",
                    element.wire_type
                ),
            ));
        }
        self.read_length()
    }

    pub(crate) fn read_entry_header(&mut self, expected: u8) -> Result<WireType> {
        let offset = self.reader.position();
        let header = read_header(self.reader)?;
        if header.tag != expected {
            let role = if expected == 0 { "key" } else { "value" };
            return Err(JceError::malformed(
                offset,
                format!(
                    "map {role} must have tag {expected}, found {}",
                    header.tag
                ),
            ));
        }
        Ok(header.wire_type)
    }

    fn read_bytes(&mut self, len: usize) -> Result<Cow<'a, [u8]>> {
        Ok(self.reader.bytes(len as i64, self.option.zero_copy())?)
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(JceError::RecursionLimit { limit: MAX_DEPTH });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Consumes a value without building it.
    ///
    /// Applies the same checks as [`GenericDecoder::read_value`], so a value
    /// that skips cleanly also decodes cleanly.
    pub fn skip_value(&mut self, wire_type: WireType) -> Result<()> {
        match wire_type {
            WireType::ZeroTag => {}
            WireType::Int1 => self.reader.skip(1)?,
            WireType::Int2 => self.reader.skip(2)?,
            WireType::Int4 | WireType::Float => self.reader.skip(4)?,
            WireType::Int8 | WireType::Double => self.reader.skip(8)?,
            WireType::String1 | WireType::String4 => {
                let len = self.read_string_length(wire_type)?;
                self.reader.skip(len as i64)?;
            }
            WireType::List => {
                self.enter()?;
                let count = self.read_length()?;
                for _ in 0..count {
                    let header = read_header(self.reader)?;
                    self.skip_value(header.wire_type)?;
                }
                self.leave();
            }
            WireType::Map => {
                self.enter()?;
                let count = self.read_length()?;
                for _ in 0..count {
                    let key_type = self.read_entry_header(0)?;
                    self.skip_value(key_type)?;
                    let value_type = self.read_entry_header(1)?;
                    self.skip_value(value_type)?;
                }
                self.leave();
            }
            WireType::StructBegin => {
                self.enter()?;
                self.skip_struct_body()?;
                self.leave();
            }
            WireType::SimpleList => {
                let len = self.read_simple_list_length()?;
                self.reader.skip(len as i64)?;
            }
            WireType::StructEnd => {
                return Err(JceError::malformed(
                    self.reader.position(),
                    "unexpected struct end",
                ))
            }
        }
        Ok(())
    }

    /// Skips fields up to and including the closing `StructEnd`.
    pub fn skip_struct_body(&mut self) -> Result<()> {
        loop {
            let header = read_header(self.reader)?;
            if header.wire_type == WireType::StructEnd {
                return Ok(());
            }
            self.skip_value(header.wire_type)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::JceKey;

    fn decode(data: &[u8]) -> Result<JceStruct<'_>> {
        let mut reader = Reader::new(data);
        GenericDecoder::new(&mut reader, JceOption::NONE).decode()
    }

    fn bytes(v: &[u8]) -> JceValue<'static> {
        JceValue::Bytes(Cow::Owned(v.to_vec()))
    }

    #[test]
    fn decodes_scalars() {
        let data = [
            0x00, 0x7b, // tag 0 Int1 123
            0x11, 0xff, 0x38, // tag 1 Int2 -200
            0x2c, // tag 2 ZeroTag
            0x36, 0x02, b'h', b'i', // tag 3 String1 "hi"
        ];
        let fields = decode(&data).unwrap();
        assert_eq!(fields[&0], JceValue::Int(123));
        assert_eq!(fields[&1], JceValue::Int(-200));
        assert_eq!(fields[&2], JceValue::Int(0));
        assert_eq!(fields[&3], bytes(b"hi"));
    }

    #[test]
    fn little_endian_ints() {
        let data = [0x01, 0x38, 0xff];
        let mut reader = reader_for(&data, JceOption::LITTLE_ENDIAN);
        let fields = GenericDecoder::new(&mut reader, JceOption::LITTLE_ENDIAN)
            .decode()
            .unwrap();
        assert_eq!(fields[&0], JceValue::Int(-200));
    }

    #[test]
    fn decodes_list_map_struct() {
        let data = [
            0x09, 0x00, 0x02, 0x00, 0x01, 0x00, 0x02, // tag 0 list [1, 2]
            0x18, 0x00, 0x01, 0x06, 0x01, b'k', 0x10, 0x05, // tag 1 map {"k": 5}
            0x2a, 0x00, 0x09, 0x0b, // tag 2 struct {0: 9}
        ];
        let fields = decode(&data).unwrap();
        assert_eq!(
            fields[&0],
            JceValue::List(vec![JceValue::Int(1), JceValue::Int(2)])
        );
        let map = fields[&1].as_map().unwrap();
        assert_eq!(map[&JceKey::Bytes(b"k".to_vec())], JceValue::Int(5));
        let inner = fields[&2].as_struct().unwrap();
        assert_eq!(inner[&0], JceValue::Int(9));
    }

    #[test]
    fn last_write_wins() {
        let data = [0x00, 0x01, 0x00, 0x02];
        let fields = decode(&data).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[&0], JceValue::Int(2));
    }

    #[test]
    fn top_level_struct_end_stops() {
        let data = [0x00, 0x01, 0x0b, 0x10, 0x02];
        let fields = decode(&data).unwrap();
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn simple_list() {
        let data = [0x0d, 0x00, 0x00, 0x03, b'a', b'b', b'c'];
        let fields = decode(&data).unwrap();
        assert_eq!(fields[&0], bytes(b"abc"));
    }

    #[test]
    fn simple_list_element_type_checked() {
        let data = [0x0d, 0x01, 0x00, 0x01, 0x00];
        assert!(matches!(decode(&data), Err(JceError::Malformed(_))));
    }

    #[test]
    fn zero_copy_borrows() {
        let data = [0x06, 0x02, b'h', b'i'];
        let mut reader = Reader::new(&data);
        let fields = GenericDecoder::new(&mut reader, JceOption::ZERO_COPY)
            .decode()
            .unwrap();
        assert!(matches!(fields[&0], JceValue::Bytes(Cow::Borrowed(_))));
    }

    #[test]
    fn map_tag_mismatch() {
        let data = [0x08, 0x00, 0x01, 0x20, 0x01, 0x10, 0x02];
        let err = decode(&data).unwrap_err();
        assert!(matches!(err, JceError::Malformed(ref f) if f.reason.contains("key")));
    }

    #[test]
    fn negative_container_size() {
        let data = [0x09, 0x00, 0xff];
        assert!(matches!(decode(&data), Err(JceError::Malformed(_))));
    }

    #[test]
    fn non_integer_length() {
        let data = [0x09, 0x06, 0x00];
        assert!(matches!(decode(&data), Err(JceError::Malformed(_))));
    }

    #[test]
    fn truncated_is_partial() {
        let data = [0x02, 0x00, 0x00];
        assert!(matches!(decode(&data), Err(JceError::PartialData(_))));
    }

    #[test]
    fn unterminated_struct_is_partial() {
        let data = [0x0a, 0x00, 0x01];
        assert!(matches!(decode(&data), Err(JceError::PartialData(_))));
    }

    #[test]
    fn stray_struct_end_in_list() {
        let data = [0x09, 0x00, 0x01, 0x0b];
        assert!(matches!(decode(&data), Err(JceError::Malformed(_))));
    }

    #[test]
    fn skip_consumes_same_bytes_as_read() {
        let data = [
            0x09, 0x00, 0x02, 0x0a, 0x06, 0x01, b'x', 0x0b, 0x0c, // list [struct, 0]
            0x10, 0x07, // trailing field
        ];
        let mut reader = Reader::new(&data);
        let mut decoder = GenericDecoder::new(&mut reader, JceOption::NONE);
        let header = read_header(decoder.reader()).unwrap();
        decoder.skip_value(header.wire_type).unwrap();
        assert_eq!(decoder.reader().position(), 9);
        assert_eq!(decoder.depth(), 0);
    }

    #[test]
    fn skip_checks_map_tags() {
        let data = [0x08, 0x00, 0x01, 0x00, 0x01, 0x00, 0x02];
        let mut reader = Reader::new(&data);
        let mut decoder = GenericDecoder::new(&mut reader, JceOption::NONE);
        let header = read_header(decoder.reader()).unwrap();
        assert!(matches!(
            decoder.skip_value(header.wire_type),
            Err(JceError::Malformed(_))
        ));
    }

    #[test]
    fn depth_limit() {
        let nested = |n: usize| {
            let mut data = vec![0x0a; n];
            data.extend(std::iter::repeat(0x0b).take(n));
            data
        };
        assert!(decode(&nested(MAX_DEPTH)).is_ok());
        assert_eq!(
            decode(&nested(MAX_DEPTH + 1)),
            Err(JceError::RecursionLimit { limit: MAX_DEPTH })
        );
    }
}
