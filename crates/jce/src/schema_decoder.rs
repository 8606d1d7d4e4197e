//! `SchemaDecoder` — decodes wire tags into the named fields of a [`Schema`].

use std::borrow::Cow;

use jce_buffers::Reader;
use tracing::{debug, warn};

use crate::classify::classify;
use crate::config::JceConfig;
use crate::constants::{WireType, MAX_DEPTH};
use crate::decoder::GenericDecoder;
use crate::error::{JceError, Result};
use crate::header::read_header;
use crate::schema::{DeserializationInfo, Field, FieldType, JceRecord, Schema};
use crate::value::{Fields, JceKey, JceValue};

/// Key used when a list-of-structs element is not a struct.
pub const RAW_VALUE_KEY: &str = "_raw_value";

/// Decoder that maps wire tags onto a schema's named fields.
pub struct SchemaDecoder<'r, 'a, 'c> {
    reader: &'r mut Reader<'a>,
    config: &'c JceConfig,
    depth: usize,
}

impl<'r, 'a, 'c> SchemaDecoder<'r, 'a, 'c> {
    pub fn new(reader: &'r mut Reader<'a>, config: &'c JceConfig) -> Self {
        Self {
            reader,
            config,
            depth: 0,
        }
    }

    /// Decodes the top-level fields of `schema`.
    ///
    /// Unknown tags are skipped. Fields that did not appear on the wire but
    /// declare a default are filled with it.
    pub fn decode_to_fields(&mut self, schema: &Schema) -> Result<Fields<'a>> {
        let start = self.reader.position();
        debug!(schema = schema.name(), offset = start, "schema decode start");
        let result = self.read_fields(schema, false);
        match &result {
            Ok(fields) => debug!(
                schema = schema.name(),
                fields = fields.len(),
                consumed = self.reader.position() - start,
                "schema decode done"
            ),
            Err(err) => warn!(schema = schema.name(), error = %err, "schema decode failed"),
        }
        result
    }

    /// Decodes and binds a record type.
    pub fn decode_record<T: JceRecord>(&mut self) -> Result<T> {
        let schema = T::schema();
        let fields = self.decode_to_fields(&schema)?;
        T::from_fields(fields)
    }

    fn generic(&mut self) -> GenericDecoder<'_, 'a> {
        GenericDecoder::with_depth(&mut *self.reader, self.config.option, self.depth)
    }

    fn read_fields(&mut self, schema: &Schema, nested: bool) -> Result<Fields<'a>> {
        let mut fields = Fields::new();
        loop {
            if !nested && self.reader.is_eof() {
                break;
            }
            let header = read_header(self.reader)?;
            if header.wire_type == WireType::StructEnd {
                break;
            }
            let Some(field) = schema.field_by_tag(header.tag) else {
                debug!(
                    schema = schema.name(),
                    tag = header.tag,
                    wire_type = ?header.wire_type,
                    "skipping unknown tag"
                );
                self.generic().skip_value(header.wire_type)?;
                continue;
            };
            let value = self
                .read_field(field, header.wire_type)
                .and_then(|value| self.run_hook(schema, field, value))
                .map_err(|err| err.with_field(&field.name))?;
            fields.insert(field.name.clone(), value);
        }
        for field in schema.fields() {
            if let Some(default) = &field.default {
                if !fields.contains_key(&field.name) {
                    fields.insert(field.name.clone(), default.clone());
                }
            }
        }
        Ok(fields)
    }

    fn run_hook(&self, schema: &Schema, field: &Field, value: JceValue<'a>) -> Result<JceValue<'a>> {
        match schema.deserializer(&field.name) {
            Some(hook) => {
                let info = DeserializationInfo {
                    option: self.config.option,
                    context: &self.config.context,
                    field_name: &field.name,
                    tag: field.tag,
                };
                hook(value, &info)
            }
            None => Ok(value),
        }
    }

    fn read_field(&mut self, field: &Field, wire_type: WireType) -> Result<JceValue<'a>> {
        if let (FieldType::List(inner), WireType::List) = (&field.ty, wire_type) {
            if let FieldType::Struct(schema) = inner.as_ref() {
                return self.struct_list(schema);
            }
        }
        match (&field.ty, wire_type) {
            (FieldType::Struct(schema), WireType::StructBegin) => {
                self.nested_record(schema).map(JceValue::Record)
            }
            (FieldType::Any, _) => {
                let value = self.generic().read_value(wire_type)?;
                Ok(classify(value, self.config.bytes_mode, self.config.option))
            }
            (ty, _) => {
                let value = self.generic().read_value(wire_type)?;
                Ok(coerce(ty, value))
            }
        }
    }

    fn nested_record(&mut self, schema: &Schema) -> Result<Fields<'a>> {
        self.enter()?;
        let fields = SchemaDecoder {
            reader: &mut *self.reader,
            config: self.config,
            depth: self.depth,
        }
        .read_fields(schema, true)?;
        self.depth -= 1;
        Ok(fields)
    }

    fn struct_list(&mut self, schema: &Schema) -> Result<JceValue<'a>> {
        self.enter()?;
        let count = self.generic().read_length()?;
        let mut items = Vec::with_capacity(count.min(self.reader.remaining()));
        for _ in 0..count {
            let header = read_header(self.reader)?;
            let item = if header.wire_type == WireType::StructBegin {
                JceValue::Record(self.nested_record(schema)?)
            } else {
                let value = self.generic().read_value(header.wire_type)?;
                remap_element(schema, value)
            };
            items.push(item);
        }
        self.depth -= 1;
        Ok(JceValue::List(items))
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(JceError::RecursionLimit { limit: MAX_DEPTH });
        }
        Ok(())
    }
}

/// Best-effort mapping of a list element that was not a struct on the wire.
fn remap_element<'a>(schema: &Schema, value: JceValue<'a>) -> JceValue<'a> {
    match value {
        JceValue::Struct(_) => coerce_struct(schema, value),
        other => {
            let mut record = Fields::new();
            record.insert(RAW_VALUE_KEY.to_string(), other);
            JceValue::Record(record)
        }
    }
}

/// Shapes a generically decoded value after its declared type.
///
/// Wire strings under a `String` type become text, tag-keyed structs under a
/// `Struct` type become records. Anything that does not line up is left as
/// decoded.
fn coerce<'a>(ty: &FieldType, value: JceValue<'a>) -> JceValue<'a> {
    match (ty, value) {
        (FieldType::String, value) => lenient_text(value),
        (FieldType::List(inner), JceValue::List(items)) => {
            JceValue::List(items.into_iter().map(|item| coerce(inner, item)).collect())
        }
        (FieldType::Map(key_ty, value_ty), JceValue::Map(map)) => JceValue::Map(
            map.into_iter()
                .map(|(k, v)| {
                    let k = match (key_ty.as_ref(), k) {
                        (FieldType::String, JceKey::Bytes(b)) => match String::from_utf8(b) {
                            Ok(s) => JceKey::Str(s),
                            Err(err) => JceKey::Bytes(err.into_bytes()),
                        },
                        (_, k) => k,
                    };
                    (k, coerce(value_ty, v))
                })
                .collect(),
        ),
        (FieldType::Struct(schema), value @ JceValue::Struct(_)) => coerce_struct(schema, value),
        (_, value) => value,
    }
}

/// Valid UTF-8 becomes text. Anything else stays bytes.
fn lenient_text(value: JceValue<'_>) -> JceValue<'_> {
    match value {
        JceValue::Bytes(Cow::Borrowed(data)) => match std::str::from_utf8(data) {
            Ok(text) => JceValue::Str(Cow::Borrowed(text)),
            Err(_) => JceValue::Bytes(Cow::Borrowed(data)),
        },
        JceValue::Bytes(Cow::Owned(data)) => match String::from_utf8(data) {
            Ok(text) => JceValue::Str(Cow::Owned(text)),
            Err(err) => JceValue::Bytes(Cow::Owned(err.into_bytes())),
        },
        other => other,
    }
}

/// Renames known tags after their fields. Unknown tags are keyed by their
/// decimal string.
fn coerce_struct<'a>(schema: &Schema, value: JceValue<'a>) -> JceValue<'a> {
    let JceValue::Struct(tagged) = value else {
        return value;
    };
    let mut record = Fields::new();
    for (tag, v) in tagged {
        match schema.field_by_tag(tag) {
            Some(field) => {
                record.insert(field.name.clone(), coerce(&field.ty, v));
            }
            None => {
                record.insert(tag.to_string(), v);
            }
        }
    }
    JceValue::Record(record)
}
