//! Schema-driven encoding of name-keyed records.

use tracing::debug;

use crate::config::JceConfig;
use crate::encoder::JceEncoder;
use crate::error::{JceError, Result};
use crate::options::JceOption;
use crate::schema::{FieldType, Schema, SerializationInfo};
use crate::value::{Fields, JceValue};

/// Encodes `fields` as the top-level fields of `schema`.
///
/// Fields are written in schema order. A field missing from `fields` is
/// unset: it is dropped under `EXCLUDE_UNSET`, otherwise its default is
/// written (or nothing, if it has none). Under `OMIT_DEFAULT` values equal
/// to the field default are dropped.
pub fn encode_record(schema: &Schema, fields: &Fields<'_>, config: &JceConfig) -> Result<Vec<u8>> {
    let mut encoder = JceEncoder::new(config.option);
    SchemaEncoder {
        encoder: &mut encoder,
        config,
    }
    .write_record(schema, fields)?;
    let out = encoder.finish();
    debug!(schema = schema.name(), len = out.len(), "encoded record");
    Ok(out)
}

struct SchemaEncoder<'e, 'c> {
    encoder: &'e mut JceEncoder,
    config: &'c JceConfig,
}

impl SchemaEncoder<'_, '_> {
    fn write_record(&mut self, schema: &Schema, fields: &Fields<'_>) -> Result<()> {
        let option = self.config.option;
        for field in schema.fields() {
            let value: &JceValue<'_> = match (fields.get(&field.name), &field.default) {
                (Some(value), _) => value,
                (None, _) if option.contains(JceOption::EXCLUDE_UNSET) => continue,
                (None, Some(default)) => default,
                (None, None) => continue,
            };
            if option.contains(JceOption::OMIT_DEFAULT) && field.default.as_ref() == Some(value) {
                continue;
            }
            let written = match schema.serializer(&field.name) {
                Some(hook) => {
                    let info = SerializationInfo {
                        option,
                        context: &self.config.context,
                        field_name: &field.name,
                        tag: field.tag,
                    };
                    hook(value, &info).and_then(|out| self.encoder.write_value(field.tag, &out))
                }
                None => self.write_typed(field.tag, &field.ty, value),
            };
            written.map_err(|err| err.with_field(&field.name))?;
        }
        Ok(())
    }

    fn write_typed(&mut self, tag: u8, ty: &FieldType, value: &JceValue<'_>) -> Result<()> {
        match (ty, value) {
            (FieldType::Any, _) => self.encoder.write_value(tag, value),
            (FieldType::Byte | FieldType::Short | FieldType::Int | FieldType::Long, JceValue::Int(i)) => {
                if let Some((min, max)) = ty.int_range() {
                    if !(min..=max).contains(i) {
                        return Err(JceError::unencodable(format!(
                            "{i} does not fit in {ty:?}"
                        )));
                    }
                }
                self.encoder.write_int(tag, *i);
                Ok(())
            }
            (FieldType::Float, JceValue::Float(f)) => {
                self.encoder.write_float(tag, *f);
                Ok(())
            }
            (FieldType::Float, JceValue::Double(d)) => {
                self.encoder.write_float(tag, *d as f32);
                Ok(())
            }
            (FieldType::Float, JceValue::Int(i)) => {
                self.encoder.write_float(tag, *i as f32);
                Ok(())
            }
            (FieldType::Double, JceValue::Float(f)) => {
                self.encoder.write_double(tag, f64::from(*f));
                Ok(())
            }
            (FieldType::Double, JceValue::Double(d)) => {
                self.encoder.write_double(tag, *d);
                Ok(())
            }
            (FieldType::Double, JceValue::Int(i)) => {
                self.encoder.write_double(tag, *i as f64);
                Ok(())
            }
            (FieldType::String, JceValue::Str(s)) => self.encoder.write_string(tag, s.as_bytes()),
            (FieldType::String, JceValue::Bytes(b)) => self.encoder.write_string(tag, b),
            (FieldType::Bytes, JceValue::Bytes(b)) => self.encoder.write_bytes(tag, b),
            (FieldType::Bytes, JceValue::Str(s)) => self.encoder.write_bytes(tag, s.as_bytes()),
            (FieldType::Bytes, JceValue::Struct(_) | JceValue::List(_) | JceValue::Map(_)) => {
                let blob = JceEncoder::new(self.config.option).encode(value)?;
                self.encoder.write_bytes(tag, &blob)
            }
            (FieldType::List(inner), JceValue::List(items)) => {
                self.encoder.begin_list(tag, items.len())?;
                for item in items {
                    self.write_typed(0, inner, item)?;
                }
                Ok(())
            }
            (FieldType::Map(key_ty, value_ty), JceValue::Map(map)) => {
                self.encoder.begin_map(tag, map.len())?;
                for (key, item) in map {
                    self.write_typed(0, key_ty, &key.to_value())?;
                    self.write_typed(1, value_ty, item)?;
                }
                Ok(())
            }
            (FieldType::Struct(schema), JceValue::Record(fields)) => {
                self.encoder.begin_struct(tag);
                self.write_record(schema, fields)?;
                self.encoder.end_struct();
                Ok(())
            }
            (FieldType::Struct(_), JceValue::Struct(_)) => self.encoder.write_value(tag, value),
            _ => Err(JceError::unencodable(format!(
                "{} value does not match field type {}",
                value.type_name(),
                type_label(ty)
            ))),
        }
    }
}

fn type_label(ty: &FieldType) -> String {
    match ty {
        FieldType::Struct(schema) => format!("struct {}", schema.name()),
        FieldType::List(inner) => format!("list<{}>", type_label(inner)),
        FieldType::Map(k, v) => format!("map<{}, {}>", type_label(k), type_label(v)),
        other => format!("{other:?}").to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn user() -> Arc<Schema> {
        Schema::builder("User")
            .field("id", 0, FieldType::Int)
            .field_with_default("name", 1, FieldType::String, "anon")
            .field_with_default("level", 2, FieldType::Byte, 1i64)
            .build()
            .unwrap()
    }

    fn fields(pairs: &[(&str, JceValue<'static>)]) -> Fields<'static> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn writes_in_schema_order_with_defaults() {
        let out = encode_record(
            &user(),
            &fields(&[("level", JceValue::Int(3)), ("id", JceValue::Int(7))]),
            &JceConfig::new(),
        )
        .unwrap();
        assert_eq!(
            out,
            [0x00, 0x07, 0x16, 0x04, b'a', b'n', b'o', b'n', 0x20, 0x03]
        );
    }

    #[test]
    fn exclude_unset_drops_missing_fields() {
        let config = JceConfig::new().with_option(JceOption::EXCLUDE_UNSET);
        let out = encode_record(&user(), &fields(&[("id", JceValue::Int(7))]), &config).unwrap();
        assert_eq!(out, [0x00, 0x07]);
    }

    #[test]
    fn omit_default_drops_default_values() {
        let config = JceConfig::new().with_option(JceOption::OMIT_DEFAULT);
        let out = encode_record(
            &user(),
            &fields(&[("id", JceValue::Int(7)), ("name", JceValue::from("anon"))]),
            &config,
        )
        .unwrap();
        assert_eq!(out, [0x00, 0x07]);
    }

    #[test]
    fn out_of_range_int_names_field() {
        let err = encode_record(
            &user(),
            &fields(&[("id", JceValue::Int(1)), ("level", JceValue::Int(500))]),
            &JceConfig::new(),
        )
        .unwrap_err();
        assert!(matches!(err, JceError::Unencodable(_)));
        assert_eq!(err.loc(), ["level".to_string()]);
    }

    #[test]
    fn type_mismatch_is_unencodable() {
        let err = encode_record(
            &user(),
            &fields(&[("id", JceValue::from("seven"))]),
            &JceConfig::new(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("does not match field type int"));
    }

    #[test]
    fn bytes_field_holding_struct_becomes_blob() {
        let schema = Schema::builder("Envelope")
            .field("body", 0, FieldType::Bytes)
            .build()
            .unwrap();
        let mut inner = crate::value::JceStruct::new();
        inner.insert(0, JceValue::Int(5));
        let out = encode_record(
            &schema,
            &fields(&[("body", JceValue::Struct(inner))]),
            &JceConfig::new(),
        )
        .unwrap();
        assert_eq!(out, [0x0d, 0x00, 0x00, 0x02, 0x00, 0x05]);
    }

    #[test]
    fn serialize_hook_output_is_encoded_generically() {
        let schema = Schema::builder("H")
            .field("when", 0, FieldType::Long)
            .on_serialize("when", |value, info| {
                assert_eq!(info.field_name, "when");
                Ok(JceValue::from(format!("t={}", value.as_int().unwrap_or(0))))
            })
            .build()
            .unwrap();
        let out = encode_record(
            &schema,
            &fields(&[("when", JceValue::Int(9))]),
            &JceConfig::new(),
        )
        .unwrap();
        assert_eq!(out, [0x06, 0x03, b't', b'=', b'9']);
    }

    #[test]
    fn nested_record_is_struct() {
        let outer = Schema::builder("Team")
            .field("lead", 0, FieldType::Struct(user()))
            .build()
            .unwrap();
        let lead = fields(&[("id", JceValue::Int(1))]);
        let config = JceConfig::new().with_option(JceOption::EXCLUDE_UNSET);
        let out = encode_record(
            &outer,
            &fields(&[("lead", JceValue::Record(lead))]),
            &config,
        )
        .unwrap();
        assert_eq!(out, [0x0a, 0x00, 0x01, 0x0b]);
    }
}
