//! Schemas: named, typed fields bound to wire tags, plus per-field hooks.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{JceError, Result};
use crate::options::JceOption;
use crate::value::{Fields, JceValue};

/// Declared type of a schema field.
#[derive(Debug, Clone)]
pub enum FieldType {
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    String,
    Bytes,
    List(Box<FieldType>),
    Map(Box<FieldType>, Box<FieldType>),
    Struct(Arc<Schema>),
    /// Any wire value; byte payloads go through the classifier.
    Any,
}

impl FieldType {
    pub fn list(inner: FieldType) -> Self {
        FieldType::List(Box::new(inner))
    }

    pub fn map(key: FieldType, value: FieldType) -> Self {
        FieldType::Map(Box::new(key), Box::new(value))
    }

    /// Inclusive integer range for the sized integer types.
    pub fn int_range(&self) -> Option<(i64, i64)> {
        match self {
            FieldType::Byte => Some((i64::from(i8::MIN), i64::from(i8::MAX))),
            FieldType::Short => Some((i64::from(i16::MIN), i64::from(i16::MAX))),
            FieldType::Int => Some((i64::from(i32::MIN), i64::from(i32::MAX))),
            FieldType::Long => Some((i64::MIN, i64::MAX)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub tag: u8,
    pub ty: FieldType,
    pub default: Option<JceValue<'static>>,
}

/// What a deserialize hook is told about the field it runs for.
#[derive(Debug, Clone, Copy)]
pub struct DeserializationInfo<'c> {
    pub option: JceOption,
    pub context: &'c Map<String, Value>,
    pub field_name: &'c str,
    pub tag: u8,
}

/// What a serialize hook is told about the field it runs for.
#[derive(Debug, Clone, Copy)]
pub struct SerializationInfo<'c> {
    pub option: JceOption,
    pub context: &'c Map<String, Value>,
    pub field_name: &'c str,
    pub tag: u8,
}

/// Replaces a decoded field value.
pub type DeserializeHook = Arc<
    dyn for<'a> Fn(JceValue<'a>, &DeserializationInfo<'_>) -> Result<JceValue<'a>> + Send + Sync,
>;

/// Produces the value to write for a field. The result is encoded
/// generically, without consulting the field type.
pub type SerializeHook =
    Arc<dyn Fn(&JceValue<'_>, &SerializationInfo<'_>) -> Result<JceValue<'static>> + Send + Sync>;

/// An immutable, validated set of fields.
pub struct Schema {
    name: String,
    fields: Vec<Field>,
    by_tag: HashMap<u8, usize>,
    deserializers: HashMap<String, DeserializeHook>,
    serializers: HashMap<String, SerializeHook>,
}

impl Schema {
    /// Starts a schema for the record called `name`.
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
            deserializers: HashMap::new(),
            serializers: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Field declared at `tag`, if any.
    pub fn field_by_tag(&self, tag: u8) -> Option<&Field> {
        self.by_tag.get(&tag).map(|&i| &self.fields[i])
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Hook applied after decoding the named field.
    pub fn deserializer(&self, name: &str) -> Option<&DeserializeHook> {
        self.deserializers.get(name)
    }

    /// Hook applied before encoding the named field.
    pub fn serializer(&self, name: &str) -> Option<&SerializeHook> {
        self.serializers.get(name)
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut hooked: Vec<&String> = self
            .deserializers
            .keys()
            .chain(self.serializers.keys())
            .collect();
        hooked.sort();
        hooked.dedup();
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("hooked", &hooked)
            .finish()
    }
}

/// Collects fields and hooks; [`build`](Self::build) validates them.
pub struct SchemaBuilder {
    name: String,
    fields: Vec<Field>,
    deserializers: HashMap<String, DeserializeHook>,
    serializers: HashMap<String, SerializeHook>,
}

impl SchemaBuilder {
    /// Declares a field with no default.
    pub fn field(self, name: impl Into<String>, tag: u8, ty: FieldType) -> Self {
        self.push(name.into(), tag, ty, None)
    }

    pub fn field_with_default(
        self,
        name: impl Into<String>,
        tag: u8,
        ty: FieldType,
        default: impl Into<JceValue<'static>>,
    ) -> Self {
        self.push(name.into(), tag, ty, Some(default.into()))
    }

    fn push(mut self, name: String, tag: u8, ty: FieldType, default: Option<JceValue<'static>>) -> Self {
        self.fields.push(Field {
            name,
            tag,
            ty,
            default,
        });
        self
    }

    pub fn on_deserialize<F>(mut self, field: impl Into<String>, hook: F) -> Self
    where
        F: for<'a> Fn(JceValue<'a>, &DeserializationInfo<'_>) -> Result<JceValue<'a>>
            + Send
            + Sync
            + 'static,
    {
        self.deserializers.insert(field.into(), Arc::new(hook));
        self
    }

    pub fn on_serialize<F>(mut self, field: impl Into<String>, hook: F) -> Self
    where
        F: Fn(&JceValue<'_>, &SerializationInfo<'_>) -> Result<JceValue<'static>>
            + Send
            + Sync
            + 'static,
    {
        self.serializers.insert(field.into(), Arc::new(hook));
        self
    }

    /// Validates the fields and freezes the schema.
    ///
    /// Fails on duplicate tags, duplicate names, or hooks registered for
    /// fields that do not exist.
    pub fn build(self) -> Result<Arc<Schema>> {
        let mut by_tag = HashMap::with_capacity(self.fields.len());
        for (i, field) in self.fields.iter().enumerate() {
            if let Some(&prev) = by_tag.get(&field.tag) {
                let prev: &Field = &self.fields[prev];
                return Err(JceError::Configuration(format!(
                    "schema {}: tag {} used by both {:?} and {:?}",
                    self.name, field.tag, prev.name, field.name
                )));
            }
            if self.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(JceError::Configuration(format!(
                    "schema {}: duplicate field name {:?}",
                    self.name, field.name
                )));
            }
            by_tag.insert(field.tag, i);
        }
        for name in self.deserializers.keys().chain(self.serializers.keys()) {
            if !self.fields.iter().any(|f| &f.name == name) {
                return Err(JceError::Configuration(format!(
                    "schema {}: hook registered for unknown field {:?}",
                    self.name, name
                )));
            }
        }
        Ok(Arc::new(Schema {
            name: self.name,
            fields: self.fields,
            by_tag,
            deserializers: self.deserializers,
            serializers: self.serializers,
        }))
    }
}

/// A Rust type bound to a schema.
pub trait JceRecord: Sized {
    fn schema() -> Arc<Schema>;

    /// Builds the record from schema-decoded fields.
    fn from_fields(fields: Fields<'_>) -> Result<Self>;

    /// Field values to encode. Fields left out count as unset.
    fn to_fields(&self) -> Fields<'_>;
}

/// Looks up a field a record cannot be built without.
pub fn required<'f, 'a>(fields: &'f Fields<'a>, name: &str) -> Result<&'f JceValue<'a>> {
    fields
        .get(name)
        .ok_or_else(|| JceError::Configuration(format!("missing field {name:?}")))
}
