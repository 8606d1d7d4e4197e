//! `JceValue` — the decoded value tree, and `JceKey`, its hashable map-key form.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use indexmap::IndexMap;

/// Tag-keyed struct body. Wire order is kept; a repeated tag overwrites.
pub type JceStruct<'a> = IndexMap<u8, JceValue<'a>>;

/// Name-keyed record produced by schema decoding.
pub type Fields<'a> = IndexMap<String, JceValue<'a>>;

/// A decoded JCE value.
///
/// Byte payloads and strings are `Cow`s: with zero-copy decoding they
/// borrow from the input, otherwise they own their data. Wire strings decode
/// as [`JceValue::Bytes`]; [`JceValue::Str`] comes from the classifier, from
/// string-typed schema fields, or from callers building values to encode.
#[derive(Debug, Clone, PartialEq)]
pub enum JceValue<'a> {
    Int(i64),
    Float(f32),
    Double(f64),
    Bytes(Cow<'a, [u8]>),
    Str(Cow<'a, str>),
    List(Vec<JceValue<'a>>),
    Map(IndexMap<JceKey, JceValue<'a>>),
    Struct(JceStruct<'a>),
    Record(Fields<'a>),
}

impl<'a> JceValue<'a> {
    /// Detaches the value from the input buffer.
    pub fn into_owned(self) -> JceValue<'static> {
        match self {
            JceValue::Int(i) => JceValue::Int(i),
            JceValue::Float(f) => JceValue::Float(f),
            JceValue::Double(d) => JceValue::Double(d),
            JceValue::Bytes(b) => JceValue::Bytes(Cow::Owned(b.into_owned())),
            JceValue::Str(s) => JceValue::Str(Cow::Owned(s.into_owned())),
            JceValue::List(items) => {
                JceValue::List(items.into_iter().map(JceValue::into_owned).collect())
            }
            JceValue::Map(map) => JceValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, v.into_owned()))
                    .collect(),
            ),
            JceValue::Struct(fields) => JceValue::Struct(
                fields
                    .into_iter()
                    .map(|(tag, v)| (tag, v.into_owned()))
                    .collect(),
            ),
            JceValue::Record(fields) => JceValue::Record(
                fields
                    .into_iter()
                    .map(|(name, v)| (name, v.into_owned()))
                    .collect(),
            ),
        }
    }

    /// Variant name, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            JceValue::Int(_) => "int",
            JceValue::Float(_) => "float",
            JceValue::Double(_) => "double",
            JceValue::Bytes(_) => "bytes",
            JceValue::Str(_) => "string",
            JceValue::List(_) => "list",
            JceValue::Map(_) => "map",
            JceValue::Struct(_) => "struct",
            JceValue::Record(_) => "record",
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            JceValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Floats of either width, widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            JceValue::Float(f) => Some(f64::from(*f)),
            JceValue::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            JceValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            JceValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[JceValue<'a>]> {
        match self {
            JceValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<JceKey, JceValue<'a>>> {
        match self {
            JceValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&JceStruct<'a>> {
        match self {
            JceValue::Struct(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_fields(&self) -> Option<&Fields<'a>> {
        match self {
            JceValue::Record(fields) => Some(fields),
            _ => None,
        }
    }
}

impl From<i64> for JceValue<'_> {
    fn from(v: i64) -> Self {
        JceValue::Int(v)
    }
}

impl From<i32> for JceValue<'_> {
    fn from(v: i32) -> Self {
        JceValue::Int(i64::from(v))
    }
}

impl From<bool> for JceValue<'_> {
    fn from(v: bool) -> Self {
        JceValue::Int(i64::from(v))
    }
}

impl From<f32> for JceValue<'_> {
    fn from(v: f32) -> Self {
        JceValue::Float(v)
    }
}

impl From<f64> for JceValue<'_> {
    fn from(v: f64) -> Self {
        JceValue::Double(v)
    }
}

impl<'a> From<&'a str> for JceValue<'a> {
    fn from(v: &'a str) -> Self {
        JceValue::Str(Cow::Borrowed(v))
    }
}

impl From<String> for JceValue<'_> {
    fn from(v: String) -> Self {
        JceValue::Str(Cow::Owned(v))
    }
}

impl<'a> From<&'a [u8]> for JceValue<'a> {
    fn from(v: &'a [u8]) -> Self {
        JceValue::Bytes(Cow::Borrowed(v))
    }
}

impl From<Vec<u8>> for JceValue<'_> {
    fn from(v: Vec<u8>) -> Self {
        JceValue::Bytes(Cow::Owned(v))
    }
}

impl<'a> From<Vec<JceValue<'a>>> for JceValue<'a> {
    fn from(v: Vec<JceValue<'a>>) -> Self {
        JceValue::List(v)
    }
}

impl<'a> From<JceStruct<'a>> for JceValue<'a> {
    fn from(v: JceStruct<'a>) -> Self {
        JceValue::Struct(v)
    }
}

impl<'a> From<Fields<'a>> for JceValue<'a> {
    fn from(v: Fields<'a>) -> Self {
        JceValue::Record(v)
    }
}

/// Hashable, totally ordered form of a map key.
///
/// Floats compare by bit pattern. Lists freeze to `Tuple`; structs, maps and
/// records freeze to `Pairs` sorted by key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JceKey {
    Int(i64),
    Float(u32),
    Double(u64),
    Bytes(Vec<u8>),
    Str(String),
    Tuple(Arc<[JceKey]>),
    Pairs(Arc<[(JceKey, JceKey)]>),
}

impl JceKey {
    /// Thaws the key back into a value. Frozen structs come back as maps.
    pub fn to_value(&self) -> JceValue<'static> {
        match self {
            JceKey::Int(i) => JceValue::Int(*i),
            JceKey::Float(bits) => JceValue::Float(f32::from_bits(*bits)),
            JceKey::Double(bits) => JceValue::Double(f64::from_bits(*bits)),
            JceKey::Bytes(b) => JceValue::Bytes(Cow::Owned(b.clone())),
            JceKey::Str(s) => JceValue::Str(Cow::Owned(s.clone())),
            JceKey::Tuple(items) => JceValue::List(items.iter().map(JceKey::to_value).collect()),
            JceKey::Pairs(pairs) => JceValue::Map(
                pairs
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_value()))
                    .collect(),
            ),
        }
    }
}

impl From<i64> for JceKey {
    fn from(v: i64) -> Self {
        JceKey::Int(v)
    }
}

impl From<&str> for JceKey {
    fn from(v: &str) -> Self {
        JceKey::Str(v.to_string())
    }
}

impl From<String> for JceKey {
    fn from(v: String) -> Self {
        JceKey::Str(v)
    }
}

impl From<Vec<u8>> for JceKey {
    fn from(v: Vec<u8>) -> Self {
        JceKey::Bytes(v)
    }
}

impl fmt::Display for JceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JceKey::Int(i) => write!(f, "{i}"),
            JceKey::Float(bits) => write!(f, "{}", f32::from_bits(*bits)),
            JceKey::Double(bits) => write!(f, "{}", f64::from_bits(*bits)),
            JceKey::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
            JceKey::Str(s) => f.write_str(s),
            JceKey::Tuple(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
            JceKey::Pairs(pairs) => {
                f.write_str("{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

/// Freezes decoded values into map keys, sharing storage between
/// structurally equal composite keys.
///
/// One freezer lives for one decode call.
#[derive(Debug, Default)]
pub struct KeyFreezer {
    seen: HashSet<JceKey>,
}

impl KeyFreezer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct composite keys interned so far.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Turns a decoded key value into a hashable key.
    pub fn freeze(&mut self, value: &JceValue<'_>) -> JceKey {
        let key = match value {
            JceValue::Int(i) => return JceKey::Int(*i),
            JceValue::Float(v) => return JceKey::Float(v.to_bits()),
            JceValue::Double(v) => return JceKey::Double(v.to_bits()),
            JceValue::Bytes(b) => return JceKey::Bytes(b.to_vec()),
            JceValue::Str(s) => return JceKey::Str(s.to_string()),
            JceValue::List(items) => {
                JceKey::Tuple(items.iter().map(|item| self.freeze(item)).collect())
            }
            JceValue::Map(map) => {
                let pairs = map.iter().map(|(k, v)| (k.clone(), self.freeze(v))).collect();
                sorted_pairs(pairs)
            }
            JceValue::Struct(fields) => {
                let pairs = fields
                    .iter()
                    .map(|(tag, v)| (JceKey::Int(i64::from(*tag)), self.freeze(v)))
                    .collect();
                sorted_pairs(pairs)
            }
            JceValue::Record(fields) => {
                let pairs = fields
                    .iter()
                    .map(|(name, v)| (JceKey::Str(name.clone()), self.freeze(v)))
                    .collect();
                sorted_pairs(pairs)
            }
        };
        self.intern(key)
    }

    fn intern(&mut self, key: JceKey) -> JceKey {
        if let Some(existing) = self.seen.get(&key) {
            return existing.clone();
        }
        self.seen.insert(key.clone());
        key
    }
}

fn sorted_pairs(mut pairs: Vec<(JceKey, JceKey)>) -> JceKey {
    pairs.sort();
    JceKey::Pairs(pairs.into())
}

const BIN_PREFIX: &str = "data:application/octet-stream;base64,";

impl From<&JceValue<'_>> for serde_json::Value {
    fn from(v: &JceValue<'_>) -> Self {
        use serde_json::Value;
        match v {
            JceValue::Int(i) => Value::from(*i),
            JceValue::Float(f) => float_to_json(f64::from(*f)),
            JceValue::Double(d) => float_to_json(*d),
            JceValue::Bytes(b) => Value::String(format!("{BIN_PREFIX}{}", STANDARD.encode(b))),
            JceValue::Str(s) => Value::String(s.to_string()),
            JceValue::List(items) => Value::Array(items.iter().map(Value::from).collect()),
            JceValue::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.to_string(), Value::from(v)))
                    .collect(),
            ),
            JceValue::Struct(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(tag, v)| (tag.to_string(), Value::from(v)))
                    .collect(),
            ),
            JceValue::Record(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(name, v)| (name.clone(), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<JceValue<'_>> for serde_json::Value {
    fn from(v: JceValue<'_>) -> Self {
        serde_json::Value::from(&v)
    }
}

fn float_to_json(v: f64) -> serde_json::Value {
    serde_json::Number::from_f64(v)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}
