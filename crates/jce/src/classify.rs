//! Post-decode pass that decides how to present opaque byte payloads.
//!
//! JCE strings and simple lists carry bytes with no declared meaning. The
//! classifier turns readable text into [`JceValue::Str`] and, in
//! [`BytesMode::Auto`], tries to read the remaining payloads as nested JCE.
//! Empty payloads read as the empty string in every mode. It never fails:
//! anything it cannot interpret stays as bytes.

use std::borrow::Cow;

use indexmap::IndexMap;
use jce_buffers::Reader;
use unicode_general_category::{get_general_category, GeneralCategory};

use crate::constants::MAX_DEPTH;
use crate::decoder::GenericDecoder;
use crate::options::{BytesMode, JceOption};
use crate::value::{JceKey, JceStruct, JceValue};

/// Classifies every byte payload in `value`.
pub fn classify<'a>(value: JceValue<'a>, mode: BytesMode, option: JceOption) -> JceValue<'a> {
    Classifier { mode, option }.value(value, 0)
}

/// Classifies the values of a decoded struct.
pub fn classify_struct<'a>(
    fields: JceStruct<'a>,
    mode: BytesMode,
    option: JceOption,
) -> JceStruct<'a> {
    let classifier = Classifier { mode, option };
    classifier.fields(fields, 0)
}

struct Classifier {
    mode: BytesMode,
    option: JceOption,
}

impl Classifier {
    fn value<'a>(&self, value: JceValue<'a>, depth: usize) -> JceValue<'a> {
        match value {
            JceValue::Bytes(bytes) => self.bytes(bytes, depth),
            JceValue::List(items) => JceValue::List(
                items
                    .into_iter()
                    .map(|item| self.value(item, depth + 1))
                    .collect(),
            ),
            JceValue::Map(map) => JceValue::Map(self.map(map, depth)),
            JceValue::Struct(fields) => JceValue::Struct(self.fields(fields, depth)),
            JceValue::Record(fields) => JceValue::Record(
                fields
                    .into_iter()
                    .map(|(name, v)| (name, self.value(v, depth + 1)))
                    .collect(),
            ),
            other => other,
        }
    }

    fn fields<'a>(&self, fields: JceStruct<'a>, depth: usize) -> JceStruct<'a> {
        fields
            .into_iter()
            .map(|(tag, v)| (tag, self.value(v, depth + 1)))
            .collect()
    }

    fn map<'a>(
        &self,
        map: IndexMap<JceKey, JceValue<'a>>,
        depth: usize,
    ) -> IndexMap<JceKey, JceValue<'a>> {
        let raw = self.mode == BytesMode::Raw;
        map.into_iter()
            .map(|(k, v)| {
                let k = if raw { k } else { text_key(k) };
                (k, self.value(v, depth + 1))
            })
            .collect()
    }

    fn bytes<'a>(&self, bytes: Cow<'a, [u8]>, depth: usize) -> JceValue<'a> {
        if bytes.is_empty() {
            return JceValue::Str(Cow::Borrowed(""));
        }
        if self.mode == BytesMode::Raw {
            return JceValue::Bytes(bytes);
        }
        let bytes = match into_text(bytes) {
            Ok(text) => return JceValue::Str(text),
            Err(bytes) => bytes,
        };
        if self.mode != BytesMode::Auto || bytes[0] & 0x0f > 13 || depth >= MAX_DEPTH {
            return JceValue::Bytes(bytes);
        }
        match self.reparse(&bytes, depth) {
            Some(fields) => JceValue::Struct(fields),
            None => JceValue::Bytes(bytes),
        }
    }

    /// Reads a payload as nested JCE. A top-level struct end stops the read
    /// early and whatever follows it is ignored.
    fn reparse<'a>(&self, bytes: &Cow<'a, [u8]>, depth: usize) -> Option<JceStruct<'a>> {
        match bytes {
            Cow::Borrowed(slice) => self.reparse_slice(*slice, depth),
            Cow::Owned(vec) => {
                let owned: Option<JceStruct<'static>> =
                    self.reparse_slice(vec, depth).map(|fields| {
                        fields
                            .into_iter()
                            .map(|(tag, v)| (tag, v.into_owned()))
                            .collect()
                    });
                owned
            }
        }
    }

    fn reparse_slice<'b>(&self, data: &'b [u8], depth: usize) -> Option<JceStruct<'b>> {
        let mut reader = Reader::with_endianness(data, self.option.little_endian());
        let fields = GenericDecoder::with_depth(&mut reader, self.option, depth + 1)
            .decode()
            .ok()?;
        Some(self.fields(fields, depth + 1))
    }
}

/// Byte keys that read as safe text become string keys.
fn text_key(key: JceKey) -> JceKey {
    match key {
        JceKey::Bytes(b) => match String::from_utf8(b) {
            Ok(s) if is_safe_text(&s) => JceKey::Str(s),
            Ok(s) => JceKey::Bytes(s.into_bytes()),
            Err(err) => JceKey::Bytes(err.into_bytes()),
        },
        other => other,
    }
}

fn into_text(bytes: Cow<'_, [u8]>) -> Result<Cow<'_, str>, Cow<'_, [u8]>> {
    match bytes {
        Cow::Borrowed(b) => match std::str::from_utf8(b) {
            Ok(s) if is_safe_text(s) => Ok(Cow::Borrowed(s)),
            _ => Err(Cow::Borrowed(b)),
        },
        Cow::Owned(v) => match String::from_utf8(v) {
            Ok(s) if is_safe_text(&s) => Ok(Cow::Owned(s)),
            Ok(s) => Err(Cow::Owned(s.into_bytes())),
            Err(err) => Err(Cow::Owned(err.into_bytes())),
        },
    }
}

/// Whether a string reads as text rather than binary that happens to be
/// valid UTF-8.
///
/// ASCII must be printable or tab, newline, carriage return. Other strings
/// may not contain control, format, surrogate, private-use or unassigned
/// code points, nor separators other than the plain space.
pub fn is_safe_text(s: &str) -> bool {
    if s.is_ascii() {
        return s
            .bytes()
            .all(|b| (32..=126).contains(&b) || matches!(b, b'\t' | b'\n' | b'\r'));
    }
    s.chars()
        .all(|c| matches!(c, '\t' | '\n' | '\r') || is_printable(c))
}

fn is_printable(c: char) -> bool {
    use GeneralCategory::*;
    c == ' '
        || !matches!(
            get_general_category(c),
            Control
                | Format
                | Surrogate
                | PrivateUse
                | Unassigned
                | LineSeparator
                | ParagraphSeparator
                | SpaceSeparator
        )
}
