//! `NodeDecoder` — full-fidelity tree for inspecting raw JCE.
//!
//! Every node keeps its tag, wire type and, for strings and containers, the
//! declared length. Truncated input yields the nodes read so far.

use std::borrow::Cow;

use jce_buffers::Reader;
use serde::Serialize;
use tracing::{debug, warn};

use crate::constants::{WireType, MAX_DEPTH};
use crate::decoder::GenericDecoder;
use crate::error::{JceError, Result};
use crate::header::read_header;
use crate::options::JceOption;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JceNode<'a> {
    /// `None` for list elements.
    pub tag: Option<u8>,
    pub wire_type: WireType,
    pub value: NodeValue<'a>,
    /// Byte length for strings and simple lists, element count for lists
    /// and maps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeValue<'a> {
    Int(i64),
    Float(f32),
    Double(f64),
    Text(Cow<'a, str>),
    Bytes(Cow<'a, [u8]>),
    Nodes(Vec<JceNode<'a>>),
    Pairs(Vec<(JceNode<'a>, JceNode<'a>)>),
}

impl<'a> JceNode<'a> {
    fn new(tag: Option<u8>, wire_type: WireType, value: NodeValue<'a>) -> Self {
        Self {
            tag,
            wire_type,
            value,
            length: None,
        }
    }

    fn with_length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    /// Child nodes of structs, lists and re-parsed simple lists.
    pub fn children(&self) -> &[JceNode<'a>] {
        match &self.value {
            NodeValue::Nodes(nodes) => nodes,
            _ => &[],
        }
    }
}

/// Decoder producing [`JceNode`] trees.
pub struct NodeDecoder<'r, 'a> {
    reader: &'r mut Reader<'a>,
    option: JceOption,
    depth: usize,
}

impl<'r, 'a> NodeDecoder<'r, 'a> {
    /// Node decoder at nesting depth zero.
    pub fn new(reader: &'r mut Reader<'a>, option: JceOption) -> Self {
        Self {
            reader,
            option,
            depth: 0,
        }
    }

    /// Decodes top-level fields until the input ends.
    ///
    /// Running out of input stops decoding and returns what was read;
    /// malformed input and excessive nesting are errors.
    pub fn decode(&mut self) -> Result<Vec<JceNode<'a>>> {
        debug!(len = self.reader.len(), "node decode start");
        let result = self.decode_nodes();
        match &result {
            Ok(nodes) => debug!(nodes = nodes.len(), "node decode done"),
            Err(err) => warn!(error = %err, "node decode failed"),
        }
        result
    }

    fn decode_nodes(&mut self) -> Result<Vec<JceNode<'a>>> {
        let mut nodes = Vec::new();
        while !self.reader.is_eof() {
            match self.read_field() {
                Ok(Some(node)) => nodes.push(node),
                Ok(None) => break,
                Err(JceError::PartialData(failure)) => {
                    debug!(offset = failure.offset, nodes = nodes.len(), "node decode stopped on partial data");
                    break;
                }
                Err(err) => return Err(err),
            }
        }
        Ok(nodes)
    }

    fn generic(&mut self) -> GenericDecoder<'_, 'a> {
        GenericDecoder::with_depth(&mut *self.reader, self.option, self.depth)
    }

    /// Reads one headered field. `None` marks a `StructEnd`.
    fn read_field(&mut self) -> Result<Option<JceNode<'a>>> {
        let header = read_header(self.reader)?;
        if header.wire_type == WireType::StructEnd {
            return Ok(None);
        }
        self.read_node(Some(header.tag), header.wire_type).map(Some)
    }

    fn read_node(&mut self, tag: Option<u8>, wire_type: WireType) -> Result<JceNode<'a>> {
        let node = match wire_type {
            WireType::ZeroTag
            | WireType::Int1
            | WireType::Int2
            | WireType::Int4
            | WireType::Int8 => {
                JceNode::new(tag, wire_type, NodeValue::Int(self.generic().read_int(wire_type)?))
            }
            WireType::Float => JceNode::new(tag, wire_type, NodeValue::Float(self.reader.try_f32()?)),
            WireType::Double => {
                JceNode::new(tag, wire_type, NodeValue::Double(self.reader.try_f64()?))
            }
            WireType::String1 | WireType::String4 => {
                let len = self.generic().read_string_length(wire_type)?;
                let raw = self.reader.try_buf(len)?;
                let value = match std::str::from_utf8(raw) {
                    Ok(text) if self.option.zero_copy() => NodeValue::Text(Cow::Borrowed(text)),
                    Ok(text) => NodeValue::Text(Cow::Owned(text.to_string())),
                    Err(_) => NodeValue::Bytes(self.payload(raw)),
                };
                JceNode::new(tag, wire_type, value).with_length(len)
            }
            WireType::List => {
                self.enter()?;
                let count = self.generic().read_length()?;
                let mut items = Vec::with_capacity(count.min(self.reader.remaining()));
                for _ in 0..count {
                    let header = read_header(self.reader)?;
                    items.push(self.read_node(None, header.wire_type)?);
                }
                self.depth -= 1;
                JceNode::new(tag, wire_type, NodeValue::Nodes(items)).with_length(count)
            }
            WireType::Map => {
                self.enter()?;
                let count = self.generic().read_length()?;
                let mut pairs = Vec::with_capacity(count.min(self.reader.remaining()));
                for _ in 0..count {
                    let key_type = self.generic().read_entry_header(0)?;
                    let key = self.read_node(Some(0), key_type)?;
                    let value_type = self.generic().read_entry_header(1)?;
                    let value = self.read_node(Some(1), value_type)?;
                    pairs.push((key, value));
                }
                self.depth -= 1;
                JceNode::new(tag, wire_type, NodeValue::Pairs(pairs)).with_length(count)
            }
            WireType::StructBegin => {
                self.enter()?;
                let mut fields = Vec::new();
                while let Some(node) = self.read_field()? {
                    fields.push(node);
                }
                self.depth -= 1;
                JceNode::new(tag, wire_type, NodeValue::Nodes(fields))
            }
            WireType::SimpleList => {
                let len = self.generic().read_simple_list_length()?;
                let raw = self.reader.try_buf(len)?;
                let value = match self.reparse(raw) {
                    Some(nodes) => NodeValue::Nodes(nodes),
                    None => NodeValue::Bytes(self.payload(raw)),
                };
                JceNode::new(tag, wire_type, value).with_length(len)
            }
            WireType::StructEnd => {
                return Err(JceError::malformed(
                    self.reader.position(),
                    "unexpected struct end",
                ))
            }
        };
        Ok(node)
    }

    /// Tries to read a simple-list payload as nested JCE. A truncated tail
    /// keeps the nodes before it; malformed payloads stay bytes.
    fn reparse(&self, raw: &'a [u8]) -> Option<Vec<JceNode<'a>>> {
        if raw.is_empty() || raw[0] & 0x0f > 13 || self.depth >= MAX_DEPTH {
            return None;
        }
        let mut reader = Reader::with_endianness(raw, self.option.little_endian());
        let mut nested = NodeDecoder {
            reader: &mut reader,
            option: self.option,
            depth: self.depth + 1,
        };
        let nodes = nested.decode_nodes().ok()?;
        (!nodes.is_empty()).then_some(nodes)
    }

    fn payload(&self, raw: &'a [u8]) -> Cow<'a, [u8]> {
        if self.option.zero_copy() {
            Cow::Borrowed(raw)
        } else {
            Cow::Owned(raw.to_vec())
        }
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(JceError::RecursionLimit { limit: MAX_DEPTH });
        }
        Ok(())
    }
}
