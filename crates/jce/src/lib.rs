//! JCE/Tars tag-length-value binary codec.
//!
//! Every value on the wire is a header (tag + 4-bit type) followed by its
//! payload. This crate decodes such streams three ways:
//!
//! - [`GenericDecoder`] into a tag-keyed [`JceStruct`],
//! - [`SchemaDecoder`] into name-keyed [`Fields`] driven by a [`Schema`],
//! - [`NodeDecoder`] into a [`JceNode`] tree that keeps every wire detail,
//!
//! and encodes values back with [`JceEncoder`] and [`encode_record`]. The
//! [`classify`] pass presents opaque byte payloads as text or nested
//! structures. [`framing`] handles length-prefixed streams.
//!
//! ```
//! use jce::{dumps, loads, JceConfig, JceOption, JceStruct, JceValue};
//!
//! let mut fields = JceStruct::new();
//! fields.insert(0, JceValue::Int(123));
//! fields.insert(1, JceValue::from("hi"));
//!
//! let data = dumps(&JceValue::Struct(fields.clone()), JceOption::NONE).unwrap();
//! assert_eq!(data, [0x00, 0x7b, 0x16, 0x02, b'h', b'i']);
//! assert_eq!(loads(&data, &JceConfig::new()).unwrap(), fields);
//! ```

mod api;
mod config;
mod constants;
mod error;
mod header;
mod options;
mod value;

pub mod classify;
pub mod decoder;
pub mod encoder;
pub mod framing;
pub mod node_decoder;
pub mod scanner;
pub mod schema;
pub mod schema_decoder;
pub mod schema_encoder;

pub use jce_buffers::{BufferError, Reader, Writer};

pub use api::{dumps, dumps_fields, dumps_record, loads, loads_fields, loads_nodes, loads_record};
pub use classify::{classify, classify_struct, is_safe_text};
pub use config::JceConfig;
pub use constants::{WireType, MAX_CONTAINER_SIZE, MAX_DEPTH, MAX_STRING_LENGTH};
pub use decoder::{reader_for, GenericDecoder};
pub use encoder::JceEncoder;
pub use error::{DecodeFailure, EncodeFailure, ErrorKind, JceError, Result};
pub use framing::{FrameError, FrameReader, FrameWriter, Framer};
pub use header::{peek_header, read_header, write_header, Header};
pub use node_decoder::{JceNode, NodeDecoder, NodeValue};
pub use options::{BytesMode, JceOption};
pub use scanner::{validate, Scan};
pub use schema::{
    required, DeserializationInfo, Field, FieldType, JceRecord, Schema, SchemaBuilder,
    SerializationInfo,
};
pub use schema_decoder::{SchemaDecoder, RAW_VALUE_KEY};
pub use schema_encoder::encode_record;
pub use value::{Fields, JceKey, JceStruct, JceValue, KeyFreezer};
