//! One-call entry points over the decoders and encoders.

use crate::classify::classify_struct;
use crate::config::JceConfig;
use crate::decoder::{reader_for, GenericDecoder};
use crate::encoder::JceEncoder;
use crate::error::Result;
use crate::node_decoder::{JceNode, NodeDecoder};
use crate::options::JceOption;
use crate::schema::{JceRecord, Schema};
use crate::schema_decoder::SchemaDecoder;
use crate::schema_encoder::encode_record;
use crate::value::{Fields, JceStruct, JceValue};

/// Encodes a value. Structs are written as bare field sequences, anything
/// else as field 0.
pub fn dumps(value: &JceValue<'_>, option: JceOption) -> Result<Vec<u8>> {
    JceEncoder::new(option).encode(value)
}

/// Encodes name-keyed fields against a schema.
pub fn dumps_fields(schema: &Schema, fields: &Fields<'_>, config: &JceConfig) -> Result<Vec<u8>> {
    encode_record(schema, fields, config)
}

/// Encodes a bound record through its schema.
pub fn dumps_record<T: JceRecord>(record: &T, config: &JceConfig) -> Result<Vec<u8>> {
    encode_record(&T::schema(), &record.to_fields(), config)
}

/// Decodes without a schema and classifies byte payloads per
/// `config.bytes_mode`.
pub fn loads<'a>(data: &'a [u8], config: &JceConfig) -> Result<JceStruct<'a>> {
    let mut reader = reader_for(data, config.option);
    let fields = GenericDecoder::new(&mut reader, config.option).decode()?;
    Ok(classify_struct(fields, config.bytes_mode, config.option))
}

/// Decodes name-keyed fields against a schema.
pub fn loads_fields<'a>(data: &'a [u8], schema: &Schema, config: &JceConfig) -> Result<Fields<'a>> {
    let mut reader = reader_for(data, config.option);
    SchemaDecoder::new(&mut reader, config).decode_to_fields(schema)
}

/// Decodes and binds a record type.
pub fn loads_record<T: JceRecord>(data: &[u8], config: &JceConfig) -> Result<T> {
    let mut reader = reader_for(data, config.option);
    SchemaDecoder::new(&mut reader, config).decode_record::<T>()
}

/// Decodes into an inspection tree. Truncated input yields a partial tree.
pub fn loads_nodes(data: &[u8], option: JceOption) -> Result<Vec<JceNode<'_>>> {
    let mut reader = reader_for(data, option);
    NodeDecoder::new(&mut reader, option).decode()
}
