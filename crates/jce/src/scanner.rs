//! Structural validation without building values.

use crate::constants::WireType;
use crate::decoder::{reader_for, GenericDecoder};
use crate::error::Result;
use crate::header::read_header;
use crate::options::JceOption;

/// Outcome of a successful scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scan {
    /// Top-level fields seen.
    pub fields: usize,
    /// Bytes read, including a top-level struct end that stopped the scan.
    pub consumed: usize,
}

/// Checks that `data` is well-formed JCE.
///
/// Runs the decoder's skip path, so it accepts exactly the inputs a generic
/// decode accepts and fails with the same errors.
pub fn validate(data: &[u8], option: JceOption) -> Result<Scan> {
    let mut reader = reader_for(data, option);
    let mut decoder = GenericDecoder::new(&mut reader, option);
    let mut fields = 0;
    while !decoder.reader().is_eof() {
        let header = read_header(decoder.reader())?;
        if header.wire_type == WireType::StructEnd {
            break;
        }
        decoder.skip_value(header.wire_type)?;
        fields += 1;
    }
    Ok(Scan {
        fields,
        consumed: decoder.reader().position(),
    })
}
