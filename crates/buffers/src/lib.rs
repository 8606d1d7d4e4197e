//! Byte cursor and growable writer used by the JCE codec.
//!
//! The [`Reader`] never panics on short input: every read is bounds-checked
//! and leaves the cursor untouched when it fails. The [`Writer`] grows its
//! backing buffer on demand.

mod reader;
mod writer;

pub use reader::{recover_f32, recover_f64, Reader};
pub use writer::Writer;

use thiserror::Error;

/// Errors raised by [`Reader`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    /// Not enough bytes remain to satisfy the read.
    #[error("need {needed} bytes at offset {offset}, only {available} available")]
    EndOfBuffer {
        offset: usize,
        needed: usize,
        available: usize,
    },
    /// A length prefix or skip request was negative.
    #[error("negative length {length} at offset {offset}")]
    NegativeLength { offset: usize, length: i64 },
}
