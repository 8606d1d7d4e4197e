//! Error types shared by every JCE decoder and encoder.

use std::fmt;

use jce_buffers::BufferError;
use thiserror::Error;

use crate::framing::FrameError;

/// Where and why a decode failed.
///
/// `loc` is the field path from the outermost record down to the failing
/// field. It is filled in from the inside out as the error propagates
/// through nested schema decoders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeFailure {
    pub offset: usize,
    pub reason: String,
    pub loc: Vec<String>,
}

impl DecodeFailure {
    /// Failure at `offset` with an empty field path.
    pub fn new(offset: usize, reason: impl Into<String>) -> Self {
        Self {
            offset,
            reason: reason.into(),
            loc: Vec::new(),
        }
    }
}

impl fmt::Display for DecodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}", self.reason, self.offset)?;
        if !self.loc.is_empty() {
            write!(f, " (field {})", self.loc.join("."))?;
        }
        Ok(())
    }
}

/// Why a value could not be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeFailure {
    pub reason: String,
    pub loc: Vec<String>,
}

impl fmt::Display for EncodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)?;
        if !self.loc.is_empty() {
            write!(f, " (field {})", self.loc.join("."))?;
        }
        Ok(())
    }
}

/// Coarse error category, for callers that only branch on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    PartialData,
    Malformed,
    RecursionLimit,
    Configuration,
    Unencodable,
    Frame,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JceError {
    /// The input ended before the value was complete.
    #[error("partial data: {0}")]
    PartialData(DecodeFailure),
    /// The input is not valid JCE.
    #[error("malformed data: {0}")]
    Malformed(DecodeFailure),
    #[error("recursion limit of {limit} exceeded")]
    RecursionLimit { limit: usize },
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("cannot encode value: {0}")]
    Unencodable(EncodeFailure),
    #[error(transparent)]
    Frame(#[from] FrameError),
}

impl JceError {
    pub fn partial(offset: usize, reason: impl Into<String>) -> Self {
        JceError::PartialData(DecodeFailure::new(offset, reason))
    }

    pub fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        JceError::Malformed(DecodeFailure::new(offset, reason))
    }

    pub fn unencodable(reason: impl Into<String>) -> Self {
        JceError::Unencodable(EncodeFailure {
            reason: reason.into(),
            loc: Vec::new(),
        })
    }

    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            JceError::PartialData(_) => ErrorKind::PartialData,
            JceError::Malformed(_) => ErrorKind::Malformed,
            JceError::RecursionLimit { .. } => ErrorKind::RecursionLimit,
            JceError::Configuration(_) => ErrorKind::Configuration,
            JceError::Unencodable(_) => ErrorKind::Unencodable,
            JceError::Frame(_) => ErrorKind::Frame,
        }
    }

    /// Prepends `name` to the error's field path.
    pub fn with_field(mut self, name: &str) -> Self {
        match &mut self {
            JceError::PartialData(failure) | JceError::Malformed(failure) => {
                failure.loc.insert(0, name.to_string());
            }
            JceError::Unencodable(failure) => failure.loc.insert(0, name.to_string()),
            _ => {}
        }
        self
    }

    /// Field path, outermost first. Empty for errors that carry none.
    pub fn loc(&self) -> &[String] {
        match self {
            JceError::PartialData(failure) | JceError::Malformed(failure) => &failure.loc,
            JceError::Unencodable(failure) => &failure.loc,
            _ => &[],
        }
    }
}

impl From<BufferError> for JceError {
    fn from(err: BufferError) -> Self {
        match err {
            BufferError::EndOfBuffer {
                offset,
                needed,
                available,
            } => JceError::partial(
                offset,
                format!("need {needed} bytes, only {available} available"),
            ),
            BufferError::NegativeLength { offset, length } => {
                JceError::malformed(offset, format!("negative length {length}"))
            }
        }
    }
}

pub type Result<T, E = JceError> = std::result::Result<T, E>;
