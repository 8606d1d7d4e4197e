//! Option flags and the byte-presentation mode.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::JceError;

bitflags! {
    /// Bit flags accepted by every encode and decode entry point.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct JceOption: u32 {
        /// Multi-byte numbers are little-endian on the wire.
        const LITTLE_ENDIAN = 1;
        /// Byte payloads borrow from the input instead of being copied.
        const ZERO_COPY = 2;
        /// Schema encoding drops fields equal to their default.
        const OMIT_DEFAULT = 32;
        /// Schema encoding drops fields the caller never set.
        const EXCLUDE_UNSET = 64;
    }
}

impl JceOption {
    pub const NONE: JceOption = JceOption::empty();

    pub fn little_endian(self) -> bool {
        self.contains(JceOption::LITTLE_ENDIAN)
    }

    pub fn zero_copy(self) -> bool {
        self.contains(JceOption::ZERO_COPY)
    }
}

impl Default for JceOption {
    fn default() -> Self {
        JceOption::NONE
    }
}

/// How opaque byte payloads are presented after a generic decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BytesMode {
    /// Leave every payload as bytes.
    Raw,
    /// Turn payloads that are readable text into strings.
    String,
    /// Like `String`, then try to read the rest as nested JCE.
    #[default]
    Auto,
}

impl BytesMode {
    pub fn as_str(self) -> &'static str {
        match self {
            BytesMode::Raw => "raw",
            BytesMode::String => "string",
            BytesMode::Auto => "auto",
        }
    }
}

impl fmt::Display for BytesMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BytesMode {
    type Err = JceError;

    /// Accepts the mode names and their numeric ids `0`, `1`, `2`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" | "0" => Ok(BytesMode::Raw),
            "string" | "1" => Ok(BytesMode::String),
            "auto" | "2" => Ok(BytesMode::Auto),
            other => Err(JceError::Configuration(format!(
                "unknown bytes mode {other:?}, expected raw, string or auto"
            ))),
        }
    }
}
