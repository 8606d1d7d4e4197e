//! `JceConfig` — options, byte mode and hook context in one value.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{JceError, Result};
use crate::options::{BytesMode, JceOption};

/// Settings shared by the high-level API, the decoders and the framing
/// reader.
///
/// Can be built in code or loaded from JSON:
///
/// ```
/// use jce::{BytesMode, JceConfig, JceOption};
///
/// let config = JceConfig::from_json(r#"{"option": "LITTLE_ENDIAN", "bytes_mode": "raw"}"#).unwrap();
/// assert_eq!(config.option, JceOption::LITTLE_ENDIAN);
/// assert_eq!(config.bytes_mode, BytesMode::Raw);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JceConfig {
    pub option: JceOption,
    pub bytes_mode: BytesMode,
    /// Free-form values handed to field hooks.
    pub context: Map<String, Value>,
}

impl JceConfig {
    /// Big-endian, no flags, `auto` bytes mode, empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a configuration from JSON. Missing keys take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|err| JceError::Configuration(format!("invalid config: {err}")))
    }

    pub fn with_option(mut self, option: JceOption) -> Self {
        self.option = option;
        self
    }

    pub fn with_bytes_mode(mut self, bytes_mode: BytesMode) -> Self {
        self.bytes_mode = bytes_mode;
        self
    }

    /// Replaces the context handed to field hooks.
    pub fn with_context(mut self, context: Map<String, Value>) -> Self {
        self.context = context;
        self
    }

    pub fn with_context_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}
