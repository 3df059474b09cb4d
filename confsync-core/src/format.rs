//! Serialization formats for source payloads and structured destinations.
//!
//! The format set is closed: adding a format means adding an enum variant and
//! covering it in both `decode` and `encode`. Unknown format names fail at
//! parse time, not per-call.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;

/// The interchange mapping produced by decoding and consumed by encoding.
pub type Mapping = serde_json::Map<String, Value>;

/// Key under which the `raw` format wraps unstructured text, so templates can
/// reference `{{ content }}`.
pub const RAW_CONTENT_KEY: &str = "content";

/// All errors that can arise from codec operations.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The format name is not one of the supported identifiers.
    #[error("unsupported format '{name}' (supported: json, yaml, yml, toml, raw)")]
    Unsupported { name: String },

    /// The payload decoded successfully but is not a mapping at the top level.
    #[error("decoded {format} payload is not a mapping")]
    NotAMapping { format: Format },

    /// `raw` encoding requires a string value under the `content` key.
    #[error("raw encoding requires a string '{RAW_CONTENT_KEY}' key")]
    MissingContentKey,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

/// A supported serialization format.
///
/// `Raw` is special: decoding wraps the text under [`RAW_CONTENT_KEY`], and
/// encoding extracts that key back out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Json,
    Yaml,
    Toml,
    Raw,
}

impl Format {
    /// All format variants in a stable order.
    pub fn all() -> &'static [Format] {
        &[Format::Json, Format::Yaml, Format::Toml, Format::Raw]
    }

    /// The canonical identifier for this format.
    pub fn name(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Yaml => "yaml",
            Format::Toml => "toml",
            Format::Raw => "raw",
        }
    }

    /// Deserialize `raw` into a mapping.
    pub fn decode(&self, raw: &str) -> Result<Mapping, FormatError> {
        let value: Value = match self {
            Format::Json => serde_json::from_str(raw)?,
            Format::Yaml => serde_yaml::from_str(raw)?,
            Format::Toml => toml::from_str(raw)?,
            Format::Raw => {
                let mut map = Mapping::new();
                map.insert(RAW_CONTENT_KEY.to_string(), Value::String(raw.to_string()));
                return Ok(map);
            }
        };

        match value {
            Value::Object(map) => Ok(map),
            _ => Err(FormatError::NotAMapping { format: *self }),
        }
    }

    /// Serialize a mapping into this format.
    pub fn encode(&self, data: &Mapping) -> Result<String, FormatError> {
        match self {
            Format::Json => Ok(serde_json::to_string_pretty(&Value::Object(data.clone()))?),
            Format::Yaml => Ok(serde_yaml::to_string(&Value::Object(data.clone()))?),
            Format::Toml => Ok(toml::to_string(data)?),
            Format::Raw => match data.get(RAW_CONTENT_KEY) {
                Some(Value::String(content)) => Ok(content.clone()),
                _ => Err(FormatError::MissingContentKey),
            },
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Format::Json),
            "yaml" | "yml" => Ok(Format::Yaml),
            "toml" => Ok(Format::Toml),
            "raw" => Ok(Format::Raw),
            other => Err(FormatError::Unsupported {
                name: other.to_string(),
            }),
        }
    }
}
