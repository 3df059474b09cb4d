//! Error types for confsync-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::format::FormatError;

/// All errors that can arise from loading and validating settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (file not found, permission denied, etc.).
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on the settings file itself.
    #[error("failed to parse settings at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// No settings file was found at any of the default locations.
    #[error("could not find a confsync settings file (searched: {})", format_searched(.searched))]
    SettingsNotFound { searched: Vec<PathBuf> },

    /// The requested object key does not exist in the settings file.
    #[error("unknown object '{key}' (known objects: {})", .known.join(", "))]
    UnknownObject { key: String, known: Vec<String> },

    /// An object failed validation. Carries the full object dump so the
    /// settings file can be fixed without consulting source code.
    #[error("invalid object '{key}': {detail}\n{dump}")]
    InvalidObject {
        key: String,
        detail: String,
        dump: String,
    },

    /// A codec error raised while validating format fields.
    #[error(transparent)]
    Format(#[from] FormatError),
}

/// Convenience constructor for [`ConfigError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}

fn format_searched(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
