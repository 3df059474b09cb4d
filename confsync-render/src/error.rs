//! Error types for confsync-render.

use std::path::PathBuf;

use thiserror::Error;

use confsync_core::FormatError;

/// All errors that can arise from resolving or rendering a destination.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Malformed template, or a render-time failure such as an undefined
    /// variable.
    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    /// A structured encode failed.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Underlying I/O failure reading a template file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`RenderError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RenderError {
    RenderError::Io {
        path: path.into(),
        source,
    }
}
