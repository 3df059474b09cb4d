//! Error types for confsync-agent.

use std::path::PathBuf;

use thiserror::Error;

use confsync_backends::BackendError;
use confsync_core::{ConfigError, FormatError, ObjectKey};
use confsync_hooks::HookError;
use confsync_render::RenderError;

/// All errors that can arise from controller and orchestrator operations.
#[derive(Debug, Error)]
pub enum AgentError {
    /// An error from the configuration source.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// A decode failure on a fetched payload.
    #[error("decode error: {0}")]
    Format(#[from] FormatError),

    /// A destination resolution or render failure.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// A hook resolution or execution failure.
    #[error("hook error: {0}")]
    Hook(#[from] HookError),

    /// A settings-level configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An I/O error writing the destination, with annotated path.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The object lists hooks but no hook table could be loaded.
    #[error("object '{key}' references hooks {hooks:?} but no hook table was loaded")]
    HooksUnavailable { key: ObjectKey, hooks: Vec<String> },

    /// A task running an object's loop panicked or was aborted.
    #[error("task join failure for '{key}': {detail}")]
    Join { key: ObjectKey, detail: String },
}

/// Convenience constructor for [`AgentError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> AgentError {
    AgentError::Io {
        path: path.into(),
        source,
    }
}
