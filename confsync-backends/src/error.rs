//! Error types for confsync-backends.
//!
//! Rate limiting is deliberately absent here: it exists only as
//! [`crate::api::ApiError::RateLimited`] and is recovered inside the watch
//! loops, so it can never surface to a caller of this crate.

use std::path::PathBuf;

use thiserror::Error;

use confsync_core::BackendKind;

use crate::api::ApiError;

/// All errors that can arise from a configuration source.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Underlying I/O failure (file not found, permission denied, etc.).
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Friendly-name resolution found zero matches.
    #[error("no {operation} results found for name '{name}'")]
    NotFound { operation: String, name: String },

    /// The remote provider rejected or failed the call; the provider's
    /// original message is preserved verbatim.
    #[error("provider error: {message}")]
    Provider { message: String },

    /// The `deploy`/`secrets` backends need a `provider:` section in the
    /// settings file.
    #[error("the {backend} backend requires a `provider` section in the settings file")]
    ProviderNotConfigured { backend: BackendKind },

    /// Filesystem watcher failure.
    #[error("watch error: {0}")]
    Notify(#[from] notify::Error),

    /// A watch event channel closed unexpectedly.
    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),
}

impl From<ApiError> for BackendError {
    fn from(err: ApiError) -> Self {
        match err {
            // A rate-limit rejection outside a watch loop is just a provider
            // rejection to the caller.
            ApiError::RateLimited => BackendError::Provider {
                message: "request came too early".to_string(),
            },
            ApiError::Provider(message) => BackendError::Provider { message },
        }
    }
}

/// Convenience constructor for [`BackendError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> BackendError {
    BackendError::Io {
        path: path.into(),
        source,
    }
}
