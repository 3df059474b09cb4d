//! Core domain types for confsync: codec formats, object specifications,
//! and the settings-file loader.

pub mod error;
pub mod format;
pub mod settings;
pub mod types;

pub use error::ConfigError;
pub use format::{Format, FormatError, Mapping};
pub use settings::{ProviderSettings, Settings};
pub use types::{
    BackendKind, DeployIdentity, DestSpec, HookName, ObjectKey, ObjectSpec, RenderSpec,
    SourceIdentity, SourceSpec,
};
