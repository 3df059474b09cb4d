//! Domain types for confsync objects.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem
//! paths. The raw (primitive) settings schema lives in [`crate::settings`];
//! the types here are the validated form the synchronization engine consumes.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::format::Format;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed key identifying one configured synchronization object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectKey(pub String);

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ObjectKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ObjectKey {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A strongly-typed name for a hook task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HookName(pub String);

impl fmt::Display for HookName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for HookName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for HookName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// The kind of provider a source reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// A file on the local filesystem.
    Local,
    /// The remote configuration-deployment service.
    Deploy,
    /// The remote secret store.
    Secrets,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Local => write!(f, "local"),
            BackendKind::Deploy => write!(f, "deploy"),
            BackendKind::Secrets => write!(f, "secrets"),
        }
    }
}

/// Application/environment/profile coordinates in the deployment service,
/// either as opaque provider IDs or as friendly names to be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployIdentity {
    pub application: String,
    pub environment: String,
    pub profile: String,
}

/// Provider-specific identity of a source. Exactly one variant matches the
/// object's [`BackendKind`]; validation enforces the pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceIdentity {
    /// Path to a local file.
    File { path: PathBuf },
    /// Direct deployment-service identifiers.
    DeployIds(DeployIdentity),
    /// Friendly names that must be resolved to identifiers at construction.
    DeployNames(DeployIdentity),
    /// Identifier of a secret in the secret store.
    Secret { id: String },
}

/// The source half of an object: where configuration payloads come from and
/// how to decode them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub backend: BackendKind,
    /// Decode source payloads from this format. Defaults to `raw`.
    pub format: Format,
    /// Poll interval for `watch`/`sync` loops.
    pub interval: Duration,
    pub identity: SourceIdentity,
}

// ---------------------------------------------------------------------------
// Destination
// ---------------------------------------------------------------------------

/// How a destination file is produced from the decoded mapping: either a
/// structured encode in a registered format, or a template render. The two
/// are mutually exclusive and distinguished by a membership test against the
/// codec set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderSpec {
    Structured(Format),
    Template(PathBuf),
}

impl fmt::Display for RenderSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderSpec::Structured(format) => write!(f, "(format: {format})"),
            RenderSpec::Template(path) => write!(f, "(template: {})", path.display()),
        }
    }
}

/// The destination half of an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestSpec {
    /// Write the rendered output to this path.
    pub path: PathBuf,
    pub render: RenderSpec,
}

impl fmt::Display for DestSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.render, self.path.display())
    }
}

// ---------------------------------------------------------------------------
// Object
// ---------------------------------------------------------------------------

/// One configured synchronization target: a source bound to a destination,
/// plus the hooks to run after each successful write. Immutable after load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSpec {
    pub key: ObjectKey,
    pub source: SourceSpec,
    pub dest: DestSpec,
    pub hooks: Vec<HookName>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newtype_display() {
        assert_eq!(ObjectKey::from("example").to_string(), "example");
        assert_eq!(HookName::from("restart").to_string(), "restart");
    }

    #[test]
    fn dest_spec_display_structured() {
        let dest = DestSpec {
            path: PathBuf::from("/tmp/out.json"),
            render: RenderSpec::Structured(Format::Json),
        };
        assert_eq!(dest.to_string(), "(format: json) -> /tmp/out.json");
    }

    #[test]
    fn dest_spec_display_template() {
        let dest = DestSpec {
            path: PathBuf::from("/tmp/out.conf"),
            render: RenderSpec::Template(PathBuf::from("templates/out.conf.tera")),
        };
        assert_eq!(
            dest.to_string(),
            "(template: templates/out.conf.tera) -> /tmp/out.conf"
        );
    }
}
