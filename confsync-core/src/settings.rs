//! Settings-file loading and validation.
//!
//! The settings file is a YAML document:
//!
//! ```yaml
//! provider:
//!   url: https://config.internal.example.com
//!   token_env: CONFSYNC_TOKEN
//!
//! objects:
//!   example-local:
//!     source:
//!       backend: local
//!       format: yaml
//!       path: /etc/app/source.yaml
//!     dest:
//!       path: /tmp/confsync/app.json
//!       format: json
//!     hooks: [reload-app]
//!
//! hooks:
//!   reload-app:
//!     cmd: [systemctl, reload, app]
//! ```
//!
//! The structs in this module mirror the file one-to-one ("raw" primitives);
//! [`RawObject::into_spec`] validates them into the domain types the engine
//! consumes. Validation failures carry the offending key and a YAML dump of
//! the object so the settings file can be fixed without reading source code.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};
use crate::format::Format;
use crate::types::{
    BackendKind, DeployIdentity, DestSpec, HookName, ObjectKey, ObjectSpec, RenderSpec,
    SourceIdentity, SourceSpec,
};

/// Default poll interval for `watch`/`sync` loops, also the minimum interval
/// the deployment service will accept for a session.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// File name of the settings file.
pub const SETTINGS_FILE: &str = "confsync.yaml";

// ---------------------------------------------------------------------------
// Raw schema
// ---------------------------------------------------------------------------

/// Connection settings for the remote provider endpoint, shared by the
/// `deploy` and `secrets` backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Base URL of the provider API.
    pub url: String,
    /// Name of the environment variable holding the bearer token, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDeployIdentity {
    pub application: String,
    pub environment: String,
    pub profile: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSource {
    pub backend: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Poll interval in seconds for `watch`/`sync` loops.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ids: Option<RawDeployIdentity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub names: Option<RawDeployIdentity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDest {
    pub path: PathBuf,
    /// A codec identifier, or the path to a template file.
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawObject {
    pub source: RawSource,
    pub dest: RawDest,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hooks: Vec<String>,
}

/// The parsed settings file.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub objects: BTreeMap<String, RawObject>,

    #[serde(default)]
    pub provider: Option<ProviderSettings>,

    /// Hook task table. Left as an untyped value so that a malformed table
    /// degrades to a disabled hook graph instead of failing the whole file.
    #[serde(default)]
    pub hooks: Option<serde_yaml::Value>,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Settings {
    /// Load and parse the settings file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        let settings: Settings = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(
            path = %path.display(),
            objects = settings.objects.len(),
            "loaded settings",
        );
        Ok(settings)
    }

    /// Validate every configured object into an [`ObjectSpec`], in key order.
    pub fn object_specs(&self) -> Result<Vec<ObjectSpec>, ConfigError> {
        self.objects
            .iter()
            .map(|(key, raw)| raw.clone().into_spec(key))
            .collect()
    }

    /// Validate a single object by key.
    pub fn object_spec(&self, key: &str) -> Result<ObjectSpec, ConfigError> {
        match self.objects.get(key) {
            Some(raw) => raw.clone().into_spec(key),
            None => Err(ConfigError::UnknownObject {
                key: key.to_string(),
                known: self.objects.keys().cloned().collect(),
            }),
        }
    }
}

/// Return the first default settings path that exists.
///
/// Checked in priority order: `./confsync.yaml`, `~/confsync.yaml`,
/// `/etc/confsync/confsync.yaml`.
pub fn resolve_path() -> Result<PathBuf, ConfigError> {
    let mut candidates = vec![PathBuf::from(SETTINGS_FILE)];
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(SETTINGS_FILE));
    }
    candidates.push(PathBuf::from("/etc/confsync").join(SETTINGS_FILE));

    for candidate in &candidates {
        if candidate.is_file() {
            return Ok(candidate.clone());
        }
    }
    Err(ConfigError::SettingsNotFound {
        searched: candidates,
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl RawObject {
    /// Validate the raw object into a domain [`ObjectSpec`].
    pub fn into_spec(self, key: &str) -> Result<ObjectSpec, ConfigError> {
        let invalid = |detail: String| ConfigError::InvalidObject {
            key: key.to_string(),
            detail,
            dump: serde_yaml::to_string(&self).unwrap_or_default(),
        };

        let backend = match self.source.backend.as_str() {
            "local" => BackendKind::Local,
            "deploy" => BackendKind::Deploy,
            "secrets" => BackendKind::Secrets,
            other => {
                return Err(invalid(format!(
                    "unknown backend '{other}' (known backends: local, deploy, secrets)"
                )))
            }
        };

        let format = match &self.source.format {
            None => Format::Raw,
            Some(name) => Format::from_str(name).map_err(|e| invalid(e.to_string()))?,
        };

        let identity = match backend {
            BackendKind::Local => match &self.source.path {
                Some(path) => SourceIdentity::File { path: path.clone() },
                None => return Err(invalid("the local backend requires `source.path`".into())),
            },
            BackendKind::Deploy => match (&self.source.ids, &self.source.names) {
                (Some(ids), None) => SourceIdentity::DeployIds(ids.clone().into()),
                (None, Some(names)) => SourceIdentity::DeployNames(names.clone().into()),
                _ => {
                    return Err(invalid(
                        "the deploy backend requires exactly one of `source.ids` and `source.names`"
                            .into(),
                    ))
                }
            },
            BackendKind::Secrets => match &self.source.secret {
                Some(id) => SourceIdentity::Secret { id: id.clone() },
                None => {
                    return Err(invalid("the secrets backend requires `source.secret`".into()))
                }
            },
        };

        let interval = self
            .source
            .interval
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_POLL_INTERVAL);

        // Membership test against the codec set decides structured vs. template.
        let render = match Format::from_str(&self.dest.format) {
            Ok(format) => RenderSpec::Structured(format),
            Err(_) => RenderSpec::Template(PathBuf::from(&self.dest.format)),
        };

        Ok(ObjectSpec {
            key: ObjectKey::from(key),
            source: SourceSpec {
                backend,
                format,
                interval,
                identity,
            },
            dest: DestSpec {
                path: self.dest.path.clone(),
                render,
            },
            hooks: self.hooks.iter().map(|h| HookName::from(h.as_str())).collect(),
        })
    }
}

impl From<RawDeployIdentity> for DeployIdentity {
    fn from(raw: RawDeployIdentity) -> Self {
        DeployIdentity {
            application: raw.application,
            environment: raw.environment,
            profile: raw.profile,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    const SAMPLE: &str = r#"
provider:
  url: https://config.internal.example.com
  token_env: CONFSYNC_TOKEN

objects:
  app-settings:
    source:
      backend: deploy
      format: yaml
      names:
        application: payments
        environment: production
        profile: api
    dest:
      path: /tmp/confsync/app.json
      format: json
    hooks: [reload-app]

  docker-auth:
    source:
      backend: secrets
      format: json
      secret: docker/config
    dest:
      path: /tmp/confsync/docker.json
      format: json

  motd:
    source:
      backend: local
      path: /etc/confsync/motd.txt
    dest:
      path: /etc/motd
      format: raw

hooks:
  reload-app:
    cmd: [systemctl, reload, app]
"#;

    fn load_sample() -> Settings {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, SAMPLE).expect("write settings");
        Settings::load(&path).expect("load settings")
    }

    #[test]
    fn sample_settings_parse_and_validate() {
        let settings = load_sample();
        let specs = settings.object_specs().expect("validate");
        assert_eq!(specs.len(), 3);

        let app = &specs[0];
        assert_eq!(app.key, ObjectKey::from("app-settings"));
        assert_eq!(app.source.backend, BackendKind::Deploy);
        assert_eq!(app.source.format, Format::Yaml);
        assert!(matches!(app.source.identity, SourceIdentity::DeployNames(_)));
        assert_eq!(app.dest.render, RenderSpec::Structured(Format::Json));
        assert_eq!(app.hooks, vec![HookName::from("reload-app")]);
    }

    #[test]
    fn source_format_defaults_to_raw() {
        let settings = load_sample();
        let motd = settings.object_spec("motd").expect("validate");
        assert_eq!(motd.source.format, Format::Raw);
        assert_eq!(motd.source.interval, DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn unknown_key_lists_known_objects() {
        let settings = load_sample();
        let err = settings.object_spec("nope").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("unknown object 'nope'"), "{message}");
        assert!(message.contains("app-settings"), "{message}");
    }

    #[test]
    fn unknown_backend_is_invalid_with_dump() {
        let raw: RawObject = serde_yaml::from_str(
            r#"
source:
  backend: consul
  path: /x
dest:
  path: /tmp/x
  format: raw
"#,
        )
        .expect("parse raw object");
        let err = raw.into_spec("bad").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("invalid object 'bad'"), "{message}");
        assert!(message.contains("unknown backend 'consul'"), "{message}");
        // The dump gives enough context to fix the file.
        assert!(message.contains("backend: consul"), "{message}");
    }

    #[test]
    fn deploy_requires_exactly_one_identity() {
        let raw: RawObject = serde_yaml::from_str(
            r#"
source:
  backend: deploy
  ids: { application: a, environment: e, profile: p }
  names: { application: a, environment: e, profile: p }
dest:
  path: /tmp/x
  format: json
"#,
        )
        .expect("parse raw object");
        let err = raw.into_spec("both").unwrap_err();
        assert!(err.to_string().contains("exactly one of"), "{err}");
    }

    #[test]
    fn template_destination_is_distinguished_by_membership_test() {
        let raw: RawObject = serde_yaml::from_str(
            r#"
source:
  backend: local
  path: /x
dest:
  path: /tmp/x.conf
  format: templates/x.conf.tera
"#,
        )
        .expect("parse raw object");
        let spec = raw.into_spec("tpl").expect("validate");
        assert_eq!(
            spec.dest.render,
            RenderSpec::Template(PathBuf::from("templates/x.conf.tera"))
        );
    }

    #[test]
    fn missing_settings_file_is_io_error() {
        let err = Settings::load(Path::new("/nonexistent/confsync.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
