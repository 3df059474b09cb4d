//! Configuration sources: pluggable providers with a uniform fetch/poll
//! contract.
//!
//! A [`Backend`] produces configuration payloads. `get` is a one-shot fetch;
//! `watch` returns a [`Poller`], a lazy sequence of payloads driven by
//! repeated `next()` calls. Cancellation is dropping the in-flight `next()`
//! future (e.g. from a `tokio::select!`); pollers hold their provider
//! session or filesystem watch handle internally, so dropping the poller
//! releases it.

pub mod api;
mod error;
pub mod local;
pub mod remote;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use confsync_core::{ProviderSettings, SourceIdentity, SourceSpec};

pub use api::{ApiError, DeployApi, LookupOp, SecretsApi};
pub use error::BackendError;
pub use local::LocalBackend;
pub use remote::deploy::DeployBackend;
pub use remote::http::HttpProviderClient;
pub use remote::resolver::NameResolver;
pub use remote::secrets::SecretsBackend;

/// A lazy sequence of configuration payloads.
#[async_trait]
pub trait Poller: Send {
    /// Wait for and return the next payload. Never yields rate-limit
    /// conditions; provider errors terminate the sequence.
    async fn next(&mut self) -> Result<String, BackendError>;
}

/// A provider of configuration payloads.
#[async_trait]
pub trait Backend: fmt::Display + Send + Sync {
    /// Retrieve the configuration as a raw string.
    async fn get(&self) -> Result<String, BackendError>;

    /// Start watching for changes, polling at `interval` where the provider
    /// needs one.
    async fn watch(&self, interval: Duration) -> Result<Box<dyn Poller>, BackendError>;
}

/// Realizes backends from validated source specs.
///
/// The provider HTTP client and the name-resolution cache are built lazily
/// on first remote use and shared across every backend the factory creates,
/// so repeated controller construction against the same friendly names does
/// not repeat paginated lookups.
pub struct BackendFactory {
    provider: Option<ProviderSettings>,
    shared: std::sync::Mutex<Option<SharedProvider>>,
}

#[derive(Clone)]
struct SharedProvider {
    client: Arc<HttpProviderClient>,
    resolver: Arc<NameResolver>,
}

impl BackendFactory {
    pub fn new(provider: Option<ProviderSettings>) -> Self {
        BackendFactory {
            provider,
            shared: std::sync::Mutex::new(None),
        }
    }

    /// Realize a backend from a validated source spec.
    ///
    /// Friendly names are resolved to provider IDs here, so a `NotFound`
    /// from name resolution fails construction, not the first fetch.
    pub async fn realize(&self, spec: &SourceSpec) -> Result<Box<dyn Backend>, BackendError> {
        match &spec.identity {
            SourceIdentity::File { path } => Ok(Box::new(LocalBackend::new(path.clone()))),
            SourceIdentity::DeployIds(identity) => {
                let shared = self.shared(spec)?;
                Ok(Box::new(DeployBackend::new(
                    shared.client,
                    identity.application.clone(),
                    identity.environment.clone(),
                    identity.profile.clone(),
                )))
            }
            SourceIdentity::DeployNames(identity) => {
                let shared = self.shared(spec)?;
                Ok(Box::new(
                    DeployBackend::resolve(shared.client.clone(), &shared.resolver, identity)
                        .await?,
                ))
            }
            SourceIdentity::Secret { id } => {
                let shared = self.shared(spec)?;
                Ok(Box::new(SecretsBackend::new(shared.client, id.clone())))
            }
        }
    }

    fn shared(&self, spec: &SourceSpec) -> Result<SharedProvider, BackendError> {
        let mut guard = self.shared.lock().expect("provider handle poisoned");
        if let Some(shared) = guard.as_ref() {
            return Ok(shared.clone());
        }

        let settings = self
            .provider
            .as_ref()
            .ok_or(BackendError::ProviderNotConfigured {
                backend: spec.backend,
            })?;
        let token = settings
            .token_env
            .as_ref()
            .and_then(|var| std::env::var(var).ok());
        let client = Arc::new(HttpProviderClient::new(&settings.url, token)?);
        let resolver = Arc::new(NameResolver::new(client.clone()));

        let shared = SharedProvider { client, resolver };
        *guard = Some(shared.clone());
        Ok(shared)
    }
}
