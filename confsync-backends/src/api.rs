//! Provider API contracts for the remote backends.
//!
//! The wire protocol is opaque to the engine: these traits describe only the
//! calls the backends make and the retry/backoff signals they react to. The
//! production implementation is [`crate::http::HttpProviderClient`]; tests
//! substitute scripted fakes.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors a provider call can signal.
///
/// `RateLimited` never leaves this layer: the deploy watch loop recovers it
/// with a half-interval backoff, and [`crate::BackendError`] has no
/// equivalent variant.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request came too early")]
    RateLimited,

    #[error("{0}")]
    Provider(String),
}

/// Continuation token for a deploy configuration session. Rotates on every
/// successful poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken(pub String);

/// Response to a latest-configuration request.
#[derive(Debug, Clone)]
pub struct LatestConfiguration {
    /// Token to present on the next poll.
    pub next_token: SessionToken,
    /// The configuration payload; `None` (or empty) when nothing changed
    /// since the last poll on this session.
    pub payload: Option<String>,
    /// Provider-suggested sleep before the next poll.
    pub next_poll: Duration,
}

/// One page of a search-by-name lookup.
#[derive(Debug, Clone)]
pub struct IdPage {
    /// IDs whose name matched, in provider-returned order.
    pub ids: Vec<String>,
    /// Opaque cursor for the next page, when there is one.
    pub next_page: Option<String>,
}

/// The paginated name-lookup operations the deploy service offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupOp {
    Applications,
    Environments,
    Profiles,
}

impl fmt::Display for LookupOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupOp::Applications => write!(f, "applications"),
            LookupOp::Environments => write!(f, "environments"),
            LookupOp::Profiles => write!(f, "profiles"),
        }
    }
}

/// RPC surface of the configuration-deployment service.
#[async_trait]
pub trait DeployApi: Send + Sync {
    /// Open a configuration session; the provider enforces `min_interval` as
    /// the minimum poll spacing for the session.
    async fn start_session(
        &self,
        application_id: &str,
        environment_id: &str,
        profile_id: &str,
        min_interval: Duration,
    ) -> Result<SessionToken, ApiError>;

    /// Request the latest configuration for a session.
    async fn latest_configuration(
        &self,
        token: &SessionToken,
    ) -> Result<LatestConfiguration, ApiError>;

    /// One page of a search-by-name lookup. `parent` scopes environments and
    /// profiles to an application ID.
    async fn search_ids(
        &self,
        op: LookupOp,
        name: &str,
        parent: Option<&str>,
        page: Option<&str>,
    ) -> Result<IdPage, ApiError>;
}

/// A secret's current value plus its version marker.
#[derive(Debug, Clone)]
pub struct SecretPayload {
    pub value: String,
    pub version: Option<String>,
}

/// RPC surface of the secret store.
#[async_trait]
pub trait SecretsApi: Send + Sync {
    /// Retrieve the secret's current value.
    async fn secret_value(&self, secret_id: &str) -> Result<SecretPayload, ApiError>;

    /// The version marker currently flagged as "current", when one is.
    async fn current_version(&self, secret_id: &str) -> Result<Option<String>, ApiError>;
}
