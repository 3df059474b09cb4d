//! Secret-store configuration source.
//!
//! Change detection is version-based: the poller asks which version marker
//! is currently flagged as "current" and fetches the value only when the
//! marker moves. A cycle with no current version logs a warning and keeps
//! polling; it never fails the loop.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::api::SecretsApi;
use crate::error::BackendError;
use crate::{Backend, Poller};

/// Reads configuration data from one secret in the secret store.
pub struct SecretsBackend {
    api: Arc<dyn SecretsApi>,
    secret_id: String,
    /// Last-seen version marker, updated on every successful fetch.
    version: Mutex<Option<String>>,
}

impl SecretsBackend {
    pub fn new(api: Arc<dyn SecretsApi>, secret_id: String) -> Self {
        tracing::debug!(secret = %secret_id, "initialize secrets backend");
        SecretsBackend {
            api,
            secret_id,
            version: Mutex::new(None),
        }
    }

    fn last_version(&self) -> Option<String> {
        self.version.lock().expect("version marker poisoned").clone()
    }
}

impl fmt::Display for SecretsBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.last_version() {
            Some(version) => write!(f, "{} (version: {version})", self.secret_id),
            None => write!(f, "{}", self.secret_id),
        }
    }
}

#[async_trait]
impl Backend for SecretsBackend {
    async fn get(&self) -> Result<String, BackendError> {
        let payload = self.api.secret_value(&self.secret_id).await?;
        *self.version.lock().expect("version marker poisoned") = payload.version;
        Ok(payload.value)
    }

    async fn watch(&self, interval: Duration) -> Result<Box<dyn Poller>, BackendError> {
        Ok(Box::new(SecretsPoller {
            api: self.api.clone(),
            secret_id: self.secret_id.clone(),
            version: self.last_version(),
            interval,
            sleep_first: false,
        }))
    }
}

/// Poller over the secret's current-version marker.
struct SecretsPoller {
    api: Arc<dyn SecretsApi>,
    secret_id: String,
    version: Option<String>,
    interval: Duration,
    sleep_first: bool,
}

#[async_trait]
impl Poller for SecretsPoller {
    async fn next(&mut self) -> Result<String, BackendError> {
        loop {
            if self.sleep_first {
                tokio::time::sleep(self.interval).await;
            }
            self.sleep_first = true;

            tracing::debug!(secret = %self.secret_id, "poll for secret changes");
            match self.api.current_version(&self.secret_id).await? {
                None => {
                    tracing::warn!(
                        secret = %self.secret_id,
                        "no current version found; skipping cycle",
                    );
                }
                Some(current) if self.version.as_deref() != Some(current.as_str()) => {
                    let payload = self.api.secret_value(&self.secret_id).await?;
                    self.version = Some(current);
                    return Ok(payload.value);
                }
                Some(_) => {}
            }
        }
    }
}
