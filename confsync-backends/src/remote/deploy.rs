//! Configuration-deployment service source.
//!
//! Sessions carry a rotating continuation token; the provider suggests the
//! sleep before each next poll and signals "request came too early" when a
//! poll violates the session's minimum interval. That rate-limit signal is
//! recovered here with a half-interval backoff and never yielded.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use confsync_core::DeployIdentity;

use crate::api::{ApiError, DeployApi, LookupOp, SessionToken};
use crate::error::BackendError;
use crate::remote::resolver::NameResolver;
use crate::{Backend, Poller};

/// The minimum poll interval the provider accepts for a session.
pub const MINIMUM_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Reads the deployed configuration for one application/environment/profile
/// triple.
pub struct DeployBackend {
    api: Arc<dyn DeployApi>,
    application_id: String,
    environment_id: String,
    profile_id: String,
}

impl DeployBackend {
    pub fn new(
        api: Arc<dyn DeployApi>,
        application_id: String,
        environment_id: String,
        profile_id: String,
    ) -> Self {
        tracing::debug!(
            application = %application_id,
            environment = %environment_id,
            profile = %profile_id,
            "initialize deploy backend",
        );
        DeployBackend {
            api,
            application_id,
            environment_id,
            profile_id,
        }
    }

    /// Construct by resolving friendly names to provider IDs.
    ///
    /// The application name resolves first; environment and profile lookups
    /// are scoped to the resolved application ID.
    pub async fn resolve(
        api: Arc<dyn DeployApi>,
        resolver: &NameResolver,
        names: &DeployIdentity,
    ) -> Result<Self, BackendError> {
        tracing::info!(
            application = %names.application,
            environment = %names.environment,
            profile = %names.profile,
            "resolve deploy identity from friendly names",
        );
        let application_id = resolver
            .resolve(LookupOp::Applications, &names.application, None)
            .await?;
        let environment_id = resolver
            .resolve(
                LookupOp::Environments,
                &names.environment,
                Some(&application_id),
            )
            .await?;
        let profile_id = resolver
            .resolve(LookupOp::Profiles, &names.profile, Some(&application_id))
            .await?;

        Ok(DeployBackend::new(
            api,
            application_id,
            environment_id,
            profile_id,
        ))
    }

    async fn start_session(&self, min_interval: Duration) -> Result<SessionToken, BackendError> {
        self.api
            .start_session(
                &self.application_id,
                &self.environment_id,
                &self.profile_id,
                min_interval,
            )
            .await
            .map_err(BackendError::from)
    }
}

impl fmt::Display for DeployBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "deploy(application='{}', environment='{}', profile='{}')",
            self.application_id, self.environment_id, self.profile_id
        )
    }
}

#[async_trait]
impl Backend for DeployBackend {
    async fn get(&self) -> Result<String, BackendError> {
        tracing::debug!(backend = %self, "retrieve latest configuration");
        let token = self.start_session(MINIMUM_POLL_INTERVAL).await?;
        let latest = self.api.latest_configuration(&token).await?;
        Ok(latest.payload.unwrap_or_default())
    }

    async fn watch(&self, interval: Duration) -> Result<Box<dyn Poller>, BackendError> {
        let token = self.start_session(interval).await?;
        Ok(Box::new(DeployPoller {
            api: self.api.clone(),
            token,
            interval,
            next_delay: None,
        }))
    }
}

/// Poller over a configuration session.
struct DeployPoller {
    api: Arc<dyn DeployApi>,
    token: SessionToken,
    interval: Duration,
    /// Provider-suggested sleep to take before the next request.
    next_delay: Option<Duration>,
}

#[async_trait]
impl Poller for DeployPoller {
    async fn next(&mut self) -> Result<String, BackendError> {
        loop {
            if let Some(delay) = self.next_delay.take() {
                tokio::time::sleep(delay).await;
            }

            tracing::debug!("poll for configuration changes");
            let latest = match self.api.latest_configuration(&self.token).await {
                Ok(latest) => latest,
                Err(ApiError::RateLimited) => {
                    let backoff = self.interval / 2;
                    tracing::debug!(seconds = backoff.as_secs(), "request too early; retrying");
                    self.next_delay = Some(backoff);
                    continue;
                }
                Err(err @ ApiError::Provider(_)) => return Err(err.into()),
            };

            self.token = latest.next_token;
            self.next_delay = Some(latest.next_poll);
            match latest.payload {
                Some(payload) if !payload.is_empty() => return Ok(payload),
                _ => tracing::debug!("no configuration changes"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use tokio::time::Instant;

    use crate::api::LatestConfiguration;

    use super::*;

    /// Scripted deploy API: pops one canned response per poll.
    struct ScriptedDeploy {
        responses: Mutex<Vec<Result<LatestConfiguration, ApiError>>>,
    }

    impl ScriptedDeploy {
        fn new(mut responses: Vec<Result<LatestConfiguration, ApiError>>) -> Self {
            responses.reverse();
            ScriptedDeploy {
                responses: Mutex::new(responses),
            }
        }
    }

    fn ok(payload: Option<&str>, token: &str, next_poll: Duration) -> Result<LatestConfiguration, ApiError> {
        Ok(LatestConfiguration {
            next_token: SessionToken(token.to_string()),
            payload: payload.map(str::to_owned),
            next_poll,
        })
    }

    #[async_trait]
    impl DeployApi for ScriptedDeploy {
        async fn start_session(
            &self,
            _application_id: &str,
            _environment_id: &str,
            _profile_id: &str,
            _min_interval: Duration,
        ) -> Result<SessionToken, ApiError> {
            Ok(SessionToken("initial".to_string()))
        }

        async fn latest_configuration(
            &self,
            _token: &SessionToken,
        ) -> Result<LatestConfiguration, ApiError> {
            self.responses
                .lock()
                .expect("lock")
                .pop()
                .expect("script exhausted")
        }

        async fn search_ids(
            &self,
            _op: LookupOp,
            _name: &str,
            _parent: Option<&str>,
            _page: Option<&str>,
        ) -> Result<crate::api::IdPage, ApiError> {
            unimplemented!("not used by deploy tests")
        }
    }

    fn backend(api: ScriptedDeploy) -> DeployBackend {
        DeployBackend::new(
            Arc::new(api),
            "app-id".to_string(),
            "env-id".to_string(),
            "profile-id".to_string(),
        )
    }

    #[tokio::test]
    async fn get_returns_the_latest_payload() {
        let backend = backend(ScriptedDeploy::new(vec![ok(
            Some("key: value"),
            "t1",
            Duration::from_secs(60),
        )]));
        assert_eq!(backend.get().await.expect("get"), "key: value");
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_backs_off_half_the_interval_and_retries_once() {
        let interval = Duration::from_secs(60);
        let backend = backend(ScriptedDeploy::new(vec![
            Err(ApiError::RateLimited),
            ok(Some("payload"), "t2", interval),
        ]));

        let mut poller = backend.watch(interval).await.expect("watch");
        let started = Instant::now();
        let payload = poller.next().await.expect("poll");

        assert_eq!(payload, "payload");
        assert_eq!(
            started.elapsed(),
            interval / 2,
            "exactly one half-interval backoff before the retry"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn empty_payloads_are_skipped_silently() {
        let interval = Duration::from_secs(60);
        let backend = backend(ScriptedDeploy::new(vec![
            ok(None, "t2", Duration::from_secs(10)),
            ok(Some(""), "t3", Duration::from_secs(10)),
            ok(Some("real"), "t4", interval),
        ]));

        let mut poller = backend.watch(interval).await.expect("watch");
        let started = Instant::now();
        let payload = poller.next().await.expect("poll");

        assert_eq!(payload, "real");
        // Two empty cycles, each followed by the provider-suggested sleep.
        assert_eq!(started.elapsed(), Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn provider_suggested_interval_is_honored_between_yields() {
        let backend = backend(ScriptedDeploy::new(vec![
            ok(Some("first"), "t2", Duration::from_secs(45)),
            ok(Some("second"), "t3", Duration::from_secs(60)),
        ]));

        let mut poller = backend.watch(Duration::from_secs(60)).await.expect("watch");
        assert_eq!(poller.next().await.expect("poll"), "first");

        let started = Instant::now();
        assert_eq!(poller.next().await.expect("poll"), "second");
        assert_eq!(started.elapsed(), Duration::from_secs(45));
    }

    #[tokio::test]
    async fn provider_errors_propagate_verbatim() {
        let backend = backend(ScriptedDeploy::new(vec![Err(ApiError::Provider(
            "access denied for session".to_string(),
        ))]));

        let mut poller = backend.watch(Duration::from_secs(60)).await.expect("watch");
        let err = poller.next().await.unwrap_err();
        assert!(
            matches!(&err, BackendError::Provider { message }
                if message == "access denied for session"),
            "{err}"
        );
    }
}
