//! JSON-over-HTTP implementation of the provider APIs.
//!
//! Endpoint layout (relative to the configured base URL):
//!
//! | call | endpoint |
//! |---|---|
//! | start session | `POST v1/deploy/sessions` |
//! | latest configuration | `GET v1/deploy/configuration?token=` |
//! | search IDs | `GET v1/deploy/{applications,environments,profiles}?name=&parent=&page=` |
//! | secret value | `GET v1/secrets/{id}/value` |
//! | current version | `GET v1/secrets/{id}/versions/current` |
//!
//! HTTP 429 maps to [`ApiError::RateLimited`]; any other non-success status
//! becomes [`ApiError::Provider`] carrying the response body verbatim.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};

use crate::api::{
    ApiError, DeployApi, IdPage, LatestConfiguration, LookupOp, SecretPayload, SecretsApi,
    SessionToken,
};
use crate::error::BackendError;

/// Shared client for both remote backends. Cheap to clone via `Arc`;
/// controllers targeting the same provider share one instance.
#[derive(Debug)]
pub struct HttpProviderClient {
    http: Client,
    base: Url,
    token: Option<String>,
}

impl HttpProviderClient {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, BackendError> {
        let base = Url::parse(base_url).map_err(|err| BackendError::Provider {
            message: format!("invalid provider URL '{base_url}': {err}"),
        })?;
        let http = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|err| BackendError::Provider {
                message: err.to_string(),
            })?;
        Ok(HttpProviderClient { http, base, token })
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path)
            .map_err(|err| ApiError::Provider(format!("invalid endpoint '{path}': {err}")))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check(&self, response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ApiError::RateLimited);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Provider(format!("{status}: {body}")))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let response = self
            .authorize(self.http.get(url))
            .send()
            .await
            .map_err(|err| ApiError::Provider(err.to_string()))?;
        self.check(response)
            .await?
            .json()
            .await
            .map_err(|err| ApiError::Provider(err.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct StartSessionRequest<'a> {
    application: &'a str,
    environment: &'a str,
    profile: &'a str,
    min_poll_seconds: u64,
}

#[derive(Deserialize)]
struct SessionResponse {
    token: String,
}

#[derive(Deserialize)]
struct ConfigurationResponse {
    token: String,
    #[serde(default)]
    payload: Option<String>,
    next_poll_seconds: u64,
}

#[derive(Deserialize)]
struct IdPageResponse {
    ids: Vec<String>,
    #[serde(default)]
    next_page: Option<String>,
}

#[derive(Deserialize)]
struct SecretValueResponse {
    value: String,
    #[serde(default)]
    version: Option<String>,
}

#[derive(Deserialize)]
struct CurrentVersionResponse {
    #[serde(default)]
    version: Option<String>,
}

// ---------------------------------------------------------------------------
// Trait implementations
// ---------------------------------------------------------------------------

#[async_trait]
impl DeployApi for HttpProviderClient {
    async fn start_session(
        &self,
        application_id: &str,
        environment_id: &str,
        profile_id: &str,
        min_interval: Duration,
    ) -> Result<SessionToken, ApiError> {
        let url = self.url("v1/deploy/sessions")?;
        let request = StartSessionRequest {
            application: application_id,
            environment: environment_id,
            profile: profile_id,
            min_poll_seconds: min_interval.as_secs(),
        };
        let response = self
            .authorize(self.http.post(url).json(&request))
            .send()
            .await
            .map_err(|err| ApiError::Provider(err.to_string()))?;
        let session: SessionResponse = self
            .check(response)
            .await?
            .json()
            .await
            .map_err(|err| ApiError::Provider(err.to_string()))?;
        Ok(SessionToken(session.token))
    }

    async fn latest_configuration(
        &self,
        token: &SessionToken,
    ) -> Result<LatestConfiguration, ApiError> {
        let mut url = self.url("v1/deploy/configuration")?;
        url.query_pairs_mut().append_pair("token", &token.0);

        let response: ConfigurationResponse = self.get_json(url).await?;
        Ok(LatestConfiguration {
            next_token: SessionToken(response.token),
            payload: response.payload,
            next_poll: Duration::from_secs(response.next_poll_seconds),
        })
    }

    async fn search_ids(
        &self,
        op: LookupOp,
        name: &str,
        parent: Option<&str>,
        page: Option<&str>,
    ) -> Result<IdPage, ApiError> {
        let mut url = self.url(&format!("v1/deploy/{op}"))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("name", name);
            if let Some(parent) = parent {
                query.append_pair("parent", parent);
            }
            if let Some(page) = page {
                query.append_pair("page", page);
            }
        }

        let response: IdPageResponse = self.get_json(url).await?;
        Ok(IdPage {
            ids: response.ids,
            next_page: response.next_page,
        })
    }
}

#[async_trait]
impl SecretsApi for HttpProviderClient {
    async fn secret_value(&self, secret_id: &str) -> Result<SecretPayload, ApiError> {
        let url = self.url(&format!("v1/secrets/{secret_id}/value"))?;
        let response: SecretValueResponse = self.get_json(url).await?;
        Ok(SecretPayload {
            value: response.value,
            version: response.version,
        })
    }

    async fn current_version(&self, secret_id: &str) -> Result<Option<String>, ApiError> {
        let url = self.url(&format!("v1/secrets/{secret_id}/versions/current"))?;
        let response: CurrentVersionResponse = self.get_json(url).await?;
        Ok(response.version)
    }
}
