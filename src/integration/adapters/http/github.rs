//! GitHub implementation of the code-review client port.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::{build_http_client, ensure_success, map_transport_error};
use crate::integration::{
    domain::AccessToken,
    ports::{CodeReviewClient, ExternalApiResult, StatusReport},
};

/// Connection settings for [`GitHubClient`].
#[derive(Clone)]
pub struct GitHubClientConfig {
    /// API root, normally `https://api.github.com`.
    pub api_base: String,
    /// OAuth application client id.
    pub client_id: String,
    /// OAuth application client secret.
    pub client_secret: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// Code-review client backed by the GitHub REST API.
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_base: String,
    client_id: String,
    client_secret: String,
}

impl fmt::Debug for GitHubClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubClientConfig")
            .field("api_base", &self.api_base)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubClient")
            .field("api_base", &self.api_base)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct StatusBody<'a> {
    state: &'a str,
    description: &'a str,
    context: &'a str,
}

#[derive(Serialize)]
struct RevokeBody<'a> {
    access_token: &'a str,
}

impl GitHubClient {
    /// Builds a client from its configuration.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the HTTP client cannot be built.
    pub fn new(config: GitHubClientConfig) -> ExternalApiResult<Self> {
        Ok(Self {
            http: build_http_client(config.timeout)?,
            api_base: config.api_base.trim_end_matches('/').to_owned(),
            client_id: config.client_id,
            client_secret: config.client_secret,
        })
    }
}

#[async_trait]
impl CodeReviewClient for GitHubClient {
    async fn set_status(
        &self,
        token: &AccessToken,
        report: &StatusReport,
    ) -> ExternalApiResult<()> {
        let body = StatusBody {
            state: report.state.as_str(),
            description: &report.description,
            context: &report.context,
        };
        let response = self
            .http
            .post(report.url.as_str())
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header(
                reqwest::header::AUTHORIZATION,
                format!("token {}", token.expose()),
            )
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn revoke_token(&self, token: &AccessToken) -> ExternalApiResult<()> {
        let response = self
            .http
            .delete(format!(
                "{}/applications/{}/token",
                self.api_base, self.client_id
            ))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .json(&RevokeBody {
                access_token: token.expose(),
            })
            .send()
            .await
            .map_err(map_transport_error)?;
        ensure_success(response).await?;
        Ok(())
    }
}
