//! Trello implementation of the task-board client port.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{build_http_client, ensure_success, map_transport_error};
use crate::integration::{
    domain::{AccessToken, BoardId, ColumnId, WebhookId},
    ports::{BoardSummary, ColumnSummary, ExternalApiError, ExternalApiResult, TaskBoardClient},
};

/// Connection settings for [`TrelloClient`].
#[derive(Debug, Clone)]
pub struct TrelloClientConfig {
    /// API root, normally `https://api.trello.com/1`.
    pub api_base: String,
    /// Application API key.
    pub api_key: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// Task-board client backed by the Trello REST API.
#[derive(Debug, Clone)]
pub struct TrelloClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
}

#[derive(Deserialize)]
struct CreatedWebhook {
    id: String,
}

#[derive(Deserialize)]
struct NamedEntity {
    id: String,
    name: String,
}

impl TrelloClient {
    /// Builds a client from its configuration.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the HTTP client cannot be built.
    pub fn new(config: TrelloClientConfig) -> ExternalApiResult<Self> {
        Ok(Self {
            http: build_http_client(config.timeout)?,
            api_base: config.api_base.trim_end_matches('/').to_owned(),
            api_key: config.api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }

    async fn fetch_named(
        &self,
        token: &AccessToken,
        path: &str,
    ) -> ExternalApiResult<Vec<NamedEntity>> {
        let response = self
            .http
            .get(self.url(path))
            .query(&[
                ("key", self.api_key.as_str()),
                ("token", token.expose()),
                ("fields", "name"),
            ])
            .send()
            .await
            .map_err(map_transport_error)?;
        ensure_success(response)
            .await?
            .json::<Vec<NamedEntity>>()
            .await
            .map_err(|err| ExternalApiError::Decode(err.to_string()))
    }
}

fn decode_id<T>(
    value: String,
    build: impl FnOnce(String) -> Result<T, crate::integration::domain::IntegrationDomainError>,
) -> ExternalApiResult<T> {
    build(value).map_err(|err| ExternalApiError::Decode(err.to_string()))
}

#[async_trait]
impl TaskBoardClient for TrelloClient {
    async fn create_webhook(
        &self,
        token: &AccessToken,
        column_id: &ColumnId,
        callback_url: &str,
    ) -> ExternalApiResult<WebhookId> {
        let description = format!("product sign-off for column {column_id}");
        let response = self
            .http
            .post(self.url("webhooks"))
            .query(&[
                ("key", self.api_key.as_str()),
                ("token", token.expose()),
                ("idModel", column_id.as_str()),
                ("callbackURL", callback_url),
                ("description", description.as_str()),
            ])
            .send()
            .await
            .map_err(map_transport_error)?;
        let created = ensure_success(response)
            .await?
            .json::<CreatedWebhook>()
            .await
            .map_err(|err| ExternalApiError::Decode(err.to_string()))?;
        decode_id(created.id, WebhookId::new)
    }

    async fn delete_webhook(
        &self,
        token: &AccessToken,
        webhook_id: &WebhookId,
    ) -> ExternalApiResult<()> {
        let response = self
            .http
            .delete(self.url(&format!("webhooks/{webhook_id}")))
            .query(&[("key", self.api_key.as_str()), ("token", token.expose())])
            .send()
            .await
            .map_err(map_transport_error)?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn revoke_token(&self, token: &AccessToken) -> ExternalApiResult<()> {
        let response = self
            .http
            .delete(self.url(&format!("tokens/{}", token.expose())))
            .query(&[("key", self.api_key.as_str()), ("token", token.expose())])
            .send()
            .await
            .map_err(map_transport_error)?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn list_boards(&self, token: &AccessToken) -> ExternalApiResult<Vec<BoardSummary>> {
        self.fetch_named(token, "members/me/boards")
            .await?
            .into_iter()
            .map(|entity| {
                Ok(BoardSummary {
                    id: decode_id(entity.id, BoardId::new)?,
                    name: entity.name,
                })
            })
            .collect()
    }

    async fn list_columns(
        &self,
        token: &AccessToken,
        board_id: &BoardId,
    ) -> ExternalApiResult<Vec<ColumnSummary>> {
        self.fetch_named(token, &format!("boards/{board_id}/lists"))
            .await?
            .into_iter()
            .map(|entity| {
                Ok(ColumnSummary {
                    id: decode_id(entity.id, ColumnId::new)?,
                    name: entity.name,
                })
            })
            .collect()
    }
}
