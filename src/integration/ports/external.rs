//! Outbound capability ports for the code-review and task-board services.
//!
//! Both ports take the caller's [`AccessToken`] explicitly so that adapters
//! hold no per-account state and the reconciler decides which credential
//! authorizes each call.

use crate::integration::domain::{AccessToken, BoardId, ColumnId, WebhookId};
use crate::review::domain::StatusReportUrl;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Result type for outbound API calls.
pub type ExternalApiResult<T> = Result<T, ExternalApiError>;

/// Commit status states understood by the code-review service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommitState {
    /// The change still needs product review.
    Pending,
    /// The change has been accepted.
    Success,
}

impl CommitState {
    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
        }
    }
}

impl fmt::Display for CommitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Commit status posted to a change's status-report URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    /// Status-report endpoint for the change's head revision.
    pub url: StatusReportUrl,
    /// Reported state.
    pub state: CommitState,
    /// Human-readable description.
    pub description: String,
    /// Context label identifying this integration.
    pub context: String,
}

/// Board summary returned by the task board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardSummary {
    /// Board identifier.
    pub id: BoardId,
    /// Board display name.
    pub name: String,
}

/// Column summary returned by the task board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSummary {
    /// Column identifier.
    pub id: ColumnId,
    /// Column display name.
    pub name: String,
}

/// Code-review service capabilities.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CodeReviewClient: Send + Sync {
    /// Sets a commit status on the code-review service.
    async fn set_status(&self, token: &AccessToken, report: &StatusReport)
    -> ExternalApiResult<()>;

    /// Revokes an access token previously granted to this integration.
    async fn revoke_token(&self, token: &AccessToken) -> ExternalApiResult<()>;
}

/// Task-board service capabilities.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskBoardClient: Send + Sync {
    /// Subscribes `callback_url` to events on a column.
    async fn create_webhook(
        &self,
        token: &AccessToken,
        column_id: &ColumnId,
        callback_url: &str,
    ) -> ExternalApiResult<WebhookId>;

    /// Removes a webhook subscription.
    async fn delete_webhook(
        &self,
        token: &AccessToken,
        webhook_id: &WebhookId,
    ) -> ExternalApiResult<()>;

    /// Revokes an access token previously granted to this integration.
    async fn revoke_token(&self, token: &AccessToken) -> ExternalApiResult<()>;

    /// Lists boards visible to the token holder.
    async fn list_boards(&self, token: &AccessToken) -> ExternalApiResult<Vec<BoardSummary>>;

    /// Lists the columns of a board.
    async fn list_columns(
        &self,
        token: &AccessToken,
        board_id: &BoardId,
    ) -> ExternalApiResult<Vec<ColumnSummary>>;
}

/// Errors returned by outbound API adapters.
#[derive(Debug, Clone, Error)]
pub enum ExternalApiError {
    /// The service answered with a non-success status code.
    #[error("unexpected HTTP status {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated by the adapter.
        body: String,
    },

    /// The call did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The request could not be sent or the response could not be read.
    #[error("transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),

    /// The response body did not have the expected shape.
    #[error("unexpected response payload: {0}")]
    Decode(String),
}

impl ExternalApiError {
    /// Wraps a transport-layer failure.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}
