//! Recording outbound clients for deterministic flows and tests.
//!
//! Both clients remember every call they receive and can be told to fail,
//! which lets tests assert on exactly-once delivery and on error handling
//! without network access.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use crate::integration::{
    domain::{AccessToken, BoardId, ColumnId, WebhookId},
    ports::{
        BoardSummary, CodeReviewClient, ColumnSummary, ExternalApiError, ExternalApiResult,
        StatusReport, TaskBoardClient,
    },
};

fn lock_error(err: impl ToString) -> ExternalApiError {
    ExternalApiError::transport(std::io::Error::other(err.to_string()))
}

/// Status report captured by [`RecordingCodeReviewClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedStatus {
    /// Token that authorized the call.
    pub token: String,
    /// Report that was sent.
    pub report: StatusReport,
}

/// Code-review client that records status reports instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct RecordingCodeReviewClient {
    state: Arc<RwLock<CodeReviewState>>,
}

#[derive(Debug, Default)]
struct CodeReviewState {
    reports: Vec<RecordedStatus>,
    revoked: Vec<String>,
    failure: Option<ExternalApiError>,
    delay: Option<Duration>,
}

impl RecordingCodeReviewClient {
    /// Creates a client with no recorded calls.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> ExternalApiResult<RwLockReadGuard<'_, CodeReviewState>> {
        self.state.read().map_err(lock_error)
    }

    fn write(&self) -> ExternalApiResult<RwLockWriteGuard<'_, CodeReviewState>> {
        self.state.write().map_err(lock_error)
    }

    /// Makes every subsequent call fail with `error` until
    /// [`recover`](Self::recover) is called.
    ///
    /// # Errors
    ///
    /// Returns a transport error when lock acquisition fails.
    pub fn fail_with(&self, error: ExternalApiError) -> ExternalApiResult<()> {
        self.write()?.failure = Some(error);
        Ok(())
    }

    /// Clears an injected failure.
    ///
    /// # Errors
    ///
    /// Returns a transport error when lock acquisition fails.
    pub fn recover(&self) -> ExternalApiResult<()> {
        self.write()?.failure = None;
        Ok(())
    }

    /// Delays every status report by `delay` before recording it.
    ///
    /// # Errors
    ///
    /// Returns a transport error when lock acquisition fails.
    pub fn set_delay(&self, delay: Duration) -> ExternalApiResult<()> {
        self.write()?.delay = Some(delay);
        Ok(())
    }

    /// Returns every successfully recorded status report, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a transport error when lock acquisition fails.
    pub fn reports(&self) -> ExternalApiResult<Vec<RecordedStatus>> {
        Ok(self.read()?.reports.clone())
    }

    /// Returns every revoked token value.
    ///
    /// # Errors
    ///
    /// Returns a transport error when lock acquisition fails.
    pub fn revoked_tokens(&self) -> ExternalApiResult<Vec<String>> {
        Ok(self.read()?.revoked.clone())
    }
}

#[async_trait]
impl CodeReviewClient for RecordingCodeReviewClient {
    async fn set_status(
        &self,
        token: &AccessToken,
        report: &StatusReport,
    ) -> ExternalApiResult<()> {
        let delay = self.read()?.delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.write()?;
        if let Some(failure) = state.failure.clone() {
            return Err(failure);
        }
        state.reports.push(RecordedStatus {
            token: token.expose().to_owned(),
            report: report.clone(),
        });
        Ok(())
    }

    async fn revoke_token(&self, token: &AccessToken) -> ExternalApiResult<()> {
        let mut state = self.write()?;
        if let Some(failure) = state.failure.clone() {
            return Err(failure);
        }
        state.revoked.push(token.expose().to_owned());
        Ok(())
    }
}

/// Task-board client that keeps webhooks and board catalogs in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingTaskBoardClient {
    state: Arc<RwLock<TaskBoardState>>,
}

#[derive(Debug, Default)]
struct TaskBoardState {
    next_webhook: u64,
    webhooks: BTreeMap<WebhookId, (ColumnId, String)>,
    deleted: Vec<WebhookId>,
    revoked: Vec<String>,
    boards: Vec<BoardSummary>,
    columns: HashMap<BoardId, Vec<ColumnSummary>>,
    failure: Option<ExternalApiError>,
}

impl RecordingTaskBoardClient {
    /// Creates a client with no boards and no webhooks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> ExternalApiResult<RwLockReadGuard<'_, TaskBoardState>> {
        self.state.read().map_err(lock_error)
    }

    fn write(&self) -> ExternalApiResult<RwLockWriteGuard<'_, TaskBoardState>> {
        self.state.write().map_err(lock_error)
    }

    /// Adds a board and its columns to the catalog.
    ///
    /// # Errors
    ///
    /// Returns a transport error when lock acquisition fails.
    pub fn add_board(
        &self,
        board: BoardSummary,
        columns: Vec<ColumnSummary>,
    ) -> ExternalApiResult<()> {
        let mut state = self.write()?;
        state.columns.insert(board.id.clone(), columns);
        state.boards.push(board);
        Ok(())
    }

    /// Makes every subsequent call fail with `error` until
    /// [`recover`](Self::recover) is called.
    ///
    /// # Errors
    ///
    /// Returns a transport error when lock acquisition fails.
    pub fn fail_with(&self, error: ExternalApiError) -> ExternalApiResult<()> {
        self.write()?.failure = Some(error);
        Ok(())
    }

    /// Clears an injected failure.
    ///
    /// # Errors
    ///
    /// Returns a transport error when lock acquisition fails.
    pub fn recover(&self) -> ExternalApiResult<()> {
        self.write()?.failure = None;
        Ok(())
    }

    /// Returns the column and callback URL of each live webhook.
    ///
    /// # Errors
    ///
    /// Returns a transport error when lock acquisition fails.
    pub fn active_webhooks(&self) -> ExternalApiResult<Vec<(WebhookId, ColumnId, String)>> {
        Ok(self
            .read()?
            .webhooks
            .iter()
            .map(|(id, (column, callback))| (id.clone(), column.clone(), callback.clone()))
            .collect())
    }

    /// Returns every deleted webhook identifier.
    ///
    /// # Errors
    ///
    /// Returns a transport error when lock acquisition fails.
    pub fn deleted_webhooks(&self) -> ExternalApiResult<Vec<WebhookId>> {
        Ok(self.read()?.deleted.clone())
    }

    /// Returns every revoked token value.
    ///
    /// # Errors
    ///
    /// Returns a transport error when lock acquisition fails.
    pub fn revoked_tokens(&self) -> ExternalApiResult<Vec<String>> {
        Ok(self.read()?.revoked.clone())
    }

    fn check_failure(state: &TaskBoardState) -> ExternalApiResult<()> {
        state.failure.clone().map_or(Ok(()), Err)
    }
}

#[async_trait]
impl TaskBoardClient for RecordingTaskBoardClient {
    async fn create_webhook(
        &self,
        _token: &AccessToken,
        column_id: &ColumnId,
        callback_url: &str,
    ) -> ExternalApiResult<WebhookId> {
        let mut state = self.write()?;
        Self::check_failure(&state)?;
        state.next_webhook += 1;
        let webhook_id = WebhookId::new(format!("hook-{}", state.next_webhook))
            .map_err(|err| ExternalApiError::Decode(err.to_string()))?;
        state.webhooks.insert(
            webhook_id.clone(),
            (column_id.clone(), callback_url.to_owned()),
        );
        Ok(webhook_id)
    }

    async fn delete_webhook(
        &self,
        _token: &AccessToken,
        webhook_id: &WebhookId,
    ) -> ExternalApiResult<()> {
        let mut state = self.write()?;
        Self::check_failure(&state)?;
        if state.webhooks.remove(webhook_id).is_none() {
            return Err(ExternalApiError::UnexpectedStatus {
                status: 404,
                body: format!("unknown webhook {webhook_id}"),
            });
        }
        state.deleted.push(webhook_id.clone());
        Ok(())
    }

    async fn revoke_token(&self, token: &AccessToken) -> ExternalApiResult<()> {
        let mut state = self.write()?;
        Self::check_failure(&state)?;
        state.revoked.push(token.expose().to_owned());
        Ok(())
    }

    async fn list_boards(&self, _token: &AccessToken) -> ExternalApiResult<Vec<BoardSummary>> {
        let state = self.read()?;
        Self::check_failure(&state)?;
        Ok(state.boards.clone())
    }

    async fn list_columns(
        &self,
        _token: &AccessToken,
        board_id: &BoardId,
    ) -> ExternalApiResult<Vec<ColumnSummary>> {
        let state = self.read()?;
        Self::check_failure(&state)?;
        state
            .columns
            .get(board_id)
            .cloned()
            .ok_or_else(|| ExternalApiError::UnexpectedStatus {
                status: 404,
                body: format!("unknown board {board_id}"),
            })
    }
}
