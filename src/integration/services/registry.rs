//! Service layer for linking accounts to external services.

use crate::integration::{
    domain::{
        AccessToken, AccountId, BoardId, ColumnId, IntegrationCredential,
        IntegrationDomainError, RegisteredRepository, RepoId, ServiceKind, WatchedColumn,
    },
    ports::{
        BoardSummary, CodeReviewClient, ColumnSummary, ExternalApiError, IntegrationRepository,
        IntegrationRepositoryError, TaskBoardClient,
    },
};
use crate::review::ports::{ReviewRecordStore, ReviewStoreError};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Request payload for watching a task-board column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchColumnRequest {
    /// Account that owns the task-board credential.
    pub owner: AccountId,
    /// Board the column belongs to.
    pub board_id: String,
    /// Column to watch.
    pub column_id: String,
}

impl WatchColumnRequest {
    /// Creates a watch request.
    #[must_use]
    pub fn new(
        owner: AccountId,
        board_id: impl Into<String>,
        column_id: impl Into<String>,
    ) -> Self {
        Self {
            owner,
            board_id: board_id.into(),
            column_id: column_id.into(),
        }
    }
}

/// Summary of a completed revocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RevocationOutcome {
    /// Watched columns removed with the credential.
    pub columns_removed: usize,
    /// Review records whose column link was cleared.
    pub links_cleared: usize,
    /// External clean-up calls that failed and were only logged.
    pub external_failures: usize,
}

/// Service-level errors for integration registry operations.
#[derive(Debug, Error)]
pub enum IntegrationServiceError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] IntegrationDomainError),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] IntegrationRepositoryError),
    /// Review store operation failed.
    #[error(transparent)]
    ReviewStore(#[from] ReviewStoreError),
    /// An outbound API call failed.
    #[error(transparent)]
    External(#[from] ExternalApiError),
    /// The account has no credential for the service.
    #[error("account {owner} has no {kind} credential")]
    CredentialNotFound {
        /// Owning account.
        owner: AccountId,
        /// Service kind.
        kind: ServiceKind,
    },
    /// The account's credential for the service has no token yet.
    #[error("{kind} integration for account {owner} is not authorized")]
    NotAuthorized {
        /// Owning account.
        owner: AccountId,
        /// Service kind.
        kind: ServiceKind,
    },
    /// The account already holds a live credential for the service.
    #[error("{kind} integration for account {owner} is already linked")]
    AlreadyLinked {
        /// Owning account.
        owner: AccountId,
        /// Service kind.
        kind: ServiceKind,
    },
    /// The column is already watched.
    #[error("column {0} is already watched")]
    ColumnAlreadyWatched(ColumnId),
    /// The repository is registered by a different account.
    #[error("repository {0} is registered by another account")]
    RepositoryOwnedElsewhere(RepoId),
}

impl IntegrationServiceError {
    /// Returns `true` for outcomes that reject a request without touching
    /// state because it conflicts with existing ownership.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::AlreadyLinked { .. }
                | Self::ColumnAlreadyWatched(_)
                | Self::RepositoryOwnedElsewhere(_)
                | Self::Domain(IntegrationDomainError::AlreadyAuthorized(_))
                | Self::Repository(
                    IntegrationRepositoryError::DuplicateCredential { .. }
                        | IntegrationRepositoryError::DuplicateColumn(_)
                        | IntegrationRepositoryError::DuplicateRepository(_)
                )
        )
    }
}

/// Result type for integration registry service operations.
pub type IntegrationServiceResult<T> = Result<T, IntegrationServiceError>;

/// Integration registry orchestration service.
#[derive(Clone)]
pub struct IntegrationRegistryService<R, S, G, T, C>
where
    R: IntegrationRepository,
    S: ReviewRecordStore,
    G: CodeReviewClient,
    T: TaskBoardClient,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    review_store: Arc<S>,
    code_review: Arc<G>,
    task_board: Arc<T>,
    clock: Arc<C>,
    callback_url: String,
}

impl<R, S, G, T, C> IntegrationRegistryService<R, S, G, T, C>
where
    R: IntegrationRepository,
    S: ReviewRecordStore,
    G: CodeReviewClient,
    T: TaskBoardClient,
    C: Clock + Send + Sync,
{
    /// Creates a new registry service.
    ///
    /// `callback_url` is where every watched column's webhook delivers card
    /// events. It must be the URL the inbound Trello signature check signs
    /// against, i.e. `AppConfig::trello_callback_url`.
    #[must_use]
    pub fn new(
        repository: Arc<R>,
        review_store: Arc<S>,
        code_review: Arc<G>,
        task_board: Arc<T>,
        clock: Arc<C>,
        callback_url: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            review_store,
            code_review,
            task_board,
            clock,
            callback_url: callback_url.into(),
        }
    }

    /// Returns the callback URL registered for watched columns.
    #[must_use]
    pub fn callback_url(&self) -> &str {
        &self.callback_url
    }

    async fn live_credential(
        &self,
        owner: AccountId,
        kind: ServiceKind,
    ) -> IntegrationServiceResult<(IntegrationCredential, AccessToken)> {
        let credential = self
            .repository
            .find_credential(owner, kind)
            .await?
            .ok_or(IntegrationServiceError::CredentialNotFound { owner, kind })?;
        let token = credential
            .token()
            .cloned()
            .ok_or(IntegrationServiceError::NotAuthorized { owner, kind })?;
        Ok((credential, token))
    }

    /// Starts an authorization handshake.
    ///
    /// A pending credential is reused with a fresh nonce; otherwise a new one
    /// is stored.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationServiceError::AlreadyLinked`] when a live
    /// credential exists, or persistence errors.
    pub async fn begin_authorization(
        &self,
        owner: AccountId,
        kind: ServiceKind,
    ) -> IntegrationServiceResult<IntegrationCredential> {
        match self.repository.find_credential(owner, kind).await? {
            Some(credential) if credential.is_live() => {
                Err(IntegrationServiceError::AlreadyLinked { owner, kind })
            }
            Some(mut credential) => {
                credential.restart_handshake(&*self.clock)?;
                self.repository.update_credential(&credential).await?;
                Ok(credential)
            }
            None => {
                let credential = IntegrationCredential::pending(owner, kind, &*self.clock);
                self.repository.store_credential(&credential).await?;
                Ok(credential)
            }
        }
    }

    /// Completes a handshake by storing the token the service issued.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationServiceError::CredentialNotFound`] when no
    /// handshake was started, [`IntegrationServiceError::AlreadyLinked`] for
    /// live credentials, domain errors for nonce mismatches or empty tokens,
    /// and persistence errors.
    pub async fn complete_authorization(
        &self,
        owner: AccountId,
        kind: ServiceKind,
        returned_state: &str,
        token: &str,
    ) -> IntegrationServiceResult<IntegrationCredential> {
        let mut credential = self
            .repository
            .find_credential(owner, kind)
            .await?
            .ok_or(IntegrationServiceError::CredentialNotFound { owner, kind })?;
        if credential.is_live() {
            return Err(IntegrationServiceError::AlreadyLinked { owner, kind });
        }
        let token = AccessToken::new(token)?;
        credential.complete_handshake(returned_state, token, &*self.clock)?;
        self.repository.update_credential(&credential).await?;
        info!(%owner, %kind, "integration authorized");
        Ok(credential)
    }

    /// Stores a token delivered directly, without a redirect handshake.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationServiceError::AlreadyLinked`] when a live
    /// credential exists, domain errors for empty tokens, and persistence
    /// errors.
    pub async fn register_credential(
        &self,
        owner: AccountId,
        kind: ServiceKind,
        token: &str,
    ) -> IntegrationServiceResult<IntegrationCredential> {
        let token = AccessToken::new(token)?;
        match self.repository.find_credential(owner, kind).await? {
            Some(credential) if credential.is_live() => {
                Err(IntegrationServiceError::AlreadyLinked { owner, kind })
            }
            Some(mut credential) => {
                credential.authorize(token, &*self.clock)?;
                self.repository.update_credential(&credential).await?;
                Ok(credential)
            }
            None => {
                let credential =
                    IntegrationCredential::authorized(owner, kind, token, &*self.clock);
                self.repository.store_credential(&credential).await?;
                Ok(credential)
            }
        }
    }

    /// Unlinks an account from a service.
    ///
    /// Webhook deletion and token revocation are attempted first; their
    /// failures are logged and counted but never block the local cascade.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationServiceError::CredentialNotFound`] when the
    /// account holds no credential for the service, or persistence errors.
    pub async fn revoke(
        &self,
        owner: AccountId,
        kind: ServiceKind,
    ) -> IntegrationServiceResult<RevocationOutcome> {
        let credential = self
            .repository
            .find_credential(owner, kind)
            .await?
            .ok_or(IntegrationServiceError::CredentialNotFound { owner, kind })?;
        let columns = self.repository.list_watched_columns(credential.id()).await?;
        let mut outcome = RevocationOutcome {
            columns_removed: columns.len(),
            ..RevocationOutcome::default()
        };

        if let Some(token) = credential.token() {
            outcome.external_failures = self.release_remote_resources(kind, token, &columns).await;
        }

        let now = self.clock.utc();
        for column in &columns {
            outcome.links_cleared += self
                .review_store
                .unlink_column(column.column_id(), now)
                .await?;
        }
        self.repository.delete_credential(credential.id()).await?;

        info!(
            %owner,
            %kind,
            columns_removed = outcome.columns_removed,
            links_cleared = outcome.links_cleared,
            external_failures = outcome.external_failures,
            "integration revoked"
        );
        Ok(outcome)
    }

    async fn release_remote_resources(
        &self,
        kind: ServiceKind,
        token: &AccessToken,
        columns: &[WatchedColumn],
    ) -> usize {
        let mut failures = 0;
        for column in columns {
            let Some(webhook_id) = column.webhook_id() else {
                continue;
            };
            if let Err(err) = self.task_board.delete_webhook(token, webhook_id).await {
                warn!(
                    column_id = %column.column_id(),
                    %webhook_id,
                    error = %err,
                    "failed to delete task-board webhook during revoke"
                );
                failures += 1;
            }
        }

        let revoked = match kind {
            ServiceKind::CodeReview => self.code_review.revoke_token(token).await,
            ServiceKind::TaskBoard => self.task_board.revoke_token(token).await,
        };
        if let Err(err) = revoked {
            warn!(%kind, error = %err, "failed to revoke external token");
            failures += 1;
        }
        failures
    }

    /// Registers a code-review repository under the owner's credential.
    ///
    /// Registering the same repository twice for the same owner returns the
    /// existing registration.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationServiceError::RepositoryOwnedElsewhere`] when a
    /// different credential registered it, credential lookup errors when the
    /// owner has no live code-review credential, and persistence errors.
    pub async fn register_repository(
        &self,
        owner: AccountId,
        repo_id: u64,
    ) -> IntegrationServiceResult<RegisteredRepository> {
        let repo_id = RepoId::new(repo_id)?;
        let (credential, _) = self.live_credential(owner, ServiceKind::CodeReview).await?;

        if let Some(existing) = self.repository.find_repository(repo_id).await? {
            if existing.credential_id() == credential.id() {
                return Ok(existing);
            }
            return Err(IntegrationServiceError::RepositoryOwnedElsewhere(repo_id));
        }

        let registration = RegisteredRepository::new(repo_id, credential.id(), &*self.clock);
        self.repository.store_repository(&registration).await?;
        Ok(registration)
    }

    /// Subscribes to card moves on a column and records it as watched.
    ///
    /// The remote webhook is created before anything is stored; if storing
    /// then fails the webhook is deleted again on a best-effort basis.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationServiceError::ColumnAlreadyWatched`] for watched
    /// columns, credential lookup errors when the owner has no live
    /// task-board credential, external errors from webhook creation, and
    /// persistence errors.
    pub async fn watch_column(
        &self,
        request: WatchColumnRequest,
    ) -> IntegrationServiceResult<WatchedColumn> {
        let board_id = BoardId::new(request.board_id)?;
        let column_id = ColumnId::new(request.column_id)?;
        let (credential, token) = self
            .live_credential(request.owner, ServiceKind::TaskBoard)
            .await?;

        if self.repository.find_watched_column(&column_id).await?.is_some() {
            return Err(IntegrationServiceError::ColumnAlreadyWatched(column_id));
        }

        let webhook_id = self
            .task_board
            .create_webhook(&token, &column_id, &self.callback_url)
            .await?;
        let column = WatchedColumn::new(
            column_id,
            credential.id(),
            board_id,
            Some(webhook_id.clone()),
            &*self.clock,
        );

        if let Err(err) = self.repository.store_watched_column(&column).await {
            if let Err(cleanup) = self.task_board.delete_webhook(&token, &webhook_id).await {
                warn!(
                    %webhook_id,
                    error = %cleanup,
                    "failed to delete orphaned task-board webhook"
                );
            }
            return Err(err.into());
        }
        Ok(column)
    }

    /// Lists the boards visible to the owner's task-board credential.
    ///
    /// # Errors
    ///
    /// Returns credential lookup errors or external errors.
    pub async fn list_boards(
        &self,
        owner: AccountId,
    ) -> IntegrationServiceResult<Vec<BoardSummary>> {
        let (_, token) = self.live_credential(owner, ServiceKind::TaskBoard).await?;
        Ok(self.task_board.list_boards(&token).await?)
    }

    /// Lists the columns of one board.
    ///
    /// # Errors
    ///
    /// Returns domain errors for invalid board ids, credential lookup errors,
    /// or external errors.
    pub async fn list_columns(
        &self,
        owner: AccountId,
        board_id: &str,
    ) -> IntegrationServiceResult<Vec<ColumnSummary>> {
        let board_id = BoardId::new(board_id)?;
        let (_, token) = self.live_credential(owner, ServiceKind::TaskBoard).await?;
        Ok(self.task_board.list_columns(&token, &board_id).await?)
    }
}
