//! Repository port for credentials, watched columns, and repositories.

use crate::integration::domain::{
    AccountId, ColumnId, CredentialId, IntegrationCredential, RegisteredRepository, RepoId,
    ServiceKind, WatchedColumn,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for integration repository operations.
pub type IntegrationRepositoryResult<T> = Result<T, IntegrationRepositoryError>;

/// Persistence contract for the integration registry.
#[async_trait]
pub trait IntegrationRepository: Send + Sync {
    /// Stores a new credential.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationRepositoryError::DuplicateCredential`] when the
    /// owner already holds a credential for the same service.
    async fn store_credential(
        &self,
        credential: &IntegrationCredential,
    ) -> IntegrationRepositoryResult<()>;

    /// Persists token or handshake changes to an existing credential.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationRepositoryError::CredentialNotFound`] when the
    /// credential does not exist.
    async fn update_credential(
        &self,
        credential: &IntegrationCredential,
    ) -> IntegrationRepositoryResult<()>;

    /// Finds the credential an owner holds for a service.
    async fn find_credential(
        &self,
        owner: AccountId,
        kind: ServiceKind,
    ) -> IntegrationRepositoryResult<Option<IntegrationCredential>>;

    /// Finds a credential by identifier.
    async fn find_credential_by_id(
        &self,
        id: CredentialId,
    ) -> IntegrationRepositoryResult<Option<IntegrationCredential>>;

    /// Deletes a credential together with every watched column and
    /// registered repository owned through it.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationRepositoryError::CredentialNotFound`] when the
    /// credential does not exist.
    async fn delete_credential(&self, id: CredentialId) -> IntegrationRepositoryResult<()>;

    /// Stores a watched column.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationRepositoryError::DuplicateColumn`] when the column
    /// is already watched, or [`IntegrationRepositoryError::CredentialNotFound`]
    /// when the owning credential does not exist.
    async fn store_watched_column(&self, column: &WatchedColumn)
    -> IntegrationRepositoryResult<()>;

    /// Finds a watched column by column identifier.
    async fn find_watched_column(
        &self,
        column_id: &ColumnId,
    ) -> IntegrationRepositoryResult<Option<WatchedColumn>>;

    /// Returns every column watched through a credential.
    async fn list_watched_columns(
        &self,
        credential_id: CredentialId,
    ) -> IntegrationRepositoryResult<Vec<WatchedColumn>>;

    /// Stores a repository registration.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationRepositoryError::DuplicateRepository`] when the
    /// repository is already registered, or
    /// [`IntegrationRepositoryError::CredentialNotFound`] when the owning
    /// credential does not exist.
    async fn store_repository(
        &self,
        repository: &RegisteredRepository,
    ) -> IntegrationRepositoryResult<()>;

    /// Finds a repository registration.
    async fn find_repository(
        &self,
        repo_id: RepoId,
    ) -> IntegrationRepositoryResult<Option<RegisteredRepository>>;

    /// Returns every repository registered through a credential.
    async fn list_repositories(
        &self,
        credential_id: CredentialId,
    ) -> IntegrationRepositoryResult<Vec<RegisteredRepository>>;
}

/// Errors returned by integration repository implementations.
#[derive(Debug, Clone, Error)]
pub enum IntegrationRepositoryError {
    /// The owner already holds a credential for the service.
    #[error("account {owner} already has a {kind} credential")]
    DuplicateCredential {
        /// Owning account.
        owner: AccountId,
        /// Service kind.
        kind: ServiceKind,
    },

    /// The credential was not found.
    #[error("credential not found: {0}")]
    CredentialNotFound(CredentialId),

    /// The column is already watched.
    #[error("column already watched: {0}")]
    DuplicateColumn(ColumnId),

    /// The repository is already registered.
    #[error("repository already registered: {0}")]
    DuplicateRepository(RepoId),

    /// Persisted data could not be reconstructed into domain types.
    #[error("invalid persisted integration data: {0}")]
    InvalidPersistedData(Arc<dyn std::error::Error + Send + Sync>),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl IntegrationRepositoryError {
    /// Wraps persisted-data decoding or validation failures.
    pub fn invalid_persisted_data(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::InvalidPersistedData(Arc::new(err))
    }

    /// Wraps a persistence-layer failure.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
