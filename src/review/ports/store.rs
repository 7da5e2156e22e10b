//! Store port for review records and the column-to-record index.

use crate::integration::domain::{ColumnId, RepoId};
use crate::review::domain::{AcceptanceClaim, ChangeId, ReviewRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for review store operations.
pub type ReviewStoreResult<T> = Result<T, ReviewStoreError>;

/// Persistence contract for review records.
///
/// Acceptance is a three-step protocol so that concurrent replays of the
/// same event issue a single outbound call: [`try_claim_acceptance`] takes
/// an expiring claim on a pending record, then the caller either
/// [`complete_acceptance`] or [`release_claim`].
///
/// [`try_claim_acceptance`]: ReviewRecordStore::try_claim_acceptance
/// [`complete_acceptance`]: ReviewRecordStore::complete_acceptance
/// [`release_claim`]: ReviewRecordStore::release_claim
#[async_trait]
pub trait ReviewRecordStore: Send + Sync {
    /// Stores a record unless one already exists for its change id.
    ///
    /// Returns `true` when the record was inserted.
    async fn insert_if_absent(&self, record: &ReviewRecord) -> ReviewStoreResult<bool>;

    /// Finds a record by change id.
    async fn find(&self, change_id: ChangeId) -> ReviewStoreResult<Option<ReviewRecord>>;

    /// Returns every record of a repository.
    async fn find_by_repo(&self, repo_id: RepoId) -> ReviewStoreResult<Vec<ReviewRecord>>;

    /// Returns every record linked to a watched column.
    async fn find_linked_to(&self, column_id: &ColumnId) -> ReviewStoreResult<Vec<ReviewRecord>>;

    /// Persists the column link of an existing record.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewStoreError::NotFound`] when the record does not exist.
    async fn update_link(&self, record: &ReviewRecord) -> ReviewStoreResult<()>;

    /// Clears the link of every record pointing at `column_id`.
    ///
    /// Returns the number of records unlinked.
    async fn unlink_column(
        &self,
        column_id: &ColumnId,
        now: DateTime<Utc>,
    ) -> ReviewStoreResult<usize>;

    /// Claims a pending record for acceptance on behalf of `claim` until
    /// `lease_until`.
    ///
    /// Returns `false` when the record is missing, already accepted, or
    /// claimed by another caller whose lease has not expired at `now`.
    async fn try_claim_acceptance(
        &self,
        change_id: ChangeId,
        claim: AcceptanceClaim,
        now: DateTime<Utc>,
        lease_until: DateTime<Utc>,
    ) -> ReviewStoreResult<bool>;

    /// Moves a pending record to accepted and clears its claim.
    ///
    /// Returns `false` when the record was no longer pending or `claim` no
    /// longer holds it.
    async fn complete_acceptance(
        &self,
        change_id: ChangeId,
        claim: AcceptanceClaim,
        now: DateTime<Utc>,
    ) -> ReviewStoreResult<bool>;

    /// Drops an acceptance claim without changing status.
    ///
    /// A claim held by another token is left untouched.
    async fn release_claim(
        &self,
        change_id: ChangeId,
        claim: AcceptanceClaim,
    ) -> ReviewStoreResult<()>;
}

/// Errors returned by review store implementations.
#[derive(Debug, Clone, Error)]
pub enum ReviewStoreError {
    /// The record was not found.
    #[error("review record not found: {0}")]
    NotFound(ChangeId),

    /// Persisted data could not be reconstructed into domain types.
    #[error("invalid persisted review data: {0}")]
    InvalidPersistedData(Arc<dyn std::error::Error + Send + Sync>),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl ReviewStoreError {
    /// Wraps persisted-data decoding or validation failures.
    pub fn invalid_persisted_data(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::InvalidPersistedData(Arc::new(err))
    }

    /// Wraps a persistence-layer failure.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
