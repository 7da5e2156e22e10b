//! Error taxonomy for event reconciliation.

use super::payload::PayloadError;
use crate::integration::domain::{AccountId, ColumnId, RepoId, ServiceKind};
use crate::integration::ports::{ExternalApiError, IntegrationRepositoryError};
use crate::review::domain::ChangeId;
use crate::review::ports::ReviewStoreError;
use thiserror::Error;

/// Broad classification of a reconciliation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReconcileErrorKind {
    /// Malformed inbound payload.
    Validation,
    /// A referenced repository, column, credential, or record is absent.
    NotFound,
    /// The request conflicts with existing ownership or state.
    Conflict,
    /// The compensating call to the other service failed or timed out.
    ExternalCall,
    /// Local persistence failed.
    Persistence,
    /// The reconciler is misconfigured.
    Internal,
}

/// How the sender of an inbound event should be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Disposition {
    /// Acknowledge the delivery; redelivery cannot change the outcome.
    Acknowledge,
    /// Ask the sender to redeliver.
    Retry,
}

/// Errors returned by the event reconciler.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The inbound payload failed validation.
    #[error(transparent)]
    Validation(#[from] PayloadError),

    /// The repository is not registered by any account.
    #[error("repository {0} is not registered")]
    RepositoryNotRegistered(RepoId),

    /// The column is not watched.
    #[error("column {0} is not watched")]
    ColumnNotWatched(ColumnId),

    /// No record exists for the change.
    #[error("no review record for change {0}")]
    ChangeNotFound(ChangeId),

    /// The credential needed for the call is missing or has no token.
    #[error("no live {kind} credential for account {owner}")]
    CredentialUnavailable {
        /// Account whose credential was needed.
        owner: AccountId,
        /// Service kind.
        kind: ServiceKind,
    },

    /// A credential referenced by a registration no longer exists.
    #[error("credential behind {0} is missing")]
    DanglingRegistration(String),

    /// The column belongs to a different account.
    #[error("column {0} is owned by another account")]
    ColumnOwnedElsewhere(ColumnId),

    /// The repository belongs to a different account.
    #[error("repository {0} is owned by another account")]
    RepositoryOwnedElsewhere(RepoId),

    /// The record has already been accepted.
    #[error("change {0} has already been accepted")]
    AlreadyAccepted(ChangeId),

    /// The status description template failed to render.
    #[error("failed to render status description: {0}")]
    TemplateRender(String),

    /// The acceptance claim lease cannot guard an outbound call.
    #[error("invalid acceptance claim lease: {0}")]
    InvalidClaimLease(String),

    /// The outbound status call failed.
    #[error("status report failed: {0}")]
    ExternalCall(#[from] ExternalApiError),

    /// Registry persistence failed.
    #[error(transparent)]
    Registry(#[from] IntegrationRepositoryError),

    /// Review store persistence failed.
    #[error(transparent)]
    ReviewStore(#[from] ReviewStoreError),
}

impl ReconcileError {
    /// Returns the broad classification of the error.
    #[must_use]
    pub const fn kind(&self) -> ReconcileErrorKind {
        match self {
            Self::Validation(_) => ReconcileErrorKind::Validation,
            Self::RepositoryNotRegistered(_)
            | Self::ColumnNotWatched(_)
            | Self::ChangeNotFound(_)
            | Self::CredentialUnavailable { .. }
            | Self::DanglingRegistration(_) => ReconcileErrorKind::NotFound,
            Self::ColumnOwnedElsewhere(_)
            | Self::RepositoryOwnedElsewhere(_)
            | Self::AlreadyAccepted(_) => ReconcileErrorKind::Conflict,
            Self::ExternalCall(_) => ReconcileErrorKind::ExternalCall,
            Self::Registry(_) | Self::ReviewStore(_) => ReconcileErrorKind::Persistence,
            Self::TemplateRender(_) | Self::InvalidClaimLease(_) => ReconcileErrorKind::Internal,
        }
    }

    /// Returns how the sender of the triggering event should be answered.
    #[must_use]
    pub const fn disposition(&self) -> Disposition {
        match self.kind() {
            ReconcileErrorKind::Validation
            | ReconcileErrorKind::NotFound
            | ReconcileErrorKind::Conflict => Disposition::Acknowledge,
            ReconcileErrorKind::ExternalCall
            | ReconcileErrorKind::Persistence
            | ReconcileErrorKind::Internal => Disposition::Retry,
        }
    }
}
