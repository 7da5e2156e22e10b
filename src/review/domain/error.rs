//! Error types for review record validation and transitions.

use super::ChangeId;
use thiserror::Error;

/// Errors returned while constructing or mutating review records.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReviewDomainError {
    /// The change identifier is zero or not representable as `BIGINT`.
    #[error("invalid change id {0}, expected a positive integer")]
    InvalidChangeId(u64),

    /// The head revision is not a hexadecimal commit sha.
    #[error("invalid revision sha '{0}'")]
    InvalidRevisionSha(String),

    /// The branch name is empty after trimming.
    #[error("branch name must not be empty")]
    EmptyBranchName,

    /// The branch name exceeds the 255-character storage limit.
    #[error("branch name exceeds 255 character limit: {0}")]
    BranchNameTooLong(String),

    /// The status-report URL template is not an absolute HTTP(S) URL.
    #[error("status URL '{0}' must start with 'http://' or 'https://'")]
    InvalidStatusUrl(String),

    /// The record has already been accepted.
    #[error("review record {0} has already been accepted")]
    AlreadyAccepted(ChangeId),
}

/// Error returned while parsing review statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown review status: {0}")]
pub struct ParseReviewStatusError(pub String);
