//! Review record aggregate and its status state machine.

use super::{
    BranchName, ChangeId, ParseReviewStatusError, ReviewDomainError, RevisionSha, StatusReportUrl,
};
use crate::integration::domain::{ColumnId, RepoId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Product-review status of a code change.
///
/// The only transition is `Pending -> Accepted`; `Accepted` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    /// Awaiting product review.
    Pending,
    /// Accepted by moving the linked card into a watched column.
    Accepted,
}

impl ReviewStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
        }
    }

    /// Returns whether a transition from `self` to `target` is permitted.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!((self, target), (Self::Pending, Self::Accepted))
    }
}

impl TryFrom<&str> for ReviewStatus {
    type Error = ParseReviewStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            _ => Err(ParseReviewStatusError(value.to_owned())),
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated facts about a newly opened change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedChange {
    /// Change identifier.
    pub change_id: ChangeId,
    /// Repository the change targets.
    pub repo_id: RepoId,
    /// Head revision.
    pub head_sha: RevisionSha,
    /// Source branch.
    pub branch: BranchName,
    /// Status-report URL for the head revision.
    pub report_url: StatusReportUrl,
}

/// Local record of an in-flight code change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRecord {
    change_id: ChangeId,
    repo_id: RepoId,
    head_sha: RevisionSha,
    branch: BranchName,
    status: ReviewStatus,
    report_url: StatusReportUrl,
    linked_column: Option<ColumnId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted review record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedReviewData {
    /// Change identifier.
    pub change_id: ChangeId,
    /// Repository identifier.
    pub repo_id: RepoId,
    /// Head revision.
    pub head_sha: RevisionSha,
    /// Source branch.
    pub branch: BranchName,
    /// Review status.
    pub status: ReviewStatus,
    /// Status-report URL.
    pub report_url: StatusReportUrl,
    /// Linked watched column, if any.
    pub linked_column: Option<ColumnId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl ReviewRecord {
    /// Creates a pending, unlinked record for a newly opened change.
    #[must_use]
    pub fn open(change: OpenedChange, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            change_id: change.change_id,
            repo_id: change.repo_id,
            head_sha: change.head_sha,
            branch: change.branch,
            status: ReviewStatus::Pending,
            report_url: change.report_url,
            linked_column: None,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Reconstructs a record from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedReviewData) -> Self {
        Self {
            change_id: data.change_id,
            repo_id: data.repo_id,
            head_sha: data.head_sha,
            branch: data.branch,
            status: data.status,
            report_url: data.report_url,
            linked_column: data.linked_column,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the change identifier.
    #[must_use]
    pub const fn change_id(&self) -> ChangeId {
        self.change_id
    }

    /// Returns the repository identifier.
    #[must_use]
    pub const fn repo_id(&self) -> RepoId {
        self.repo_id
    }

    /// Returns the head revision recorded when the change opened.
    #[must_use]
    pub const fn head_sha(&self) -> &RevisionSha {
        &self.head_sha
    }

    /// Returns the source branch.
    #[must_use]
    pub const fn branch(&self) -> &BranchName {
        &self.branch
    }

    /// Returns the review status.
    #[must_use]
    pub const fn status(&self) -> ReviewStatus {
        self.status
    }

    /// Returns `true` once the record has been accepted.
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self.status, ReviewStatus::Accepted)
    }

    /// Returns the status-report URL.
    #[must_use]
    pub const fn report_url(&self) -> &StatusReportUrl {
        &self.report_url
    }

    /// Returns the linked watched column, if any.
    #[must_use]
    pub const fn linked_column(&self) -> Option<&ColumnId> {
        self.linked_column.as_ref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Links the record to a watched column, replacing any previous link.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewDomainError::AlreadyAccepted`] for accepted records.
    pub fn link_to(
        &mut self,
        column_id: ColumnId,
        clock: &impl Clock,
    ) -> Result<(), ReviewDomainError> {
        if self.is_accepted() {
            return Err(ReviewDomainError::AlreadyAccepted(self.change_id));
        }
        self.linked_column = Some(column_id);
        self.touch(clock);
        Ok(())
    }

    /// Clears the column link.
    pub fn unlink(&mut self, clock: &impl Clock) {
        self.unlink_at(clock.utc());
    }

    pub(crate) fn unlink_at(&mut self, at: DateTime<Utc>) {
        self.set_link_at(None, at);
    }

    pub(crate) fn set_link_at(&mut self, column_id: Option<ColumnId>, at: DateTime<Utc>) {
        self.linked_column = column_id;
        self.updated_at = at;
    }

    /// Applies the `Pending -> Accepted` transition.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewDomainError::AlreadyAccepted`] when the record is
    /// already accepted.
    pub fn accept(&mut self, clock: &impl Clock) -> Result<(), ReviewDomainError> {
        self.accept_at(clock.utc())
    }

    pub(crate) fn accept_at(&mut self, at: DateTime<Utc>) -> Result<(), ReviewDomainError> {
        if !self.status.can_transition_to(ReviewStatus::Accepted) {
            return Err(ReviewDomainError::AlreadyAccepted(self.change_id));
        }
        self.status = ReviewStatus::Accepted;
        self.updated_at = at;
        Ok(())
    }

    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}
