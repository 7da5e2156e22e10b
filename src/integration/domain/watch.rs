//! Watched task-board columns and registered code-review repositories.

use super::{BoardId, ColumnId, CredentialId, RepoId, WebhookId};
use chrono::{DateTime, Utc};
use mockable::Clock;

/// Task-board column whose card moves are monitored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedColumn {
    column_id: ColumnId,
    credential_id: CredentialId,
    board_id: BoardId,
    webhook_id: Option<WebhookId>,
    created_at: DateTime<Utc>,
}

impl WatchedColumn {
    /// Creates a watched column owned through the given task-board credential.
    #[must_use]
    pub fn new(
        column_id: ColumnId,
        credential_id: CredentialId,
        board_id: BoardId,
        webhook_id: Option<WebhookId>,
        clock: &impl Clock,
    ) -> Self {
        Self {
            column_id,
            credential_id,
            board_id,
            webhook_id,
            created_at: clock.utc(),
        }
    }

    /// Reconstructs a watched column from persisted storage.
    #[must_use]
    pub const fn from_persisted(
        column_id: ColumnId,
        credential_id: CredentialId,
        board_id: BoardId,
        webhook_id: Option<WebhookId>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            column_id,
            credential_id,
            board_id,
            webhook_id,
            created_at,
        }
    }

    /// Returns the column identifier.
    #[must_use]
    pub const fn column_id(&self) -> &ColumnId {
        &self.column_id
    }

    /// Returns the owning credential.
    #[must_use]
    pub const fn credential_id(&self) -> CredentialId {
        self.credential_id
    }

    /// Returns the board the column belongs to.
    #[must_use]
    pub const fn board_id(&self) -> &BoardId {
        &self.board_id
    }

    /// Returns the remote webhook subscription, if one was registered.
    #[must_use]
    pub const fn webhook_id(&self) -> Option<&WebhookId> {
        self.webhook_id.as_ref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Code-review repository registered by an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredRepository {
    repo_id: RepoId,
    credential_id: CredentialId,
    created_at: DateTime<Utc>,
}

impl RegisteredRepository {
    /// Registers a repository under a code-review credential.
    #[must_use]
    pub fn new(repo_id: RepoId, credential_id: CredentialId, clock: &impl Clock) -> Self {
        Self {
            repo_id,
            credential_id,
            created_at: clock.utc(),
        }
    }

    /// Reconstructs a registration from persisted storage.
    #[must_use]
    pub const fn from_persisted(
        repo_id: RepoId,
        credential_id: CredentialId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            repo_id,
            credential_id,
            created_at,
        }
    }

    /// Returns the repository identifier.
    #[must_use]
    pub const fn repo_id(&self) -> RepoId {
        self.repo_id
    }

    /// Returns the owning code-review credential.
    #[must_use]
    pub const fn credential_id(&self) -> CredentialId {
        self.credential_id
    }

    /// Returns the registration timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
