//! Domain model for external-service integrations.
//!
//! Every entity carries explicit ownership: credentials name their owning
//! account, and watched columns and registered repositories point at the
//! credential they were created through. Authorization checks are therefore
//! plain comparisons of [`AccountId`] values.

mod credential;
mod error;
mod ids;
mod watch;

pub use credential::{
    AccessToken, HandshakeState, IntegrationCredential, PersistedCredentialData, ServiceKind,
};
pub use error::{IntegrationDomainError, ParseServiceKindError};
pub use ids::{AccountId, BoardId, ColumnId, CredentialId, RepoId, WebhookId};
pub use watch::{RegisteredRepository, WatchedColumn};
