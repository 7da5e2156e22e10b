//! Identifier types for accounts, credentials, and external resources.

use super::IntegrationDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Maximum length of an external identifier stored in a `VARCHAR(64)` column.
const MAX_EXTERNAL_ID_LENGTH: usize = 64;

/// Local account that owns integrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(Uuid);

impl AccountId {
    /// Creates a new random account identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an account identifier from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a stored integration credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialId(Uuid);

impl CredentialId {
    /// Creates a new random credential identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a credential identifier from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for CredentialId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CredentialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Numeric repository identifier assigned by the code-review service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepoId(u64);

impl RepoId {
    /// Largest repository id representable in the current `PostgreSQL` schema.
    const MAX_PERSISTED_VALUE: u64 = i64::MAX as u64;

    /// Creates a validated repository identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationDomainError::InvalidRepoId`] when the value is
    /// zero or exceeds `i64::MAX`.
    pub const fn new(value: u64) -> Result<Self, IntegrationDomainError> {
        if value == 0 || value > Self::MAX_PERSISTED_VALUE {
            return Err(IntegrationDomainError::InvalidRepoId(value));
        }
        Ok(Self(value))
    }

    /// Returns the underlying numeric value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn validate_external_id(
    kind: &'static str,
    value: impl Into<String>,
) -> Result<String, IntegrationDomainError> {
    let raw = value.into();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(IntegrationDomainError::EmptyIdentifier { kind });
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(IntegrationDomainError::InvalidIdentifier { kind, value: raw });
    }
    if trimmed.len() > MAX_EXTERNAL_ID_LENGTH {
        return Err(IntegrationDomainError::IdentifierTooLong { kind, value: raw });
    }
    Ok(trimmed.to_owned())
}

macro_rules! external_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a validated identifier.
            ///
            /// # Errors
            ///
            /// Returns an [`IntegrationDomainError`] when the value is empty,
            /// contains whitespace, or exceeds 64 characters.
            pub fn new(value: impl Into<String>) -> Result<Self, IntegrationDomainError> {
                validate_external_id($kind, value).map(Self)
            }

            /// Returns the identifier as `str`.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

external_id!(
    /// Task-board column identifier (a Trello list id).
    ColumnId,
    "column id"
);

external_id!(
    /// Task-board board identifier.
    BoardId,
    "board id"
);

external_id!(
    /// Identifier of a webhook subscription registered with the task board.
    WebhookId,
    "webhook id"
);
