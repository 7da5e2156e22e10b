//! Integration credential aggregate and its supporting value types.

use super::{AccountId, CredentialId, IntegrationDomainError, ParseServiceKindError};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// External service an integration credential authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    /// The code-review platform (GitHub).
    CodeReview,
    /// The task board (Trello).
    TaskBoard,
}

impl ServiceKind {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CodeReview => "code_review",
            Self::TaskBoard => "task_board",
        }
    }
}

impl TryFrom<&str> for ServiceKind {
    type Error = ParseServiceKindError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "code_review" => Ok(Self::CodeReview),
            "task_board" => Ok(Self::TaskBoard),
            _ => Err(ParseServiceKindError(value.to_owned())),
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque access token issued by an external service.
///
/// The token value is redacted from `Debug` and `Display` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    /// Creates a validated access token.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationDomainError::EmptyAccessToken`] when the value is
    /// empty after trimming.
    pub fn new(value: impl Into<String>) -> Result<Self, IntegrationDomainError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(IntegrationDomainError::EmptyAccessToken);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Exposes the secret value for use in outbound requests.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

impl fmt::Display for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// Nonce echoed back by the external service during authorization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandshakeState(String);

impl HandshakeState {
    /// Generates a fresh random nonce.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wraps a persisted nonce value.
    #[must_use]
    pub fn from_persisted(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the nonce as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Credential linking a local account to one external service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrationCredential {
    id: CredentialId,
    owner: AccountId,
    kind: ServiceKind,
    token: Option<AccessToken>,
    handshake_state: HandshakeState,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedCredentialData {
    /// Persisted credential identifier.
    pub id: CredentialId,
    /// Owning account.
    pub owner: AccountId,
    /// Authorized service.
    pub kind: ServiceKind,
    /// Access token, absent while the handshake is pending.
    pub token: Option<AccessToken>,
    /// Handshake nonce.
    pub handshake_state: HandshakeState,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl IntegrationCredential {
    /// Starts an authorization handshake, producing a credential without a
    /// token.
    #[must_use]
    pub fn pending(owner: AccountId, kind: ServiceKind, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: CredentialId::new(),
            owner,
            kind,
            token: None,
            handshake_state: HandshakeState::generate(),
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Creates a credential that is authorized immediately.
    #[must_use]
    pub fn authorized(
        owner: AccountId,
        kind: ServiceKind,
        token: AccessToken,
        clock: &impl Clock,
    ) -> Self {
        let mut credential = Self::pending(owner, kind, clock);
        credential.token = Some(token);
        credential
    }

    /// Reconstructs a credential from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedCredentialData) -> Self {
        Self {
            id: data.id,
            owner: data.owner,
            kind: data.kind,
            token: data.token,
            handshake_state: data.handshake_state,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the credential identifier.
    #[must_use]
    pub const fn id(&self) -> CredentialId {
        self.id
    }

    /// Returns the owning account.
    #[must_use]
    pub const fn owner(&self) -> AccountId {
        self.owner
    }

    /// Returns the authorized service.
    #[must_use]
    pub const fn kind(&self) -> ServiceKind {
        self.kind
    }

    /// Returns the access token once the handshake has completed.
    #[must_use]
    pub const fn token(&self) -> Option<&AccessToken> {
        self.token.as_ref()
    }

    /// Returns the handshake nonce.
    #[must_use]
    pub const fn handshake_state(&self) -> &HandshakeState {
        &self.handshake_state
    }

    /// Returns `true` once a token is held.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.token.is_some()
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

    /// Replaces the handshake nonce of a pending credential.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationDomainError::AlreadyAuthorized`] when the
    /// credential already holds a token.
    pub fn restart_handshake(&mut self, clock: &impl Clock) -> Result<(), IntegrationDomainError> {
        if self.is_live() {
            return Err(IntegrationDomainError::AlreadyAuthorized(self.kind));
        }
        self.handshake_state = HandshakeState::generate();
        self.updated_at = clock.utc();
        Ok(())
    }

    /// Completes the handshake by storing the issued token.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationDomainError::AlreadyAuthorized`] when a token is
    /// already held, or [`IntegrationDomainError::HandshakeStateMismatch`]
    /// when `returned_state` differs from the stored nonce.
    pub fn complete_handshake(
        &mut self,
        returned_state: &str,
        token: AccessToken,
        clock: &impl Clock,
    ) -> Result<(), IntegrationDomainError> {
        if self.is_live() {
            return Err(IntegrationDomainError::AlreadyAuthorized(self.kind));
        }
        if returned_state != self.handshake_state.as_str() {
            return Err(IntegrationDomainError::HandshakeStateMismatch(self.kind));
        }
        self.token = Some(token);
        self.updated_at = clock.utc();
        Ok(())
    }

    /// Stores a token delivered directly by the user, skipping the nonce
    /// check used by redirect-based handshakes.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationDomainError::AlreadyAuthorized`] when a token is
    /// already held.
    pub fn authorize(
        &mut self,
        token: AccessToken,
        clock: &impl Clock,
    ) -> Result<(), IntegrationDomainError> {
        if self.is_live() {
            return Err(IntegrationDomainError::AlreadyAuthorized(self.kind));
        }
        self.token = Some(token);
        self.updated_at = clock.utc();
        Ok(())
    }
}
