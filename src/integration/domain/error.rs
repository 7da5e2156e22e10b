//! Error types for integration domain validation and parsing.

use super::ServiceKind;
use thiserror::Error;

/// Errors returned while constructing or mutating integration domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IntegrationDomainError {
    /// An external identifier is empty after trimming.
    #[error("{kind} must not be empty")]
    EmptyIdentifier {
        /// Identifier kind, e.g. `column id`.
        kind: &'static str,
    },

    /// An external identifier contains whitespace.
    #[error("{kind} '{value}' must not contain whitespace")]
    InvalidIdentifier {
        /// Identifier kind.
        kind: &'static str,
        /// Rejected raw value.
        value: String,
    },

    /// An external identifier exceeds the 64-character storage limit.
    #[error("{kind} exceeds 64 character limit: {value}")]
    IdentifierTooLong {
        /// Identifier kind.
        kind: &'static str,
        /// Rejected raw value.
        value: String,
    },

    /// The repository identifier is zero or not representable as `BIGINT`.
    #[error("invalid repository id {0}, expected a positive integer")]
    InvalidRepoId(u64),

    /// The access token is empty after trimming.
    #[error("access token must not be empty")]
    EmptyAccessToken,

    /// The handshake state returned by the external service does not match.
    #[error("authorization handshake state mismatch for {0} integration")]
    HandshakeStateMismatch(ServiceKind),

    /// The credential already holds a token.
    #[error("{0} integration is already authorized")]
    AlreadyAuthorized(ServiceKind),
}

/// Error returned while parsing service kinds from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown service kind: {0}")]
pub struct ParseServiceKindError(pub String);
