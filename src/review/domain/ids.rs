//! Identifier and validated scalar types for review records.

use super::ReviewDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Maximum branch name length stored in a `VARCHAR(255)` column.
const MAX_BRANCH_NAME_LENGTH: usize = 255;

/// Placeholder the code-review service uses in its status URL template.
const SHA_PLACEHOLDER: &str = "{sha}";

/// External identifier of a code change (pull request id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeId(u64);

impl ChangeId {
    /// Largest change id representable in the current `PostgreSQL` schema.
    const MAX_PERSISTED_VALUE: u64 = i64::MAX as u64;

    /// Creates a validated change identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewDomainError::InvalidChangeId`] when the value is zero
    /// or exceeds `i64::MAX`.
    pub const fn new(value: u64) -> Result<Self, ReviewDomainError> {
        if value == 0 || value > Self::MAX_PERSISTED_VALUE {
            return Err(ReviewDomainError::InvalidChangeId(value));
        }
        Ok(Self(value))
    }

    /// Returns the underlying numeric value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Token identifying one holder of an acceptance claim.
///
/// Completing or releasing a claim requires the token that took it, so a
/// caller whose lease ran out cannot clear a newer caller's claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AcceptanceClaim(Uuid);

impl AcceptanceClaim {
    /// Creates a fresh claim token.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for AcceptanceClaim {
    fn default() -> Self {
        Self::new()
    }
}

/// Head revision of a change, as a lowercase hexadecimal commit sha.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionSha(String);

impl RevisionSha {
    /// Creates a validated revision sha.
    ///
    /// Accepts abbreviated (at least 7) through full SHA-256 (64) hex digits.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewDomainError::InvalidRevisionSha`] for any other value.
    pub fn new(value: impl Into<String>) -> Result<Self, ReviewDomainError> {
        let raw = value.into();
        let normalized = raw.trim().to_ascii_lowercase();
        let is_valid = (7..=64).contains(&normalized.len())
            && normalized.chars().all(|ch| ch.is_ascii_hexdigit());
        if !is_valid {
            return Err(ReviewDomainError::InvalidRevisionSha(raw));
        }
        Ok(Self(normalized))
    }

    /// Returns the sha as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RevisionSha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Source branch of a change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchName(String);

impl BranchName {
    /// Creates a validated branch name.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewDomainError::EmptyBranchName`] when empty after
    /// trimming, or [`ReviewDomainError::BranchNameTooLong`] above 255
    /// characters.
    pub fn new(value: impl Into<String>) -> Result<Self, ReviewDomainError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ReviewDomainError::EmptyBranchName);
        }
        if trimmed.len() > MAX_BRANCH_NAME_LENGTH {
            return Err(ReviewDomainError::BranchNameTooLong(raw));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the branch name as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Absolute endpoint that receives commit statuses for one revision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusReportUrl(String);

impl StatusReportUrl {
    /// Expands a status URL template (e.g.
    /// `https://api.github.com/repos/o/r/statuses/{sha}`) for a revision.
    ///
    /// Templates without the `{sha}` placeholder are used verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewDomainError::InvalidStatusUrl`] unless the template is
    /// an absolute `http://` or `https://` URL.
    pub fn from_template(template: &str, sha: &RevisionSha) -> Result<Self, ReviewDomainError> {
        let expanded = template.trim().replace(SHA_PLACEHOLDER, sha.as_str());
        Self::new(expanded)
    }

    /// Wraps an already expanded URL.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewDomainError::InvalidStatusUrl`] unless the value is an
    /// absolute `http://` or `https://` URL.
    pub fn new(value: impl Into<String>) -> Result<Self, ReviewDomainError> {
        let raw = value.into();
        let has_scheme = raw.starts_with("https://") || raw.starts_with("http://");
        let has_host = raw
            .split_once("://")
            .is_some_and(|(_, rest)| !rest.is_empty() && !rest.starts_with('/'));
        if !has_scheme || !has_host || raw.chars().any(char::is_whitespace) {
            return Err(ReviewDomainError::InvalidStatusUrl(raw));
        }
        Ok(Self(raw))
    }

    /// Returns the URL as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StatusReportUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
