//! Inbound webhook payloads and their validation.
//!
//! Every field is optional on the wire so that a missing field surfaces as a
//! [`PayloadError`] naming the field, rather than as an opaque decode error.

use crate::integration::domain::{ColumnId, RepoId};
use crate::review::domain::{BranchName, ChangeId, OpenedChange, RevisionSha, StatusReportUrl};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Pull-request actions that start product review.
const REVIEWED_ACTIONS: [&str; 2] = ["opened", "reopened"];

/// Task-board action type emitted when a card changes.
const CARD_UPDATE_ACTION: &str = "updateCard";

/// Actor name used when the task board omits the member who moved the card.
const UNKNOWN_ACTOR: &str = "unknown user";

/// Errors raised while validating inbound payloads.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PayloadError {
    /// The body is not valid JSON for the expected event.
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// A required field is absent.
    #[error("missing field '{0}'")]
    MissingField(&'static str),

    /// A field is present but fails validation.
    #[error("invalid field '{field}': {reason}")]
    InvalidField {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Validation failure.
        reason: String,
    },
}

impl PayloadError {
    fn invalid(field: &'static str, err: impl std::fmt::Display) -> Self {
        Self::InvalidField {
            field,
            reason: err.to_string(),
        }
    }
}

/// Code-review `pull_request` webhook event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PullRequestEvent {
    /// Event action, e.g. `opened`.
    #[serde(default)]
    pub action: Option<String>,
    /// Pull-request body.
    #[serde(default)]
    pub pull_request: Option<PullRequestPayload>,
}

/// Pull-request section of a [`PullRequestEvent`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PullRequestPayload {
    /// Change identifier.
    #[serde(default)]
    pub id: Option<u64>,
    /// Head revision details.
    #[serde(default)]
    pub head: Option<HeadPayload>,
}

/// Head section of a pull request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HeadPayload {
    /// Head revision sha.
    #[serde(default)]
    pub sha: Option<String>,
    /// Source branch.
    #[serde(default, rename = "ref")]
    pub branch: Option<String>,
    /// Repository the head revision lives in.
    #[serde(default)]
    pub repo: Option<RepoPayload>,
}

/// Repository section of a pull-request head.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RepoPayload {
    /// Repository identifier.
    #[serde(default)]
    pub id: Option<u64>,
    /// Status URL template containing a `{sha}` placeholder.
    #[serde(default)]
    pub statuses_url: Option<String>,
}

impl PullRequestEvent {
    /// Decodes an event from a raw request body.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::Malformed`] when the body is not a JSON object
    /// of the expected shape.
    pub fn from_slice(body: &[u8]) -> Result<Self, PayloadError> {
        decode_object(body)
    }

    /// Returns the event action, or an empty string when absent.
    #[must_use]
    pub fn action(&self) -> &str {
        self.action.as_deref().unwrap_or_default()
    }

    /// Returns `true` for actions that start product review.
    #[must_use]
    pub fn is_review_trigger(&self) -> bool {
        let action = self.action();
        REVIEWED_ACTIONS.iter().any(|reviewed| *reviewed == action)
    }

    /// Validates the event into the facts needed to open a review record.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError`] naming the first missing or invalid field.
    pub fn opened_change(&self) -> Result<OpenedChange, PayloadError> {
        let pull_request = self
            .pull_request
            .as_ref()
            .ok_or(PayloadError::MissingField("pull_request"))?;
        let raw_id = pull_request
            .id
            .ok_or(PayloadError::MissingField("pull_request.id"))?;
        let head = pull_request
            .head
            .as_ref()
            .ok_or(PayloadError::MissingField("pull_request.head"))?;
        let raw_sha = head
            .sha
            .as_deref()
            .ok_or(PayloadError::MissingField("pull_request.head.sha"))?;
        let raw_branch = head
            .branch
            .as_deref()
            .ok_or(PayloadError::MissingField("pull_request.head.ref"))?;
        let repo = head
            .repo
            .as_ref()
            .ok_or(PayloadError::MissingField("pull_request.head.repo"))?;
        let raw_repo_id = repo
            .id
            .ok_or(PayloadError::MissingField("pull_request.head.repo.id"))?;
        let template = repo
            .statuses_url
            .as_deref()
            .ok_or(PayloadError::MissingField(
                "pull_request.head.repo.statuses_url",
            ))?;

        let change_id = ChangeId::new(raw_id)
            .map_err(|err| PayloadError::invalid("pull_request.id", err))?;
        let head_sha = RevisionSha::new(raw_sha)
            .map_err(|err| PayloadError::invalid("pull_request.head.sha", err))?;
        let branch = BranchName::new(raw_branch)
            .map_err(|err| PayloadError::invalid("pull_request.head.ref", err))?;
        let repo_id = RepoId::new(raw_repo_id)
            .map_err(|err| PayloadError::invalid("pull_request.head.repo.id", err))?;
        let report_url = StatusReportUrl::from_template(template, &head_sha)
            .map_err(|err| PayloadError::invalid("pull_request.head.repo.statuses_url", err))?;

        Ok(OpenedChange {
            change_id,
            repo_id,
            head_sha,
            branch,
            report_url,
        })
    }
}

/// Task-board webhook event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CardMovedEvent {
    /// Action that triggered the delivery.
    #[serde(default)]
    pub action: Option<BoardAction>,
}

/// Action section of a [`CardMovedEvent`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BoardAction {
    /// Action type discriminator, e.g. `updateCard`.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// Action data.
    #[serde(default)]
    pub data: Option<BoardActionData>,
    /// Member who performed the action.
    #[serde(default, rename = "memberCreator")]
    pub member_creator: Option<BoardMember>,
}

/// Data section of a [`BoardAction`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BoardActionData {
    /// Destination list of a card move.
    #[serde(default, rename = "listAfter")]
    pub list_after: Option<BoardList>,
}

/// List reference inside action data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BoardList {
    /// List identifier.
    #[serde(default)]
    pub id: Option<String>,
}

/// Member reference inside an action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BoardMember {
    /// Display name.
    #[serde(default, rename = "fullName")]
    pub full_name: Option<String>,
    /// Login name.
    #[serde(default)]
    pub username: Option<String>,
}

/// Validated facts of a card move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardMoved {
    /// Destination column.
    pub column_id: ColumnId,
    /// Display name of the member who moved the card.
    pub actor: String,
}

impl CardMovedEvent {
    /// Decodes an event from a raw request body.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::Malformed`] when the body is not a JSON object
    /// of the expected shape.
    pub fn from_slice(body: &[u8]) -> Result<Self, PayloadError> {
        decode_object(body)
    }

    /// Returns the action type, or an empty string when absent.
    #[must_use]
    pub fn action_type(&self) -> &str {
        self.action
            .as_ref()
            .and_then(|action| action.kind.as_deref())
            .unwrap_or_default()
    }

    /// Returns `true` for card updates, the only actions reconciled.
    #[must_use]
    pub fn is_card_update(&self) -> bool {
        self.action_type() == CARD_UPDATE_ACTION
    }

    /// Validates the event into a destination column and actor.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError`] when the destination column is missing or
    /// invalid.
    pub fn card_moved(&self) -> Result<CardMoved, PayloadError> {
        let action = self
            .action
            .as_ref()
            .ok_or(PayloadError::MissingField("action"))?;
        let raw_column = action
            .data
            .as_ref()
            .and_then(|data| data.list_after.as_ref())
            .and_then(|list| list.id.as_deref())
            .ok_or(PayloadError::MissingField("action.data.listAfter.id"))?;
        let column_id = ColumnId::new(raw_column)
            .map_err(|err| PayloadError::invalid("action.data.listAfter.id", err))?;

        let actor = action
            .member_creator
            .as_ref()
            .and_then(|member| {
                non_blank(member.full_name.as_deref()).or(non_blank(member.username.as_deref()))
            })
            .unwrap_or(UNKNOWN_ACTOR)
            .to_owned();

        Ok(CardMoved { column_id, actor })
    }
}

/// Decodes a webhook body, which must be a JSON object.
///
/// Structs with defaulted fields also accept the JSON sequence form, so an
/// array body would otherwise decode into an empty event.
fn decode_object<T: DeserializeOwned>(body: &[u8]) -> Result<T, PayloadError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|err| PayloadError::Malformed(err.to_string()))?;
    if !value.is_object() {
        return Err(PayloadError::Malformed(format!(
            "expected a JSON object, found {}",
            json_kind(&value)
        )));
    }
    serde_json::from_value(value).map_err(|err| PayloadError::Malformed(err.to_string()))
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|trimmed| !trimmed.is_empty())
}
