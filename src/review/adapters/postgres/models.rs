//! Diesel row models for review record persistence.

use super::schema::review_records;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Query result row for review records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = review_records)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ReviewRecordRow {
    /// External change identifier.
    pub change_id: i64,
    /// Repository identifier.
    pub repo_id: i64,
    /// Head revision sha.
    pub head_sha: String,
    /// Source branch.
    pub branch: String,
    /// Review status.
    pub status: String,
    /// Status-report URL.
    pub report_url: String,
    /// Linked watched column.
    pub linked_column_id: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Insert model for review records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = review_records)]
pub struct NewReviewRecordRow {
    /// External change identifier.
    pub change_id: i64,
    /// Repository identifier.
    pub repo_id: i64,
    /// Head revision sha.
    pub head_sha: String,
    /// Source branch.
    pub branch: String,
    /// Review status.
    pub status: String,
    /// Status-report URL.
    pub report_url: String,
    /// Linked watched column.
    pub linked_column_id: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}
