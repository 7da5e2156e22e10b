//! Diesel row models for the integration registry.

use super::schema::{integration_credentials, registered_repositories, watched_columns};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

/// Query and insert row for credentials.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = integration_credentials)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CredentialRow {
    /// Credential identifier.
    pub id: Uuid,
    /// Owning account.
    pub owner_id: Uuid,
    /// Service kind.
    pub service_kind: String,
    /// Access token.
    pub access_token: Option<String>,
    /// Handshake nonce.
    pub handshake_state: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Query and insert row for watched columns.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = watched_columns)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct WatchedColumnRow {
    /// Column identifier.
    pub column_id: String,
    /// Owning credential.
    pub credential_id: Uuid,
    /// Board identifier.
    pub board_id: String,
    /// Webhook identifier.
    pub webhook_id: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Query and insert row for registered repositories.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = registered_repositories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RepositoryRow {
    /// Repository identifier.
    pub repo_id: i64,
    /// Owning credential.
    pub credential_id: Uuid,
    /// Registration timestamp.
    pub created_at: DateTime<Utc>,
}
