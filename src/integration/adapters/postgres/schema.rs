//! Diesel schema for the integration registry.

diesel::table! {
    /// Credentials linking accounts to external services.
    integration_credentials (id) {
        /// Credential identifier.
        id -> Uuid,
        /// Owning account.
        owner_id -> Uuid,
        /// Authorized service kind.
        #[max_length = 20]
        service_kind -> Varchar,
        /// Access token, null while the handshake is pending.
        access_token -> Nullable<Text>,
        /// Handshake nonce.
        #[max_length = 64]
        handshake_state -> Varchar,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Task-board columns whose card moves are monitored.
    watched_columns (column_id) {
        /// Column identifier.
        #[max_length = 64]
        column_id -> Varchar,
        /// Owning task-board credential.
        credential_id -> Uuid,
        /// Board the column belongs to.
        #[max_length = 64]
        board_id -> Varchar,
        /// Remote webhook subscription.
        #[max_length = 64]
        webhook_id -> Nullable<Varchar>,
        /// Creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Code-review repositories registered by accounts.
    registered_repositories (repo_id) {
        /// Repository identifier.
        repo_id -> Int8,
        /// Owning code-review credential.
        credential_id -> Uuid,
        /// Registration timestamp.
        created_at -> Timestamptz,
    }
}

diesel::joinable!(watched_columns -> integration_credentials (credential_id));
diesel::joinable!(registered_repositories -> integration_credentials (credential_id));

diesel::allow_tables_to_appear_in_same_query!(
    integration_credentials,
    watched_columns,
    registered_repositories,
);
