//! Diesel schema for review record persistence.

diesel::table! {
    /// One row per in-flight code change.
    review_records (change_id) {
        /// External change identifier.
        change_id -> Int8,
        /// Repository the change targets.
        repo_id -> Int8,
        /// Head revision sha.
        #[max_length = 64]
        head_sha -> Varchar,
        /// Source branch.
        #[max_length = 255]
        branch -> Varchar,
        /// Review status.
        #[max_length = 20]
        status -> Varchar,
        /// Status-report URL.
        report_url -> Text,
        /// Linked watched column, if any.
        #[max_length = 64]
        linked_column_id -> Nullable<Varchar>,
        /// Expiry of the current acceptance claim, if any.
        acceptance_claimed_until -> Nullable<Timestamptz>,
        /// Token of the caller holding the acceptance claim, if any.
        acceptance_claim_token -> Nullable<Uuid>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}
