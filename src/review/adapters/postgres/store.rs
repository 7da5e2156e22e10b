//! `PostgreSQL` store implementation for review records.

use super::{
    models::{NewReviewRecordRow, ReviewRecordRow},
    schema::review_records,
};
use crate::integration::domain::{ColumnId, RepoId};
use crate::review::{
    domain::{
        AcceptanceClaim, BranchName, ChangeId, PersistedReviewData, ReviewRecord, ReviewStatus,
        RevisionSha, StatusReportUrl,
    },
    ports::{ReviewRecordStore, ReviewStoreError, ReviewStoreResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_types::{BigInt, Timestamptz, Uuid as SqlUuid};

/// `PostgreSQL` connection pool type used by review adapters.
pub type ReviewPgPool = Pool<ConnectionManager<PgConnection>>;

const CLAIM_ACCEPTANCE_SQL: &str = concat!(
    "UPDATE review_records ",
    "SET acceptance_claimed_until = $3, acceptance_claim_token = $4 ",
    "WHERE change_id = $1 AND status = 'pending' ",
    "AND (acceptance_claimed_until IS NULL OR acceptance_claimed_until <= $2)",
);

const COMPLETE_ACCEPTANCE_SQL: &str = concat!(
    "UPDATE review_records ",
    "SET status = 'accepted', acceptance_claimed_until = NULL, ",
    "acceptance_claim_token = NULL, updated_at = $2 ",
    "WHERE change_id = $1 AND status = 'pending' AND acceptance_claim_token = $3",
);

const RELEASE_CLAIM_SQL: &str = concat!(
    "UPDATE review_records ",
    "SET acceptance_claimed_until = NULL, acceptance_claim_token = NULL ",
    "WHERE change_id = $1 AND acceptance_claim_token = $2",
);

/// `PostgreSQL`-backed review record store.
#[derive(Debug, Clone)]
pub struct PostgresReviewStore {
    pool: ReviewPgPool,
}

impl PostgresReviewStore {
    /// Creates a new store from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: ReviewPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> ReviewStoreResult<T>
    where
        F: FnOnce(&mut PgConnection) -> ReviewStoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(ReviewStoreError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(ReviewStoreError::persistence)?
    }
}

#[async_trait]
impl ReviewRecordStore for PostgresReviewStore {
    async fn insert_if_absent(&self, record: &ReviewRecord) -> ReviewStoreResult<bool> {
        let new_row = to_new_row(record)?;
        self.run_blocking(move |connection| {
            let inserted = diesel::insert_into(review_records::table)
                .values(&new_row)
                .on_conflict(review_records::change_id)
                .do_nothing()
                .execute(connection)
                .map_err(ReviewStoreError::persistence)?;
            Ok(inserted == 1)
        })
        .await
    }

    async fn find(&self, change_id: ChangeId) -> ReviewStoreResult<Option<ReviewRecord>> {
        let key = change_key(change_id)?;
        self.run_blocking(move |connection| {
            let row = review_records::table
                .filter(review_records::change_id.eq(key))
                .select(ReviewRecordRow::as_select())
                .first::<ReviewRecordRow>(connection)
                .optional()
                .map_err(ReviewStoreError::persistence)?;
            row.map(row_to_record).transpose()
        })
        .await
    }

    async fn find_by_repo(&self, repo_id: RepoId) -> ReviewStoreResult<Vec<ReviewRecord>> {
        let key = i64::try_from(repo_id.value()).map_err(ReviewStoreError::persistence)?;
        self.run_blocking(move |connection| {
            let rows = review_records::table
                .filter(review_records::repo_id.eq(key))
                .order(review_records::change_id.asc())
                .select(ReviewRecordRow::as_select())
                .load::<ReviewRecordRow>(connection)
                .map_err(ReviewStoreError::persistence)?;
            rows.into_iter().map(row_to_record).collect()
        })
        .await
    }

    async fn find_linked_to(&self, column_id: &ColumnId) -> ReviewStoreResult<Vec<ReviewRecord>> {
        let key = column_id.as_str().to_owned();
        self.run_blocking(move |connection| {
            let rows = review_records::table
                .filter(review_records::linked_column_id.eq(key))
                .order(review_records::change_id.asc())
                .select(ReviewRecordRow::as_select())
                .load::<ReviewRecordRow>(connection)
                .map_err(ReviewStoreError::persistence)?;
            rows.into_iter().map(row_to_record).collect()
        })
        .await
    }

    async fn update_link(&self, record: &ReviewRecord) -> ReviewStoreResult<()> {
        let change_id = record.change_id();
        let key = change_key(change_id)?;
        let linked = record.linked_column().map(|column| column.as_str().to_owned());
        let updated_at = record.updated_at();
        self.run_blocking(move |connection| {
            let updated = diesel::update(review_records::table.find(key))
                .set((
                    review_records::linked_column_id.eq(linked),
                    review_records::updated_at.eq(updated_at),
                ))
                .execute(connection)
                .map_err(ReviewStoreError::persistence)?;
            if updated == 0 {
                return Err(ReviewStoreError::NotFound(change_id));
            }
            Ok(())
        })
        .await
    }

    async fn unlink_column(
        &self,
        column_id: &ColumnId,
        now: DateTime<Utc>,
    ) -> ReviewStoreResult<usize> {
        let key = column_id.as_str().to_owned();
        self.run_blocking(move |connection| {
            diesel::update(review_records::table.filter(review_records::linked_column_id.eq(key)))
                .set((
                    review_records::linked_column_id.eq(None::<String>),
                    review_records::updated_at.eq(now),
                ))
                .execute(connection)
                .map_err(ReviewStoreError::persistence)
        })
        .await
    }

    async fn try_claim_acceptance(
        &self,
        change_id: ChangeId,
        claim: AcceptanceClaim,
        now: DateTime<Utc>,
        lease_until: DateTime<Utc>,
    ) -> ReviewStoreResult<bool> {
        let key = change_key(change_id)?;
        self.run_blocking(move |connection| {
            let claimed = diesel::sql_query(CLAIM_ACCEPTANCE_SQL)
                .bind::<BigInt, _>(key)
                .bind::<Timestamptz, _>(now)
                .bind::<Timestamptz, _>(lease_until)
                .bind::<SqlUuid, _>(claim.into_inner())
                .execute(connection)
                .map_err(ReviewStoreError::persistence)?;
            Ok(claimed == 1)
        })
        .await
    }

    async fn complete_acceptance(
        &self,
        change_id: ChangeId,
        claim: AcceptanceClaim,
        now: DateTime<Utc>,
    ) -> ReviewStoreResult<bool> {
        let key = change_key(change_id)?;
        self.run_blocking(move |connection| {
            let accepted = diesel::sql_query(COMPLETE_ACCEPTANCE_SQL)
                .bind::<BigInt, _>(key)
                .bind::<Timestamptz, _>(now)
                .bind::<SqlUuid, _>(claim.into_inner())
                .execute(connection)
                .map_err(ReviewStoreError::persistence)?;
            Ok(accepted == 1)
        })
        .await
    }

    async fn release_claim(
        &self,
        change_id: ChangeId,
        claim: AcceptanceClaim,
    ) -> ReviewStoreResult<()> {
        let key = change_key(change_id)?;
        self.run_blocking(move |connection| {
            diesel::sql_query(RELEASE_CLAIM_SQL)
                .bind::<BigInt, _>(key)
                .bind::<SqlUuid, _>(claim.into_inner())
                .execute(connection)
                .map_err(ReviewStoreError::persistence)?;
            Ok(())
        })
        .await
    }
}

fn change_key(change_id: ChangeId) -> ReviewStoreResult<i64> {
    i64::try_from(change_id.value()).map_err(ReviewStoreError::persistence)
}

fn to_new_row(record: &ReviewRecord) -> ReviewStoreResult<NewReviewRecordRow> {
    Ok(NewReviewRecordRow {
        change_id: change_key(record.change_id())?,
        repo_id: i64::try_from(record.repo_id().value()).map_err(ReviewStoreError::persistence)?,
        head_sha: record.head_sha().as_str().to_owned(),
        branch: record.branch().as_str().to_owned(),
        status: record.status().as_str().to_owned(),
        report_url: record.report_url().as_str().to_owned(),
        linked_column_id: record
            .linked_column()
            .map(|column| column.as_str().to_owned()),
        created_at: record.created_at(),
        updated_at: record.updated_at(),
    })
}

fn row_to_record(row: ReviewRecordRow) -> ReviewStoreResult<ReviewRecord> {
    let ReviewRecordRow {
        change_id,
        repo_id,
        head_sha,
        branch,
        status,
        report_url,
        linked_column_id,
        created_at,
        updated_at,
    } = row;

    let change_id = u64::try_from(change_id)
        .map_err(ReviewStoreError::invalid_persisted_data)
        .and_then(|value| ChangeId::new(value).map_err(ReviewStoreError::invalid_persisted_data))?;
    let repo_id = u64::try_from(repo_id)
        .map_err(ReviewStoreError::invalid_persisted_data)
        .and_then(|value| RepoId::new(value).map_err(ReviewStoreError::invalid_persisted_data))?;
    let linked_column = linked_column_id
        .map(ColumnId::new)
        .transpose()
        .map_err(ReviewStoreError::invalid_persisted_data)?;

    let data = PersistedReviewData {
        change_id,
        repo_id,
        head_sha: RevisionSha::new(head_sha).map_err(ReviewStoreError::invalid_persisted_data)?,
        branch: BranchName::new(branch).map_err(ReviewStoreError::invalid_persisted_data)?,
        status: ReviewStatus::try_from(status.as_str())
            .map_err(ReviewStoreError::invalid_persisted_data)?,
        report_url: StatusReportUrl::new(report_url)
            .map_err(ReviewStoreError::invalid_persisted_data)?,
        linked_column,
        created_at,
        updated_at,
    };
    Ok(ReviewRecord::from_persisted(data))
}
