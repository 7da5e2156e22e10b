//! Shared helpers for `PostgreSQL` integration tests.
//!
//! Each test gets its own schema inside the database named by
//! [`DATABASE_URL_ENV`]; tests are skipped when the variable is unset.

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use eyre::WrapErr;
use mockable::DefaultClock;
use product_signoff::{
    integration::{
        adapters::postgres::PostgresIntegrationRepository,
        domain::{
            AccessToken, AccountId, BoardId, ColumnId, IntegrationCredential, RepoId,
            ServiceKind, WatchedColumn,
        },
        ports::IntegrationRepository,
    },
    review::{
        adapters::postgres::PostgresReviewStore,
        domain::{BranchName, ChangeId, OpenedChange, ReviewRecord, RevisionSha, StatusReportUrl},
    },
};
use rstest::fixture;
use uuid::Uuid;

/// Environment variable naming the database used by these tests.
pub const DATABASE_URL_ENV: &str = "SIGNOFF_TEST_DATABASE_URL";

/// Schema applied to every test schema.
pub const SCHEMA_SQL: &str =
    include_str!("../../migrations/2026-10-18-000000_create_signoff_tables/up.sql");

type PgPool = Pool<ConnectionManager<PgConnection>>;

#[derive(Debug)]
struct SearchPath(String);

impl CustomizeConnection<PgConnection, diesel::r2d2::Error> for SearchPath {
    fn on_acquire(&self, conn: &mut PgConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&format!("SET search_path TO {}", self.0))
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Isolated schema with both adapters wired to it.
///
/// The schema is dropped when the value goes out of scope.
pub struct TestSchema {
    url: String,
    name: String,
    /// Integration registry adapter.
    pub registry: PostgresIntegrationRepository,
    /// Review record adapter.
    pub store: PostgresReviewStore,
}

impl TestSchema {
    fn create(url: String) -> eyre::Result<Self> {
        let name = format!("signoff_test_{}", Uuid::new_v4().simple());
        let mut conn = PgConnection::establish(&url).wrap_err("connect to test database")?;
        conn.batch_execute(&format!("CREATE SCHEMA {name}; SET search_path TO {name};"))
            .wrap_err("create test schema")?;
        conn.batch_execute(SCHEMA_SQL)
            .wrap_err("apply signoff schema")?;

        let pool: PgPool = Pool::builder()
            .max_size(2)
            .connection_customizer(Box::new(SearchPath(name.clone())))
            .build(ConnectionManager::new(url.as_str()))
            .wrap_err("build test pool")?;
        Ok(Self {
            url,
            name,
            registry: PostgresIntegrationRepository::new(pool.clone()),
            store: PostgresReviewStore::new(pool),
        })
    }
}

impl Drop for TestSchema {
    fn drop(&mut self) {
        if let Ok(mut conn) = PgConnection::establish(&self.url) {
            let drop_sql = format!("DROP SCHEMA IF EXISTS {} CASCADE", self.name);
            if let Err(err) = conn.batch_execute(&drop_sql) {
                eprintln!("failed to drop test schema {}: {err}", self.name);
            }
        }
    }
}

/// Provides an isolated schema, or `None` when no test database is configured.
///
/// # Errors
///
/// Returns an error when the configured database cannot be prepared.
#[fixture]
pub fn schema() -> eyre::Result<Option<TestSchema>> {
    let Ok(url) = std::env::var(DATABASE_URL_ENV) else {
        eprintln!("{DATABASE_URL_ENV} is unset; skipping PostgreSQL test");
        return Ok(None);
    };
    TestSchema::create(url).map(Some)
}

/// Stores a live credential for `owner`.
///
/// # Errors
///
/// Returns an error when the credential cannot be stored.
pub async fn live_credential(
    schema: &TestSchema,
    owner: AccountId,
    kind: ServiceKind,
) -> eyre::Result<IntegrationCredential> {
    let credential =
        IntegrationCredential::authorized(owner, kind, AccessToken::new("token")?, &DefaultClock);
    schema.registry.store_credential(&credential).await?;
    Ok(credential)
}

/// Stores a watched column owned by `credential`.
///
/// # Errors
///
/// Returns an error when the column cannot be stored.
pub async fn watched_column(
    schema: &TestSchema,
    column: &str,
    credential: &IntegrationCredential,
) -> eyre::Result<ColumnId> {
    let column_id = ColumnId::new(column)?;
    let watched = WatchedColumn::new(
        column_id.clone(),
        credential.id(),
        BoardId::new("board-1")?,
        None,
        &DefaultClock,
    );
    schema.registry.store_watched_column(&watched).await?;
    Ok(column_id)
}

/// Builds a pending review record.
///
/// # Errors
///
/// Returns an error for invalid identifiers.
pub fn pending_record(change: u64, repo: u64) -> eyre::Result<ReviewRecord> {
    let head_sha = RevisionSha::new("0123456789abcdef")?;
    let opened = OpenedChange {
        change_id: ChangeId::new(change)?,
        repo_id: RepoId::new(repo)?,
        report_url: StatusReportUrl::from_template(
            "https://api.github.com/repos/acme/shop/statuses/{sha}",
            &head_sha,
        )?,
        head_sha,
        branch: BranchName::new("feature/x")?,
    };
    Ok(ReviewRecord::open(opened, &DefaultClock))
}
