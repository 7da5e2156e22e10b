//! `PostgreSQL` repository implementation for the integration registry.

use super::{
    models::{CredentialRow, RepositoryRow, WatchedColumnRow},
    schema::{integration_credentials, registered_repositories, watched_columns},
};
use crate::integration::{
    domain::{
        AccessToken, AccountId, BoardId, ColumnId, CredentialId, HandshakeState,
        IntegrationCredential, PersistedCredentialData, RegisteredRepository, RepoId, ServiceKind,
        WatchedColumn, WebhookId,
    },
    ports::{IntegrationRepository, IntegrationRepositoryError, IntegrationRepositoryResult},
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind, Error as DieselError};

/// `PostgreSQL` connection pool type used by integration adapters.
pub type IntegrationPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed integration repository.
///
/// Watched columns and registered repositories reference their credential
/// with `ON DELETE CASCADE`, so deleting a credential removes them atomically.
#[derive(Debug, Clone)]
pub struct PostgresIntegrationRepository {
    pool: IntegrationPgPool,
}

impl PostgresIntegrationRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: IntegrationPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> IntegrationRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> IntegrationRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(IntegrationRepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(IntegrationRepositoryError::persistence)?
    }
}

#[async_trait]
impl IntegrationRepository for PostgresIntegrationRepository {
    async fn store_credential(
        &self,
        credential: &IntegrationCredential,
    ) -> IntegrationRepositoryResult<()> {
        let owner = credential.owner();
        let kind = credential.kind();
        let row = to_credential_row(credential);

        self.run_blocking(move |connection| {
            diesel::insert_into(integration_credentials::table)
                .values(&row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info)
                        if is_owner_kind_unique_violation(info.as_ref()) =>
                    {
                        IntegrationRepositoryError::DuplicateCredential { owner, kind }
                    }
                    _ => IntegrationRepositoryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn update_credential(
        &self,
        credential: &IntegrationCredential,
    ) -> IntegrationRepositoryResult<()> {
        let credential_id = credential.id();
        let row = to_credential_row(credential);

        self.run_blocking(move |connection| {
            let updated =
                diesel::update(integration_credentials::table.find(credential_id.into_inner()))
                    .set((
                        integration_credentials::access_token.eq(row.access_token),
                        integration_credentials::handshake_state.eq(row.handshake_state),
                        integration_credentials::updated_at.eq(row.updated_at),
                    ))
                    .execute(connection)
                    .map_err(IntegrationRepositoryError::persistence)?;
            if updated == 0 {
                return Err(IntegrationRepositoryError::CredentialNotFound(
                    credential_id,
                ));
            }
            Ok(())
        })
        .await
    }

    async fn find_credential(
        &self,
        owner: AccountId,
        kind: ServiceKind,
    ) -> IntegrationRepositoryResult<Option<IntegrationCredential>> {
        self.run_blocking(move |connection| {
            let row = integration_credentials::table
                .filter(integration_credentials::owner_id.eq(owner.into_inner()))
                .filter(integration_credentials::service_kind.eq(kind.as_str()))
                .select(CredentialRow::as_select())
                .first::<CredentialRow>(connection)
                .optional()
                .map_err(IntegrationRepositoryError::persistence)?;
            row.map(row_to_credential).transpose()
        })
        .await
    }

    async fn find_credential_by_id(
        &self,
        id: CredentialId,
    ) -> IntegrationRepositoryResult<Option<IntegrationCredential>> {
        self.run_blocking(move |connection| {
            let row = integration_credentials::table
                .find(id.into_inner())
                .select(CredentialRow::as_select())
                .first::<CredentialRow>(connection)
                .optional()
                .map_err(IntegrationRepositoryError::persistence)?;
            row.map(row_to_credential).transpose()
        })
        .await
    }

    async fn delete_credential(&self, id: CredentialId) -> IntegrationRepositoryResult<()> {
        self.run_blocking(move |connection| {
            let deleted = diesel::delete(integration_credentials::table.find(id.into_inner()))
                .execute(connection)
                .map_err(IntegrationRepositoryError::persistence)?;
            if deleted == 0 {
                return Err(IntegrationRepositoryError::CredentialNotFound(id));
            }
            Ok(())
        })
        .await
    }

    async fn store_watched_column(
        &self,
        column: &WatchedColumn,
    ) -> IntegrationRepositoryResult<()> {
        let column_id = column.column_id().clone();
        let credential_id = column.credential_id();
        let row = WatchedColumnRow {
            column_id: column.column_id().as_str().to_owned(),
            credential_id: credential_id.into_inner(),
            board_id: column.board_id().as_str().to_owned(),
            webhook_id: column.webhook_id().map(|id| id.as_str().to_owned()),
            created_at: column.created_at(),
        };

        self.run_blocking(move |connection| {
            diesel::insert_into(watched_columns::table)
                .values(&row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        IntegrationRepositoryError::DuplicateColumn(column_id)
                    }
                    DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                        IntegrationRepositoryError::CredentialNotFound(credential_id)
                    }
                    _ => IntegrationRepositoryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn find_watched_column(
        &self,
        column_id: &ColumnId,
    ) -> IntegrationRepositoryResult<Option<WatchedColumn>> {
        let key = column_id.as_str().to_owned();
        self.run_blocking(move |connection| {
            let row = watched_columns::table
                .find(key)
                .select(WatchedColumnRow::as_select())
                .first::<WatchedColumnRow>(connection)
                .optional()
                .map_err(IntegrationRepositoryError::persistence)?;
            row.map(row_to_column).transpose()
        })
        .await
    }

    async fn list_watched_columns(
        &self,
        credential_id: CredentialId,
    ) -> IntegrationRepositoryResult<Vec<WatchedColumn>> {
        self.run_blocking(move |connection| {
            let rows = watched_columns::table
                .filter(watched_columns::credential_id.eq(credential_id.into_inner()))
                .order(watched_columns::column_id.asc())
                .select(WatchedColumnRow::as_select())
                .load::<WatchedColumnRow>(connection)
                .map_err(IntegrationRepositoryError::persistence)?;
            rows.into_iter().map(row_to_column).collect()
        })
        .await
    }

    async fn store_repository(
        &self,
        repository: &RegisteredRepository,
    ) -> IntegrationRepositoryResult<()> {
        let repo_id = repository.repo_id();
        let credential_id = repository.credential_id();
        let row = RepositoryRow {
            repo_id: repo_key(repo_id)?,
            credential_id: credential_id.into_inner(),
            created_at: repository.created_at(),
        };

        self.run_blocking(move |connection| {
            diesel::insert_into(registered_repositories::table)
                .values(&row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        IntegrationRepositoryError::DuplicateRepository(repo_id)
                    }
                    DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                        IntegrationRepositoryError::CredentialNotFound(credential_id)
                    }
                    _ => IntegrationRepositoryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn find_repository(
        &self,
        repo_id: RepoId,
    ) -> IntegrationRepositoryResult<Option<RegisteredRepository>> {
        let key = repo_key(repo_id)?;
        self.run_blocking(move |connection| {
            let row = registered_repositories::table
                .find(key)
                .select(RepositoryRow::as_select())
                .first::<RepositoryRow>(connection)
                .optional()
                .map_err(IntegrationRepositoryError::persistence)?;
            row.map(row_to_repository).transpose()
        })
        .await
    }

    async fn list_repositories(
        &self,
        credential_id: CredentialId,
    ) -> IntegrationRepositoryResult<Vec<RegisteredRepository>> {
        self.run_blocking(move |connection| {
            let rows = registered_repositories::table
                .filter(registered_repositories::credential_id.eq(credential_id.into_inner()))
                .order(registered_repositories::repo_id.asc())
                .select(RepositoryRow::as_select())
                .load::<RepositoryRow>(connection)
                .map_err(IntegrationRepositoryError::persistence)?;
            rows.into_iter().map(row_to_repository).collect()
        })
        .await
    }
}

fn repo_key(repo_id: RepoId) -> IntegrationRepositoryResult<i64> {
    i64::try_from(repo_id.value()).map_err(IntegrationRepositoryError::persistence)
}

fn to_credential_row(credential: &IntegrationCredential) -> CredentialRow {
    CredentialRow {
        id: credential.id().into_inner(),
        owner_id: credential.owner().into_inner(),
        service_kind: credential.kind().as_str().to_owned(),
        access_token: credential.token().map(|token| token.expose().to_owned()),
        handshake_state: credential.handshake_state().as_str().to_owned(),
        created_at: credential.created_at(),
        updated_at: credential.updated_at(),
    }
}

fn row_to_credential(row: CredentialRow) -> IntegrationRepositoryResult<IntegrationCredential> {
    let kind = ServiceKind::try_from(row.service_kind.as_str())
        .map_err(IntegrationRepositoryError::invalid_persisted_data)?;
    let token = row
        .access_token
        .map(AccessToken::new)
        .transpose()
        .map_err(IntegrationRepositoryError::invalid_persisted_data)?;

    Ok(IntegrationCredential::from_persisted(
        PersistedCredentialData {
            id: CredentialId::from_uuid(row.id),
            owner: AccountId::from_uuid(row.owner_id),
            kind,
            token,
            handshake_state: HandshakeState::from_persisted(row.handshake_state),
            created_at: row.created_at,
            updated_at: row.updated_at,
        },
    ))
}

fn row_to_column(row: WatchedColumnRow) -> IntegrationRepositoryResult<WatchedColumn> {
    let column_id =
        ColumnId::new(row.column_id).map_err(IntegrationRepositoryError::invalid_persisted_data)?;
    let board_id =
        BoardId::new(row.board_id).map_err(IntegrationRepositoryError::invalid_persisted_data)?;
    let webhook_id = row
        .webhook_id
        .map(WebhookId::new)
        .transpose()
        .map_err(IntegrationRepositoryError::invalid_persisted_data)?;

    Ok(WatchedColumn::from_persisted(
        column_id,
        CredentialId::from_uuid(row.credential_id),
        board_id,
        webhook_id,
        row.created_at,
    ))
}

fn row_to_repository(row: RepositoryRow) -> IntegrationRepositoryResult<RegisteredRepository> {
    let repo_id = u64::try_from(row.repo_id)
        .map_err(IntegrationRepositoryError::invalid_persisted_data)
        .and_then(|value| {
            RepoId::new(value).map_err(IntegrationRepositoryError::invalid_persisted_data)
        })?;

    Ok(RegisteredRepository::from_persisted(
        repo_id,
        CredentialId::from_uuid(row.credential_id),
        row.created_at,
    ))
}

fn is_owner_kind_unique_violation(info: &dyn DatabaseErrorInformation) -> bool {
    info.constraint_name()
        .is_some_and(|name| name == "idx_integration_credentials_owner_kind")
}
