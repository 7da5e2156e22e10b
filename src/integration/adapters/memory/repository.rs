//! In-memory integration registry repository.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::integration::{
    domain::{
        AccountId, ColumnId, CredentialId, IntegrationCredential, RegisteredRepository, RepoId,
        ServiceKind, WatchedColumn,
    },
    ports::{IntegrationRepository, IntegrationRepositoryError, IntegrationRepositoryResult},
};

/// Thread-safe in-memory integration repository.
///
/// Deleting a credential removes the columns and repositories owned through
/// it in the same critical section.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIntegrationRepository {
    state: Arc<RwLock<InMemoryIntegrationState>>,
}

#[derive(Debug, Default)]
struct InMemoryIntegrationState {
    credentials: HashMap<CredentialId, IntegrationCredential>,
    owner_index: HashMap<(AccountId, ServiceKind), CredentialId>,
    columns: BTreeMap<ColumnId, WatchedColumn>,
    repositories: BTreeMap<RepoId, RegisteredRepository>,
}

impl InMemoryIntegrationRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> IntegrationRepositoryResult<RwLockReadGuard<'_, InMemoryIntegrationState>> {
        self.state.read().map_err(|err| {
            IntegrationRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn write(
        &self,
    ) -> IntegrationRepositoryResult<RwLockWriteGuard<'_, InMemoryIntegrationState>> {
        self.state.write().map_err(|err| {
            IntegrationRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }
}

#[async_trait]
impl IntegrationRepository for InMemoryIntegrationRepository {
    async fn store_credential(
        &self,
        credential: &IntegrationCredential,
    ) -> IntegrationRepositoryResult<()> {
        let mut state = self.write()?;
        let key = (credential.owner(), credential.kind());
        if state.owner_index.contains_key(&key) {
            return Err(IntegrationRepositoryError::DuplicateCredential {
                owner: credential.owner(),
                kind: credential.kind(),
            });
        }
        state.owner_index.insert(key, credential.id());
        state
            .credentials
            .insert(credential.id(), credential.clone());
        Ok(())
    }

    async fn update_credential(
        &self,
        credential: &IntegrationCredential,
    ) -> IntegrationRepositoryResult<()> {
        let mut state = self.write()?;
        let stored = state
            .credentials
            .get_mut(&credential.id())
            .ok_or(IntegrationRepositoryError::CredentialNotFound(
                credential.id(),
            ))?;
        *stored = credential.clone();
        Ok(())
    }

    async fn find_credential(
        &self,
        owner: AccountId,
        kind: ServiceKind,
    ) -> IntegrationRepositoryResult<Option<IntegrationCredential>> {
        let state = self.read()?;
        Ok(state
            .owner_index
            .get(&(owner, kind))
            .and_then(|id| state.credentials.get(id))
            .cloned())
    }

    async fn find_credential_by_id(
        &self,
        id: CredentialId,
    ) -> IntegrationRepositoryResult<Option<IntegrationCredential>> {
        Ok(self.read()?.credentials.get(&id).cloned())
    }

    async fn delete_credential(&self, id: CredentialId) -> IntegrationRepositoryResult<()> {
        let mut state = self.write()?;
        let removed = state
            .credentials
            .remove(&id)
            .ok_or(IntegrationRepositoryError::CredentialNotFound(id))?;
        state
            .owner_index
            .remove(&(removed.owner(), removed.kind()));
        state
            .columns
            .retain(|_, column| column.credential_id() != id);
        state
            .repositories
            .retain(|_, repository| repository.credential_id() != id);
        Ok(())
    }

    async fn store_watched_column(
        &self,
        column: &WatchedColumn,
    ) -> IntegrationRepositoryResult<()> {
        let mut state = self.write()?;
        if !state.credentials.contains_key(&column.credential_id()) {
            return Err(IntegrationRepositoryError::CredentialNotFound(
                column.credential_id(),
            ));
        }
        if state.columns.contains_key(column.column_id()) {
            return Err(IntegrationRepositoryError::DuplicateColumn(
                column.column_id().clone(),
            ));
        }
        state
            .columns
            .insert(column.column_id().clone(), column.clone());
        Ok(())
    }

    async fn find_watched_column(
        &self,
        column_id: &ColumnId,
    ) -> IntegrationRepositoryResult<Option<WatchedColumn>> {
        Ok(self.read()?.columns.get(column_id).cloned())
    }

    async fn list_watched_columns(
        &self,
        credential_id: CredentialId,
    ) -> IntegrationRepositoryResult<Vec<WatchedColumn>> {
        Ok(self
            .read()?
            .columns
            .values()
            .filter(|column| column.credential_id() == credential_id)
            .cloned()
            .collect())
    }

    async fn store_repository(
        &self,
        repository: &RegisteredRepository,
    ) -> IntegrationRepositoryResult<()> {
        let mut state = self.write()?;
        if !state.credentials.contains_key(&repository.credential_id()) {
            return Err(IntegrationRepositoryError::CredentialNotFound(
                repository.credential_id(),
            ));
        }
        if state.repositories.contains_key(&repository.repo_id()) {
            return Err(IntegrationRepositoryError::DuplicateRepository(
                repository.repo_id(),
            ));
        }
        state
            .repositories
            .insert(repository.repo_id(), repository.clone());
        Ok(())
    }

    async fn find_repository(
        &self,
        repo_id: RepoId,
    ) -> IntegrationRepositoryResult<Option<RegisteredRepository>> {
        Ok(self.read()?.repositories.get(&repo_id).cloned())
    }

    async fn list_repositories(
        &self,
        credential_id: CredentialId,
    ) -> IntegrationRepositoryResult<Vec<RegisteredRepository>> {
        Ok(self
            .read()?
            .repositories
            .values()
            .filter(|repository| repository.credential_id() == credential_id)
            .cloned()
            .collect())
    }
}
