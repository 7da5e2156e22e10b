//! In-memory review record store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::integration::domain::{ColumnId, RepoId};
use crate::review::{
    domain::{AcceptanceClaim, ChangeId, ReviewRecord},
    ports::{ReviewRecordStore, ReviewStoreError, ReviewStoreResult},
};

/// Thread-safe in-memory review record store.
///
/// Records are kept in change-id order so fan-out results are deterministic.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReviewStore {
    state: Arc<RwLock<InMemoryReviewState>>,
}

#[derive(Debug, Clone, Copy)]
struct HeldClaim {
    claim: AcceptanceClaim,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct InMemoryReviewState {
    records: BTreeMap<ChangeId, ReviewRecord>,
    claims: HashMap<ChangeId, HeldClaim>,
}

impl InMemoryReviewStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> ReviewStoreResult<RwLockReadGuard<'_, InMemoryReviewState>> {
        self.state
            .read()
            .map_err(|err| ReviewStoreError::persistence(std::io::Error::other(err.to_string())))
    }

    fn write(&self) -> ReviewStoreResult<RwLockWriteGuard<'_, InMemoryReviewState>> {
        self.state
            .write()
            .map_err(|err| ReviewStoreError::persistence(std::io::Error::other(err.to_string())))
    }
}

fn collect_matching(
    state: &InMemoryReviewState,
    predicate: impl Fn(&ReviewRecord) -> bool,
) -> Vec<ReviewRecord> {
    state
        .records
        .values()
        .filter(|record| predicate(record))
        .cloned()
        .collect()
}

#[async_trait]
impl ReviewRecordStore for InMemoryReviewStore {
    async fn insert_if_absent(&self, record: &ReviewRecord) -> ReviewStoreResult<bool> {
        let mut state = self.write()?;
        if state.records.contains_key(&record.change_id()) {
            return Ok(false);
        }
        state.records.insert(record.change_id(), record.clone());
        Ok(true)
    }

    async fn find(&self, change_id: ChangeId) -> ReviewStoreResult<Option<ReviewRecord>> {
        Ok(self.read()?.records.get(&change_id).cloned())
    }

    async fn find_by_repo(&self, repo_id: RepoId) -> ReviewStoreResult<Vec<ReviewRecord>> {
        let state = self.read()?;
        Ok(collect_matching(&state, |record| record.repo_id() == repo_id))
    }

    async fn find_linked_to(&self, column_id: &ColumnId) -> ReviewStoreResult<Vec<ReviewRecord>> {
        let state = self.read()?;
        Ok(collect_matching(&state, |record| {
            record.linked_column() == Some(column_id)
        }))
    }

    async fn update_link(&self, record: &ReviewRecord) -> ReviewStoreResult<()> {
        let mut state = self.write()?;
        let stored = state
            .records
            .get_mut(&record.change_id())
            .ok_or(ReviewStoreError::NotFound(record.change_id()))?;

        stored.set_link_at(record.linked_column().cloned(), record.updated_at());
        Ok(())
    }

    async fn unlink_column(
        &self,
        column_id: &ColumnId,
        now: DateTime<Utc>,
    ) -> ReviewStoreResult<usize> {
        let mut state = self.write()?;
        let mut unlinked = 0;
        for record in state.records.values_mut() {
            if record.linked_column() == Some(column_id) {
                record.unlink_at(now);
                unlinked += 1;
            }
        }
        Ok(unlinked)
    }

    async fn try_claim_acceptance(
        &self,
        change_id: ChangeId,
        claim: AcceptanceClaim,
        now: DateTime<Utc>,
        lease_until: DateTime<Utc>,
    ) -> ReviewStoreResult<bool> {
        let mut state = self.write()?;
        let is_pending = state
            .records
            .get(&change_id)
            .is_some_and(|record| !record.is_accepted());
        if !is_pending {
            return Ok(false);
        }
        if state
            .claims
            .get(&change_id)
            .is_some_and(|held| held.expires_at > now)
        {
            return Ok(false);
        }
        state.claims.insert(
            change_id,
            HeldClaim {
                claim,
                expires_at: lease_until,
            },
        );
        Ok(true)
    }

    async fn complete_acceptance(
        &self,
        change_id: ChangeId,
        claim: AcceptanceClaim,
        now: DateTime<Utc>,
    ) -> ReviewStoreResult<bool> {
        let mut state = self.write()?;
        if !holds(&state, change_id, claim) {
            return Ok(false);
        }
        state.claims.remove(&change_id);
        let Some(record) = state.records.get_mut(&change_id) else {
            return Ok(false);
        };
        Ok(record.accept_at(now).is_ok())
    }

    async fn release_claim(
        &self,
        change_id: ChangeId,
        claim: AcceptanceClaim,
    ) -> ReviewStoreResult<()> {
        let mut state = self.write()?;
        if holds(&state, change_id, claim) {
            state.claims.remove(&change_id);
        }
        Ok(())
    }
}

fn holds(state: &InMemoryReviewState, change_id: ChangeId, claim: AcceptanceClaim) -> bool {
    state
        .claims
        .get(&change_id)
        .is_some_and(|held| held.claim == claim)
}
