//! Event reconciler: maps inbound events onto review records and issues the
//! compensating status calls.

use super::error::{Disposition, ReconcileError};
use super::payload::{CardMovedEvent, PullRequestEvent};
use crate::integration::{
    domain::{
        AccessToken, AccountId, ColumnId, CredentialId, IntegrationCredential, RepoId,
        ServiceKind,
    },
    ports::{CodeReviewClient, CommitState, ExternalApiError, IntegrationRepository, StatusReport},
};
use crate::review::{
    domain::{AcceptanceClaim, ChangeId, ReviewRecord},
    ports::ReviewRecordStore,
};
use minijinja::{Environment, context};
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default commit-status context label.
pub const DEFAULT_STATUS_CONTEXT: &str = "product-signoff";

/// Description reported while a change awaits product review.
pub const PENDING_DESCRIPTION: &str = "Awaiting product review";

/// Default template for the description reported on acceptance.
pub const DEFAULT_ACCEPTED_TEMPLATE: &str = "Product accepted by {{ user }}";

/// Tunables for the event reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerSettings {
    /// Context label attached to every status report.
    pub status_context: String,
    /// Upper bound on each outbound status call.
    pub outbound_timeout: Duration,
    /// How long an acceptance claim is held before another delivery may
    /// take it over.
    pub claim_lease: Duration,
    /// `minijinja` template for the acceptance description; receives `user`.
    pub accepted_template: String,
}

impl ReconcilerSettings {
    /// Returns the claim lease once it is known to outlast an outbound call.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::InvalidClaimLease`] when the lease is not
    /// longer than the outbound timeout or does not fit a timestamp offset.
    pub fn validated_claim_lease(&self) -> Result<chrono::Duration, ReconcileError> {
        if self.claim_lease <= self.outbound_timeout {
            return Err(ReconcileError::InvalidClaimLease(format!(
                "lease of {:?} must be longer than the outbound timeout of {:?}",
                self.claim_lease, self.outbound_timeout
            )));
        }
        chrono::Duration::from_std(self.claim_lease).map_err(|err| {
            ReconcileError::InvalidClaimLease(format!(
                "lease of {:?} is out of range: {err}",
                self.claim_lease
            ))
        })
    }
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            status_context: DEFAULT_STATUS_CONTEXT.to_owned(),
            outbound_timeout: Duration::from_secs(5),
            claim_lease: Duration::from_secs(30),
            accepted_template: DEFAULT_ACCEPTED_TEMPLATE.to_owned(),
        }
    }
}

/// Renders the acceptance description for `user`.
///
/// # Errors
///
/// Returns [`ReconcileError::TemplateRender`] when the template is invalid.
pub fn render_accepted_description(template: &str, user: &str) -> Result<String, ReconcileError> {
    Environment::new()
        .render_str(template, context! { user => user })
        .map_err(|err| ReconcileError::TemplateRender(err.to_string()))
}

/// Result of handling a change-opened event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeOpenedOutcome {
    /// The pull-request action does not start review.
    Ignored {
        /// Action that was ignored.
        action: String,
    },
    /// A pending status was reported and a new record stored.
    Recorded(ChangeId),
    /// A pending status was reported again for an existing pending record.
    AlreadyTracked(ChangeId),
    /// The record is already accepted; nothing was reported.
    AlreadyAccepted(ChangeId),
}

/// Per-record failure inside a card-moved fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFailure {
    /// Change whose acceptance failed.
    pub change_id: ChangeId,
    /// Whether redelivery could succeed.
    pub disposition: Disposition,
    /// Rendered failure reason.
    pub reason: String,
}

/// Per-record results of a card-moved fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanOutReport {
    /// Watched column the card moved into.
    pub column_id: ColumnId,
    /// Records moved to accepted by this delivery.
    pub accepted: Vec<ChangeId>,
    /// Records already accepted or claimed by a concurrent delivery.
    pub skipped: Vec<ChangeId>,
    /// Records whose acceptance failed.
    pub failed: Vec<RecordFailure>,
}

impl FanOutReport {
    fn new(column_id: ColumnId) -> Self {
        Self {
            column_id,
            accepted: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Returns `true` when at least one failure could succeed on
    /// redelivery.
    #[must_use]
    pub fn needs_redelivery(&self) -> bool {
        self.failed
            .iter()
            .any(|failure| failure.disposition == Disposition::Retry)
    }
}

/// Result of handling a card-moved event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardMovedOutcome {
    /// The action is not a card update.
    Ignored {
        /// Action type that was ignored.
        action: String,
    },
    /// The destination column is not watched.
    ColumnNotWatched(ColumnId),
    /// The linked records were reconciled.
    Reconciled(FanOutReport),
}

/// What a link request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTarget {
    /// A single change.
    Change(ChangeId),
    /// Every pending change of a repository.
    Repository(RepoId),
}

/// Request to link review records to a watched column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkReviewRequest {
    /// Account performing the link.
    pub requested_by: AccountId,
    /// Records to link.
    pub target: LinkTarget,
    /// Watched column to link them to.
    pub column_id: ColumnId,
}

/// Result of a link request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkOutcome {
    /// Records now linked to the column.
    pub linked: Vec<ChangeId>,
    /// Records left alone because they are already accepted.
    pub skipped_accepted: Vec<ChangeId>,
}

enum RecordAcceptance {
    Accepted,
    Skipped,
}

/// Reconciles code-review and task-board events against local state.
#[derive(Clone)]
pub struct EventReconciler<R, S, G, C>
where
    R: IntegrationRepository,
    S: ReviewRecordStore,
    G: CodeReviewClient,
    C: Clock + Send + Sync,
{
    registry: Arc<R>,
    store: Arc<S>,
    code_review: Arc<G>,
    clock: Arc<C>,
    settings: ReconcilerSettings,
}

impl<R, S, G, C> EventReconciler<R, S, G, C>
where
    R: IntegrationRepository,
    S: ReviewRecordStore,
    G: CodeReviewClient,
    C: Clock + Send + Sync,
{
    /// Creates a reconciler.
    #[must_use]
    pub const fn new(
        registry: Arc<R>,
        store: Arc<S>,
        code_review: Arc<G>,
        clock: Arc<C>,
        settings: ReconcilerSettings,
    ) -> Self {
        Self {
            registry,
            store,
            code_review,
            clock,
            settings,
        }
    }

    /// Returns the active settings.
    #[must_use]
    pub const fn settings(&self) -> &ReconcilerSettings {
        &self.settings
    }

    /// Handles a code-review change-opened event.
    ///
    /// Reports a pending status for the change's head revision and, only once
    /// that call succeeds, stores a pending record. Replays re-report the
    /// same status and leave exactly one record.
    ///
    /// # Errors
    ///
    /// Returns validation errors for malformed payloads, not-found errors
    /// when the repository is not registered or its credential is not live,
    /// [`ReconcileError::ExternalCall`] when the status call fails, and
    /// persistence errors.
    pub async fn handle_change_opened(
        &self,
        event: &PullRequestEvent,
    ) -> Result<ChangeOpenedOutcome, ReconcileError> {
        if !event.is_review_trigger() {
            debug!(action = event.action(), "ignoring pull request action");
            return Ok(ChangeOpenedOutcome::Ignored {
                action: event.action().to_owned(),
            });
        }

        let change = event.opened_change()?;
        let change_id = change.change_id;
        let (_, token) = self.repository_credential(change.repo_id).await?;

        let existing = self.store.find(change_id).await?;
        if existing.as_ref().is_some_and(ReviewRecord::is_accepted) {
            info!(%change_id, "change already accepted, not reporting pending");
            return Ok(ChangeOpenedOutcome::AlreadyAccepted(change_id));
        }

        let report = StatusReport {
            url: change.report_url.clone(),
            state: CommitState::Pending,
            description: PENDING_DESCRIPTION.to_owned(),
            context: self.settings.status_context.clone(),
        };
        self.send_report(&token, &report).await.inspect_err(|err| {
            warn!(%change_id, error = %err, "pending status report failed");
        })?;

        if existing.is_some() {
            return Ok(ChangeOpenedOutcome::AlreadyTracked(change_id));
        }
        let record = ReviewRecord::open(change, &*self.clock);
        if self.store.insert_if_absent(&record).await? {
            info!(%change_id, repo_id = %record.repo_id(), "review record opened");
            Ok(ChangeOpenedOutcome::Recorded(change_id))
        } else {
            Ok(ChangeOpenedOutcome::AlreadyTracked(change_id))
        }
    }

    /// Handles a task-board card-moved event.
    ///
    /// Each record linked to the destination column is accepted
    /// independently; a failure for one record never affects the others.
    ///
    /// # Errors
    ///
    /// Returns validation errors for malformed payloads, not-found errors
    /// when the column's credential is not live, and persistence errors
    /// raised before the fan-out starts.
    pub async fn handle_column_card_moved(
        &self,
        event: &CardMovedEvent,
    ) -> Result<CardMovedOutcome, ReconcileError> {
        if !event.is_card_update() {
            debug!(action = event.action_type(), "ignoring task-board action");
            return Ok(CardMovedOutcome::Ignored {
                action: event.action_type().to_owned(),
            });
        }

        let moved = event.card_moved()?;
        let Some(column) = self.registry.find_watched_column(&moved.column_id).await? else {
            debug!(column_id = %moved.column_id, "card moved into unwatched column");
            return Ok(CardMovedOutcome::ColumnNotWatched(moved.column_id));
        };
        let column_owner = self
            .live_credential(column.credential_id(), ServiceKind::TaskBoard)
            .await?
            .0
            .owner();

        let mut report = FanOutReport::new(moved.column_id.clone());
        let records = self.store.find_linked_to(&moved.column_id).await?;
        if records.is_empty() {
            info!(column_id = %moved.column_id, "no review records linked to column");
            return Ok(CardMovedOutcome::Reconciled(report));
        }

        let lease = self.settings.validated_claim_lease()?;
        let description =
            render_accepted_description(&self.settings.accepted_template, &moved.actor)?;
        for record in &records {
            let change_id = record.change_id();
            match self
                .accept_record(record, column_owner, lease, &description)
                .await
            {
                Ok(RecordAcceptance::Accepted) => report.accepted.push(change_id),
                Ok(RecordAcceptance::Skipped) => report.skipped.push(change_id),
                Err(err) => {
                    warn!(
                        %change_id,
                        column_id = %moved.column_id,
                        error = %err,
                        "acceptance failed"
                    );
                    report.failed.push(RecordFailure {
                        change_id,
                        disposition: err.disposition(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        info!(
            column_id = %moved.column_id,
            accepted = report.accepted.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "card move reconciled"
        );
        Ok(CardMovedOutcome::Reconciled(report))
    }

    async fn accept_record(
        &self,
        record: &ReviewRecord,
        column_owner: AccountId,
        lease: chrono::Duration,
        description: &str,
    ) -> Result<RecordAcceptance, ReconcileError> {
        let change_id = record.change_id();
        if record.is_accepted() {
            return Ok(RecordAcceptance::Skipped);
        }

        let (credential, token) = self.repository_credential(record.repo_id()).await?;
        if credential.owner() != column_owner {
            return Err(ReconcileError::RepositoryOwnedElsewhere(record.repo_id()));
        }

        let now = self.clock.utc();
        let lease_until = now.checked_add_signed(lease).ok_or_else(|| {
            ReconcileError::InvalidClaimLease(format!("lease of {lease} overflows {now}"))
        })?;
        let claim = AcceptanceClaim::new();
        if !self
            .store
            .try_claim_acceptance(change_id, claim, now, lease_until)
            .await?
        {
            debug!(%change_id, "record already accepted or claimed");
            return Ok(RecordAcceptance::Skipped);
        }

        let report = StatusReport {
            url: record.report_url().clone(),
            state: CommitState::Success,
            description: description.to_owned(),
            context: self.settings.status_context.clone(),
        };
        if let Err(err) = self.send_report(&token, &report).await {
            if let Err(release_err) = self.store.release_claim(change_id, claim).await {
                warn!(%change_id, error = %release_err, "failed to release acceptance claim");
            }
            return Err(err.into());
        }

        if !self
            .store
            .complete_acceptance(change_id, claim, self.clock.utc())
            .await?
        {
            warn!(%change_id, "acceptance claim lost before completion");
        }
        Ok(RecordAcceptance::Accepted)
    }

    /// Links review records to a watched column on behalf of an account.
    ///
    /// The account must own both the column's task-board credential and the
    /// repository registration. Accepted records are never relinked.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::ColumnNotWatched`],
    /// [`ReconcileError::ChangeNotFound`], or
    /// [`ReconcileError::RepositoryNotRegistered`] for missing entities,
    /// ownership conflicts, [`ReconcileError::AlreadyAccepted`] when a single
    /// targeted change is accepted, and persistence errors.
    pub async fn link_review(
        &self,
        request: &LinkReviewRequest,
    ) -> Result<LinkOutcome, ReconcileError> {
        let column = self
            .registry
            .find_watched_column(&request.column_id)
            .await?
            .ok_or_else(|| ReconcileError::ColumnNotWatched(request.column_id.clone()))?;
        let (column_credential, _) = self
            .live_credential(column.credential_id(), ServiceKind::TaskBoard)
            .await?;
        if column_credential.owner() != request.requested_by {
            return Err(ReconcileError::ColumnOwnedElsewhere(
                request.column_id.clone(),
            ));
        }

        let (repo_id, records) = match request.target {
            LinkTarget::Change(change_id) => {
                let record = self
                    .store
                    .find(change_id)
                    .await?
                    .ok_or(ReconcileError::ChangeNotFound(change_id))?;
                if record.is_accepted() {
                    return Err(ReconcileError::AlreadyAccepted(change_id));
                }
                (record.repo_id(), vec![record])
            }
            LinkTarget::Repository(repo_id) => {
                (repo_id, self.store.find_by_repo(repo_id).await?)
            }
        };
        self.ensure_repository_owner(repo_id, request.requested_by)
            .await?;

        let mut outcome = LinkOutcome::default();
        for mut record in records {
            let change_id = record.change_id();
            if record.link_to(request.column_id.clone(), &*self.clock).is_err() {
                outcome.skipped_accepted.push(change_id);
                continue;
            }
            self.store.update_link(&record).await?;
            outcome.linked.push(change_id);
        }

        info!(
            column_id = %request.column_id,
            linked = outcome.linked.len(),
            skipped = outcome.skipped_accepted.len(),
            "review records linked"
        );
        Ok(outcome)
    }

    async fn ensure_repository_owner(
        &self,
        repo_id: RepoId,
        owner: AccountId,
    ) -> Result<(), ReconcileError> {
        let registration = self
            .registry
            .find_repository(repo_id)
            .await?
            .ok_or(ReconcileError::RepositoryNotRegistered(repo_id))?;
        let credential = self
            .registry
            .find_credential_by_id(registration.credential_id())
            .await?
            .ok_or_else(|| {
                ReconcileError::DanglingRegistration(format!("repository {repo_id}"))
            })?;
        if credential.owner() != owner {
            return Err(ReconcileError::RepositoryOwnedElsewhere(repo_id));
        }
        Ok(())
    }

    async fn repository_credential(
        &self,
        repo_id: RepoId,
    ) -> Result<(IntegrationCredential, AccessToken), ReconcileError> {
        let registration = self
            .registry
            .find_repository(repo_id)
            .await?
            .ok_or(ReconcileError::RepositoryNotRegistered(repo_id))?;
        self.live_credential(registration.credential_id(), ServiceKind::CodeReview)
            .await
    }

    async fn live_credential(
        &self,
        credential_id: CredentialId,
        kind: ServiceKind,
    ) -> Result<(IntegrationCredential, AccessToken), ReconcileError> {
        let credential = self
            .registry
            .find_credential_by_id(credential_id)
            .await?
            .ok_or_else(|| {
                ReconcileError::DanglingRegistration(format!("credential {credential_id}"))
            })?;
        let Some(token) = credential.token().cloned() else {
            return Err(ReconcileError::CredentialUnavailable {
                owner: credential.owner(),
                kind,
            });
        };
        Ok((credential, token))
    }

    async fn send_report(
        &self,
        token: &AccessToken,
        report: &StatusReport,
    ) -> Result<(), ExternalApiError> {
        tokio::time::timeout(
            self.settings.outbound_timeout,
            self.code_review.set_status(token, report),
        )
        .await
        .map_err(|_| ExternalApiError::Timeout)?
    }
}
