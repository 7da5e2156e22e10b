//! Driving port through which the webhook surface hands events over.

use super::error::ReconcileError;
use super::payload::{CardMovedEvent, PullRequestEvent};
use super::service::{CardMovedOutcome, ChangeOpenedOutcome, EventReconciler};
use crate::integration::ports::{CodeReviewClient, IntegrationRepository};
use crate::review::ports::ReviewRecordStore;
use async_trait::async_trait;
use mockable::Clock;

/// Inbound event handling contract.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InboundEvents: Send + Sync {
    /// Handles a code-review change-opened event.
    async fn change_opened(
        &self,
        event: PullRequestEvent,
    ) -> Result<ChangeOpenedOutcome, ReconcileError>;

    /// Handles a task-board card-moved event.
    async fn card_moved(&self, event: CardMovedEvent) -> Result<CardMovedOutcome, ReconcileError>;
}

#[async_trait]
impl<R, S, G, C> InboundEvents for EventReconciler<R, S, G, C>
where
    R: IntegrationRepository,
    S: ReviewRecordStore,
    G: CodeReviewClient,
    C: Clock + Send + Sync,
{
    async fn change_opened(
        &self,
        event: PullRequestEvent,
    ) -> Result<ChangeOpenedOutcome, ReconcileError> {
        self.handle_change_opened(&event).await
    }

    async fn card_moved(&self, event: CardMovedEvent) -> Result<CardMovedOutcome, ReconcileError> {
        self.handle_column_card_moved(&event).await
    }
}
