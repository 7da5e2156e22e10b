//! Credential revocation and its cascade.

use product_signoff::{
    integration::{
        domain::{ColumnId, ServiceKind},
        ports::{ExternalApiError, IntegrationRepository},
    },
    reconciler::{CardMovedOutcome, ReconcileError},
    review::{domain::ReviewStatus, ports::ReviewRecordStore},
};
use rstest::rstest;

use super::helpers::{Stack, card_moved, change_id, change_opened, stack};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn revoking_task_board_removes_columns_and_links(stack: Stack) -> eyre::Result<()> {
    let owner = stack.onboard(&[7], &["col_9", "col_10"]).await?;
    stack.open_change(42, 7, "aaaaaaa").await?;
    stack.link(owner, 42, "col_9").await?;
    assert_eq!(stack.task_board.active_webhooks()?.len(), 2);

    let outcome = stack.registry.revoke(owner, ServiceKind::TaskBoard).await?;

    assert_eq!(outcome.columns_removed, 2);
    assert_eq!(outcome.links_cleared, 1);
    assert_eq!(outcome.external_failures, 0);
    assert!(stack.task_board.active_webhooks()?.is_empty());
    assert_eq!(stack.task_board.revoked_tokens()?, vec!["tr-token".to_owned()]);
    assert!(
        stack
            .registry_repository
            .find_watched_column(&ColumnId::new("col_9")?)
            .await?
            .is_none()
    );

    let record = stack
        .store
        .find(change_id(42)?)
        .await?
        .ok_or_else(|| eyre::eyre!("records survive revocation"))?;
    assert!(record.linked_column().is_none());
    assert_eq!(record.status(), ReviewStatus::Pending);

    let moved = stack
        .reconciler
        .handle_column_card_moved(&card_moved("col_9", "Alice")?)
        .await?;
    assert!(matches!(moved, CardMovedOutcome::ColumnNotWatched(_)));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn revocation_cascades_even_when_task_board_is_down(stack: Stack) -> eyre::Result<()> {
    let owner = stack.onboard(&[7], &["col_9"]).await?;
    stack.task_board.fail_with(ExternalApiError::Timeout)?;

    let outcome = stack.registry.revoke(owner, ServiceKind::TaskBoard).await?;

    assert_eq!(outcome.columns_removed, 1);
    assert_eq!(outcome.external_failures, 2);
    assert!(
        stack
            .registry_repository
            .find_credential(owner, ServiceKind::TaskBoard)
            .await?
            .is_none()
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn revoking_code_review_stops_pending_reports(stack: Stack) -> eyre::Result<()> {
    let owner = stack.onboard(&[7], &["col_9"]).await?;
    stack.registry.revoke(owner, ServiceKind::CodeReview).await?;

    assert_eq!(stack.code_review.revoked_tokens()?, vec!["gh-token".to_owned()]);
    let result = stack
        .reconciler
        .handle_change_opened(&change_opened(42, 7, "aaaaaaa")?)
        .await;
    assert!(matches!(result, Err(ReconcileError::RepositoryNotRegistered(_))));
    assert!(stack.code_review.reports()?.is_empty());
    Ok(())
}
