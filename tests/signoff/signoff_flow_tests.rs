//! Change opened, linked, and accepted across both services.

use product_signoff::{
    integration::ports::{CommitState, ExternalApiError},
    reconciler::{CardMovedOutcome, ChangeOpenedOutcome},
    review::{domain::ReviewStatus, ports::ReviewRecordStore},
};
use rstest::rstest;

use super::helpers::{Stack, card_moved, change_id, change_opened, stack};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn opened_change_is_reported_pending_then_accepted(stack: Stack) -> eyre::Result<()> {
    let owner = stack.onboard(&[7], &["col_9"]).await?;

    let outcome = stack
        .reconciler
        .handle_change_opened(&change_opened(42, 7, "ABCDEF1")?)
        .await?;
    eyre::ensure!(
        outcome == ChangeOpenedOutcome::Recorded(change_id(42)?),
        "unexpected outcome {outcome:?}"
    );

    stack.link(owner, 42, "col_9").await?;
    let report = stack.move_card("col_9", "Alice").await?;
    eyre::ensure!(report.accepted == vec![change_id(42)?], "report {report:?}");

    let reports = stack.code_review.reports()?;
    let states: Vec<CommitState> = reports.iter().map(|sent| sent.report.state).collect();
    assert_eq!(states, vec![CommitState::Pending, CommitState::Success]);
    assert!(reports.iter().all(|sent| {
        sent.report.url.as_str() == "https://api.github.com/repos/acme/shop/statuses/abcdef1"
    }));
    assert_eq!(
        reports.last().map(|sent| sent.report.description.as_str()),
        Some("Product accepted by Alice")
    );

    let record = stack
        .store
        .find(change_id(42)?)
        .await?
        .ok_or_else(|| eyre::eyre!("record missing"))?;
    assert_eq!(record.status(), ReviewStatus::Accepted);
    assert_eq!(record.branch().as_str(), "feature/x");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn column_fan_out_accepts_every_linked_change(stack: Stack) -> eyre::Result<()> {
    let owner = stack.onboard(&[7], &["col_9"]).await?;
    stack.open_change(42, 7, "aaaaaaa").await?;
    stack.open_change(43, 7, "bbbbbbb").await?;
    stack.link(owner, 42, "col_9").await?;
    stack.link(owner, 43, "col_9").await?;

    let first = stack.move_card("col_9", "Alice").await?;
    let replay = stack.move_card("col_9", "Alice").await?;

    assert_eq!(first.accepted, vec![change_id(42)?, change_id(43)?]);
    assert!(replay.accepted.is_empty());
    assert_eq!(replay.skipped, vec![change_id(42)?, change_id(43)?]);
    let successes = stack
        .code_review
        .reports()?
        .iter()
        .filter(|sent| sent.report.state == CommitState::Success)
        .count();
    assert_eq!(successes, 2);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn card_moved_into_unwatched_column_changes_nothing(stack: Stack) -> eyre::Result<()> {
    let owner = stack.onboard(&[7], &["col_9"]).await?;
    stack.open_change(42, 7, "aaaaaaa").await?;
    stack.link(owner, 42, "col_9").await?;
    let before = stack.code_review.reports()?.len();

    let outcome = stack
        .reconciler
        .handle_column_card_moved(&card_moved("col_x", "Alice")?)
        .await?;

    assert!(matches!(outcome, CardMovedOutcome::ColumnNotWatched(_)));
    assert_eq!(stack.code_review.reports()?.len(), before);
    let record = stack
        .store
        .find(change_id(42)?)
        .await?
        .ok_or_else(|| eyre::eyre!("record missing"))?;
    assert_eq!(record.status(), ReviewStatus::Pending);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn outage_during_fan_out_is_recovered_by_redelivery(stack: Stack) -> eyre::Result<()> {
    let owner = stack.onboard(&[7], &["col_9"]).await?;
    stack.open_change(42, 7, "aaaaaaa").await?;
    stack.link(owner, 42, "col_9").await?;
    stack.code_review.fail_with(ExternalApiError::UnexpectedStatus {
        status: 500,
        body: "internal error".to_owned(),
    })?;

    let failed = stack.move_card("col_9", "Alice").await?;
    assert!(failed.needs_redelivery());
    assert!(failed.accepted.is_empty());

    stack.code_review.recover()?;
    let redelivered = stack.move_card("col_9", "Alice").await?;
    assert_eq!(redelivered.accepted, vec![change_id(42)?]);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn accounts_cannot_link_each_others_changes(stack: Stack) -> eyre::Result<()> {
    let alice = stack.onboard(&[7], &["col_9"]).await?;
    let bob = stack.onboard(&[8], &["col_b"]).await?;
    stack.open_change(42, 7, "aaaaaaa").await?;

    let into_foreign_column = stack.link(bob, 42, "col_9").await;
    let foreign_change = stack.link(bob, 42, "col_b").await;
    assert!(into_foreign_column.is_err());
    assert!(foreign_change.is_err());

    stack.link(alice, 42, "col_9").await?;
    let bob_moves = stack.move_card("col_b", "Bob").await?;
    assert!(bob_moves.accepted.is_empty());
    Ok(())
}
