//! Then steps for product sign-off BDD scenarios.

use super::world::{SignoffWorld, run_async, sha_for};
use product_signoff::{
    integration::domain::RepoId,
    reconciler::CardMovedOutcome,
    review::{domain::ChangeId, ports::ReviewRecordStore},
};
use rstest_bdd_macros::then;

#[then(r#"a "{state}" status is reported for change {change:u64}"#)]
fn status_reported(
    world: &SignoffWorld,
    state: String,
    change: u64,
) -> Result<(), eyre::Report> {
    let sha = sha_for(change);
    let reports = world.code_review.reports()?;
    let found = reports.iter().any(|sent| {
        sent.report.state.as_str() == state && sent.report.url.as_str().ends_with(&sha)
    });
    eyre::ensure!(found, "no {state} status for change {change} in {reports:?}");
    Ok(())
}

#[then(r#"change {change:u64} is tracked as "{status}""#)]
fn change_tracked_as(
    world: &SignoffWorld,
    change: u64,
    status: String,
) -> Result<(), eyre::Report> {
    let record = run_async(world.store.find(ChangeId::new(change)?))?
        .ok_or_else(|| eyre::eyre!("no record for change {change}"))?;
    eyre::ensure!(
        record.status().as_str() == status,
        "expected change {change} to be {status}, found {}",
        record.status()
    );
    Ok(())
}

#[then("exactly one record exists for repository {repo:u64}")]
fn single_record_for_repository(world: &SignoffWorld, repo: u64) -> Result<(), eyre::Report> {
    let records = run_async(world.store.find_by_repo(RepoId::new(repo)?))?;
    eyre::ensure!(
        records.len() == 1,
        "expected one record, found {}",
        records.len()
    );
    Ok(())
}

#[then(r#"{count:usize} "{state}" statuses mention "{actor}""#)]
fn statuses_mention_actor(
    world: &SignoffWorld,
    count: usize,
    state: String,
    actor: String,
) -> Result<(), eyre::Report> {
    let matching = world
        .code_review
        .reports()?
        .iter()
        .filter(|sent| {
            sent.report.state.as_str() == state && sent.report.description.contains(&actor)
        })
        .count();
    eyre::ensure!(
        matching == count,
        "expected {count} {state} statuses mentioning {actor}, found {matching}"
    );
    Ok(())
}

#[then("the delivery is reported as an unwatched column")]
fn delivery_hit_unwatched_column(world: &SignoffWorld) -> Result<(), eyre::Report> {
    match world.last_card_moved.as_ref() {
        Some(Ok(CardMovedOutcome::ColumnNotWatched(_))) => Ok(()),
        other => Err(eyre::eyre!("expected an unwatched column, got {other:?}")),
    }
}

#[then("redelivery is requested")]
fn redelivery_requested(world: &SignoffWorld) -> Result<(), eyre::Report> {
    match world.last_card_moved.as_ref() {
        Some(Ok(CardMovedOutcome::Reconciled(report))) if report.needs_redelivery() => Ok(()),
        other => Err(eyre::eyre!("expected a redelivery request, got {other:?}")),
    }
}
