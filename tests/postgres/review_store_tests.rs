//! `PostgreSQL` tests for the review record store.

use super::helpers::{TestSchema, live_credential, pending_record, schema, watched_column};
use chrono::{Duration, Utc};
use mockable::DefaultClock;
use product_signoff::{
    integration::{
        domain::{AccountId, RepoId, ServiceKind},
        ports::IntegrationRepository,
    },
    review::{
        domain::{AcceptanceClaim, ChangeId, ReviewStatus},
        ports::{ReviewRecordStore, ReviewStoreError},
    },
};
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn insert_if_absent_keeps_the_first_record(
    schema: eyre::Result<Option<TestSchema>>,
) -> eyre::Result<()> {
    let Some(db) = schema? else { return Ok(()) };
    let record = pending_record(42, 7)?;

    assert!(db.store.insert_if_absent(&record).await?);
    assert!(!db.store.insert_if_absent(&pending_record(42, 7)?).await?);

    let stored = db
        .store
        .find(record.change_id())
        .await?
        .ok_or_else(|| eyre::eyre!("record should exist"))?;
    assert_eq!(stored.status(), ReviewStatus::Pending);
    assert_eq!(stored.report_url(), record.report_url());
    assert_eq!(db.store.find_by_repo(RepoId::new(7)?).await?.len(), 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn acceptance_claim_is_exclusive_until_the_lease_expires(
    schema: eyre::Result<Option<TestSchema>>,
) -> eyre::Result<()> {
    let Some(db) = schema? else { return Ok(()) };
    let change = ChangeId::new(42)?;
    db.store.insert_if_absent(&pending_record(42, 7)?).await?;
    let now = Utc::now();
    let lease = now + Duration::seconds(30);
    let first = AcceptanceClaim::new();
    let second = AcceptanceClaim::new();

    assert!(db.store.try_claim_acceptance(change, first, now, lease).await?);
    assert!(!db.store.try_claim_acceptance(change, second, now, lease).await?);

    let after_expiry = lease + Duration::seconds(1);
    let renewed = after_expiry + Duration::seconds(30);
    assert!(
        db.store
            .try_claim_acceptance(change, second, after_expiry, renewed)
            .await?
    );

    assert!(!db.store.complete_acceptance(change, first, after_expiry).await?);
    assert!(db.store.complete_acceptance(change, second, after_expiry).await?);
    assert!(!db.store.complete_acceptance(change, second, after_expiry).await?);
    assert!(
        !db.store
            .try_claim_acceptance(change, AcceptanceClaim::new(), after_expiry, lease)
            .await?,
        "accepted records cannot be claimed"
    );
    let stored = db
        .store
        .find(change)
        .await?
        .ok_or_else(|| eyre::eyre!("record should exist"))?;
    assert_eq!(stored.status(), ReviewStatus::Accepted);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn only_the_claim_holder_can_release(
    schema: eyre::Result<Option<TestSchema>>,
) -> eyre::Result<()> {
    let Some(db) = schema? else { return Ok(()) };
    let change = ChangeId::new(42)?;
    db.store.insert_if_absent(&pending_record(42, 7)?).await?;
    let now = Utc::now();
    let lease = now + Duration::seconds(30);
    let holder = AcceptanceClaim::new();

    assert!(db.store.try_claim_acceptance(change, holder, now, lease).await?);
    db.store.release_claim(change, AcceptanceClaim::new()).await?;
    assert!(
        !db.store
            .try_claim_acceptance(change, AcceptanceClaim::new(), now, lease)
            .await?,
        "a foreign release leaves the claim in place"
    );

    db.store.release_claim(change, holder).await?;
    assert!(
        db.store
            .try_claim_acceptance(change, AcceptanceClaim::new(), now, lease)
            .await?
    );
    assert!(
        !db.store
            .try_claim_acceptance(ChangeId::new(99)?, AcceptanceClaim::new(), now, lease)
            .await?,
        "missing records cannot be claimed"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn links_follow_the_watched_column_lifecycle(
    schema: eyre::Result<Option<TestSchema>>,
) -> eyre::Result<()> {
    let Some(db) = schema? else { return Ok(()) };
    let credential = live_credential(&db, AccountId::new(), ServiceKind::TaskBoard).await?;
    let col_a = watched_column(&db, "col_a", &credential).await?;
    let col_b = watched_column(&db, "col_b", &credential).await?;

    for change in [1, 2, 3] {
        let mut record = pending_record(change, 7)?;
        db.store.insert_if_absent(&record).await?;
        let target = if change == 3 { &col_b } else { &col_a };
        record.link_to(target.clone(), &DefaultClock)?;
        db.store.update_link(&record).await?;
    }
    assert_eq!(db.store.find_linked_to(&col_a).await?.len(), 2);

    assert_eq!(db.store.unlink_column(&col_a, Utc::now()).await?, 2);
    assert!(db.store.find_linked_to(&col_a).await?.is_empty());

    db.registry.delete_credential(credential.id()).await?;
    let orphaned = db
        .store
        .find(ChangeId::new(3)?)
        .await?
        .ok_or_else(|| eyre::eyre!("records outlive their column"))?;
    assert!(orphaned.linked_column().is_none());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn update_link_reports_missing_record(
    schema: eyre::Result<Option<TestSchema>>,
) -> eyre::Result<()> {
    let Some(db) = schema? else { return Ok(()) };
    let record = pending_record(5, 7)?;
    let result = db.store.update_link(&record).await;
    assert!(matches!(result, Err(ReviewStoreError::NotFound(id)) if id == record.change_id()));
    Ok(())
}
