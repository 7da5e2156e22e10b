//! Signed deliveries through the HTTP router into the reconciler.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use product_signoff::{
    reconciler::InboundEvents,
    review::{domain::ReviewStatus, ports::ReviewRecordStore},
    webhook::{GITHUB_CALLBACK_PATH, TRELLO_CALLBACK_PATH, WebhookSecrets, WebhookState, router},
};
use rstest::rstest;
use sha1::Sha1;
use sha2::Sha256;
use tower::ServiceExt;

use super::helpers::{
    CALLBACK_URL, Stack, card_moved_body, change_id, change_opened_body, stack,
};

const GITHUB_SECRET: &str = "gh-webhook-secret";
const TRELLO_SECRET: &str = "trello-app-secret";

fn app(stack: &Stack) -> Router {
    let events: Arc<dyn InboundEvents> = stack.reconciler.clone();
    router(WebhookState::new(
        events,
        WebhookSecrets {
            github_webhook_secret: GITHUB_SECRET.to_owned(),
            trello_api_secret: TRELLO_SECRET.to_owned(),
            trello_callback_url: CALLBACK_URL.to_owned(),
        },
    ))
}

fn github_delivery(body: Vec<u8>, secret: &str) -> eyre::Result<Request<Body>> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|err| eyre::eyre!("hmac key: {err}"))?;
    mac.update(&body);
    let hex: String = mac
        .finalize()
        .into_bytes()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect();
    Ok(Request::builder()
        .method("POST")
        .uri(GITHUB_CALLBACK_PATH)
        .header("x-github-event", "pull_request")
        .header("x-hub-signature-256", format!("sha256={hex}"))
        .body(Body::from(body))?)
}

fn trello_delivery(body: Vec<u8>) -> eyre::Result<Request<Body>> {
    let mut mac = Hmac::<Sha1>::new_from_slice(TRELLO_SECRET.as_bytes())
        .map_err(|err| eyre::eyre!("hmac key: {err}"))?;
    mac.update(&body);
    mac.update(CALLBACK_URL.as_bytes());
    let signature = STANDARD.encode(mac.finalize().into_bytes());
    Ok(Request::builder()
        .method("POST")
        .uri(TRELLO_CALLBACK_PATH)
        .header("x-trello-webhook", signature)
        .body(Body::from(body))?)
}

async fn status_of(stack: &Stack, change: u64) -> eyre::Result<Option<ReviewStatus>> {
    Ok(stack
        .store
        .find(change_id(change)?)
        .await?
        .map(|record| record.status()))
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn signed_deliveries_drive_the_signoff(stack: Stack) -> eyre::Result<()> {
    let owner = stack.onboard(&[7], &["col_9"]).await?;

    let opened = app(&stack)
        .oneshot(github_delivery(change_opened_body(42, 7, "abc1234"), GITHUB_SECRET)?)
        .await?;
    assert_eq!(opened.status(), StatusCode::OK);
    assert_eq!(status_of(&stack, 42).await?, Some(ReviewStatus::Pending));

    stack.link(owner, 42, "col_9").await?;
    let moved = app(&stack)
        .oneshot(trello_delivery(card_moved_body("col_9", "Alice"))?)
        .await?;
    assert_eq!(moved.status(), StatusCode::OK);
    assert_eq!(status_of(&stack, 42).await?, Some(ReviewStatus::Accepted));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn forged_delivery_leaves_no_trace(stack: Stack) -> eyre::Result<()> {
    stack.onboard(&[7], &["col_9"]).await?;

    let response = app(&stack)
        .oneshot(github_delivery(change_opened_body(42, 7, "abc1234"), "forged")?)
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(status_of(&stack, 42).await?, None);
    assert!(stack.code_review.reports()?.is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn outage_is_answered_with_service_unavailable(stack: Stack) -> eyre::Result<()> {
    stack.onboard(&[7], &["col_9"]).await?;
    stack
        .code_review
        .fail_with(product_signoff::integration::ports::ExternalApiError::Timeout)?;

    let response = app(&stack)
        .oneshot(github_delivery(change_opened_body(42, 7, "abc1234"), GITHUB_SECRET)?)
        .await?;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(status_of(&stack, 42).await?, None);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn watched_columns_deliver_to_the_signed_callback(stack: Stack) -> eyre::Result<()> {
    stack.onboard(&[7], &["col_9", "col_10"]).await?;

    let hooks = stack.task_board.active_webhooks()?;
    assert_eq!(hooks.len(), 2);
    assert!(hooks.iter().all(|(_, _, url)| url == CALLBACK_URL));
    assert_eq!(stack.registry.callback_url(), CALLBACK_URL);
    Ok(())
}
