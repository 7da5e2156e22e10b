//! Axum routes receiving code-review and task-board deliveries.

use super::signature::{verify_github_signature, verify_trello_signature};
use crate::reconciler::{
    CardMovedEvent, CardMovedOutcome, Disposition, InboundEvents, PullRequestEvent,
    ReconcileError,
};
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Path receiving code-review `pull_request` deliveries.
pub const GITHUB_CALLBACK_PATH: &str = "/github/integration/callback";

/// Path receiving task-board deliveries and the HEAD check Trello sends on webhook creation.
pub const TRELLO_CALLBACK_PATH: &str = "/trello/integration";

const GITHUB_SIGNATURE_HEADER: &str = "x-hub-signature-256";
const GITHUB_EVENT_HEADER: &str = "x-github-event";
const TRELLO_SIGNATURE_HEADER: &str = "x-trello-webhook";
const PULL_REQUEST_EVENT: &str = "pull_request";

/// Shared secrets used to authenticate deliveries.
#[derive(Clone)]
pub struct WebhookSecrets {
    /// Secret configured on the code-review webhook.
    pub github_webhook_secret: String,
    /// Task-board application secret.
    pub trello_api_secret: String,
    /// Absolute callback URL registered with the task board; part of the
    /// signed material.
    pub trello_callback_url: String,
}

impl fmt::Debug for WebhookSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookSecrets")
            .field("github_webhook_secret", &"[REDACTED]")
            .field("trello_api_secret", &"[REDACTED]")
            .field("trello_callback_url", &self.trello_callback_url)
            .finish()
    }
}

/// Router state.
#[derive(Clone)]
pub struct WebhookState {
    events: Arc<dyn InboundEvents>,
    secrets: Arc<WebhookSecrets>,
}

impl WebhookState {
    /// Creates router state around an event handler.
    #[must_use]
    pub fn new(events: Arc<dyn InboundEvents>, secrets: WebhookSecrets) -> Self {
        Self {
            events,
            secrets: Arc::new(secrets),
        }
    }
}

/// Builds the webhook router.
pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route(GITHUB_CALLBACK_PATH, post(handle_github_delivery))
        .route(
            TRELLO_CALLBACK_PATH,
            post(handle_trello_delivery).head(handle_trello_head),
        )
        .with_state(state)
}

async fn handle_github_delivery(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(err) = verify_github_signature(
        state.secrets.github_webhook_secret.as_bytes(),
        &body,
        header_value(&headers, GITHUB_SIGNATURE_HEADER),
    ) {
        warn!(error = %err, "rejected code-review delivery");
        return unauthorized();
    }

    if let Some(event) = header_value(&headers, GITHUB_EVENT_HEADER)
        .filter(|event| *event != PULL_REQUEST_EVENT)
    {
        debug!(event, "ignoring code-review event");
        return acknowledged();
    }

    let result = match PullRequestEvent::from_slice(&body) {
        Ok(event) => state.events.change_opened(event).await,
        Err(err) => Err(err.into()),
    };
    match result {
        Ok(outcome) => {
            debug!(?outcome, "code-review delivery handled");
            acknowledged()
        }
        Err(err) => answer_failure(&err),
    }
}

#[expect(clippy::unused_async, reason = "axum handlers are async functions")]
async fn handle_trello_head() -> Response {
    acknowledged()
}

async fn handle_trello_delivery(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(err) = verify_trello_signature(
        state.secrets.trello_api_secret.as_bytes(),
        &body,
        &state.secrets.trello_callback_url,
        header_value(&headers, TRELLO_SIGNATURE_HEADER),
    ) {
        warn!(error = %err, "rejected task-board delivery");
        return unauthorized();
    }

    let result = match CardMovedEvent::from_slice(&body) {
        Ok(event) => state.events.card_moved(event).await,
        Err(err) => Err(err.into()),
    };
    match result {
        Ok(CardMovedOutcome::Reconciled(report)) if report.needs_redelivery() => {
            warn!(
                column_id = %report.column_id,
                failed = report.failed.len(),
                "fan-out incomplete, asking for redelivery"
            );
            retry()
        }
        Ok(outcome) => {
            debug!(?outcome, "task-board delivery handled");
            acknowledged()
        }
        Err(err) => answer_failure(&err),
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn answer_failure(err: &ReconcileError) -> Response {
    match err.disposition() {
        Disposition::Acknowledge => {
            info!(kind = ?err.kind(), error = %err, "delivery acknowledged without changes");
            acknowledged()
        }
        Disposition::Retry => {
            warn!(kind = ?err.kind(), error = %err, "delivery failed, asking for redelivery");
            retry()
        }
    }
}

fn acknowledged() -> Response {
    (StatusCode::OK, Json(json!({ "status": "OK" }))).into_response()
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "status": "invalid signature" })),
    )
        .into_response()
}

fn retry() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "status": "retry" })),
    )
        .into_response()
}
