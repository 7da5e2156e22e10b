//! Event reconciler.
//!
//! Consumes validated webhook events from the code-review service and the
//! task board, resolves them against the integration registry and the review
//! record store, and issues the compensating status call. Every handler is
//! idempotent under redelivery; acceptance of a record is guarded by an
//! expiring claim so concurrent replays make a single outbound call.

mod error;
mod inbound;
mod payload;
mod service;

pub use error::{Disposition, ReconcileError, ReconcileErrorKind};
#[cfg(test)]
pub use inbound::MockInboundEvents;
pub use inbound::InboundEvents;
pub use payload::{
    BoardAction, BoardActionData, BoardList, BoardMember, CardMoved, CardMovedEvent, HeadPayload,
    PayloadError, PullRequestEvent, PullRequestPayload, RepoPayload,
};
pub use service::{
    CardMovedOutcome, ChangeOpenedOutcome, DEFAULT_ACCEPTED_TEMPLATE, DEFAULT_STATUS_CONTEXT,
    EventReconciler, FanOutReport, LinkOutcome, LinkReviewRequest, LinkTarget, PENDING_DESCRIPTION,
    ReconcilerSettings, RecordFailure, render_accepted_description,
};

#[cfg(test)]
mod tests;
