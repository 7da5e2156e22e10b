//! Inbound webhook surface.
//!
//! Authenticates deliveries from the code-review service and the task board,
//! decodes them, and hands them to an [`InboundEvents`] implementation.
//! Outcomes map onto status codes the senders understand: `200` when
//! redelivery cannot change anything, `401` for forged deliveries, and `503`
//! when a retry could succeed.
//!
//! [`InboundEvents`]: crate::reconciler::InboundEvents

mod routes;
mod signature;

pub use routes::{
    GITHUB_CALLBACK_PATH, TRELLO_CALLBACK_PATH, WebhookSecrets, WebhookState, router,
};
pub use signature::{SignatureError, verify_github_signature, verify_trello_signature};

#[cfg(test)]
mod tests;
