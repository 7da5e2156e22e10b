//! Domain model for review records.
//!
//! A review record tracks one in-flight code change from the moment it is
//! opened until a linked task card is accepted.

mod error;
mod ids;
mod record;

pub use error::{ParseReviewStatusError, ReviewDomainError};
pub use ids::{AcceptanceClaim, BranchName, ChangeId, RevisionSha, StatusReportUrl};
pub use record::{OpenedChange, PersistedReviewData, ReviewRecord, ReviewStatus};
