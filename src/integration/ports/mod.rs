//! Port contracts for the integration registry.

pub mod external;
pub mod repository;

pub use external::{
    BoardSummary, CodeReviewClient, ColumnSummary, CommitState, ExternalApiError,
    ExternalApiResult, StatusReport, TaskBoardClient,
};
pub use repository::{
    IntegrationRepository, IntegrationRepositoryError, IntegrationRepositoryResult,
};

#[cfg(test)]
pub use external::{MockCodeReviewClient, MockTaskBoardClient};
