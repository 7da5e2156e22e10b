//! In-memory adapters for the integration registry.

mod clients;
mod repository;

pub use clients::{RecordedStatus, RecordingCodeReviewClient, RecordingTaskBoardClient};
pub use repository::InMemoryIntegrationRepository;
