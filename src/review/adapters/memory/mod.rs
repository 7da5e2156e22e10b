//! In-memory adapters for review record persistence.

mod store;

pub use store::InMemoryReviewStore;
