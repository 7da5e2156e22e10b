//! `PostgreSQL` adapters for review record persistence.

mod models;
mod schema;
mod store;

pub use store::{PostgresReviewStore, ReviewPgPool};
