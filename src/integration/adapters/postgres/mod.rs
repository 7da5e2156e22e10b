//! `PostgreSQL` adapters for the integration registry.

mod models;
mod repository;
mod schema;

pub use repository::{IntegrationPgPool, PostgresIntegrationRepository};
