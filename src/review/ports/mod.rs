//! Port contracts for review record persistence.

pub mod store;

pub use store::{ReviewRecordStore, ReviewStoreError, ReviewStoreResult};
