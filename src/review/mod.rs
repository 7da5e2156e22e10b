//! Review record store.
//!
//! Tracks one record per in-flight code change, keyed by the change id the
//! code-review service assigns, together with the watched task-board column
//! it is linked to and its product-review status.
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]

pub mod adapters;
pub mod domain;
pub mod ports;

#[cfg(test)]
mod tests;
