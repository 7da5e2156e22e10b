//! Integration registry.
//!
//! Links local accounts to the code-review and task-board services: at most
//! one credential per account and service, the task-board columns an account
//! watches, and the code-review repositories it has registered. Revoking a
//! credential removes everything owned through it.
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`], including the outbound API clients
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
