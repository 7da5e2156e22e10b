//! Product sign-off: gates code changes on product acceptance.
//!
//! A change opened on the code-review service is reported as pending until
//! a card linked to it is moved into a watched task-board column, at which
//! point the change is reported as accepted. The crate keeps the links
//! between accounts, credentials, watched columns, and in-flight changes,
//! and reconciles webhook deliveries from both services against them.
//!
//! # Architecture
//!
//! Each module follows hexagonal architecture principles:
//!
//! - **Domain**: validated identifiers and state machines with no
//!   infrastructure dependencies
//! - **Ports**: async traits for persistence and outbound API calls
//! - **Adapters**: `PostgreSQL`, in-memory, and HTTP implementations
//!
//! # Modules
//!
//! - [`review`]: review records and the column-to-record index
//! - [`integration`]: credentials, watched columns, registered repositories,
//!   and the outbound API clients
//! - [`reconciler`]: the event reconciler
//! - [`webhook`]: the inbound HTTP surface
//! - [`config`]: server configuration
//! - [`telemetry`]: logging setup

pub mod config;
pub mod integration;
pub mod reconciler;
pub mod review;
pub mod telemetry;
pub mod webhook;
