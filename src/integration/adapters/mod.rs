//! Adapter implementations for the integration registry ports.

pub mod http;
pub mod memory;
pub mod postgres;
