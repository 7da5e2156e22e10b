//! Adapter implementations for the review record store port.

pub mod memory;
pub mod postgres;
