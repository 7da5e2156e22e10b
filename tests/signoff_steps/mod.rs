//! Step definitions for product sign-off scenarios.

pub mod given;
pub mod then;
pub mod when;
pub mod world;
