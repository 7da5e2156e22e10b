//! Unit tests for the integration registry.
