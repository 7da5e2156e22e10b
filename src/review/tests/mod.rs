//! Unit tests for review records and their stores.
