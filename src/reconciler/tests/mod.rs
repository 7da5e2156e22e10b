//! Unit tests for the event reconciler.
