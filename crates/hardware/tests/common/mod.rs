//! Shared test infrastructure.

/// Configuration builders and controller helpers.
pub mod harness;
