//! # Unit Tests
//!
//! One file per library module, from the codec up to the check harness.

/// Request address packing and slicing.
pub mod addr;
/// Behavioral device model rules and data path.
pub mod device;
/// Pure state machine step function.
pub mod fsm;
/// Mode register encoding.
pub mod mode;
/// Statistics counters.
pub mod stats;
