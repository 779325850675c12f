//! Common types and constants used throughout the controller model.
//!
//! This module provides the building blocks shared by the controller, the device model
//! and the verification harness. It includes:
//! 1. **Address Layout:** Packing and slicing of column/row/bank request addresses.
//! 2. **Constants:** Pin widths, initialization requirements and counter slack.
//! 3. **Error Handling:** Configuration errors, protocol violations, simulation errors and
//!    check failures.

/// Request address layout (column/row/bank slicing).
pub mod addr;

/// Pin widths and controller constants.
pub mod constants;

/// Error types.
pub mod error;

pub use addr::{AddrLayout, SdramAddr};
pub use error::{CheckError, ConfigError, ProtocolViolation, SimError};
