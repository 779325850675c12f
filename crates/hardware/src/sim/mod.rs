//! Simulation driver.
//!
//! Couples the controller with the behavioral device model and a queue of
//! transactions. It provides:
//! 1. **Simulator:** Cycle loop that feeds the request interface, moves write and read
//!    beats, and clocks the device with the controller's pins.
//! 2. **Traffic:** Deterministic pseudo-random transaction streams.

/// Cycle loop and transaction bookkeeping.
pub mod simulator;
/// Pseudo-random transaction generator.
pub mod traffic;

pub use simulator::{Completion, Simulator, TraceEntry, Transaction, TransactionKind};
pub use traffic::TrafficGenerator;
