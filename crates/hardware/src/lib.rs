//! SDR SDRAM controller model library.
//!
//! This crate implements a cycle-accurate single-row-at-a-time SDRAM controller with the
//! following:
//! 1. **Controller:** Command codec, refresh admission counter and the protocol state
//!    machine that sequences initialization, row transactions and refresh.
//! 2. **Device:** A behavioral SDRAM model that checks the controller's pins against
//!    the command and timing contract and stores data.
//! 3. **Simulation:** A driver that couples both with a transaction queue, plus a
//!    deterministic traffic generator.
//! 4. **Verification:** Bounded exploration of the admission counter and controller
//!    runs cross-checked against the device model.
//! 5. **Configuration and statistics:** JSON-loadable configuration with fail-fast
//!    validation, and per-run counters.

/// Common types and constants (address layout, pin widths, errors).
pub mod common;
/// Controller configuration (defaults, sections, validation).
pub mod config;
/// Controller (codec, admission counter, state machine).
pub mod controller;
/// Behavioral SDRAM device model.
pub mod device;
/// Simulation driver and traffic generation.
pub mod sim;
/// Controller statistics collection and reporting.
pub mod stats;
/// Built-in property checks.
pub mod verify;

/// Root configuration type; use `Config::default()` or load with `Config::from_json`.
pub use crate::config::Config;
/// The controller; construct with `SdramController::new`.
pub use crate::controller::SdramController;
/// Reference device model.
pub use crate::device::SdramDevice;
/// Controller plus device plus transaction queue.
pub use crate::sim::Simulator;
