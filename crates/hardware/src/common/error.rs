//! Configuration, protocol and simulation error types.
//!
//! This module defines every error the crate reports. It provides:
//! 1. **Configuration Errors:** The only failure class of the controller itself; raised
//!    at construction, before any cycle executes.
//! 2. **Protocol Violations:** Rules of the SDRAM command/timing contract broken on the
//!    pins, as observed by the reference device model.
//! 3. **Simulation Errors:** Wrapper used by the simulation driver.
//! 4. **Check Failures:** Counterexamples reported by the built-in property checks.
//!
//! Contract violations inside the controller (for example removing from an empty refresh
//! backlog) are design defects. They are guarded by debug assertions and never surface
//! as values of these types.

use thiserror::Error;

use crate::controller::command::Command;
use crate::controller::refresh::CounterFault;

/// Rejected controller configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Burst length is not one of 1, 2, 4, 8 or 0 (full page).
    #[error("unsupported burst length {0} (expected 1, 2, 4, 8 or 0 for full page)")]
    UnsupportedBurstLength(u32),

    /// CAS latency is not 2 or 3.
    #[error("unsupported CAS latency {0} (expected 2 or 3)")]
    UnsupportedCasLatency(u32),

    /// Controller timing and programmed mode disagree on the CAS latency.
    #[error("timing c_cas = {timing} does not match mode cas_latency = {mode}")]
    CasLatencyMismatch {
        /// `c_cas` from the timing section.
        timing: u32,
        /// `cas_latency` from the mode section.
        mode: u32,
    },

    /// A geometry field does not fit the device pins.
    #[error("{field} = {value} is out of range {min}..={max}")]
    GeometryOutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// Value supplied.
        value: u32,
        /// Smallest accepted value.
        min: u32,
        /// Largest accepted value.
        max: u32,
    },

    /// A device delay that must span at least one cycle is zero.
    #[error("timing parameter {0} must be at least one cycle")]
    ZeroDelay(&'static str),

    /// A timing or refresh parameter exceeds what the model can count.
    #[error("{field} = {value} exceeds the supported maximum of {max}")]
    ValueTooLarge {
        /// Configuration field name.
        field: &'static str,
        /// Configured value.
        value: u32,
        /// Largest accepted value.
        max: u32,
    },

    /// The refresh period is zero.
    #[error("refresh period must be at least one cycle")]
    ZeroRefreshPeriod,

    /// The refresh backlog tolerance is zero.
    #[error("ref_max_pending must be at least 1")]
    ZeroMaxPending,

    /// Refresh obligations could accrue faster than the controller can retire them.
    #[error(
        "refresh period {period} must exceed the longest non-preemptible span of {busy_window} cycles"
    )]
    RefreshPeriodTooShort {
        /// Configured refresh period in cycles.
        period: u32,
        /// Longest span during which the controller cannot issue REFRESH.
        busy_window: u32,
    },

    /// The configuration document could not be parsed.
    #[error("invalid configuration document: {0}")]
    Parse(String),
}

/// A rule of the SDRAM command/timing contract broken on the pins.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    /// A command other than NOP/DESELECT arrived before power-up completed.
    #[error("cycle {cycle}: {command} issued before the power-up wait of {required} cycles")]
    InitTooEarly {
        /// Offending command.
        command: Command,
        /// Cycle it was observed on.
        cycle: u64,
        /// Required power-up wait.
        required: u32,
    },

    /// Power-up sequence issued out of order.
    #[error("cycle {cycle}: {command} is not legal during initialization ({reason})")]
    InitSequence {
        /// Offending command.
        command: Command,
        /// Cycle it was observed on.
        cycle: u64,
        /// What the device expected.
        reason: &'static str,
    },

    /// A traffic command arrived before the mode register was programmed.
    #[error("cycle {cycle}: {command} issued before initialization completed")]
    NotInitialized {
        /// Offending command.
        command: Command,
        /// Cycle it was observed on.
        cycle: u64,
    },

    /// A command arrived before a device delay elapsed.
    #[error("cycle {cycle}: {command} violates {constraint} (ready at cycle {ready_at})")]
    TimingViolated {
        /// Offending command.
        command: Command,
        /// Cycle it was observed on.
        cycle: u64,
        /// First cycle on which the command would have been legal.
        ready_at: u64,
        /// Name of the violated delay.
        constraint: &'static str,
    },

    /// ACTIVATE while the controller's single row is still open.
    #[error("cycle {cycle}: ACTIVATE bank {bank} while bank {open_bank} row {open_row} is open")]
    RowAlreadyOpen {
        /// Cycle it was observed on.
        cycle: u64,
        /// Bank addressed by the new ACTIVATE.
        bank: u32,
        /// Bank holding the open row.
        open_bank: u32,
        /// Open row.
        open_row: u32,
    },

    /// READ or WRITE without an open row.
    #[error("cycle {cycle}: {command} with no open row")]
    NoOpenRow {
        /// Offending command.
        command: Command,
        /// Cycle it was observed on.
        cycle: u64,
    },

    /// READ or WRITE addressed to a bank other than the open one.
    #[error("cycle {cycle}: {command} to bank {bank} but bank {open_bank} is open")]
    BankMismatch {
        /// Offending command.
        command: Command,
        /// Cycle it was observed on.
        cycle: u64,
        /// Bank on the pins.
        bank: u32,
        /// Bank holding the open row.
        open_bank: u32,
    },

    /// REFRESH or MODE REGISTER SET while a row is open.
    #[error("cycle {cycle}: {command} while a row is open")]
    RowOpen {
        /// Offending command.
        command: Command,
        /// Cycle it was observed on.
        cycle: u64,
    },

    /// MODE REGISTER SET with an undecodable value.
    #[error("cycle {cycle}: mode register value {value:#05x} is not supported")]
    InvalidModeRegister {
        /// Cycle it was observed on.
        cycle: u64,
        /// Value on the address bus.
        value: u16,
    },

    /// A write burst beat without data output enable.
    #[error("cycle {cycle}: write burst beat {beat} without data_en")]
    MissingWriteData {
        /// Cycle it was observed on.
        cycle: u64,
        /// Beat index within the burst.
        beat: u32,
    },

    /// Controller and device drove the data bus on the same cycle.
    #[error("cycle {cycle}: data bus driven by controller and device")]
    BusConflict {
        /// Cycle it was observed on.
        cycle: u64,
    },
}

/// Failure of a simulation run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// The device model rejected the controller's pins.
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),

    /// The configuration was rejected.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Queued transactions did not drain within the cycle budget.
    #[error("{pending} transaction(s) still pending after {cycles} cycles")]
    Timeout {
        /// Cycles simulated.
        cycles: u64,
        /// Transactions not yet completed.
        pending: usize,
    },
}

/// A built-in check found a counterexample or could not run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    /// The refresh counter contract broke on an explored input sequence.
    #[error("{fault} after {} cycles (removal requests: {inputs:?})", .inputs.len())]
    Counter {
        /// Violated contract.
        fault: CounterFault,
        /// Removal requests per cycle leading to the fault.
        inputs: Vec<bool>,
    },

    /// A cover target was not reached within the exploration bound.
    #[error("cover target not reached within {depth} cycles")]
    Unreachable {
        /// Exploration bound.
        depth: u32,
    },

    /// The controller broke a property observed on its outputs.
    #[error("cycle {cycle}: {reason}")]
    Controller {
        /// Cycle the property failed on.
        cycle: u64,
        /// Property that failed.
        reason: String,
    },

    /// A read returned data other than what was last written.
    #[error("read of {addr:#x} completed at cycle {cycle} returned {got:x?}, expected {expected:x?}")]
    DataMismatch {
        /// Packed request address.
        addr: u32,
        /// Completion cycle.
        cycle: u64,
        /// Words expected.
        expected: Vec<u64>,
        /// Words returned.
        got: Vec<u64>,
    },

    /// The simulation itself failed.
    #[error(transparent)]
    Sim(#[from] SimError),

    /// The check's configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
