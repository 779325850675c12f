//! Controller interface signals.
//!
//! This module defines the two signal bundles sampled and driven once per clock tick:
//! 1. **Inputs:** The request interface plus the read data returned by the device.
//! 2. **Outputs:** The grant strobe, read data, and every pin of the SDRAM command
//!    interface.
//!
//! Both bundles are plain values. The controller holds no hidden state outside its
//! registers, so any externally supplied input sequence drives it deterministically.

use serde::Serialize;

use super::command::{Command, CommandPins};

/// Signals sampled by the controller on one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Inputs {
    /// Request strobe; a request is latched only on the tick the controller leaves idle.
    pub req: bool,
    /// The request is a write.
    pub write: bool,
    /// Packed request address (column, row, bank; least significant first).
    pub addr: u32,
    /// Write data for the current beat.
    pub wr_data: u64,
    /// Data bus as driven by the device.
    pub rd_data: u64,
}

impl Inputs {
    /// Inputs with no request pending.
    pub const IDLE: Self = Self {
        req: false,
        write: false,
        addr: 0,
        wr_data: 0,
        rd_data: 0,
    };

    /// A read request for `addr`.
    pub const fn read(addr: u32) -> Self {
        Self {
            req: true,
            write: false,
            addr,
            wr_data: 0,
            rd_data: 0,
        }
    }

    /// A write request for `addr` carrying `data` as the first beat.
    pub const fn write(addr: u32, data: u64) -> Self {
        Self {
            req: true,
            write: true,
            addr,
            wr_data: data,
            rd_data: 0,
        }
    }
}

/// Signals driven by the controller on one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Outputs {
    /// Grant strobe: write data consumed this tick, or read data valid this tick.
    pub grant: bool,
    /// Read data forwarded to the requester.
    pub rd_data: u64,

    /// Command issued this tick.
    pub cmd: Command,
    /// Command strobes.
    pub pins: CommandPins,
    /// Address bus (12 bits, bit 10 already overridden).
    pub a: u16,
    /// Bank bus (2 bits).
    pub ba: u8,
    /// Write data bus.
    pub wr_data: u64,
    /// Controller drives the data bus.
    pub data_en: bool,
}

impl Outputs {
    /// Outputs for a NOP tick with nothing on the data bus.
    pub const NOP: Self = Self {
        grant: false,
        rd_data: 0,
        cmd: Command::Nop,
        pins: Command::Nop.pins(),
        a: 0,
        ba: 0,
        wr_data: 0,
        data_en: false,
    };
}
