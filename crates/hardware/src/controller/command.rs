//! SDRAM command codec.
//!
//! Every command the controller can issue has a fixed 5-bit signature:
//!
//! ```text
//! bit   4    3     2     1    0
//!       CS   RAS   CAS   WE   A10
//! ```
//!
//! Levels are logical (1 = asserted); the physical pins are active low. The A10 bit
//! does not drive a pin directly: it is OR-ed into address bit 10 so that
//! auto-precharge and precharge-all are selected by the command itself.
//!
//! Both directions are total functions: every command encodes, every pin combination
//! decodes.

use std::fmt;

use serde::Serialize;

/// Commands of the SDR SDRAM command truth table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Command {
    /// Chip not selected.
    Deselect,
    /// No operation.
    Nop,
    /// Burst stop.
    BurstStop,
    /// READ without auto-precharge.
    Read,
    /// READ with auto-precharge.
    ReadAutoPrecharge,
    /// WRITE without auto-precharge.
    Write,
    /// WRITE with auto-precharge.
    WriteAutoPrecharge,
    /// Bank activate (open a row).
    Activate,
    /// Precharge the addressed bank.
    Precharge,
    /// Precharge every bank.
    PrechargeAll,
    /// Auto refresh.
    Refresh,
    /// Mode register set.
    ModeRegisterSet,
}

const CS: u8 = 1 << 4;
const RAS: u8 = 1 << 3;
const CAS: u8 = 1 << 2;
const WE: u8 = 1 << 1;
const A10: u8 = 1 << 0;

/// Logical (active-high) levels of the four command strobes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct CommandPins {
    /// Chip select.
    pub cs: bool,
    /// Row address strobe.
    pub ras: bool,
    /// Column address strobe.
    pub cas: bool,
    /// Write enable.
    pub we: bool,
}

impl CommandPins {
    /// Physical levels as driven on the active-low pins `(CS#, RAS#, CAS#, WE#)`.
    pub const fn active_low(&self) -> (bool, bool, bool, bool) {
        (!self.cs, !self.ras, !self.cas, !self.we)
    }
}

impl Command {
    /// Every command, in truth-table order.
    pub const ALL: [Self; 12] = [
        Self::Deselect,
        Self::Nop,
        Self::BurstStop,
        Self::Read,
        Self::ReadAutoPrecharge,
        Self::Write,
        Self::WriteAutoPrecharge,
        Self::Activate,
        Self::Precharge,
        Self::PrechargeAll,
        Self::Refresh,
        Self::ModeRegisterSet,
    ];

    /// Returns the 5-bit signature `CS RAS CAS WE A10`.
    pub const fn encode(self) -> u8 {
        match self {
            Self::Deselect => 0,
            Self::Nop => CS,
            Self::BurstStop => CS | WE,
            Self::Read => CS | CAS,
            Self::ReadAutoPrecharge => CS | CAS | A10,
            Self::Write => CS | CAS | WE,
            Self::WriteAutoPrecharge => CS | CAS | WE | A10,
            Self::Activate => CS | RAS,
            Self::Precharge => CS | RAS | WE,
            Self::PrechargeAll => CS | RAS | WE | A10,
            Self::Refresh => CS | RAS | CAS,
            Self::ModeRegisterSet => CS | RAS | CAS | WE,
        }
    }

    /// Strobe levels for this command.
    pub const fn pins(self) -> CommandPins {
        let bits = self.encode();
        CommandPins {
            cs: bits & CS != 0,
            ras: bits & RAS != 0,
            cas: bits & CAS != 0,
            we: bits & WE != 0,
        }
    }

    /// Whether this command forces address bit 10 high.
    pub const fn forces_a10(self) -> bool {
        self.encode() & A10 != 0
    }

    /// Decodes the strobes plus the sampled address bit 10.
    ///
    /// Address bit 10 only distinguishes the auto-precharge and precharge-all variants;
    /// every other command ignores it.
    pub const fn decode(pins: CommandPins, a10: bool) -> Self {
        if !pins.cs {
            return Self::Deselect;
        }
        match (pins.ras, pins.cas, pins.we) {
            (false, false, false) => Self::Nop,
            (false, false, true) => Self::BurstStop,
            (false, true, false) if a10 => Self::ReadAutoPrecharge,
            (false, true, false) => Self::Read,
            (false, true, true) if a10 => Self::WriteAutoPrecharge,
            (false, true, true) => Self::Write,
            (true, false, false) => Self::Activate,
            (true, false, true) if a10 => Self::PrechargeAll,
            (true, false, true) => Self::Precharge,
            (true, true, false) => Self::Refresh,
            (true, true, true) => Self::ModeRegisterSet,
        }
    }

    /// True for READ with or without auto-precharge.
    pub const fn is_read(self) -> bool {
        matches!(self, Self::Read | Self::ReadAutoPrecharge)
    }

    /// True for WRITE with or without auto-precharge.
    pub const fn is_write(self) -> bool {
        matches!(self, Self::Write | Self::WriteAutoPrecharge)
    }

    /// True for commands that leave the device state untouched.
    pub const fn is_idle(self) -> bool {
        matches!(self, Self::Deselect | Self::Nop)
    }

    /// Datasheet mnemonic.
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Deselect => "DESL",
            Self::Nop => "NOP",
            Self::BurstStop => "BST",
            Self::Read => "READ",
            Self::ReadAutoPrecharge => "READA",
            Self::Write => "WRIT",
            Self::WriteAutoPrecharge => "WRITA",
            Self::Activate => "ACT",
            Self::Precharge => "PRE",
            Self::PrechargeAll => "PALL",
            Self::Refresh => "REF",
            Self::ModeRegisterSet => "MRS",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Final level of address bit 10: set when the command requires it or the caller's
/// address already had it set.
#[inline]
pub const fn override_address_bit10(command: Command, requested_bit10: bool) -> bool {
    command.forces_a10() || requested_bit10
}
