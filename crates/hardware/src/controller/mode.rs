//! Mode register contents.
//!
//! The mode register is programmed once, during initialization, with the burst length,
//! the burst ordering and the CAS latency. Its encoding is a fixed lookup:
//!
//! ```text
//! bit  6 5 4 | 3 | 2 1 0
//!      CAS   | I | burst
//! ```
//!
//! Burst codes: `000` = 1, `001` = 2, `010` = 4, `011` = 8, `111` = full page.
//! CAS codes: `010` = 2, `011` = 3.

use serde::Serialize;

use crate::common::error::ConfigError;
use crate::config::ModeConfig;

/// Words transferred per READ/WRITE command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum BurstLength {
    /// Single word.
    One,
    /// Two words.
    Two,
    /// Four words.
    Four,
    /// Eight words.
    Eight,
    /// Every column of the open row.
    FullPage,
}

impl BurstLength {
    /// Mode register code for this burst length.
    pub const fn code(self) -> u16 {
        match self {
            Self::One => 0b000,
            Self::Two => 0b001,
            Self::Four => 0b010,
            Self::Eight => 0b011,
            Self::FullPage => 0b111,
        }
    }

    /// Decodes a 3-bit burst code.
    pub const fn from_code(code: u16) -> Option<Self> {
        match code {
            0b000 => Some(Self::One),
            0b001 => Some(Self::Two),
            0b010 => Some(Self::Four),
            0b011 => Some(Self::Eight),
            0b111 => Some(Self::FullPage),
            _ => None,
        }
    }

    /// Number of words in one burst; a full-page burst covers every column.
    pub const fn words(self, col_bits: u32) -> u32 {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Four => 4,
            Self::Eight => 8,
            Self::FullPage => 1 << col_bits,
        }
    }
}

impl TryFrom<u32> for BurstLength {
    type Error = ConfigError;

    fn try_from(words: u32) -> Result<Self, Self::Error> {
        match words {
            0 => Ok(Self::FullPage),
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            4 => Ok(Self::Four),
            8 => Ok(Self::Eight),
            other => Err(ConfigError::UnsupportedBurstLength(other)),
        }
    }
}

/// Cycles from READ to the first data word.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum CasLatency {
    /// Two cycles.
    Two,
    /// Three cycles.
    Three,
}

impl CasLatency {
    /// Latency in cycles.
    pub const fn cycles(self) -> u32 {
        match self {
            Self::Two => 2,
            Self::Three => 3,
        }
    }

    /// Mode register code for this latency.
    pub const fn code(self) -> u16 {
        match self {
            Self::Two => 0b010,
            Self::Three => 0b011,
        }
    }

    /// Decodes a 3-bit CAS latency code.
    pub const fn from_code(code: u16) -> Option<Self> {
        match code {
            0b010 => Some(Self::Two),
            0b011 => Some(Self::Three),
            _ => None,
        }
    }
}

impl TryFrom<u32> for CasLatency {
    type Error = ConfigError;

    fn try_from(cycles: u32) -> Result<Self, Self::Error> {
        match cycles {
            2 => Ok(Self::Two),
            3 => Ok(Self::Three),
            other => Err(ConfigError::UnsupportedCasLatency(other)),
        }
    }
}

/// Validated mode register contents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Mode {
    /// Words per burst.
    pub burst_length: BurstLength,
    /// Interleaved (true) or sequential (false) burst ordering.
    pub burst_interleaved: bool,
    /// READ to data latency.
    pub cas_latency: CasLatency,
}

const BURST_MASK: u16 = 0b111;
const INTERLEAVE_SHIFT: u16 = 3;
const CAS_SHIFT: u16 = 4;
const CAS_MASK: u16 = 0b111;
const USED_BITS: u16 = 0x7F;

impl Mode {
    /// Builds a mode from raw configuration fields.
    pub fn from_config(raw: &ModeConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            burst_length: BurstLength::try_from(raw.burst_length)?,
            burst_interleaved: raw.burst_interleaved,
            cas_latency: CasLatency::try_from(raw.cas_latency)?,
        })
    }

    /// Value driven on the address bus by MODE REGISTER SET.
    pub const fn encode(&self) -> u16 {
        self.burst_length.code()
            | ((self.burst_interleaved as u16) << INTERLEAVE_SHIFT)
            | (self.cas_latency.code() << CAS_SHIFT)
    }

    /// Decodes an address-bus value written by MODE REGISTER SET.
    ///
    /// Returns `None` for reserved codes or any bit set above the fields this
    /// controller programs (test mode, write-burst mode).
    pub const fn decode(value: u16) -> Option<Self> {
        if value & !USED_BITS != 0 {
            return None;
        }
        let Some(burst_length) = BurstLength::from_code(value & BURST_MASK) else {
            return None;
        };
        let Some(cas_latency) = CasLatency::from_code((value >> CAS_SHIFT) & CAS_MASK) else {
            return None;
        };
        Some(Self {
            burst_length,
            burst_interleaved: (value >> INTERLEAVE_SHIFT) & 1 == 1,
            cas_latency,
        })
    }
}
