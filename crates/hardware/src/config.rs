//! Configuration system for the SDRAM controller.
//!
//! This module defines the configuration structures used to parameterize the controller
//! and the reference device model. It provides:
//! 1. **Defaults:** Baseline constants for a 64 Mbit, 16-bit SDR SDRAM at 100 MHz.
//! 2. **Structures:** Geometry, timing, refresh and mode-register sections.
//! 3. **Validation:** A single fail-fast check run before any cycle executes.
//!
//! Configuration is supplied as JSON (see [`Config::from_json`]) or built from
//! `Config::default()`. A configuration is immutable once a controller is built from it.

use serde::Deserialize;

use crate::common::AddrLayout;
use crate::common::constants::{
    ADDR_BUS_BITS, BANK_BUS_BITS, DEFAULT_REF_MAX_PENDING, MAX_COL_BITS, MAX_REF_PENDING,
    MAX_TIMING_CYCLES, MAX_WORD_BITS,
};
use crate::common::error::ConfigError;
use crate::controller::mode::Mode;

/// Default configuration constants.
///
/// These describe a 4 bank x 4096 row x 256 column x 16 bit part clocked at 100 MHz
/// (10 ns per cycle).
mod defaults {
    /// Data bus width in bits.
    pub const WORD_BITS: u32 = 16;

    /// Column address bits (256 columns).
    pub const COL_BITS: u32 = 8;

    /// Row address bits (4096 rows).
    pub const ROW_BITS: u32 = 12;

    /// Bank address bits (4 banks).
    pub const BANK_BITS: u32 = 2;

    /// Power-up wait: 100 us.
    pub const C_INIT: u32 = 10_000;

    /// READ to data valid.
    pub const C_CAS: u32 = 2;

    /// ACTIVATE to READ/WRITE (tRCD = 20 ns).
    pub const C_RCD: u32 = 2;

    /// ACTIVATE to PRECHARGE (tRAS = 42 ns).
    pub const C_RAS: u32 = 5;

    /// REFRESH to anything (tRC = 63 ns).
    pub const C_RC: u32 = 7;

    /// MODE REGISTER SET to anything.
    pub const C_MRD: u32 = 2;

    /// 64 ms / 4096 rows = 15.6 us between refresh obligations.
    pub const REF_PERIOD: u32 = 1_560;

    /// Burst length programmed into the mode register.
    pub const BURST_LENGTH: u32 = 1;

    /// CAS latency programmed into the mode register.
    pub const CAS_LATENCY: u32 = 2;
}

/// Root configuration.
///
/// # Examples
///
/// ```
/// use sdrctl_core::config::Config;
///
/// let json = r#"{
///     "geometry": { "word_bits": 32, "col_bits": 9 },
///     "timing": { "c_init": 20000, "c_cas": 3 },
///     "mode": { "burst_length": 4, "cas_latency": 3 }
/// }"#;
///
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.geometry.word_bits, 32);
/// assert_eq!(config.geometry.row_bits, 12);
/// assert_eq!(config.mode.burst_length, 4);
/// assert_eq!(config.refresh.ref_max_pending, 9);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Data and address widths.
    #[serde(default)]
    pub geometry: GeometryConfig,
    /// Device delays in clock cycles.
    #[serde(default)]
    pub timing: TimingConfig,
    /// Refresh obligation rate and tolerated backlog.
    #[serde(default)]
    pub refresh: RefreshConfig,
    /// Mode register contents.
    #[serde(default)]
    pub mode: ModeConfig,
}

/// Data and address widths of the attached device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct GeometryConfig {
    /// Bits per data word.
    #[serde(default = "GeometryConfig::default_word_bits")]
    pub word_bits: u32,

    /// log2 number of columns.
    #[serde(default = "GeometryConfig::default_col_bits")]
    pub col_bits: u32,

    /// log2 number of rows.
    #[serde(default = "GeometryConfig::default_row_bits")]
    pub row_bits: u32,

    /// log2 number of banks.
    #[serde(default = "GeometryConfig::default_bank_bits")]
    pub bank_bits: u32,
}

impl GeometryConfig {
    fn default_word_bits() -> u32 {
        defaults::WORD_BITS
    }

    fn default_col_bits() -> u32 {
        defaults::COL_BITS
    }

    fn default_row_bits() -> u32 {
        defaults::ROW_BITS
    }

    fn default_bank_bits() -> u32 {
        defaults::BANK_BITS
    }

    /// Address slicing implied by this geometry.
    pub const fn layout(&self) -> AddrLayout {
        AddrLayout {
            col_bits: self.col_bits,
            row_bits: self.row_bits,
            bank_bits: self.bank_bits,
        }
    }

    /// Width of a packed request address (column + row + bank).
    pub const fn addr_bits(&self) -> u32 {
        self.col_bits + self.row_bits + self.bank_bits
    }

    /// Mask applied to data words.
    pub const fn word_mask(&self) -> u64 {
        if self.word_bits >= 64 {
            u64::MAX
        } else {
            (1 << self.word_bits) - 1
        }
    }
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            word_bits: defaults::WORD_BITS,
            col_bits: defaults::COL_BITS,
            row_bits: defaults::ROW_BITS,
            bank_bits: defaults::BANK_BITS,
        }
    }
}

/// Device delays, all in controller clock cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TimingConfig {
    /// Clocks to wait after power-up before the first command.
    #[serde(default = "TimingConfig::default_c_init")]
    pub c_init: u32,

    /// Clocks from READ to data available.
    #[serde(default = "TimingConfig::default_c_cas")]
    pub c_cas: u32,

    /// Clocks from ACTIVATE to READ/WRITE.
    #[serde(default = "TimingConfig::default_c_rcd")]
    pub c_rcd: u32,

    /// Clocks from ACTIVATE to PRECHARGE.
    #[serde(default = "TimingConfig::default_c_ras")]
    pub c_ras: u32,

    /// Clocks from REFRESH to anything else.
    #[serde(default = "TimingConfig::default_c_rc")]
    pub c_rc: u32,

    /// Clocks from MODE REGISTER SET to anything else.
    #[serde(default = "TimingConfig::default_c_mrd")]
    pub c_mrd: u32,
}

impl TimingConfig {
    fn default_c_init() -> u32 {
        defaults::C_INIT
    }

    fn default_c_cas() -> u32 {
        defaults::C_CAS
    }

    fn default_c_rcd() -> u32 {
        defaults::C_RCD
    }

    fn default_c_ras() -> u32 {
        defaults::C_RAS
    }

    fn default_c_rc() -> u32 {
        defaults::C_RC
    }

    fn default_c_mrd() -> u32 {
        defaults::C_MRD
    }

    /// Longest single device delay the initialization sequence waits out between steps.
    pub fn max_delay(&self) -> u32 {
        self.c_cas.max(self.c_rc).max(self.c_rcd).max(self.c_mrd)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            c_init: defaults::C_INIT,
            c_cas: defaults::C_CAS,
            c_rcd: defaults::C_RCD,
            c_ras: defaults::C_RAS,
            c_rc: defaults::C_RC,
            c_mrd: defaults::C_MRD,
        }
    }
}

/// Refresh obligation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RefreshConfig {
    /// Cycles between mandatory refresh obligations.
    #[serde(default = "RefreshConfig::default_ref_period")]
    pub ref_period: u32,

    /// Obligations tolerated before refresh pre-empts foreground traffic.
    #[serde(default = "RefreshConfig::default_ref_max_pending")]
    pub ref_max_pending: u32,
}

impl RefreshConfig {
    fn default_ref_period() -> u32 {
        defaults::REF_PERIOD
    }

    fn default_ref_max_pending() -> u32 {
        DEFAULT_REF_MAX_PENDING
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            ref_period: defaults::REF_PERIOD,
            ref_max_pending: DEFAULT_REF_MAX_PENDING,
        }
    }
}

/// Raw mode register fields as written in a configuration document.
///
/// Converted into a typed [`Mode`] by [`Mode::from_config`], which rejects unsupported
/// combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ModeConfig {
    /// Words per READ/WRITE: 1, 2, 4, 8, or 0 for a full-page burst.
    #[serde(default = "ModeConfig::default_burst_length")]
    pub burst_length: u32,

    /// Interleaved rather than sequential burst ordering.
    #[serde(default)]
    pub burst_interleaved: bool,

    /// CAS latency, 2 or 3.
    #[serde(default = "ModeConfig::default_cas_latency")]
    pub cas_latency: u32,
}

impl ModeConfig {
    fn default_burst_length() -> u32 {
        defaults::BURST_LENGTH
    }

    fn default_cas_latency() -> u32 {
        defaults::CAS_LATENCY
    }
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self {
            burst_length: defaults::BURST_LENGTH,
            burst_interleaved: false,
            cas_latency: defaults::CAS_LATENCY,
        }
    }
}

fn check_range(field: &'static str, value: u32, min: u32, max: u32) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::GeometryOutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

fn check_nonzero(name: &'static str, value: u32) -> Result<(), ConfigError> {
    if value == 0 {
        Err(ConfigError::ZeroDelay(name))
    } else {
        Ok(())
    }
}

fn check_max(field: &'static str, value: u32, max: u32) -> Result<(), ConfigError> {
    if value > max {
        Err(ConfigError::ValueTooLarge { field, value, max })
    } else {
        Ok(())
    }
}

impl Config {
    /// Parses a JSON configuration document; missing sections and fields take defaults.
    ///
    /// The result is not validated; call [`Config::validate`] or build a controller.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Checks every construction-time constraint and returns the typed mode.
    ///
    /// Checks run in a fixed order (mode, geometry, delays, refresh) so the first
    /// error reported for a document is stable.
    pub fn validate(&self) -> Result<Mode, ConfigError> {
        let mode = Mode::from_config(&self.mode)?;
        if self.timing.c_cas != mode.cas_latency.cycles() {
            return Err(ConfigError::CasLatencyMismatch {
                timing: self.timing.c_cas,
                mode: mode.cas_latency.cycles(),
            });
        }

        let g = &self.geometry;
        check_range("word_bits", g.word_bits, 1, MAX_WORD_BITS)?;
        check_range("col_bits", g.col_bits, 1, MAX_COL_BITS)?;
        check_range("row_bits", g.row_bits, 1, ADDR_BUS_BITS)?;
        check_range("bank_bits", g.bank_bits, 0, BANK_BUS_BITS)?;

        let t = &self.timing;
        check_nonzero("c_cas", t.c_cas)?;
        check_nonzero("c_rcd", t.c_rcd)?;
        check_nonzero("c_ras", t.c_ras)?;
        check_nonzero("c_rc", t.c_rc)?;
        check_nonzero("c_mrd", t.c_mrd)?;
        for (field, value) in [
            ("c_init", t.c_init),
            ("c_rcd", t.c_rcd),
            ("c_ras", t.c_ras),
            ("c_rc", t.c_rc),
            ("c_mrd", t.c_mrd),
        ] {
            check_max(field, value, MAX_TIMING_CYCLES)?;
        }

        let r = &self.refresh;
        if r.ref_period == 0 {
            return Err(ConfigError::ZeroRefreshPeriod);
        }
        if r.ref_max_pending == 0 {
            return Err(ConfigError::ZeroMaxPending);
        }
        check_max("ref_max_pending", r.ref_max_pending, MAX_REF_PENDING)?;
        let busy_window = self.busy_window(&mode);
        if r.ref_period <= busy_window {
            return Err(ConfigError::RefreshPeriodTooShort {
                period: r.ref_period,
                busy_window,
            });
        }

        Ok(mode)
    }

    /// Longest span, in cycles, during which the controller cannot issue REFRESH.
    ///
    /// Either a REFRESH recovering (`c_rc`) or a whole transaction from ACTIVATE back to
    /// idle (`c_rcd` plus the read wait, which is never shorter than the write wait).
    ///
    /// Saturates at `u32::MAX` for timings that [`Config::validate`] would reject.
    pub fn busy_window(&self, mode: &Mode) -> u32 {
        let t = &self.timing;
        let burst = mode.burst_length.words(self.geometry.col_bits);
        let read_wait = t
            .c_ras
            .saturating_sub(t.c_rcd)
            .max(mode.cas_latency.cycles().saturating_add(burst));
        t.c_rc.max(t.c_rcd.saturating_add(read_wait))
    }
}
