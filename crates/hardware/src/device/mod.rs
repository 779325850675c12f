//! Behavioral SDR SDRAM model.
//!
//! [`SdramDevice`] consumes the controller's command pins once per clock and checks
//! them against the device's command and timing contract. It provides:
//! 1. **Initialization:** Power-up wait, PRECHARGE ALL, the mandatory refreshes and the
//!    mode register set, in that order.
//! 2. **Timing:** Every delay the controller is configured with, tracked as the first
//!    cycle on which the next command becomes legal.
//! 3. **Row tracking:** The single open row and the bank it lives in.
//! 4. **Data path:** Burst addressing per the programmed mode, a sparse word store,
//!    and a read pipeline that drives `dq` exactly CAS latency cycles after READ.
//!
//! Any broken rule is returned as a [`ProtocolViolation`]; the model never panics on
//! controller misbehavior. It accepts one open row at a time, which is all the
//! controller ever opens.

use std::collections::{HashMap, VecDeque};

use crate::common::constants::{A10_BIT, MIN_INIT_REFRESHES};
use crate::common::error::{ConfigError, ProtocolViolation};
use crate::common::{AddrLayout, SdramAddr};
use crate::config::{Config, TimingConfig};
use crate::controller::command::Command;
use crate::controller::mode::Mode;
use crate::controller::signals::Outputs;

/// Progress through the power-up sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitStage {
    /// Waiting for PRECHARGE ALL.
    PowerUp,
    /// Precharged; `n` refreshes issued so far.
    Refreshing(u32),
    /// Mode register programmed; traffic allowed.
    Ready,
}

/// Earliest cycle the next command may issue, and the delay that set it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Gate {
    ready_at: u64,
    constraint: &'static str,
}

impl Gate {
    const OPEN: Self = Self {
        ready_at: 0,
        constraint: "none",
    };

    fn hold(&mut self, until: u64, constraint: &'static str) {
        if until > self.ready_at {
            self.ready_at = until;
            self.constraint = constraint;
        }
    }

    const fn check(&self, command: Command, cycle: u64) -> Result<(), ProtocolViolation> {
        if cycle < self.ready_at {
            Err(ProtocolViolation::TimingViolated {
                command,
                cycle,
                ready_at: self.ready_at,
                constraint: self.constraint,
            })
        } else {
            Ok(())
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct OpenRow {
    bank: u32,
    row: u32,
    opened_at: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Burst {
    write: bool,
    bank: u32,
    row: u32,
    start_col: u32,
    beat: u32,
    len: u32,
}

/// Column accessed by beat `beat` of a burst of `len` words starting at `start`.
///
/// Bursts shorter than a row wrap inside their aligned block, in sequential or
/// interleaved order; a full-page burst wraps around the row.
pub const fn burst_column(start: u32, beat: u32, len: u32, columns: u32, interleaved: bool) -> u32 {
    if len >= columns {
        return (start + beat) % columns;
    }
    let wrap = len - 1;
    let offset = if interleaved {
        (start ^ beat) & wrap
    } else {
        (start + beat) & wrap
    };
    (start & !wrap) | offset
}

/// Reference SDRAM device.
#[derive(Clone, Debug)]
pub struct SdramDevice {
    layout: AddrLayout,
    word_mask: u64,
    timing: TimingConfig,

    cycle: u64,
    stage: InitStage,
    mode: Option<Mode>,
    gate: Gate,
    open: Option<OpenRow>,
    burst: Option<Burst>,

    memory: HashMap<SdramAddr, u64>,
    /// Words fetched by READ beats, oldest first; `cas_latency - 1` entries deep.
    dq_pipeline: VecDeque<Option<u64>>,
    dq_out: Option<u64>,
}

impl SdramDevice {
    /// Builds a powered-up, uninitialized device matching `config`.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let _ = config.validate()?;
        Ok(Self::from_validated(config))
    }

    /// Builds a device for a configuration that already passed [`Config::validate`].
    pub(crate) fn from_validated(config: &Config) -> Self {
        Self {
            layout: config.geometry.layout(),
            word_mask: config.geometry.word_mask(),
            timing: config.timing,
            cycle: 0,
            stage: InitStage::PowerUp,
            mode: None,
            gate: Gate::OPEN,
            open: None,
            burst: None,
            memory: HashMap::new(),
            dq_pipeline: VecDeque::new(),
            dq_out: None,
        }
    }

    /// Data bus as driven by the device during the current cycle.
    #[inline]
    pub const fn dq(&self) -> Option<u64> {
        self.dq_out
    }

    /// Clocks the device with the pins the controller drives this cycle.
    pub fn clk(&mut self, out: &Outputs) -> Result<(), ProtocolViolation> {
        let cycle = self.cycle;
        if out.data_en && self.dq_out.is_some() {
            return Err(ProtocolViolation::BusConflict { cycle });
        }

        let command = Command::decode(out.pins, out.a & (1 << A10_BIT) != 0);
        if !command.is_idle() {
            self.command(command, out)?;
        }

        let fetched = self.beat(out)?;
        self.shift_dq(fetched);
        self.cycle += 1;
        Ok(())
    }

    fn command(&mut self, command: Command, out: &Outputs) -> Result<(), ProtocolViolation> {
        let cycle = self.cycle;
        let t = self.timing;
        if self.stage == InitStage::PowerUp && cycle < u64::from(t.c_init) {
            return Err(ProtocolViolation::InitTooEarly {
                command,
                cycle,
                required: t.c_init,
            });
        }
        self.gate.check(command, cycle)?;

        let bank = u32::from(out.ba);
        match command {
            Command::PrechargeAll | Command::Precharge => {
                if let Some(open) = self.open {
                    if command == Command::PrechargeAll || open.bank == bank {
                        self.precharge(open, command)?;
                    }
                }
                if self.stage == InitStage::PowerUp {
                    self.stage = InitStage::Refreshing(0);
                }
                self.burst = None;
            }
            Command::Refresh => {
                if self.stage == InitStage::PowerUp {
                    return Err(ProtocolViolation::InitSequence {
                        command,
                        cycle,
                        reason: "PRECHARGE ALL must come first",
                    });
                }
                if self.open.is_some() {
                    return Err(ProtocolViolation::RowOpen { command, cycle });
                }
                if let InitStage::Refreshing(n) = self.stage {
                    self.stage = InitStage::Refreshing(n + 1);
                }
                self.gate.hold(cycle + u64::from(t.c_rc), "tRC");
            }
            Command::ModeRegisterSet => {
                match self.stage {
                    InitStage::PowerUp => {
                        return Err(ProtocolViolation::InitSequence {
                            command,
                            cycle,
                            reason: "PRECHARGE ALL must come first",
                        });
                    }
                    InitStage::Refreshing(n) if n < MIN_INIT_REFRESHES => {
                        return Err(ProtocolViolation::InitSequence {
                            command,
                            cycle,
                            reason: "two REFRESH commands must precede MODE REGISTER SET",
                        });
                    }
                    _ => {}
                }
                if self.open.is_some() {
                    return Err(ProtocolViolation::RowOpen { command, cycle });
                }
                let mode = Mode::decode(out.a).ok_or(ProtocolViolation::InvalidModeRegister {
                    cycle,
                    value: out.a,
                })?;
                let lines = self.dq_pipeline_depth(mode);
                self.dq_pipeline = std::iter::repeat_n(None, lines).collect();
                self.mode = Some(mode);
                self.stage = InitStage::Ready;
                self.gate.hold(cycle + u64::from(t.c_mrd), "tMRD");
                tracing::debug!(cycle, ?mode, "device mode register set");
            }
            Command::Activate => {
                let _ = self.require_ready(command)?;
                if let Some(open) = self.open {
                    return Err(ProtocolViolation::RowAlreadyOpen {
                        cycle,
                        bank,
                        open_bank: open.bank,
                        open_row: open.row,
                    });
                }
                self.open = Some(OpenRow {
                    bank,
                    row: u32::from(out.a) & ((1 << self.layout.row_bits) - 1),
                    opened_at: cycle,
                });
                self.gate.hold(cycle + u64::from(t.c_rcd), "tRCD");
            }
            Command::Read
            | Command::ReadAutoPrecharge
            | Command::Write
            | Command::WriteAutoPrecharge => {
                let mode = self.require_ready(command)?;
                let open = self
                    .open
                    .ok_or(ProtocolViolation::NoOpenRow { command, cycle })?;
                if open.bank != bank {
                    return Err(ProtocolViolation::BankMismatch {
                        command,
                        cycle,
                        bank,
                        open_bank: open.bank,
                    });
                }
                let len = mode.burst_length.words(self.layout.col_bits);
                let write = command.is_write();
                self.burst = Some(Burst {
                    write,
                    bank,
                    row: open.row,
                    start_col: u32::from(out.a) & (self.layout.columns() - 1),
                    beat: 0,
                    len,
                });
                let data_end = if write {
                    u64::from(len)
                } else {
                    u64::from(mode.cas_latency.cycles() + len)
                };
                self.gate.hold(
                    cycle + data_end,
                    if write { "write burst" } else { "read burst" },
                );
                if matches!(
                    command,
                    Command::ReadAutoPrecharge | Command::WriteAutoPrecharge
                ) {
                    self.gate
                        .hold(open.opened_at + u64::from(t.c_ras), "tRAS");
                    self.open = None;
                }
            }
            Command::BurstStop => {
                self.burst = None;
            }
            Command::Nop | Command::Deselect => {}
        }
        Ok(())
    }

    fn precharge(&mut self, open: OpenRow, command: Command) -> Result<(), ProtocolViolation> {
        let ready_at = open.opened_at + u64::from(self.timing.c_ras);
        if self.cycle < ready_at {
            return Err(ProtocolViolation::TimingViolated {
                command,
                cycle: self.cycle,
                ready_at,
                constraint: "tRAS",
            });
        }
        self.open = None;
        Ok(())
    }

    fn require_ready(&self, command: Command) -> Result<Mode, ProtocolViolation> {
        match (self.stage, self.mode) {
            (InitStage::Ready, Some(mode)) => Ok(mode),
            _ => Err(ProtocolViolation::NotInitialized {
                command,
                cycle: self.cycle,
            }),
        }
    }

    const fn dq_pipeline_depth(&self, mode: Mode) -> usize {
        mode.cas_latency.cycles() as usize - 1
    }

    /// Transfers one burst beat; returns the word fetched by a READ beat.
    fn beat(&mut self, out: &Outputs) -> Result<Option<u64>, ProtocolViolation> {
        let Some(mut burst) = self.burst else {
            return Ok(None);
        };
        let addr = SdramAddr {
            col: burst_column(
                burst.start_col,
                burst.beat,
                burst.len,
                self.layout.columns(),
                self.mode.is_some_and(|m| m.burst_interleaved),
            ),
            row: burst.row,
            bank: burst.bank,
        };

        let fetched = if burst.write {
            if !out.data_en {
                return Err(ProtocolViolation::MissingWriteData {
                    cycle: self.cycle,
                    beat: burst.beat,
                });
            }
            let _ = self.memory.insert(addr, out.wr_data & self.word_mask);
            None
        } else {
            Some(self.peek(addr))
        };

        burst.beat += 1;
        self.burst = (burst.beat < burst.len).then_some(burst);
        Ok(fetched)
    }

    fn shift_dq(&mut self, fetched: Option<u64>) {
        if self.dq_pipeline.is_empty() {
            self.dq_out = fetched;
        } else {
            self.dq_pipeline.push_back(fetched);
            self.dq_out = self.dq_pipeline.pop_front().flatten();
        }
    }

    /// Stored word at `addr`; unwritten locations read as zero.
    pub fn peek(&self, addr: SdramAddr) -> u64 {
        self.memory.get(&addr).copied().unwrap_or(0)
    }

    /// Stores `data` at `addr` without a bus transaction.
    pub fn poke(&mut self, addr: SdramAddr, data: u64) {
        let _ = self.memory.insert(addr, data & self.word_mask);
    }

    /// Programmed mode register, once initialization reached it.
    #[inline]
    pub const fn mode(&self) -> Option<Mode> {
        self.mode
    }

    /// Progress through the power-up sequence.
    #[inline]
    pub const fn stage(&self) -> InitStage {
        self.stage
    }

    /// Bank and row of the open row, if any.
    #[inline]
    pub fn open_row(&self) -> Option<(u32, u32)> {
        self.open.map(|o| (o.bank, o.row))
    }

    /// Cycles clocked so far.
    #[inline]
    pub const fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Address slicing used to index the word store.
    #[inline]
    pub const fn layout(&self) -> AddrLayout {
        self.layout
    }
}
