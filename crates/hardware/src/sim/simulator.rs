//! Simulator: owns the controller and the device model side by side.
//!
//! Each tick the simulator samples the device's data bus, presents the head of the
//! transaction queue on the request interface, steps the controller, moves the data
//! beats of the transaction in flight, and finally clocks the device with the pins the
//! controller drove. The request strobe stays high until the controller latches the
//! request, which it does on the tick it issues ACTIVATE.

use std::collections::VecDeque;

use serde::Serialize;

use crate::common::error::{ConfigError, SimError};
use crate::config::Config;
use crate::controller::command::Command;
use crate::controller::fsm::StateKind;
use crate::controller::signals::Inputs;
use crate::controller::{SdramController, Tick};
use crate::device::SdramDevice;
use crate::stats::ControllerStats;

/// A request submitted to the controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transaction {
    /// Read one burst starting at `addr`.
    Read {
        /// Packed request address.
        addr: u32,
    },
    /// Write one burst starting at `addr`.
    ///
    /// `data` holds one word per beat; a short vector is padded by repeating its last
    /// word, and an empty one writes zeros.
    Write {
        /// Packed request address.
        addr: u32,
        /// Burst data, first beat first.
        data: Vec<u64>,
    },
}

impl Transaction {
    /// Packed request address.
    pub const fn addr(&self) -> u32 {
        match self {
            Self::Read { addr } | Self::Write { addr, .. } => *addr,
        }
    }

    /// Read or write.
    pub const fn kind(&self) -> TransactionKind {
        match self {
            Self::Read { .. } => TransactionKind::Read,
            Self::Write { .. } => TransactionKind::Write,
        }
    }
}

/// Direction of a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum TransactionKind {
    /// Data flows from the device.
    Read,
    /// Data flows to the device.
    Write,
}

/// A finished transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Completion {
    /// Packed request address.
    pub addr: u32,
    /// Read or write.
    pub kind: TransactionKind,
    /// Words written, or words read back, one per beat.
    pub data: Vec<u64>,
    /// Cycle the transaction was queued.
    pub submitted_at: u64,
    /// Cycle the controller latched it (ACTIVATE).
    pub admitted_at: u64,
    /// Cycle its last data beat was on the bus.
    pub completed_at: u64,
}

/// One line of the per-tick trace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TraceEntry {
    /// Cycle number.
    pub cycle: u64,
    /// State whose rule produced the command.
    pub phase: StateKind,
    /// Command issued.
    pub command: Command,
    /// Address bus.
    pub a: u16,
    /// Bank bus.
    pub ba: u8,
    /// Grant strobe.
    pub grant: bool,
    /// Controller drives the data bus.
    pub data_en: bool,
    /// Outstanding refresh obligations.
    pub backlog: u32,
}

impl From<&Tick> for TraceEntry {
    fn from(tick: &Tick) -> Self {
        Self {
            cycle: tick.cycle,
            phase: tick.phase,
            command: tick.outputs.cmd,
            a: tick.outputs.a,
            ba: tick.outputs.ba,
            grant: tick.outputs.grant,
            data_en: tick.outputs.data_en,
            backlog: tick.backlog,
        }
    }
}

#[derive(Clone, Debug)]
struct Queued {
    addr: u32,
    kind: TransactionKind,
    data: Vec<u64>,
    submitted_at: u64,
}

#[derive(Clone, Debug)]
struct InFlight {
    txn: Queued,
    admitted_at: u64,
    /// Write beats driven, or read words collected.
    beats: usize,
    granted: bool,
    read_data: Vec<u64>,
}

/// Top-level simulator: controller, device model and transaction queue.
#[derive(Debug)]
pub struct Simulator {
    controller: SdramController,
    device: SdramDevice,
    burst_words: usize,
    word_mask: u64,

    queue: VecDeque<Queued>,
    in_flight: Option<InFlight>,
    completions: Vec<Completion>,
    trace: Option<Vec<TraceEntry>>,
}

impl Simulator {
    /// Creates a simulator with a freshly powered controller and device.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let controller = SdramController::new(config)?;
        let device = SdramDevice::from_validated(config);
        Ok(Self {
            burst_words: controller.params().burst_words as usize,
            word_mask: config.geometry.word_mask(),
            controller,
            device,
            queue: VecDeque::new(),
            in_flight: None,
            completions: Vec::new(),
            trace: None,
        })
    }

    /// Starts recording a [`TraceEntry`] per tick.
    pub fn enable_trace(&mut self) {
        if self.trace.is_none() {
            self.trace = Some(Vec::new());
        }
    }

    /// Queues a transaction behind any already submitted.
    pub fn submit(&mut self, txn: Transaction) {
        let kind = txn.kind();
        let addr = txn.addr();
        let data = match txn {
            Transaction::Read { .. } => Vec::new(),
            Transaction::Write { data, .. } => {
                let last = data.last().copied().unwrap_or(0);
                data.into_iter()
                    .chain(std::iter::repeat(last))
                    .take(self.burst_words)
                    .map(|w| w & self.word_mask)
                    .collect()
            }
        };
        self.queue.push_back(Queued {
            addr,
            kind,
            data,
            submitted_at: self.controller.cycle(),
        });
    }

    /// Advances one clock cycle.
    pub fn tick(&mut self) -> Result<Tick, SimError> {
        let mut inputs = Inputs {
            rd_data: self.device.dq().unwrap_or(0),
            ..Inputs::IDLE
        };
        if let Some(head) = self.queue.front() {
            inputs.req = true;
            inputs.write = head.kind == TransactionKind::Write;
            inputs.addr = head.addr;
            if head.kind == TransactionKind::Write {
                inputs.wr_data = head.data[0];
            }
        }
        if let Some(f) = &self.in_flight {
            if f.txn.kind == TransactionKind::Write {
                inputs.wr_data = f.txn.data[f.beats.min(self.burst_words - 1)];
            }
        }

        let tick = self.controller.tick(&inputs);
        let cycle = tick.cycle;

        if tick.admitted {
            if let Some(txn) = self.queue.pop_front() {
                debug_assert!(self.in_flight.is_none(), "admission with a transaction in flight");
                self.in_flight = Some(InFlight {
                    txn,
                    admitted_at: cycle,
                    beats: 0,
                    granted: false,
                    read_data: Vec::with_capacity(self.burst_words),
                });
            }
        }
        self.move_data(&tick);

        self.device.clk(&tick.outputs)?;

        if let Some(trace) = &mut self.trace {
            trace.push(TraceEntry::from(&tick));
        }
        Ok(tick)
    }

    fn move_data(&mut self, tick: &Tick) {
        let Some(f) = &mut self.in_flight else {
            return;
        };
        let out = &tick.outputs;
        match f.txn.kind {
            TransactionKind::Write if out.data_en => f.beats += 1,
            TransactionKind::Read => {
                f.granted |= out.grant;
                if f.granted {
                    f.read_data.push(out.rd_data);
                    f.beats += 1;
                }
            }
            TransactionKind::Write => {}
        }
        if f.beats < self.burst_words {
            return;
        }

        if let Some(f) = self.in_flight.take() {
            let data = match f.txn.kind {
                TransactionKind::Read => f.read_data,
                TransactionKind::Write => f.txn.data,
            };
            tracing::debug!(
                cycle = tick.cycle,
                addr = f.txn.addr,
                kind = ?f.txn.kind,
                latency = tick.cycle - f.txn.submitted_at,
                "transaction complete"
            );
            self.completions.push(Completion {
                addr: f.txn.addr,
                kind: f.txn.kind,
                data,
                submitted_at: f.txn.submitted_at,
                admitted_at: f.admitted_at,
                completed_at: tick.cycle,
            });
        }
    }

    /// Runs exactly `cycles` ticks.
    pub fn run(&mut self, cycles: u64) -> Result<(), SimError> {
        for _ in 0..cycles {
            let _ = self.tick()?;
        }
        Ok(())
    }

    /// Ticks until every submitted transaction has completed.
    ///
    /// Returns the completions in completion order, or [`SimError::Timeout`] when the
    /// queue has not drained after `max_cycles` ticks.
    pub fn run_until_idle(&mut self, max_cycles: u64) -> Result<Vec<Completion>, SimError> {
        self.run_until_idle_with(max_cycles, |_| {})
    }

    /// Like [`Self::run_until_idle`], handing every tick to `on_tick` as it happens.
    pub fn run_until_idle_with(
        &mut self,
        max_cycles: u64,
        mut on_tick: impl FnMut(&Tick),
    ) -> Result<Vec<Completion>, SimError> {
        let mut ran = 0;
        while self.pending() > 0 {
            if ran == max_cycles {
                return Err(SimError::Timeout {
                    cycles: ran,
                    pending: self.pending(),
                });
            }
            let tick = self.tick()?;
            on_tick(&tick);
            ran += 1;
        }
        Ok(self.take_completions())
    }

    /// Transactions queued or in flight.
    pub fn pending(&self) -> usize {
        self.queue.len() + usize::from(self.in_flight.is_some())
    }

    /// Removes and returns the completions collected so far.
    pub fn take_completions(&mut self) -> Vec<Completion> {
        std::mem::take(&mut self.completions)
    }

    /// Recorded trace; empty unless [`Self::enable_trace`] was called.
    pub fn trace(&self) -> &[TraceEntry] {
        self.trace.as_deref().unwrap_or_default()
    }

    /// The controller under test.
    pub const fn controller(&self) -> &SdramController {
        &self.controller
    }

    /// The device model.
    pub const fn device(&self) -> &SdramDevice {
        &self.device
    }

    /// Controller statistics.
    pub const fn stats(&self) -> &ControllerStats {
        self.controller.stats()
    }

    /// Ticks executed so far.
    pub const fn cycle(&self) -> u64 {
        self.controller.cycle()
    }
}
