//! Protocol state machine.
//!
//! The controller proper. One call to [`step`] is one clock tick: it reads the current
//! registers, the admission counter's urgency signals and the request interface, and
//! returns the command driven this tick together with the registers for the next one.
//! `step` is a pure function; it never touches the admission counter directly but
//! reports whether a refresh obligation was consumed.
//!
//! Every multi-cycle device delay goes through the single [`State::Wait`] state, which
//! carries a countdown and the state to resume into. A wait entered with delay `N`
//! runs the resume state's rule exactly `N` ticks after the command that entered it,
//! so command spacing equals the configured delay.
//!
//! Independently of the state, the burst countdown armed by `Active` produces the data
//! side effects of the transaction in flight: `data_en` for every remaining write
//! beat, and for reads a registered grant that rises on the tick the first read word
//! is on the bus.

use serde::Serialize;

use super::command::{Command, override_address_bit10};
use super::mode::Mode;
use super::signals::{Inputs, Outputs};
use crate::common::AddrLayout;
use crate::common::constants::{A10_BIT, ADDR_BUS_MASK, BANK_BUS_MASK, MIN_INIT_REFRESHES};
use crate::config::Config;

/// States that make a decision when evaluated; the target of a [`Wait`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Resume {
    /// Power-up wait.
    InitWait,
    /// Mandatory initialization refreshes.
    InitRefresh,
    /// Mode register programming.
    InitModeSet,
    /// Ready for traffic or refresh.
    Idle,
    /// Row open; column command pending.
    Active,
}

/// A pending device delay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Wait {
    /// Ticks left, counting the tick on which `resume` is evaluated.
    pub remaining: u32,
    /// State evaluated once the countdown expires.
    pub resume: Resume,
}

/// Controller state register.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum State {
    /// Power-up wait.
    InitWait,
    /// Mandatory initialization refreshes.
    InitRefresh,
    /// Mode register programming.
    InitModeSet,
    /// Ready for traffic or refresh.
    Idle,
    /// Row open; column command pending.
    Active,
    /// Blocking device delay.
    Wait(Wait),
}

impl From<Resume> for State {
    fn from(resume: Resume) -> Self {
        match resume {
            Resume::InitWait => Self::InitWait,
            Resume::InitRefresh => Self::InitRefresh,
            Resume::InitModeSet => Self::InitModeSet,
            Resume::Idle => Self::Idle,
            Resume::Active => Self::Active,
        }
    }
}

/// State whose rule produced a tick's command, as reported in traces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum StateKind {
    /// Power-up wait.
    InitWait,
    /// Mandatory initialization refreshes.
    InitRefresh,
    /// Mode register programming.
    InitModeSet,
    /// Ready for traffic or refresh.
    Idle,
    /// Row open; column command issued.
    Active,
    /// Blocking device delay.
    Wait,
}

impl From<Resume> for StateKind {
    fn from(resume: Resume) -> Self {
        match resume {
            Resume::InitWait => Self::InitWait,
            Resume::InitRefresh => Self::InitRefresh,
            Resume::InitModeSet => Self::InitModeSet,
            Resume::Idle => Self::Idle,
            Resume::Active => Self::Active,
        }
    }
}

impl StateKind {
    /// True while the power-up sequence is still running.
    pub const fn is_init(self) -> bool {
        matches!(self, Self::InitWait | Self::InitRefresh | Self::InitModeSet)
    }
}

/// Transaction latched on the `Idle` to `Active` transition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Latched {
    /// Packed request address.
    pub addr: u32,
    /// Write transaction.
    pub write: bool,
}

/// Why a REFRESH was issued.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum RefreshKind {
    /// Part of the power-up sequence; consumes no backlog.
    Init,
    /// Backlog full; pre-empted traffic.
    Forced,
    /// Backlog non-empty and no request waiting.
    Opportunistic,
}

/// Admission counter signals sampled by the state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RefreshStatus {
    /// At least one obligation outstanding.
    pub any: bool,
    /// Backlog at tolerance; refresh is mandatory.
    pub full: bool,
}

/// Constants derived once from a validated configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Params {
    /// Request address slicing.
    pub layout: AddrLayout,
    /// Longest of the CAS, RC, RCD and MRD delays.
    pub max_delay: u32,
    /// Initial value of the power-up counter: `ceil(c_init / max_delay) + 1`.
    pub init_cycles: u32,
    /// Mode register value.
    pub mode_code: u16,
    /// Words per burst.
    pub burst_words: u32,
    /// CAS latency in cycles.
    pub cas_latency: u32,
    /// ACTIVATE to READ/WRITE.
    pub c_rcd: u32,
    /// REFRESH to anything.
    pub c_rc: u32,
    /// MODE REGISTER SET to anything.
    pub c_mrd: u32,
    /// Wait after WRITE with auto-precharge: `max(c_ras - c_rcd, burst)`.
    pub write_wait: u32,
    /// Wait after READ with auto-precharge: `max(c_ras - c_rcd, cas + burst)`.
    pub read_wait: u32,
}

impl Params {
    /// Derives the state machine constants.
    ///
    /// `mode` is the result of [`Config::validate`] on `config`.
    pub fn new(config: &Config, mode: &Mode) -> Self {
        let t = &config.timing;
        let max_delay = t.max_delay();
        let burst_words = mode.burst_length.words(config.geometry.col_bits);
        let cas_latency = mode.cas_latency.cycles();
        let ras_after_rcd = t.c_ras.saturating_sub(t.c_rcd);
        Self {
            layout: config.geometry.layout(),
            max_delay,
            init_cycles: t.c_init.div_ceil(max_delay) + 1,
            mode_code: mode.encode(),
            burst_words,
            cas_latency,
            c_rcd: t.c_rcd,
            c_rc: t.c_rc,
            c_mrd: t.c_mrd,
            write_wait: ras_after_rcd.max(burst_words),
            read_wait: ras_after_rcd.max(cas_latency + burst_words),
        }
    }
}

/// Every register of the state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Registers {
    /// Current state.
    pub state: State,
    /// Power-up countdown.
    pub init_ctr: u32,
    /// Initialization refreshes issued so far.
    pub init_refs: u32,
    /// Transaction owned by `Active`; overwritten only on `Idle` to `Active`.
    pub txn: Latched,
    /// Burst countdown.
    pub burst: u32,
    /// Registered read grant, driven on the next tick.
    pub grant_q: bool,
}

impl Registers {
    /// Power-on register values.
    pub const fn reset(params: &Params) -> Self {
        Self {
            state: State::InitWait,
            init_ctr: params.init_cycles,
            init_refs: 0,
            txn: Latched {
                addr: 0,
                write: false,
            },
            burst: 0,
            grant_q: false,
        }
    }
}

/// Result of one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Step {
    /// Signals driven this tick.
    pub outputs: Outputs,
    /// Registers for the next tick.
    pub next: Registers,
    /// State whose rule ran this tick.
    pub phase: StateKind,
    /// REFRESH issued this tick, and why.
    pub refresh: Option<RefreshKind>,
    /// A request was latched this tick.
    pub admitted: bool,
}

impl Step {
    /// The admission counter must retire one obligation.
    pub const fn consumes_refresh(&self) -> bool {
        matches!(
            self.refresh,
            Some(RefreshKind::Forced | RefreshKind::Opportunistic)
        )
    }
}

const fn enter(delay: u32, resume: Resume) -> State {
    if delay == 0 {
        match resume {
            Resume::InitWait => State::InitWait,
            Resume::InitRefresh => State::InitRefresh,
            Resume::InitModeSet => State::InitModeSet,
            Resume::Idle => State::Idle,
            Resume::Active => State::Active,
        }
    } else {
        State::Wait(Wait {
            remaining: delay,
            resume,
        })
    }
}

fn drive(out: &mut Outputs, cmd: Command, addr: u32, bank: u32) {
    let a = (addr as u16) & ADDR_BUS_MASK;
    let bit10 = override_address_bit10(cmd, a & (1 << A10_BIT) != 0);
    out.cmd = cmd;
    out.pins = cmd.pins();
    out.a = (a & !(1 << A10_BIT)) | (u16::from(bit10) << A10_BIT);
    out.ba = (bank as u8) & BANK_BUS_MASK;
}

/// Computes one tick: `(registers, inputs) -> (outputs, next registers)`.
///
/// # Arguments
///
/// * `params` - Constants derived from the configuration.
/// * `regs` - Registers at the start of the tick.
/// * `refresh` - Admission counter signals for this tick.
/// * `inputs` - Request interface and device read data.
pub fn step(params: &Params, regs: &Registers, refresh: RefreshStatus, inputs: &Inputs) -> Step {
    let mut next = *regs;
    next.grant_q = false;

    let mut out = Outputs {
        grant: regs.grant_q,
        rd_data: inputs.rd_data,
        wr_data: inputs.wr_data,
        ..Outputs::NOP
    };

    if regs.burst != 0 {
        next.burst = regs.burst - 1;
        if regs.txn.write {
            out.data_en = true;
        } else if regs.burst & 0b11 == 1 {
            next.grant_q = true;
        }
    }

    let resume = match regs.state {
        State::Wait(w) if w.remaining > 1 => {
            next.state = State::Wait(Wait {
                remaining: w.remaining - 1,
                ..w
            });
            return Step {
                outputs: out,
                next,
                phase: StateKind::Wait,
                refresh: None,
                admitted: false,
            };
        }
        State::Wait(w) => w.resume,
        State::InitWait => Resume::InitWait,
        State::InitRefresh => Resume::InitRefresh,
        State::InitModeSet => Resume::InitModeSet,
        State::Idle => Resume::Idle,
        State::Active => Resume::Active,
    };

    let mut refresh_kind = None;
    let mut admitted = false;

    match resume {
        Resume::InitWait => {
            next.init_ctr = regs.init_ctr.saturating_sub(1);
            if next.init_ctr == 0 {
                drive(&mut out, Command::PrechargeAll, 0, 0);
                next.state = enter(params.max_delay, Resume::InitRefresh);
            } else {
                next.state = enter(params.max_delay, Resume::InitWait);
            }
        }
        Resume::InitRefresh => {
            drive(&mut out, Command::Refresh, 0, 0);
            refresh_kind = Some(RefreshKind::Init);
            next.init_refs = regs.init_refs + 1;
            let after = if next.init_refs >= MIN_INIT_REFRESHES {
                Resume::InitModeSet
            } else {
                Resume::InitRefresh
            };
            next.state = enter(params.c_rc, after);
        }
        Resume::InitModeSet => {
            drive(&mut out, Command::ModeRegisterSet, u32::from(params.mode_code), 0);
            next.state = enter(params.c_mrd, Resume::Idle);
        }
        Resume::Idle => {
            if refresh.full {
                drive(&mut out, Command::Refresh, 0, 0);
                refresh_kind = Some(RefreshKind::Forced);
                next.state = enter(params.c_rc, Resume::Idle);
            } else if inputs.req {
                let addr = params.layout.split(inputs.addr);
                next.txn = Latched {
                    addr: inputs.addr,
                    write: inputs.write,
                };
                admitted = true;
                drive(&mut out, Command::Activate, addr.row, addr.bank);
                next.state = enter(params.c_rcd, Resume::Active);
            } else if refresh.any {
                drive(&mut out, Command::Refresh, 0, 0);
                refresh_kind = Some(RefreshKind::Opportunistic);
                next.state = enter(params.c_rc, Resume::Idle);
            } else {
                next.state = State::Idle;
            }
        }
        Resume::Active => {
            let addr = params.layout.split(regs.txn.addr);
            if regs.txn.write {
                out.grant = true;
                out.data_en = true;
                next.burst = params.burst_words - 1;
                drive(&mut out, Command::WriteAutoPrecharge, addr.col, addr.bank);
                next.state = enter(params.write_wait, Resume::Idle);
            } else {
                next.burst = params.cas_latency - 1;
                drive(&mut out, Command::ReadAutoPrecharge, addr.col, addr.bank);
                next.state = enter(params.read_wait, Resume::Idle);
            }
        }
    }

    Step {
        outputs: out,
        next,
        phase: resume.into(),
        refresh: refresh_kind,
        admitted,
    }
}
