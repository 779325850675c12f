//! SDRAM controller.
//!
//! This module composes the controller from its parts:
//! 1. **Codec:** [`command`] and [`mode`] turn abstract commands and mode settings into
//!    pin levels and register values.
//! 2. **Admission counter:** [`refresh`] decides when refresh may be slipped in and when
//!    it must pre-empt traffic.
//! 3. **State machine:** [`fsm`] sequences initialization, row transactions and refresh
//!    under the configured delays.
//!
//! [`SdramController`] owns the registers of all three and advances them one tick per
//! call to [`SdramController::tick`].

/// Command Codec: command signatures, pin levels and the address bit 10 override.
pub mod command;
/// Protocol state machine: registers and the pure per-tick step function.
pub mod fsm;
/// Mode register contents and encoding.
pub mod mode;
/// Refresh admission counter.
pub mod refresh;
/// Input and output signal bundles.
pub mod signals;

use serde::Serialize;

use self::fsm::{Params, RefreshKind, RefreshStatus, Registers, State, StateKind};
use self::mode::Mode;
use self::refresh::RefreshCounter;
use self::signals::{Inputs, Outputs};
use crate::common::constants::{CONTROLLER_SLACK_HI, DEFAULT_SLACK_LO};
use crate::common::error::ConfigError;
use crate::config::Config;
use crate::stats::ControllerStats;

/// Everything observable about one controller tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Tick {
    /// Cycle number, starting at zero.
    pub cycle: u64,
    /// State whose rule produced this tick's command.
    pub phase: StateKind,
    /// Signals driven this tick.
    pub outputs: Outputs,
    /// REFRESH issued this tick, and why.
    pub refresh: Option<RefreshKind>,
    /// A request was latched this tick.
    pub admitted: bool,
    /// Admission counter signals the state machine sampled this tick.
    pub status: RefreshStatus,
    /// Outstanding refresh obligations this tick.
    pub backlog: u32,
}

/// Single-row-at-a-time SDR SDRAM controller.
///
/// # Examples
///
/// ```
/// use sdrctl_core::config::Config;
/// use sdrctl_core::controller::SdramController;
/// use sdrctl_core::controller::command::Command;
/// use sdrctl_core::controller::signals::Inputs;
///
/// let mut config = Config::default();
/// config.timing.c_init = 20;
/// let mut ctrl = SdramController::new(&config).unwrap();
///
/// let mut commands = Vec::new();
/// while !ctrl.is_initialized() {
///     let tick = ctrl.tick(&Inputs::IDLE);
///     if tick.outputs.cmd != Command::Nop {
///         commands.push(tick.outputs.cmd);
///     }
/// }
/// assert_eq!(
///     commands,
///     [Command::PrechargeAll, Command::Refresh, Command::Refresh, Command::ModeRegisterSet]
/// );
/// ```
#[derive(Clone, Debug)]
pub struct SdramController {
    params: Params,
    mode: Mode,
    regs: Registers,
    refresh: RefreshCounter,
    /// The admission counter is held until the first tick spent in `Idle`.
    refresh_enabled: bool,
    cycle: u64,
    phase: StateKind,
    waiting_since: Option<u64>,
    stats: ControllerStats,
}

impl SdramController {
    /// Builds a controller in its power-on state.
    ///
    /// Fails when the configuration is rejected by [`Config::validate`]; no cycle has
    /// executed at that point.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let mode = config.validate()?;
        let params = Params::new(config, &mode);
        tracing::debug!(?mode, mode_register = params.mode_code, "controller configured");
        Ok(Self {
            params,
            mode,
            regs: Registers::reset(&params),
            refresh: RefreshCounter::with_slack(
                config.refresh.ref_period,
                config.refresh.ref_max_pending,
                DEFAULT_SLACK_LO,
                CONTROLLER_SLACK_HI,
            ),
            refresh_enabled: false,
            cycle: 0,
            phase: StateKind::InitWait,
            waiting_since: None,
            stats: ControllerStats::default(),
        })
    }

    /// Advances one clock tick.
    pub fn tick(&mut self, inputs: &Inputs) -> Tick {
        let status = if self.refresh_enabled {
            RefreshStatus {
                any: self.refresh.any_pending(),
                full: self.refresh.is_full(),
            }
        } else {
            RefreshStatus::default()
        };
        let backlog = self.refresh.outstanding();

        let step = fsm::step(&self.params, &self.regs, status, inputs);

        if step.consumes_refresh() {
            self.refresh.request_remove();
        }
        if self.refresh_enabled {
            self.refresh.tick();
        } else if step.phase == StateKind::Idle {
            self.refresh_enabled = true;
            self.stats.init_cycles = self.cycle;
            tracing::info!(cycle = self.cycle, "initialization complete; refresh counter enabled");
        }

        self.observe(inputs, &step, backlog);

        self.regs = step.next;
        let tick = Tick {
            cycle: self.cycle,
            phase: step.phase,
            outputs: step.outputs,
            refresh: step.refresh,
            admitted: step.admitted,
            status,
            backlog,
        };
        self.cycle += 1;
        tick
    }

    fn observe(&mut self, inputs: &Inputs, step: &fsm::Step, backlog: u32) {
        let out = &step.outputs;
        self.stats.cycles += 1;
        self.stats.record_command(out.cmd);
        self.stats.max_backlog = self.stats.max_backlog.max(backlog);
        if let Some(kind) = step.refresh {
            self.stats.record_refresh(kind);
        }
        if out.grant {
            if self.regs.txn.write {
                self.stats.write_grants += 1;
            } else {
                self.stats.read_grants += 1;
            }
        }

        if inputs.req {
            let since = *self.waiting_since.get_or_insert(self.cycle);
            if step.admitted {
                self.stats.record_admission(self.cycle - since);
                self.waiting_since = None;
                tracing::debug!(
                    cycle = self.cycle,
                    addr = inputs.addr,
                    write = inputs.write,
                    waited = self.cycle - since,
                    "request admitted"
                );
            }
        } else {
            self.waiting_since = None;
        }

        if out.cmd != command::Command::Nop {
            tracing::trace!(
                cycle = self.cycle,
                cmd = %out.cmd,
                a = out.a,
                ba = out.ba,
                "command"
            );
        }
        let phase = match step.next.state {
            State::Wait(_) => StateKind::Wait,
            State::InitWait => StateKind::InitWait,
            State::InitRefresh => StateKind::InitRefresh,
            State::InitModeSet => StateKind::InitModeSet,
            State::Idle => StateKind::Idle,
            State::Active => StateKind::Active,
        };
        if phase != self.phase {
            tracing::debug!(cycle = self.cycle, from = ?self.phase, to = ?phase, "state change");
            self.phase = phase;
        }
    }

    /// Current state register.
    #[inline]
    pub const fn state(&self) -> State {
        self.regs.state
    }

    /// All state machine registers.
    #[inline]
    pub const fn registers(&self) -> &Registers {
        &self.regs
    }

    /// Constants derived from the configuration.
    #[inline]
    pub const fn params(&self) -> &Params {
        &self.params
    }

    /// Programmed mode register contents.
    #[inline]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Refresh admission counter.
    #[inline]
    pub const fn refresh(&self) -> &RefreshCounter {
        &self.refresh
    }

    /// Ticks executed so far.
    #[inline]
    pub const fn cycle(&self) -> u64 {
        self.cycle
    }

    /// The power-up sequence finished and the controller has been idle at least once.
    #[inline]
    pub const fn is_initialized(&self) -> bool {
        self.refresh_enabled
    }

    /// Statistics collected so far.
    #[inline]
    pub const fn stats(&self) -> &ControllerStats {
        &self.stats
    }
}
