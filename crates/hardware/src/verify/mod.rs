//! Built-in property checks.
//!
//! This module drives the controller and its parts with externally chosen inputs and
//! checks the properties the design relies on. It provides:
//! 1. **Counter exploration:** Breadth-first search over every reachable state of the
//!    refresh admission counter under its usage contract, failing on the first input
//!    sequence that would underflow or overflow the backlog.
//! 2. **Cover search:** The shortest input sequence that fills the backlog and later
//!    drains it again.
//! 3. **Controller runs:** Initialization order, data integrity under random traffic,
//!    and refresh/admission liveness under continuous requests, each cross-checked
//!    against the behavioral device model.
//! 4. **Registry:** Named checks with dotted-prefix selection for the command line.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::common::SdramAddr;
use crate::common::constants::{CONTROLLER_SLACK_HI, DEFAULT_SLACK_LO, MIN_INIT_REFRESHES};
use crate::common::error::CheckError;
use crate::config::Config;
use crate::controller::command::Command;
use crate::controller::fsm::{RefreshKind, StateKind};
use crate::controller::refresh::{CounterFault, RefreshCounter};
use crate::controller::signals::Inputs;
use crate::controller::{SdramController, Tick};
use crate::device::{InitStage, burst_column};
use crate::sim::{Simulator, TrafficGenerator, TransactionKind};

/// Refresh period used by the counter checks.
pub const COUNTER_PERIOD: u32 = 3;
/// Backlog tolerance used by the counter checks.
pub const COUNTER_MAX_PENDING: u32 = 5;
/// Exploration bound, in cycles, of the counter checks.
pub const COUNTER_DEPTH: u32 = 40;

/// Result of a counter exploration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Exploration {
    /// Distinct counter states visited.
    pub states: usize,
    /// Cycles explored.
    pub depth: u32,
    /// Every reachable state was visited before the bound.
    pub exhausted: bool,
}

/// Removal decisions the counter's usage contract allows in `state`.
///
/// A removal may only be requested while an obligation is outstanding, and must be
/// requested while the backlog is full.
fn allowed_removals(state: &RefreshCounter) -> impl Iterator<Item = bool> {
    let any = state.any_pending();
    let full = state.is_full();
    [false, true]
        .into_iter()
        .filter(move |&remove| (!remove || any) && (remove || !full))
}

/// Applies one cycle; reports the fault the edge would commit instead of committing it.
fn advance(state: &RefreshCounter, remove: bool) -> Result<RefreshCounter, CounterFault> {
    let mut next = state.clone();
    if remove {
        next.request_remove();
    }
    next.check_contract()?;
    next.tick();
    Ok(next)
}

/// Explores every input sequence of up to `depth` cycles from `start`.
///
/// Fails with [`CheckError::Counter`] carrying the shortest offending sequence.
pub fn explore_refresh_counter(start: &RefreshCounter, depth: u32) -> Result<Exploration, CheckError> {
    let start = start.clone();
    let mut seen = HashSet::from([start.clone()]);
    let mut frontier = vec![(start, Vec::new())];
    let mut explored = 0;

    while explored < depth && !frontier.is_empty() {
        let mut next_frontier = Vec::new();
        for (state, path) in frontier {
            for remove in allowed_removals(&state) {
                let mut inputs: Vec<bool> = path.clone();
                inputs.push(remove);
                let next = advance(&state, remove)
                    .map_err(|fault| CheckError::Counter { fault, inputs: inputs.clone() })?;
                if seen.insert(next.clone()) {
                    next_frontier.push((next, inputs));
                }
            }
        }
        frontier = next_frontier;
        explored += 1;
    }

    Ok(Exploration {
        states: seen.len(),
        depth: explored,
        exhausted: frontier.is_empty(),
    })
}

/// Finds the shortest input sequence from `start` after which the backlog was full at
/// some cycle and empty at a later one.
pub fn cover_refresh_counter(start: &RefreshCounter, depth: u32) -> Result<Vec<bool>, CheckError> {
    let start = start.clone();
    let root = (start.is_full(), start);
    let mut parent: HashMap<(bool, RefreshCounter), Option<((bool, RefreshCounter), bool)>> =
        HashMap::from([(root.clone(), None)]);
    let mut queue = VecDeque::from([(root, 0)]);

    while let Some((node, d)) = queue.pop_front() {
        let (was_full, state) = &node;
        if *was_full && !state.any_pending() {
            let mut inputs = Vec::new();
            let mut cursor = &node;
            while let Some(Some((prev, remove))) = parent.get(cursor) {
                inputs.push(*remove);
                cursor = prev;
            }
            inputs.reverse();
            return Ok(inputs);
        }
        if d == depth {
            continue;
        }
        for remove in allowed_removals(state) {
            let next = advance(state, remove).map_err(|fault| CheckError::Counter {
                fault,
                inputs: Vec::new(),
            })?;
            let key = (*was_full || next.is_full(), next);
            if !parent.contains_key(&key) {
                let _ = parent.insert(key.clone(), Some((node.clone(), remove)));
                queue.push_back((key, d + 1));
            }
        }
    }
    Err(CheckError::Unreachable { depth })
}

/// Configuration the controller checks run with: short power-up, frequent refresh,
/// small backlog tolerance.
pub fn check_config() -> Config {
    let mut config = Config::default();
    config.timing.c_init = 100;
    config.refresh.ref_period = 40;
    config.refresh.ref_max_pending = 3;
    config
}

/// Burst and latency variants exercised by the traffic check.
pub fn traffic_configs() -> Vec<Config> {
    let base = check_config();

    let mut burst4 = base.clone();
    burst4.mode.burst_length = 4;
    burst4.mode.burst_interleaved = true;
    burst4.mode.cas_latency = 3;
    burst4.timing.c_cas = 3;

    let mut burst8 = base.clone();
    burst8.mode.burst_length = 8;
    burst8.refresh.ref_period = 60;

    vec![base, burst4, burst8]
}

/// Outcome of [`check_init`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InitReport {
    /// Non-NOP commands with the cycle each was issued on.
    pub commands: Vec<(u64, Command)>,
    /// First cycle spent in `Idle`.
    pub idle_at: u64,
}

/// Runs the power-up sequence against the device model and checks its order.
pub fn check_init(config: &Config) -> Result<InitReport, CheckError> {
    let mut sim = Simulator::new(config)?;
    let limit = u64::from(config.timing.c_init)
        + 16 * u64::from(sim.controller().params().max_delay + config.timing.c_rc);
    let mut commands = Vec::new();

    while !sim.controller().is_initialized() {
        if sim.cycle() >= limit {
            return Err(CheckError::Controller {
                cycle: sim.cycle(),
                reason: "controller did not reach idle".into(),
            });
        }
        let tick = sim.tick()?;
        if tick.outputs.cmd != Command::Nop {
            commands.push((tick.cycle, tick.outputs.cmd));
        }
    }
    let idle_at = sim.cycle() - 1;

    let mut expected = vec![Command::PrechargeAll];
    expected.extend(std::iter::repeat_n(Command::Refresh, MIN_INIT_REFRESHES as usize));
    expected.push(Command::ModeRegisterSet);
    let issued: Vec<Command> = commands.iter().map(|&(_, c)| c).collect();
    if issued != expected {
        return Err(CheckError::Controller {
            cycle: idle_at,
            reason: format!("initialization issued {issued:?}, expected {expected:?}"),
        });
    }
    if let Some(&(cycle, _)) = commands.first() {
        if cycle < u64::from(config.timing.c_init) {
            return Err(CheckError::Controller {
                cycle,
                reason: "PRECHARGE ALL before the power-up wait elapsed".into(),
            });
        }
    }
    if sim.device().stage() != InitStage::Ready || sim.device().mode() != Some(sim.controller().mode())
    {
        return Err(CheckError::Controller {
            cycle: idle_at,
            reason: "device mode register does not match the controller".into(),
        });
    }

    Ok(InitReport { commands, idle_at })
}

/// Outcome of [`check_traffic`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrafficReport {
    /// Transactions completed.
    pub completed: usize,
    /// Reads whose data was compared.
    pub reads_checked: usize,
    /// Cycles simulated.
    pub cycles: u64,
}

/// Runs generated traffic through controller and device and checks every read against
/// the data last written.
pub fn check_traffic(
    config: &Config,
    seed: u64,
    requests: usize,
    write_ratio: f64,
) -> Result<TrafficReport, CheckError> {
    let mut sim = Simulator::new(config)?;
    let params = *sim.controller().params();
    let mode = sim.controller().mode();
    let layout = params.layout;

    let traffic = TrafficGenerator::new(
        seed,
        layout,
        config.geometry.word_bits,
        params.burst_words,
        write_ratio,
    );
    for txn in traffic.take(requests) {
        sim.submit(txn);
    }

    let budget = u64::from(config.timing.c_init)
        + 16 * u64::from(params.max_delay)
        + requests as u64
            * u64::from(
                config.busy_window(&mode)
                    + (DEFAULT_SLACK_LO + CONTROLLER_SLACK_HI) * params.c_rc,
            );
    let completions = sim.run_until_idle(budget)?;

    let mut shadow: HashMap<SdramAddr, u64> = HashMap::new();
    let mut reads_checked = 0;
    let mut last_admitted = 0;
    for c in &completions {
        if c.admitted_at < c.submitted_at || c.admitted_at < last_admitted {
            return Err(CheckError::Controller {
                cycle: c.admitted_at,
                reason: format!("transaction for {:#x} admitted out of order", c.addr),
            });
        }
        last_admitted = c.admitted_at;

        let start = layout.split(c.addr);
        let words = (0..params.burst_words).map(|beat| SdramAddr {
            col: burst_column(
                start.col,
                beat,
                params.burst_words,
                layout.columns(),
                mode.burst_interleaved,
            ),
            ..start
        });
        match c.kind {
            TransactionKind::Write => {
                for (addr, &word) in words.zip(&c.data) {
                    let _ = shadow.insert(addr, word);
                }
            }
            TransactionKind::Read => {
                let expected: Vec<u64> = words
                    .map(|addr| shadow.get(&addr).copied().unwrap_or(0))
                    .collect();
                if expected != c.data {
                    return Err(CheckError::DataMismatch {
                        addr: c.addr,
                        cycle: c.completed_at,
                        expected,
                        got: c.data.clone(),
                    });
                }
                reads_checked += 1;
            }
        }
    }

    Ok(TrafficReport {
        completed: completions.len(),
        reads_checked,
        cycles: sim.cycle(),
    })
}

/// Outcome of [`check_liveness`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LivenessReport {
    /// Transactions admitted after initialization.
    pub admissions: u64,
    /// Refreshes forced by a full backlog.
    pub forced_refreshes: u64,
    /// Longest run of cycles between two admissions.
    pub max_gap: u64,
    /// Bound `max_gap` was checked against.
    pub gap_bound: u64,
}

/// Holds the request strobe high for `cycles` cycles after initialization.
///
/// Checks that a full backlog is answered with REFRESH on the next idle evaluation,
/// that the counter contract holds on every cycle, and that requests keep being
/// admitted within a bound set by the busy window and the refresh recovery time.
pub fn check_liveness(config: &Config, cycles: u64) -> Result<LivenessReport, CheckError> {
    let mut sim = Simulator::new(config)?;
    let mode = sim.controller().mode();
    let params = *sim.controller().params();
    let gap_bound = u64::from(
        config.busy_window(&mode) + (DEFAULT_SLACK_LO + CONTROLLER_SLACK_HI) * params.c_rc,
    );
    let layout = params.layout;
    let mut traffic =
        TrafficGenerator::new(7, layout, config.geometry.word_bits, params.burst_words, 0.5);

    let mut last_admission: Option<u64> = None;
    let mut report = LivenessReport {
        admissions: 0,
        forced_refreshes: 0,
        max_gap: 0,
        gap_bound,
    };
    let mut remaining = cycles;

    while remaining > 0 {
        while sim.pending() < 2 {
            sim.submit(traffic.next_transaction());
        }
        let tick = sim.tick()?;
        let ctrl = sim.controller();
        if !ctrl.is_initialized() {
            continue;
        }
        remaining -= 1;

        if let Err(fault) = ctrl.refresh().check_contract() {
            return Err(CheckError::Controller {
                cycle: tick.cycle,
                reason: fault.to_string(),
            });
        }
        if tick.status.full && tick.phase == StateKind::Idle && tick.outputs.cmd != Command::Refresh
        {
            return Err(CheckError::Controller {
                cycle: tick.cycle,
                reason: format!("backlog full but idle issued {}", tick.outputs.cmd),
            });
        }
        if tick.refresh == Some(RefreshKind::Forced) {
            report.forced_refreshes += 1;
        }

        let since = last_admission.unwrap_or(ctrl.stats().init_cycles);
        let gap = tick.cycle - since;
        report.max_gap = report.max_gap.max(gap);
        if gap > gap_bound {
            return Err(CheckError::Controller {
                cycle: tick.cycle,
                reason: format!("no admission for {gap} cycles (bound {gap_bound})"),
            });
        }
        if tick.admitted {
            report.admissions += 1;
            last_admission = Some(tick.cycle);
        }
    }

    Ok(report)
}

/// Drives a bare controller with an arbitrary input sequence and returns every tick.
///
/// No device model is attached; used to check properties of the controller alone.
pub fn drive(controller: &mut SdramController, inputs: &[Inputs]) -> Vec<Tick> {
    inputs.iter().map(|i| controller.tick(i)).collect()
}

/// A named built-in check.
#[derive(Clone, Copy, Debug)]
pub struct Check {
    /// Dotted name, e.g. `refresh.bmc`.
    pub name: &'static str,
    /// One-line description.
    pub description: &'static str,
    run: fn() -> Result<String, CheckError>,
}

impl Check {
    /// Runs the check and returns its summary line.
    pub fn run(&self) -> Result<String, CheckError> {
        tracing::info!(check = self.name, "running check");
        (self.run)()
    }

    /// True when `pattern` names this check or one of its dotted prefixes.
    pub fn matches(&self, pattern: &str) -> bool {
        self.name == pattern
            || self
                .name
                .strip_prefix(pattern)
                .is_some_and(|rest| rest.starts_with('.'))
    }
}

fn run_refresh_bmc() -> Result<String, CheckError> {
    let start = RefreshCounter::new(COUNTER_PERIOD, COUNTER_MAX_PENDING);
    let e = explore_refresh_counter(&start, COUNTER_DEPTH)?;
    Ok(format!(
        "{} states, {} cycles{}",
        e.states,
        e.depth,
        if e.exhausted { ", state space exhausted" } else { "" }
    ))
}

fn run_refresh_cover() -> Result<String, CheckError> {
    let start = RefreshCounter::new(COUNTER_PERIOD, COUNTER_MAX_PENDING);
    let trace = cover_refresh_counter(&start, COUNTER_DEPTH)?;
    Ok(format!(
        "full then empty after {} cycles ({} removals)",
        trace.len(),
        trace.iter().filter(|&&r| r).count()
    ))
}

fn run_controller_init() -> Result<String, CheckError> {
    let report = check_init(&check_config())?;
    Ok(format!(
        "{} commands, idle at cycle {}",
        report.commands.len(),
        report.idle_at
    ))
}

fn run_controller_traffic() -> Result<String, CheckError> {
    let mut completed = 0;
    let mut reads = 0;
    for (seed, config) in (1..).zip(traffic_configs()) {
        let report = check_traffic(&config, seed, 500, 0.5)?;
        completed += report.completed;
        reads += report.reads_checked;
    }
    Ok(format!("{completed} transactions, {reads} reads verified"))
}

fn run_controller_liveness() -> Result<String, CheckError> {
    let report = check_liveness(&check_config(), 5_000)?;
    Ok(format!(
        "{} admissions, {} forced refreshes, max gap {} (bound {})",
        report.admissions, report.forced_refreshes, report.max_gap, report.gap_bound
    ))
}

/// Every built-in check, in execution order.
pub const CHECKS: &[Check] = &[
    Check {
        name: "refresh.bmc",
        description: "refresh counter never underflows or overflows under its contract",
        run: run_refresh_bmc,
    },
    Check {
        name: "refresh.cover",
        description: "refresh backlog can fill and then drain",
        run: run_refresh_cover,
    },
    Check {
        name: "controller.init",
        description: "power-up sequence order and timing against the device model",
        run: run_controller_init,
    },
    Check {
        name: "controller.traffic",
        description: "random traffic reads back what was written",
        run: run_controller_traffic,
    },
    Check {
        name: "controller.liveness",
        description: "forced refresh and request admission under continuous load",
        run: run_controller_liveness,
    },
];

/// Checks matching any of `patterns`; every check when `patterns` is empty.
pub fn select(patterns: &[String]) -> Vec<&'static Check> {
    CHECKS
        .iter()
        .filter(|c| patterns.is_empty() || patterns.iter().any(|p| c.matches(p)))
        .collect()
}
