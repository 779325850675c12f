//! Pure state machine step tests.
//!
//! Every test builds registers by hand and calls `step` once or a few times; no
//! admission counter or device model is involved.

use rstest::rstest;
use sdrctl_core::common::SdramAddr;
use sdrctl_core::config::Config;
use sdrctl_core::controller::command::Command;
use sdrctl_core::controller::fsm::{
    Latched, Params, RefreshKind, RefreshStatus, Registers, Resume, State, StateKind, Step,
    Wait, step,
};
use sdrctl_core::controller::signals::Inputs;

use crate::common::harness::{scenario_c_config, timing_config};

const QUIET: RefreshStatus = RefreshStatus {
    any: false,
    full: false,
};
const ANY: RefreshStatus = RefreshStatus {
    any: true,
    full: false,
};
const FULL: RefreshStatus = RefreshStatus {
    any: true,
    full: true,
};

fn derive(config: &Config) -> Params {
    Params::new(config, &config.validate().unwrap())
}

fn params() -> Params {
    derive(&scenario_c_config())
}

fn in_state(params: &Params, state: State) -> Registers {
    Registers {
        state,
        ..Registers::reset(params)
    }
}

fn addr(params: &Params, col: u32, row: u32, bank: u32) -> u32 {
    params.layout.join(SdramAddr { col, row, bank })
}

// ══════════════════════════════════════════════════════════
// 1. Derived constants
// ══════════════════════════════════════════════════════════

#[test]
fn params_derive_from_configuration() {
    let p = params();
    assert_eq!(p.max_delay, 5);
    assert_eq!(p.init_cycles, 5);
    assert_eq!(p.mode_code, 0x020);
    assert_eq!(p.burst_words, 1);
    assert_eq!(p.read_wait, 3);
    assert_eq!(p.write_wait, 3);

    let p = derive(&timing_config(2, 6, 2, 8));
    assert_eq!(p.read_wait, 10);
    assert_eq!(p.write_wait, 8);
}

// ══════════════════════════════════════════════════════════
// 2. Idle priority
// ══════════════════════════════════════════════════════════

#[rstest]
#[case::full_beats_request(FULL, true, Command::Refresh, Some(RefreshKind::Forced))]
#[case::full_without_request(FULL, false, Command::Refresh, Some(RefreshKind::Forced))]
#[case::request_beats_backlog(ANY, true, Command::Activate, None)]
#[case::backlog_when_quiet(ANY, false, Command::Refresh, Some(RefreshKind::Opportunistic))]
#[case::request_only(QUIET, true, Command::Activate, None)]
#[case::nothing_to_do(QUIET, false, Command::Nop, None)]
fn idle_priority(
    #[case] status: RefreshStatus,
    #[case] req: bool,
    #[case] expected: Command,
    #[case] refresh: Option<RefreshKind>,
) {
    let p = params();
    let regs = in_state(&p, State::Idle);
    let inputs = if req { Inputs::read(0) } else { Inputs::IDLE };
    let s = step(&p, &regs, status, &inputs);
    assert_eq!(s.outputs.cmd, expected);
    assert_eq!(s.refresh, refresh);
    assert_eq!(s.admitted, expected == Command::Activate);
    assert_eq!(s.phase, StateKind::Idle);
    assert_eq!(s.consumes_refresh(), refresh.is_some());
}

#[test]
fn refresh_waits_trc_then_returns_to_idle() {
    let p = params();
    let s = step(&p, &in_state(&p, State::Idle), FULL, &Inputs::IDLE);
    assert_eq!(
        s.next.state,
        State::Wait(Wait {
            remaining: 5,
            resume: Resume::Idle
        })
    );
}

// ══════════════════════════════════════════════════════════
// 3. Wait semantics
// ══════════════════════════════════════════════════════════

#[test]
fn wait_counts_down_with_nops() {
    let p = params();
    let regs = in_state(
        &p,
        State::Wait(Wait {
            remaining: 3,
            resume: Resume::Idle,
        }),
    );
    // Urgency and requests are ignored while the countdown runs.
    let s = step(&p, &regs, FULL, &Inputs::read(0));
    assert_eq!(s.outputs.cmd, Command::Nop);
    assert_eq!(s.phase, StateKind::Wait);
    assert!(!s.admitted);
    assert_eq!(s.refresh, None);
    assert_eq!(
        s.next.state,
        State::Wait(Wait {
            remaining: 2,
            resume: Resume::Idle
        })
    );
}

#[test]
fn last_wait_tick_runs_the_resume_rule() {
    let p = params();
    let regs = in_state(
        &p,
        State::Wait(Wait {
            remaining: 1,
            resume: Resume::Idle,
        }),
    );
    let s = step(&p, &regs, QUIET, &Inputs::read(addr(&p, 0, 7, 2)));
    assert_eq!(s.phase, StateKind::Idle);
    assert_eq!(s.outputs.cmd, Command::Activate);
    assert!(s.admitted);
}

#[test]
fn command_spacing_equals_the_delay() {
    let p = params();
    let mut regs = in_state(&p, State::Idle);
    let mut issued = Vec::new();
    for cycle in 0..12 {
        let s = step(&p, &regs, QUIET, &Inputs::write(addr(&p, 3, 9, 0), 0xAB));
        if s.outputs.cmd != Command::Nop {
            issued.push((cycle, s.outputs.cmd));
        }
        regs = s.next;
    }
    // ACT, tRCD = 2, WRITA, write wait = 3, ACT again for the still-asserted request.
    assert_eq!(
        issued,
        [
            (0, Command::Activate),
            (2, Command::WriteAutoPrecharge),
            (5, Command::Activate),
            (7, Command::WriteAutoPrecharge),
            (10, Command::Activate),
        ]
    );
}

// ══════════════════════════════════════════════════════════
// 4. Address driving and latch ownership
// ══════════════════════════════════════════════════════════

#[test]
fn activate_drives_row_and_bank() {
    let p = params();
    let s = step(
        &p,
        &in_state(&p, State::Idle),
        QUIET,
        &Inputs::read(addr(&p, 0x21, 0x123, 1)),
    );
    assert_eq!(s.outputs.a, 0x123);
    assert_eq!(s.outputs.ba, 1);
    // Row bit 10 is a real address bit on ACTIVATE.
    let s = step(
        &p,
        &in_state(&p, State::Idle),
        QUIET,
        &Inputs::read(addr(&p, 0, 0x400, 3)),
    );
    assert_eq!(s.outputs.a, 0x400);
    assert_eq!(s.outputs.ba, 3);
}

#[test]
fn column_command_forces_auto_precharge_bit() {
    let p = params();
    let regs = Registers {
        txn: Latched {
            addr: addr(&p, 0x21, 0x123, 1),
            write: false,
        },
        ..in_state(&p, State::Active)
    };
    let s = step(&p, &regs, QUIET, &Inputs::IDLE);
    assert_eq!(s.outputs.cmd, Command::ReadAutoPrecharge);
    assert_eq!(s.outputs.a, 0x421);
    assert_eq!(s.outputs.ba, 1);
    assert_eq!(s.phase, StateKind::Active);
}

#[test]
fn active_uses_the_latched_transaction() {
    let p = params();
    let latched = addr(&p, 0x10, 0x55, 2);
    let regs = Registers {
        txn: Latched {
            addr: latched,
            write: true,
        },
        ..in_state(&p, State::Active)
    };
    // A different request on the interface must not leak into the column command.
    let s = step(&p, &regs, FULL, &Inputs::read(addr(&p, 0x99, 0x66, 0)));
    assert_eq!(s.outputs.cmd, Command::WriteAutoPrecharge);
    assert_eq!(s.outputs.a, 0x410);
    assert_eq!(s.outputs.ba, 2);
    assert_eq!(s.next.txn.addr, latched);
    assert!(!s.admitted);
    assert_eq!(s.refresh, None);
}

// ══════════════════════════════════════════════════════════
// 5. Data side effects
// ══════════════════════════════════════════════════════════

fn run_from_active(params: &Params, write: bool, ticks: usize) -> Vec<Step> {
    let mut regs = Registers {
        txn: Latched { addr: 0, write },
        ..in_state(params, State::Active)
    };
    let mut steps = Vec::new();
    for _ in 0..ticks {
        let s = step(params, &regs, QUIET, &Inputs::IDLE);
        regs = s.next;
        steps.push(s);
    }
    steps
}

#[test]
fn write_enables_data_for_every_beat() {
    let p = derive(&timing_config(2, 5, 2, 4));
    let steps = run_from_active(&p, true, 6);
    let data_en: Vec<bool> = steps.iter().map(|s| s.outputs.data_en).collect();
    let grant: Vec<bool> = steps.iter().map(|s| s.outputs.grant).collect();
    assert_eq!(data_en, [true, true, true, true, false, false]);
    assert_eq!(grant, [true, false, false, false, false, false]);
}

#[rstest]
#[case::cas2(2)]
#[case::cas3(3)]
fn read_grant_rises_cas_latency_after_the_command(#[case] cas: u32) {
    let p = derive(&timing_config(2, 5, cas, 1));
    let steps = run_from_active(&p, false, 6);
    let grants: Vec<usize> = steps
        .iter()
        .enumerate()
        .filter(|(_, s)| s.outputs.grant)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(grants, [cas as usize]);
    assert!(steps.iter().all(|s| !s.outputs.data_en));
}

// ══════════════════════════════════════════════════════════
// 6. Initialization
// ══════════════════════════════════════════════════════════

#[test]
fn power_up_counter_decrements_once_per_evaluation() {
    let p = params();
    let regs = Registers::reset(&p);
    assert_eq!(regs.state, State::InitWait);
    let s = step(&p, &regs, FULL, &Inputs::read(0));
    assert_eq!(s.outputs.cmd, Command::Nop);
    assert_eq!(s.phase, StateKind::InitWait);
    assert_eq!(s.next.init_ctr, p.init_cycles - 1);
    assert!(!s.admitted);
}

#[test]
fn mode_register_set_drives_the_mode_code() {
    let p = params();
    let s = step(&p, &in_state(&p, State::InitModeSet), QUIET, &Inputs::IDLE);
    assert_eq!(s.outputs.cmd, Command::ModeRegisterSet);
    assert_eq!(s.outputs.a, p.mode_code);
    assert_eq!(
        s.next.state,
        State::Wait(Wait {
            remaining: 2,
            resume: Resume::Idle
        })
    );
}

#[test]
fn second_init_refresh_moves_to_mode_set() {
    let p = params();
    let regs = Registers {
        init_refs: 1,
        ..in_state(&p, State::InitRefresh)
    };
    let s = step(&p, &regs, QUIET, &Inputs::IDLE);
    assert_eq!(s.outputs.cmd, Command::Refresh);
    assert_eq!(s.refresh, Some(RefreshKind::Init));
    assert!(!s.consumes_refresh());
    assert_eq!(
        s.next.state,
        State::Wait(Wait {
            remaining: 5,
            resume: Resume::InitModeSet
        })
    );
}
