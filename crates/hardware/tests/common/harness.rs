use sdrctl_core::config::{Config, TimingConfig};
use sdrctl_core::controller::command::Command;
use sdrctl_core::controller::signals::Inputs;
use sdrctl_core::controller::{SdramController, Tick};
use tracing_subscriber::EnvFilter;

/// Installs a test-writer subscriber once; `RUST_LOG` selects verbosity.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

/// `c_init = 20` with a longest delay of 5 cycles, so the power-up counter starts at 5.
pub fn scenario_c_config() -> Config {
    let mut config = Config::default();
    config.timing = TimingConfig {
        c_init: 20,
        c_cas: 2,
        c_rcd: 2,
        c_ras: 5,
        c_rc: 5,
        c_mrd: 2,
    };
    config.refresh.ref_period = 40;
    config.refresh.ref_max_pending = 3;
    config
}

/// Short power-up and a refresh period long enough to stay out of the way.
pub fn timing_config(c_rcd: u32, c_ras: u32, cas: u32, burst_length: u32) -> Config {
    let mut config = Config::default();
    config.timing = TimingConfig {
        c_init: 10,
        c_cas: cas,
        c_rcd,
        c_ras,
        c_rc: 3,
        c_mrd: 2,
    };
    config.mode.cas_latency = cas;
    config.mode.burst_length = burst_length;
    config.refresh.ref_period = 1_000;
    config
}

/// Small backlog tolerance and a short period so refresh pressure builds quickly.
pub fn pressure_config() -> Config {
    let mut config = scenario_c_config();
    config.refresh.ref_period = 12;
    config.refresh.ref_max_pending = 2;
    config
}

/// Builds a controller and ticks it with no requests until it has been idle once.
pub fn initialized(config: &Config) -> SdramController {
    let mut ctrl = SdramController::new(config).unwrap();
    for _ in 0..100_000 {
        if ctrl.is_initialized() {
            return ctrl;
        }
        let _ = ctrl.tick(&Inputs::IDLE);
    }
    panic!("controller never reached idle");
}

/// Ticks with `inputs` until a tick satisfies `pred`; returns that tick.
pub fn tick_until(
    ctrl: &mut SdramController,
    inputs: &Inputs,
    pred: impl Fn(&Tick) -> bool,
) -> Tick {
    for _ in 0..10_000 {
        let tick = ctrl.tick(inputs);
        if pred(&tick) {
            return tick;
        }
    }
    panic!("condition never met");
}

/// Non-NOP commands in `ticks`, with their cycles.
pub fn commands(ticks: &[Tick]) -> Vec<(u64, Command)> {
    ticks
        .iter()
        .filter(|t| t.outputs.cmd != Command::Nop)
        .map(|t| (t.cycle, t.outputs.cmd))
        .collect()
}
