//! Device model tests.
//!
//! Hand-written command sequences checked against the power-up, timing, row and data
//! bus rules.

use pretty_assertions::assert_eq;
use rstest::rstest;
use sdrctl_core::common::{ProtocolViolation, SdramAddr};
use sdrctl_core::controller::command::Command;
use sdrctl_core::controller::signals::Outputs;
use sdrctl_core::device::{InitStage, burst_column};

use crate::common::device_driver::{DeviceDriver, pins};
use crate::common::harness::{scenario_c_config, timing_config};

fn ready() -> DeviceDriver {
    let mut drv = DeviceDriver::new(&scenario_c_config());
    drv.init().unwrap();
    drv
}

// ══════════════════════════════════════════════════════════
// 1. Power-up
// ══════════════════════════════════════════════════════════

#[test]
fn tightest_legal_power_up_is_accepted() {
    let drv = ready();
    assert_eq!(drv.device.stage(), InitStage::Ready);
    assert!(drv.device.mode().is_some());
    assert_eq!(drv.device.open_row(), None);
}

#[test]
fn command_before_power_up_wait() {
    let mut drv = DeviceDriver::new(&scenario_c_config());
    drv.nop(19).unwrap();
    assert_eq!(
        drv.issue(Command::PrechargeAll, 0, 0),
        Err(ProtocolViolation::InitTooEarly {
            command: Command::PrechargeAll,
            cycle: 19,
            required: 20,
        })
    );
}

#[test]
fn refresh_before_precharge_all() {
    let mut drv = DeviceDriver::new(&scenario_c_config());
    drv.nop(20).unwrap();
    assert!(matches!(
        drv.issue(Command::Refresh, 0, 0),
        Err(ProtocolViolation::InitSequence {
            command: Command::Refresh,
            ..
        })
    ));
}

#[test]
fn mode_register_set_needs_two_refreshes() {
    let mut drv = DeviceDriver::new(&scenario_c_config());
    drv.nop(20).unwrap();
    drv.issue(Command::PrechargeAll, 0, 0).unwrap();
    drv.issue(Command::Refresh, 0, 0).unwrap();
    drv.nop(4).unwrap();
    assert_eq!(drv.device.stage(), InitStage::Refreshing(1));
    assert!(matches!(
        drv.issue(Command::ModeRegisterSet, 0x020, 0),
        Err(ProtocolViolation::InitSequence {
            command: Command::ModeRegisterSet,
            ..
        })
    ));
}

#[test]
fn traffic_before_mode_register_set() {
    let mut drv = DeviceDriver::new(&scenario_c_config());
    drv.nop(20).unwrap();
    assert_eq!(
        drv.issue(Command::Activate, 1, 0),
        Err(ProtocolViolation::NotInitialized {
            command: Command::Activate,
            cycle: 20,
        })
    );
}

#[test]
fn reserved_mode_register_value() {
    let mut drv = DeviceDriver::new(&scenario_c_config());
    drv.nop(20).unwrap();
    drv.issue(Command::PrechargeAll, 0, 0).unwrap();
    drv.issue(Command::Refresh, 0, 0).unwrap();
    drv.nop(4).unwrap();
    drv.issue(Command::Refresh, 0, 0).unwrap();
    drv.nop(4).unwrap();
    assert_eq!(
        drv.issue(Command::ModeRegisterSet, 0x025, 0),
        Err(ProtocolViolation::InvalidModeRegister {
            cycle: 31,
            value: 0x025
        })
    );
}

// ══════════════════════════════════════════════════════════
// 2. Timing and row rules
// ══════════════════════════════════════════════════════════

#[test]
fn activate_inside_trc() {
    let mut drv = ready();
    let at = drv.device.cycle();
    drv.issue(Command::Refresh, 0, 0).unwrap();
    drv.nop(3).unwrap();
    assert_eq!(
        drv.issue(Command::Activate, 0, 0),
        Err(ProtocolViolation::TimingViolated {
            command: Command::Activate,
            cycle: at + 4,
            ready_at: at + 5,
            constraint: "tRC",
        })
    );
}

#[test]
fn precharge_inside_tras() {
    let mut drv = ready();
    let at = drv.device.cycle();
    drv.issue(Command::Activate, 7, 1).unwrap();
    drv.nop(2).unwrap();
    assert_eq!(
        drv.issue(Command::Precharge, 0, 1),
        Err(ProtocolViolation::TimingViolated {
            command: Command::Precharge,
            cycle: at + 3,
            ready_at: at + 5,
            constraint: "tRAS",
        })
    );
}

#[test]
fn second_activate_while_row_open() {
    let mut drv = ready();
    drv.issue(Command::Activate, 7, 1).unwrap();
    drv.nop(1).unwrap();
    assert!(matches!(
        drv.issue(Command::Activate, 8, 2),
        Err(ProtocolViolation::RowAlreadyOpen {
            bank: 2,
            open_bank: 1,
            open_row: 7,
            ..
        })
    ));
}

#[test]
fn refresh_while_row_open() {
    let mut drv = ready();
    drv.issue(Command::Activate, 7, 1).unwrap();
    drv.nop(1).unwrap();
    assert!(matches!(
        drv.issue(Command::Refresh, 0, 0),
        Err(ProtocolViolation::RowOpen {
            command: Command::Refresh,
            ..
        })
    ));
}

#[test]
fn column_command_rules() {
    let mut drv = ready();
    assert!(matches!(
        drv.issue(Command::ReadAutoPrecharge, 0, 0),
        Err(ProtocolViolation::NoOpenRow { .. })
    ));

    let mut drv = ready();
    drv.issue(Command::Activate, 7, 1).unwrap();
    drv.nop(1).unwrap();
    assert!(matches!(
        drv.issue(Command::ReadAutoPrecharge, 0, 2),
        Err(ProtocolViolation::BankMismatch {
            bank: 2,
            open_bank: 1,
            ..
        })
    ));

    let mut drv = ready();
    drv.issue(Command::Activate, 7, 1).unwrap();
    assert!(matches!(
        drv.issue(Command::ReadAutoPrecharge, 0, 1),
        Err(ProtocolViolation::TimingViolated {
            constraint: "tRCD",
            ..
        })
    ));
}

#[test]
fn auto_precharge_closes_the_row() {
    let mut drv = ready();
    let at = drv.device.cycle();
    drv.issue(Command::Activate, 7, 1).unwrap();
    drv.nop(1).unwrap();
    drv.issue(Command::ReadAutoPrecharge, 0, 1).unwrap();
    assert_eq!(drv.device.open_row(), None);
    drv.nop(1).unwrap();
    assert!(matches!(
        drv.issue(Command::Activate, 7, 1),
        Err(ProtocolViolation::TimingViolated { ready_at, .. }) if ready_at == at + 5
    ));
}

// ══════════════════════════════════════════════════════════
// 3. Data path
// ══════════════════════════════════════════════════════════

#[test]
fn read_word_appears_cas_latency_after_read() {
    let mut drv = ready();
    drv.device.poke(
        SdramAddr {
            col: 5,
            row: 3,
            bank: 1,
        },
        0xBEEF,
    );
    drv.issue(Command::Activate, 3, 1).unwrap();
    drv.nop(1).unwrap();
    drv.issue(Command::ReadAutoPrecharge, 5, 1).unwrap();
    assert_eq!(drv.device.dq(), None);
    drv.nop(1).unwrap();
    assert_eq!(drv.device.dq(), Some(0xBEEF));
    drv.nop(1).unwrap();
    assert_eq!(drv.device.dq(), None);
}

#[test]
fn write_beat_without_data_enable() {
    let mut drv = ready();
    drv.issue(Command::Activate, 3, 1).unwrap();
    drv.nop(1).unwrap();
    let cycle = drv.device.cycle();
    assert_eq!(
        drv.issue(Command::WriteAutoPrecharge, 5, 1),
        Err(ProtocolViolation::MissingWriteData { cycle, beat: 0 })
    );
}

#[test]
fn write_stores_masked_data() {
    let mut drv = ready();
    drv.issue(Command::Activate, 3, 1).unwrap();
    drv.nop(1).unwrap();
    drv.clk(Outputs {
        data_en: true,
        wr_data: 0x1_2345,
        ..pins(Command::WriteAutoPrecharge, 5, 1)
    })
    .unwrap();
    let stored = drv.device.peek(SdramAddr {
        col: 5,
        row: 3,
        bank: 1,
    });
    assert_eq!(stored, 0x2345);
}

#[test]
fn controller_driving_while_device_drives() {
    let mut drv = ready();
    drv.issue(Command::Activate, 3, 1).unwrap();
    drv.nop(1).unwrap();
    drv.issue(Command::ReadAutoPrecharge, 5, 1).unwrap();
    drv.nop(1).unwrap();
    let cycle = drv.device.cycle();
    assert_eq!(
        drv.clk(Outputs {
            data_en: true,
            ..Outputs::NOP
        }),
        Err(ProtocolViolation::BusConflict { cycle })
    );
}

#[test]
fn interleaved_burst_writes_in_mode_order() {
    let mut config = timing_config(2, 5, 3, 4);
    config.mode.burst_interleaved = true;
    let mut drv = DeviceDriver::new(&config);
    drv.init().unwrap();
    drv.issue(Command::Activate, 9, 0).unwrap();
    drv.nop(1).unwrap();
    for beat in 0..4u64 {
        let cmd = if beat == 0 {
            pins(Command::WriteAutoPrecharge, 6, 0)
        } else {
            Outputs::NOP
        };
        drv.clk(Outputs {
            data_en: true,
            wr_data: 100 + beat,
            ..cmd
        })
        .unwrap();
    }
    let cols: Vec<u64> = (4..8)
        .map(|col| drv.device.peek(SdramAddr { col, row: 9, bank: 0 }))
        .collect();
    // Start 6, interleaved: 6, 7, 4, 5.
    assert_eq!(cols, [102, 103, 100, 101]);
}

#[rstest]
#[case::seq4(1, 4, false, vec![1, 2, 3, 0])]
#[case::int4(1, 4, true, vec![1, 0, 3, 2])]
#[case::seq8(5, 8, false, vec![5, 6, 7, 0, 1, 2, 3, 4])]
#[case::int8(5, 8, true, vec![5, 4, 7, 6, 1, 0, 3, 2])]
#[case::seq2_upper_block(13, 2, false, vec![13, 12])]
fn burst_order(
    #[case] start: u32,
    #[case] len: u32,
    #[case] interleaved: bool,
    #[case] expected: Vec<u32>,
) {
    let cols: Vec<u32> = (0..len)
        .map(|beat| burst_column(start, beat, len, 256, interleaved))
        .collect();
    assert_eq!(cols, expected);
}

#[test]
fn full_page_burst_wraps_around_the_row() {
    let cols: Vec<u32> = (0..4).map(|beat| burst_column(254, beat, 256, 256, false)).collect();
    assert_eq!(cols, [254, 255, 0, 1]);
}
