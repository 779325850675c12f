//! Statistics tests.

use sdrctl_core::controller::command::Command;
use sdrctl_core::controller::fsm::RefreshKind;
use sdrctl_core::stats::ControllerStats;

#[test]
fn counters_start_at_zero() {
    let stats = ControllerStats::default();
    assert_eq!(stats.cycles, 0);
    assert!(stats.commands.iter().all(|&c| c == 0));
    assert_eq!(stats.avg_admission_latency(), 0.0);
}

#[test]
fn commands_are_counted_by_kind() {
    let mut stats = ControllerStats::default();
    for cmd in [Command::Activate, Command::Nop, Command::Activate, Command::Refresh] {
        stats.record_command(cmd);
    }
    assert_eq!(stats.command_count(Command::Activate), 2);
    assert_eq!(stats.command_count(Command::Refresh), 1);
    assert_eq!(stats.command_count(Command::ModeRegisterSet), 0);
    assert_eq!(stats.commands.iter().sum::<u64>(), 4);
}

#[test]
fn refreshes_are_counted_by_cause() {
    let mut stats = ControllerStats::default();
    stats.record_refresh(RefreshKind::Init);
    stats.record_refresh(RefreshKind::Init);
    stats.record_refresh(RefreshKind::Forced);
    stats.record_refresh(RefreshKind::Opportunistic);
    stats.record_refresh(RefreshKind::Opportunistic);
    stats.record_refresh(RefreshKind::Opportunistic);
    assert_eq!(
        (stats.refresh_init, stats.refresh_forced, stats.refresh_opportunistic),
        (2, 1, 3)
    );
}

#[test]
fn admission_latency_mean_and_max() {
    let mut stats = ControllerStats::default();
    for latency in [0, 4, 11] {
        stats.record_admission(latency);
    }
    assert_eq!(stats.admissions, 3);
    assert_eq!(stats.admission_latency_max, 11);
    assert!((stats.avg_admission_latency() - 5.0).abs() < f64::EPSILON);
}

#[test]
fn serializes_without_host_timing() {
    let mut stats = ControllerStats::default();
    stats.cycles = 12;
    let json = serde_json::to_value(&stats).unwrap();
    assert_eq!(json["cycles"], 12);
    assert!(json.get("start_time").is_none());
    assert_eq!(json["commands"].as_array().map(Vec::len), Some(Command::ALL.len()));
}

#[test]
fn report_sections_print() {
    let mut stats = ControllerStats::default();
    stats.cycles = 100;
    stats.record_command(Command::Refresh);
    stats.print_sections(&["refresh".to_string(), "unknown".to_string()]);
    stats.print();
}
