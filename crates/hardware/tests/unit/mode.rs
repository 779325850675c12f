//! Mode register tests.

use rstest::rstest;
use sdrctl_core::common::ConfigError;
use sdrctl_core::config::ModeConfig;
use sdrctl_core::controller::mode::{BurstLength, CasLatency, Mode};

#[rstest]
#[case(1, false, 2, 0x020)]
#[case(2, false, 2, 0x021)]
#[case(4, true, 3, 0x03A)]
#[case(8, false, 3, 0x033)]
#[case(0, false, 2, 0x027)]
fn encodes_jedec_layout(
    #[case] burst_length: u32,
    #[case] burst_interleaved: bool,
    #[case] cas_latency: u32,
    #[case] expected: u16,
) {
    let mode = Mode::from_config(&ModeConfig {
        burst_length,
        burst_interleaved,
        cas_latency,
    })
    .unwrap();
    assert_eq!(mode.encode(), expected);
    assert_eq!(Mode::decode(expected), Some(mode));
}

#[test]
fn burst_words_follow_column_count_for_full_page() {
    assert_eq!(BurstLength::Eight.words(8), 8);
    assert_eq!(BurstLength::FullPage.words(8), 256);
    assert_eq!(BurstLength::FullPage.words(10), 1024);
    assert_eq!(CasLatency::Three.cycles(), 3);
}

#[test]
fn rejects_unsupported_fields() {
    let raw = ModeConfig {
        burst_length: 16,
        burst_interleaved: false,
        cas_latency: 2,
    };
    assert_eq!(
        Mode::from_config(&raw),
        Err(ConfigError::UnsupportedBurstLength(16))
    );
    let raw = ModeConfig {
        burst_length: 1,
        burst_interleaved: false,
        cas_latency: 1,
    };
    assert_eq!(
        Mode::from_config(&raw),
        Err(ConfigError::UnsupportedCasLatency(1))
    );
}
