//! Device and Controller Constants.
//!
//! This module defines constants shared by the controller, the device model and the
//! verification harness. It includes:
//! 1. **Pin Widths:** Address and bank bus widths of the SDR SDRAM command interface.
//! 2. **Initialization:** The mandatory refresh count of the power-up sequence.
//! 3. **Admission Counter:** Default slack biases around the refresh backlog.

/// Width of the multiplexed row/column address bus in bits (A0..A11).
pub const ADDR_BUS_BITS: u32 = 12;

/// Mask for the multiplexed address bus.
pub const ADDR_BUS_MASK: u16 = (1 << ADDR_BUS_BITS) - 1;

/// Bit position of A10, the auto-precharge / precharge-all flag.
pub const A10_BIT: u32 = 10;

/// Width of the bank address bus in bits (BA0..BA1).
pub const BANK_BUS_BITS: u32 = 2;

/// Mask for the bank address bus.
pub const BANK_BUS_MASK: u8 = (1 << BANK_BUS_BITS) - 1;

/// Number of AUTO REFRESH commands the device requires between PRECHARGE ALL and
/// MODE REGISTER SET during power-up.
pub const MIN_INIT_REFRESHES: u32 = 2;

/// Default refresh backlog the controller tolerates before refresh pre-empts traffic.
pub const DEFAULT_REF_MAX_PENDING: u32 = 9;

/// Default slack below the empty backlog level.
///
/// Absorbs removals that are still in flight when the backlog already reads empty.
pub const DEFAULT_SLACK_LO: u32 = 2;

/// Default slack above the full backlog level for a free-standing counter.
pub const DEFAULT_SLACK_HI: u32 = 2;

/// Slack above the full backlog level used by the controller.
///
/// Larger than the free-standing default because a transaction that was admitted just
/// before the backlog turned full runs to completion before refresh can be issued.
pub const CONTROLLER_SLACK_HI: u32 = 4;

/// Longest device delay, power-up wait included, accepted from a configuration.
pub const MAX_TIMING_CYCLES: u32 = 1 << 24;

/// Largest refresh backlog tolerance accepted from a configuration.
pub const MAX_REF_PENDING: u32 = 1 << 16;

/// Widest data bus the model supports (one `u64` per word).
pub const MAX_WORD_BITS: u32 = 64;

/// Widest column address: A10 is reserved for auto-precharge during column commands.
pub const MAX_COL_BITS: u32 = A10_BIT;
