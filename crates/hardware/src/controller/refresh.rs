//! Refresh admission counter.
//!
//! Tracks refresh obligations that have accrued but not been issued yet, and tells the
//! state machine when refresh may be slipped in opportunistically (`any_pending`) and
//! when it must pre-empt foreground traffic (`is_full`).
//!
//! The backlog is stored with a bias so the "empty" level sits above zero:
//!
//! ```text
//! 0 ........ bias_lo ........ bias_lo + max_pending ........ + bias_hi
//! floor      empty            full                           ceiling
//! ```
//!
//! An accrual lands one cycle after the timer expires. A removal lands one cycle later
//! than that: two cycles after it was requested. The slack below `empty` absorbs
//! removals requested while earlier ones are still in flight; the slack above `full`
//! absorbs accruals that arrive before a forced refresh can be issued.
//!
//! Removing at the floor and accruing at the ceiling are contract violations of the
//! caller. They are checked with debug assertions and reported by
//! [`RefreshCounter::check_contract`] for exhaustive exploration.

use thiserror::Error;

use crate::common::constants::{DEFAULT_SLACK_HI, DEFAULT_SLACK_LO};

/// Contract violation the next clock edge would commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CounterFault {
    /// A removal would be applied to a backlog already at the floor.
    #[error("refresh backlog underflow: removal applied at the floor")]
    Underflow,
    /// An accrual would be applied to a backlog already at the ceiling.
    #[error("refresh backlog overflow: accrual applied at the ceiling")]
    Overflow,
}

/// Pending-obligation counter for periodic refresh.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RefreshCounter {
    period: u32,
    max_pending: u32,
    bias_lo: u32,
    bias_hi: u32,

    timer: u32,
    pending: u32,
    /// Accrual scheduled for the next edge.
    accrue: bool,
    /// Removal pipeline: `[requested last edge, lands next edge]`.
    remove: [bool; 2],
    /// Removal requested during the current cycle.
    remove_req: bool,
}

impl RefreshCounter {
    /// Creates a counter with the default slack on both sides.
    ///
    /// # Arguments
    ///
    /// * `period` - Cycles between obligations.
    /// * `max_pending` - Backlog at which refresh becomes mandatory.
    pub fn new(period: u32, max_pending: u32) -> Self {
        Self::with_slack(period, max_pending, DEFAULT_SLACK_LO, DEFAULT_SLACK_HI)
    }

    /// Creates a counter with explicit slack below the empty level and above the full
    /// level.
    pub fn with_slack(period: u32, max_pending: u32, slack_lo: u32, slack_hi: u32) -> Self {
        debug_assert!(period > 0, "refresh period must be non-zero");
        Self {
            period,
            max_pending,
            bias_lo: slack_lo,
            bias_hi: slack_hi,
            timer: 0,
            pending: slack_lo,
            accrue: false,
            remove: [false; 2],
            remove_req: false,
        }
    }

    /// Requests removal of one obligation; it lands two edges later.
    ///
    /// Callers must only request removal while [`Self::any_pending`] holds.
    #[inline]
    pub fn request_remove(&mut self) {
        self.remove_req = true;
    }

    /// Advances one clock edge.
    ///
    /// Applies the scheduled accrual and the removal requested two edges ago, shifts the
    /// removal pipeline and advances the period timer.
    pub fn tick(&mut self) {
        debug_assert_eq!(self.check_contract(), Ok(()), "{self:?}");

        let was_full = self.is_full();
        if self.accrue {
            self.pending += 1;
        }
        if self.remove[1] {
            self.pending -= 1;
        }
        if self.accrue || self.remove[1] {
            tracing::trace!(backlog = self.outstanding(), raw = self.pending, "refresh backlog");
        }
        if !was_full && self.is_full() {
            tracing::warn!(
                backlog = self.outstanding(),
                "refresh backlog full; refresh pre-empts traffic"
            );
        }

        self.remove = [self.remove_req, self.remove[0]];
        self.remove_req = false;

        self.accrue = false;
        self.timer += 1;
        if self.timer == self.period {
            self.timer = 0;
            self.accrue = true;
        }
    }

    /// Reports the contract violation the next [`Self::tick`] would commit, if any.
    pub const fn check_contract(&self) -> Result<(), CounterFault> {
        if self.remove[1] && self.pending == 0 {
            return Err(CounterFault::Underflow);
        }
        if self.accrue && self.pending == self.ceiling() {
            return Err(CounterFault::Overflow);
        }
        Ok(())
    }

    /// At least one obligation is outstanding.
    #[inline]
    pub const fn any_pending(&self) -> bool {
        self.pending > self.bias_lo
    }

    /// The backlog reached the configured tolerance; refresh must be forced.
    #[inline]
    pub const fn is_full(&self) -> bool {
        self.pending >= self.full_level()
    }

    /// Raw biased backlog.
    #[inline]
    pub const fn backlog(&self) -> u32 {
        self.pending
    }

    /// Outstanding obligations (zero while inside the lower slack).
    #[inline]
    pub const fn outstanding(&self) -> u32 {
        self.pending.saturating_sub(self.bias_lo)
    }

    /// Raw value read as "no obligations".
    #[inline]
    pub const fn empty_level(&self) -> u32 {
        self.bias_lo
    }

    /// Raw value at which refresh becomes mandatory.
    #[inline]
    pub const fn full_level(&self) -> u32 {
        self.max_pending + self.bias_lo
    }

    /// Largest representable raw value.
    #[inline]
    pub const fn ceiling(&self) -> u32 {
        self.full_level() + self.bias_hi
    }

    /// Cycles since the last obligation accrued.
    #[inline]
    pub const fn timer(&self) -> u32 {
        self.timer
    }

    /// Cycles between obligations.
    #[inline]
    pub const fn period(&self) -> u32 {
        self.period
    }

    /// An accrual is scheduled for the next edge.
    #[inline]
    pub const fn accrual_scheduled(&self) -> bool {
        self.accrue
    }

    /// Removals requested but not yet applied, including one requested this cycle.
    #[inline]
    pub const fn removals_in_flight(&self) -> u32 {
        self.remove_req as u32 + self.remove[0] as u32 + self.remove[1] as u32
    }
}
