//! Pseudo-random traffic.
//!
//! A xorshift generator producing a reproducible mix of reads and writes. Reads are
//! biased toward recently written addresses so that read-back comparisons see real
//! data rather than the zero fill of untouched locations.

use super::simulator::Transaction;
use crate::common::AddrLayout;

const DEFAULT_SEED: u64 = 123456789;
const RECENT_WRITES: usize = 16;

/// Deterministic transaction stream.
#[derive(Clone, Debug)]
pub struct TrafficGenerator {
    state: u64,
    addr_mask: u32,
    word_mask: u64,
    burst_words: usize,
    /// Writes per 1024 transactions.
    write_share: u64,
    recent: Vec<u32>,
}

impl TrafficGenerator {
    /// Creates a generator.
    ///
    /// # Arguments
    ///
    /// * `seed` - Generator seed; zero selects a fixed non-zero default.
    /// * `layout` - Address layout; generated addresses stay inside it.
    /// * `word_bits` - Data word width.
    /// * `burst_words` - Words per write burst.
    /// * `write_ratio` - Fraction of writes, clamped to `0.0..=1.0`.
    pub fn new(
        seed: u64,
        layout: AddrLayout,
        word_bits: u32,
        burst_words: u32,
        write_ratio: f64,
    ) -> Self {
        let write_share = (write_ratio.clamp(0.0, 1.0) * 1024.0).round() as u64;
        Self {
            state: if seed == 0 { DEFAULT_SEED } else { seed },
            addr_mask: layout.addr_mask(),
            word_mask: if word_bits >= 64 {
                u64::MAX
            } else {
                (1 << word_bits) - 1
            },
            burst_words: burst_words as usize,
            write_share,
            recent: Vec::with_capacity(RECENT_WRITES),
        }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Produces the next transaction.
    pub fn next_transaction(&mut self) -> Transaction {
        let roll = self.next_u64();
        if roll % 1024 < self.write_share {
            let addr = (self.next_u64() as u32) & self.addr_mask;
            let data = (0..self.burst_words)
                .map(|_| self.next_u64() & self.word_mask)
                .collect();
            if self.recent.len() == RECENT_WRITES {
                let _ = self.recent.remove(0);
            }
            self.recent.push(addr);
            Transaction::Write { addr, data }
        } else {
            let pick = self.next_u64();
            let addr = if !self.recent.is_empty() && pick & 1 == 0 {
                self.recent[(pick >> 1) as usize % self.recent.len()]
            } else {
                (pick >> 1) as u32 & self.addr_mask
            };
            Transaction::Read { addr }
        }
    }
}

impl Iterator for TrafficGenerator {
    type Item = Transaction;

    fn next(&mut self) -> Option<Transaction> {
        Some(self.next_transaction())
    }
}
