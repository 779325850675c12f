//! Request address decomposition.
//!
//! A request address packs three fields, least significant first:
//! `| bank | row | column |`. The controller drives the row and bank on ACTIVATE and
//! the column and bank on READ/WRITE; this type does the slicing.

use serde::{Deserialize, Serialize};

/// Field widths of a packed request address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddrLayout {
    /// Column address bits.
    pub col_bits: u32,
    /// Row address bits.
    pub row_bits: u32,
    /// Bank address bits.
    pub bank_bits: u32,
}

/// A request address split into its column, row and bank fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SdramAddr {
    /// Column within the open row.
    pub col: u32,
    /// Row within the bank.
    pub row: u32,
    /// Bank index.
    pub bank: u32,
}

const fn mask(bits: u32) -> u32 {
    if bits >= 32 { u32::MAX } else { (1 << bits) - 1 }
}

impl AddrLayout {
    /// Total width of a packed request address.
    #[inline]
    pub const fn addr_bits(&self) -> u32 {
        self.col_bits + self.row_bits + self.bank_bits
    }

    /// Mask covering every valid packed address bit.
    #[inline]
    pub const fn addr_mask(&self) -> u32 {
        mask(self.addr_bits())
    }

    /// Number of columns in one row.
    #[inline]
    pub const fn columns(&self) -> u32 {
        1 << self.col_bits
    }

    /// Splits a packed request address. Bits above [`Self::addr_bits`] are ignored.
    pub const fn split(&self, addr: u32) -> SdramAddr {
        SdramAddr {
            col: addr & mask(self.col_bits),
            row: (addr >> self.col_bits) & mask(self.row_bits),
            bank: (addr >> (self.col_bits + self.row_bits)) & mask(self.bank_bits),
        }
    }

    /// Packs the fields back into a request address. Oversized fields are truncated.
    pub const fn join(&self, addr: SdramAddr) -> u32 {
        (addr.col & mask(self.col_bits))
            | ((addr.row & mask(self.row_bits)) << self.col_bits)
            | ((addr.bank & mask(self.bank_bits)) << (self.col_bits + self.row_bits))
    }
}
