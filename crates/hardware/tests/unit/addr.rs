//! Request address layout tests.
//!
//! Property checks for packing and slicing across every legal geometry.

use proptest::prelude::*;
use sdrctl_core::common::{AddrLayout, SdramAddr};

fn layouts() -> impl Strategy<Value = AddrLayout> {
    (1u32..=10, 1u32..=12, 0u32..=2).prop_map(|(col_bits, row_bits, bank_bits)| AddrLayout {
        col_bits,
        row_bits,
        bank_bits,
    })
}

proptest! {
    #[test]
    fn join_inverts_split(layout in layouts(), addr in any::<u32>()) {
        let masked = addr & layout.addr_mask();
        prop_assert_eq!(layout.join(layout.split(addr)), masked);
    }

    #[test]
    fn split_fields_fit_their_widths(layout in layouts(), addr in any::<u32>()) {
        let a = layout.split(addr);
        prop_assert!(a.col < 1 << layout.col_bits);
        prop_assert!(a.row < 1 << layout.row_bits);
        prop_assert!(a.bank < 1 << layout.bank_bits);
    }
}

#[test]
fn default_part_layout() {
    let layout = AddrLayout {
        col_bits: 8,
        row_bits: 12,
        bank_bits: 2,
    };
    assert_eq!(layout.addr_bits(), 22);
    assert_eq!(layout.columns(), 256);
    let addr = layout.join(SdramAddr {
        col: 0x21,
        row: 0x123,
        bank: 1,
    });
    assert_eq!(addr, 0x21 | (0x123 << 8) | (1 << 20));
}
