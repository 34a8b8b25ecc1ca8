use std::io::Cursor;

use mch_write::MchWrite;
use modular_bitfield::prelude::*;

#[bitfield(bits = 16)]
#[derive(Debug, Clone, Copy)]
struct TestFlags {
    low: B4,
    high: B12,
}

mch_write::mch_write_modular_bitfield_impl!(TestFlags, 2);

#[test]
fn write_bitfield_bytes() {
    let flags = TestFlags::new().with_low(0xA).with_high(0x123);

    let mut writer = Cursor::new(Vec::new());
    flags.mch_write(&mut writer).unwrap();

    assert_eq!(vec![0x3A, 0x12], writer.into_inner());
    assert_eq!(2, flags.size_in_bytes());
}
