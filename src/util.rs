pub(crate) mod bits;

pub(crate) const fn u8_fits_n_bits(value: u8, nbits: usize) -> bool {
    let max_value = if nbits < 8 { (1 << nbits) - 1 } else { u8::MAX };
    value <= max_value
}

pub(crate) const fn u16_fits_n_bits(value: u16, nbits: usize) -> bool {
    let max_value = if nbits < 16 {
        (1 << nbits) - 1
    } else {
        u16::MAX
    };
    value <= max_value
}

pub(crate) const fn u32_fits_n_bits(value: u32, nbits: usize) -> bool {
    let max_value = if nbits < 32 {
        (1 << nbits) - 1
    } else {
        u32::MAX
    };
    value <= max_value
}

pub(crate) const fn usize_fits_n_bits(value: usize, nbits: usize) -> bool {
    let max_value = if nbits < usize::BITS as usize {
        (1 << nbits) - 1
    } else {
        usize::MAX
    };
    value <= max_value
}

pub(crate) const fn i8_fits_n_bits(value: i8, nbits: usize) -> bool {
    let (min, max) = if nbits < 8 {
        (-(1 << (nbits - 1)), (1 << (nbits - 1)) - 1)
    } else {
        (i8::MIN, i8::MAX)
    };
    value >= min && value <= max
}

pub(crate) const fn i16_fits_n_bits(value: i16, nbits: usize) -> bool {
    let (min, max) = if nbits < 15 {
        (-(1 << (nbits - 1)), (1 << (nbits - 1)) - 1)
    } else {
        (i16::MIN, i16::MAX)
    };
    value >= min && value <= max
}

pub(crate) const fn i32_fits_n_bits(value: i32, nbits: usize) -> bool {
    let (min, max) = if nbits < 31 {
        (-(1 << (nbits - 1)), (1 << (nbits - 1)) - 1)
    } else {
        (i32::MIN, i32::MAX)
    };
    value >= min && value <= max
}

#[test]
fn unsigned_fits() {
    assert!(u8_fits_n_bits(15, 4));
    assert!(!u8_fits_n_bits(16, 4));
    assert!(u16_fits_n_bits(255, 8));
    assert!(!u16_fits_n_bits(256, 8));
    assert!(u32_fits_n_bits(0xFFFF, 16));
    assert!(!u32_fits_n_bits(0x1_0000, 16));
    assert!(usize_fits_n_bits(15, 4));
    assert!(!usize_fits_n_bits(16, 4));
}

#[test]
fn signed_fits() {
    assert!(i8_fits_n_bits(-8, 4));
    assert!(i8_fits_n_bits(7, 4));
    assert!(!i8_fits_n_bits(8, 4));
    assert!(!i8_fits_n_bits(-9, 4));
    assert!(i16_fits_n_bits(-128, 8));
    assert!(i16_fits_n_bits(127, 8));
    assert!(!i16_fits_n_bits(128, 8));
    assert!(i32_fits_n_bits(-128, 8));
    assert!(!i32_fits_n_bits(-129, 8));
}
