//! Defines [Imm8] and relevant trait implementations

use core::fmt;
use std::{error::Error, fmt::Display};

use crate::util::{i16_fits_n_bits, i32_fits_n_bits, u16_fits_n_bits, u32_fits_n_bits, usize_fits_n_bits};

/// 8-bit unsigned immediate value, zero-extended to a word by the hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Imm8(pub(crate) u8);

impl Imm8 {
    const NBITS: usize = 8;

    /// Zero
    pub const ZERO: Self = Self(0);

    /// The immediate zero-extended to a 16-bit word
    #[must_use]
    pub const fn into_u16(self) -> u16 {
        self.0 as u16
    }
}

#[test]
fn into_u16() {
    assert_eq!(Imm8(0x42).into_u16(), 0x0042);
}

impl Display for Imm8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

#[test]
fn imm8_display() {
    assert_eq!(Imm8(0x05).to_string(), "0x05");
    assert_eq!(Imm8(0xFF).to_string(), "0xFF");
}

impl From<u8> for Imm8 {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl TryFrom<u16> for Imm8 {
    type Error = Imm8ConvError;

    #[allow(clippy::cast_possible_truncation)]
    fn try_from(value: u16) -> Result<Self, Self::Error> {
        if u16_fits_n_bits(value, Self::NBITS) {
            Ok(Self(value as u8))
        } else {
            Err(Imm8ConvError::U16(value))
        }
    }
}

impl TryFrom<u32> for Imm8 {
    type Error = Imm8ConvError;

    #[allow(clippy::cast_possible_truncation)]
    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if u32_fits_n_bits(value, Self::NBITS) {
            Ok(Self(value as u8))
        } else {
            Err(Imm8ConvError::U32(value))
        }
    }
}

impl TryFrom<usize> for Imm8 {
    type Error = Imm8ConvError;

    #[allow(clippy::cast_possible_truncation)]
    fn try_from(value: usize) -> Result<Self, Self::Error> {
        if usize_fits_n_bits(value, Self::NBITS) {
            Ok(Self(value as u8))
        } else {
            Err(Imm8ConvError::Usize(value))
        }
    }
}

impl TryFrom<i16> for Imm8 {
    type Error = Imm8ConvError;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn try_from(value: i16) -> Result<Self, Self::Error> {
        if value >= 0 && i16_fits_n_bits(value, Self::NBITS + 1) {
            Ok(Self(value as u8))
        } else {
            Err(Imm8ConvError::I16(value))
        }
    }
}

impl TryFrom<i32> for Imm8 {
    type Error = Imm8ConvError;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn try_from(value: i32) -> Result<Self, Self::Error> {
        if value >= 0 && i32_fits_n_bits(value, Self::NBITS + 1) {
            Ok(Self(value as u8))
        } else {
            Err(Imm8ConvError::I32(value))
        }
    }
}

#[test]
fn conversions_from() {
    assert_eq!(Imm8::from(255_u8), Imm8(255));
    assert_eq!(Imm8::try_from(255_u16), Ok(Imm8(255)));
    assert_eq!(Imm8::try_from(255_u32), Ok(Imm8(255)));
    assert_eq!(Imm8::try_from(255_usize), Ok(Imm8(255)));
    assert_eq!(Imm8::try_from(255_i16), Ok(Imm8(255)));
    assert_eq!(Imm8::try_from(255_i32), Ok(Imm8(255)));

    assert!(matches!(
        Imm8::try_from(256_u16),
        Err(Imm8ConvError::U16(256))
    ));
    assert!(matches!(
        Imm8::try_from(256_u32),
        Err(Imm8ConvError::U32(256))
    ));
    assert!(matches!(
        Imm8::try_from(256_usize),
        Err(Imm8ConvError::Usize(256))
    ));
    assert!(matches!(
        Imm8::try_from(-1_i16),
        Err(Imm8ConvError::I16(-1))
    ));
    assert!(matches!(
        Imm8::try_from(256_i32),
        Err(Imm8ConvError::I32(256))
    ));
}

impl From<Imm8> for u8 {
    fn from(imm: Imm8) -> Self {
        imm.0
    }
}

impl From<Imm8> for u16 {
    fn from(imm: Imm8) -> Self {
        From::from(imm.0)
    }
}

impl From<Imm8> for u32 {
    fn from(imm: Imm8) -> Self {
        From::from(imm.0)
    }
}

#[test]
fn conversions_into() {
    assert_eq!(Into::<u8>::into(Imm8(0x42)), 0x42);
    assert_eq!(Into::<u16>::into(Imm8(0x42)), 0x42);
    assert_eq!(Into::<u32>::into(Imm8(0x42)), 0x42);
}

/// `Imm8` conversion error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Imm8ConvError {
    ///
    U16(u16),
    ///
    U32(u32),
    ///
    Usize(usize),
    ///
    I16(i16),
    ///
    I32(i32),
}

impl Display for Imm8ConvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Imm8ConvError::U16(value) => write!(f, "invalid 8-bit immediate: {value}"),
            Imm8ConvError::U32(value) => write!(f, "invalid 8-bit immediate: {value}"),
            Imm8ConvError::Usize(value) => write!(f, "invalid 8-bit immediate: {value}"),
            Imm8ConvError::I16(value) => write!(f, "invalid 8-bit immediate: {value}"),
            Imm8ConvError::I32(value) => write!(f, "invalid 8-bit immediate: {value}"),
        }
    }
}

impl Error for Imm8ConvError {}

#[test]
fn conv_error_impl_display() {
    assert_eq!(
        Imm8::try_from(256_u16).unwrap_err().to_string(),
        "invalid 8-bit immediate: 256"
    );
    assert_eq!(
        Imm8::try_from(-1_i16).unwrap_err().to_string(),
        "invalid 8-bit immediate: -1"
    );
}
