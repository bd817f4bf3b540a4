//! Defines [Off8] and relevant trait implementations

use core::fmt;
use std::{error::Error, fmt::Display};

use crate::util::{i16_fits_n_bits, i32_fits_n_bits};

/// 8-bit signed PC-relative offset, sign-extended to a word by the hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Off8(pub(crate) i8);

impl Off8 {
    const NBITS: usize = 8;

    /// Zero
    pub const ZERO: Self = Self(0);

    /// The offset sign-extended to a 16-bit word
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub const fn as_word(self) -> u16 {
        self.0 as i16 as u16
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub(crate) const fn from_byte(bits: u16) -> Self {
        Self((bits & 0xFF) as u8 as i8)
    }

    #[allow(clippy::cast_sign_loss)]
    pub(crate) const fn into_byte(self) -> u16 {
        (self.0 as u16) & 0xFF
    }
}

#[test]
fn as_word() {
    assert_eq!(Off8(127).as_word(), 0x007F);
    assert_eq!(Off8(-3).as_word(), 0xFFFD);
    assert_eq!(Off8(-128).as_word(), 0xFF80);
}

#[test]
fn byte_round_trip() {
    for value in i8::MIN..=i8::MAX {
        let off = Off8(value);
        assert_eq!(Off8::from_byte(off.into_byte()), off);
    }
}

impl Display for Off8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

#[test]
fn off8_display() {
    assert_eq!(Off8(-3).to_string(), "-3");
    assert_eq!(Off8(127).to_string(), "127");
}

impl From<i8> for Off8 {
    fn from(value: i8) -> Self {
        Self(value)
    }
}

impl TryFrom<i16> for Off8 {
    type Error = Off8ConvError;

    #[allow(clippy::cast_possible_truncation)]
    fn try_from(value: i16) -> Result<Self, Self::Error> {
        if i16_fits_n_bits(value, Self::NBITS) {
            Ok(Self(value as i8))
        } else {
            Err(Off8ConvError::I16(value))
        }
    }
}

impl TryFrom<i32> for Off8 {
    type Error = Off8ConvError;

    #[allow(clippy::cast_possible_truncation)]
    fn try_from(value: i32) -> Result<Self, Self::Error> {
        if i32_fits_n_bits(value, Self::NBITS) {
            Ok(Self(value as i8))
        } else {
            Err(Off8ConvError::I32(value))
        }
    }
}

#[test]
fn conversions_from() {
    assert_eq!(Off8::from(-128_i8), Off8(-128));
    assert_eq!(Off8::try_from(127_i16), Ok(Off8(127)));
    assert_eq!(Off8::try_from(-3_i32), Ok(Off8(-3)));

    assert!(matches!(
        Off8::try_from(128_i16),
        Err(Off8ConvError::I16(128))
    ));
    assert!(matches!(
        Off8::try_from(-129_i32),
        Err(Off8ConvError::I32(-129))
    ));
}

impl From<Off8> for i8 {
    fn from(off: Off8) -> Self {
        off.0
    }
}

impl From<Off8> for i16 {
    fn from(off: Off8) -> Self {
        From::from(off.0)
    }
}

impl From<Off8> for i32 {
    fn from(off: Off8) -> Self {
        From::from(off.0)
    }
}

#[test]
fn conversions_into() {
    assert_eq!(Into::<i8>::into(Off8(-3)), -3);
    assert_eq!(Into::<i16>::into(Off8(-3)), -3);
    assert_eq!(Into::<i32>::into(Off8(127)), 127);
}

/// `Off8` conversion error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Off8ConvError {
    ///
    I16(i16),
    ///
    I32(i32),
}

impl Display for Off8ConvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Off8ConvError::I16(value) => write!(f, "invalid 8-bit offset: {value}"),
            Off8ConvError::I32(value) => write!(f, "invalid 8-bit offset: {value}"),
        }
    }
}

impl Error for Off8ConvError {}

#[test]
fn conv_error_impl_display() {
    assert_eq!(
        Off8::try_from(128_i16).unwrap_err().to_string(),
        "invalid 8-bit offset: 128"
    );
}
