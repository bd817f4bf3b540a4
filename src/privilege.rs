//! Privilege rings

use core::fmt;
use std::{error::Error, fmt::Display};

/// Numeric privilege level. A smaller ring is more privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Ring {
    /// Ring 0: kernel; protected regions and reality operations
    Kernel,
    /// Ring 1: supervisor; entity and world mutation
    Supervisor,
    /// Ring 2: user; computation and console I/O
    User,
}

impl Ring {
    /// The numeric privilege level
    #[must_use]
    pub const fn level(self) -> u8 {
        self as u8
    }
}

#[test]
fn levels() {
    assert_eq!(Ring::Kernel.level(), 0);
    assert_eq!(Ring::Supervisor.level(), 1);
    assert_eq!(Ring::User.level(), 2);
}

#[test]
fn smaller_ring_is_more_privileged() {
    assert!(Ring::Kernel < Ring::Supervisor);
    assert!(Ring::Supervisor < Ring::User);
}

impl Display for Ring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.level(), f)
    }
}

#[test]
fn ring_display() {
    assert_eq!(Ring::Kernel.to_string(), "0");
    assert_eq!(Ring::User.to_string(), "2");
}

impl TryFrom<u8> for Ring {
    type Error = RingConvError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Ring::Kernel),
            1 => Ok(Ring::Supervisor),
            2 => Ok(Ring::User),
            _ => Err(RingConvError::U8(value)),
        }
    }
}

impl TryFrom<u16> for Ring {
    type Error = RingConvError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Ring::Kernel),
            1 => Ok(Ring::Supervisor),
            2 => Ok(Ring::User),
            _ => Err(RingConvError::U16(value)),
        }
    }
}

#[test]
fn conversions_from() {
    assert_eq!(Ring::try_from(0_u8), Ok(Ring::Kernel));
    assert_eq!(Ring::try_from(2_u16), Ok(Ring::User));
    assert!(matches!(Ring::try_from(3_u8), Err(RingConvError::U8(3))));
    assert!(matches!(
        Ring::try_from(0x100_u16),
        Err(RingConvError::U16(0x100))
    ));
}

/// `Ring` conversion error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingConvError {
    ///
    U8(u8),
    ///
    U16(u16),
}

impl Display for RingConvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RingConvError::U8(value) => write!(f, "invalid privilege ring: {value}"),
            RingConvError::U16(value) => write!(f, "invalid privilege ring: {value}"),
        }
    }
}

impl Error for RingConvError {}

#[test]
fn conv_error_impl_display() {
    assert_eq!(
        Ring::try_from(7_u8).unwrap_err().to_string(),
        "invalid privilege ring: 7"
    );
}
