/*!
CVERE register definitions and the architectural register file.

Sixteen general-purpose registers R0..RF, the program counter, the stack
pointer, the link register, the status flags and the current privilege
level. R0 is hard-wired to zero.
*/

use core::fmt;
use std::{error::Error, fmt::Display};

use bitflags::bitflags;

use crate::privilege::Ring;
use crate::util::{u16_fits_n_bits, u32_fits_n_bits, u8_fits_n_bits, usize_fits_n_bits};

/// Number of CVERE general-purpose registers
pub const NUMBER_OF_REGISTERS: usize = 16;

/// Reset value of the stack pointer
pub const SP_INIT: u16 = 0xFFFE;

/// Hard-wired zero, ignores writes
pub const R0: Register = Register(0);
/// Syscall number and syscall return value
pub const R1: Register = Register(1);
/// General-purpose register 2, first syscall argument
pub const R2: Register = Register(2);
/// General-purpose register 3, second syscall argument
pub const R3: Register = Register(3);
/// General-purpose register 4, third syscall argument
pub const R4: Register = Register(4);
/// General-purpose register 5, fourth syscall argument
pub const R5: Register = Register(5);
/// General-purpose register 6
pub const R6: Register = Register(6);
/// General-purpose register 7
pub const R7: Register = Register(7);
/// General-purpose register 8
pub const R8: Register = Register(8);
/// General-purpose register 9
pub const R9: Register = Register(9);
/// General-purpose register 10
pub const RA: Register = Register(10);
/// General-purpose register 11
pub const RB: Register = Register(11);
/// General-purpose register 12
pub const RC: Register = Register(12);
/// General-purpose register 13
pub const RD: Register = Register(13);
/// General-purpose register 14
pub const RE: Register = Register(14);
/// General-purpose register 15
pub const RF: Register = Register(15);

/// Represents a CVERE general-purpose register
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct Register(u8);

impl Register {
    const NBITS: usize = 4;

    #[allow(clippy::cast_possible_truncation)]
    pub(crate) const fn from_nibble(bits: u16) -> Self {
        Self((bits & 0xF) as u8)
    }

    pub(crate) const fn into_u16(self) -> u16 {
        self.0 as u16
    }

    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

#[test]
fn into_u16() {
    assert_eq!(RB.into_u16(), 11);
}

impl Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{:X}", self.0)
    }
}

#[test]
fn register_display() -> Result<(), RegisterConvError> {
    for i in 0..NUMBER_OF_REGISTERS {
        assert_eq!(Register::try_from(i)?.to_string(), format!("R{i:X}"));
    }
    Ok(())
}

impl TryFrom<u8> for Register {
    type Error = RegisterConvError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if u8_fits_n_bits(value, Self::NBITS) {
            Ok(Self(value))
        } else {
            Err(RegisterConvError::U8(value))
        }
    }
}

impl TryFrom<u16> for Register {
    type Error = RegisterConvError;

    #[allow(clippy::cast_possible_truncation)]
    fn try_from(value: u16) -> Result<Self, Self::Error> {
        if u16_fits_n_bits(value, Self::NBITS) {
            Ok(Self(value as u8))
        } else {
            Err(RegisterConvError::U16(value))
        }
    }
}

impl TryFrom<u32> for Register {
    type Error = RegisterConvError;

    #[allow(clippy::cast_possible_truncation)]
    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if u32_fits_n_bits(value, Self::NBITS) {
            Ok(Self(value as u8))
        } else {
            Err(RegisterConvError::U32(value))
        }
    }
}

impl TryFrom<usize> for Register {
    type Error = RegisterConvError;

    #[allow(clippy::cast_possible_truncation)]
    fn try_from(value: usize) -> Result<Self, Self::Error> {
        if usize_fits_n_bits(value, Self::NBITS) {
            Ok(Self(value as u8))
        } else {
            Err(RegisterConvError::Usize(value))
        }
    }
}

impl TryFrom<i8> for Register {
    type Error = RegisterConvError;

    #[allow(clippy::cast_sign_loss)]
    fn try_from(value: i8) -> Result<Self, Self::Error> {
        if (value as usize) < NUMBER_OF_REGISTERS {
            Ok(Self(value as u8))
        } else {
            Err(RegisterConvError::I8(value))
        }
    }
}

impl TryFrom<i16> for Register {
    type Error = RegisterConvError;

    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    fn try_from(value: i16) -> Result<Self, Self::Error> {
        if (value as usize) < NUMBER_OF_REGISTERS {
            Ok(Self(value as u8))
        } else {
            Err(RegisterConvError::I16(value))
        }
    }
}

impl TryFrom<i32> for Register {
    type Error = RegisterConvError;

    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    fn try_from(value: i32) -> Result<Self, Self::Error> {
        if (value as usize) < NUMBER_OF_REGISTERS {
            Ok(Self(value as u8))
        } else {
            Err(RegisterConvError::I32(value))
        }
    }
}

#[test]
fn conversions_from() -> Result<(), RegisterConvError> {
    assert_eq!(Register::try_from(15_u8)?, Register(15));
    assert_eq!(Register::try_from(15_u16)?, Register(15));
    assert_eq!(Register::try_from(15_u32)?, Register(15));
    assert_eq!(Register::try_from(15_usize)?, Register(15));
    assert_eq!(Register::try_from(15_i8)?, Register(15));
    assert_eq!(Register::try_from(15_i16)?, Register(15));
    assert_eq!(Register::try_from(15_i32)?, Register(15));

    assert!(matches!(
        Register::try_from(16_u8),
        Err(RegisterConvError::U8(16))
    ));
    assert!(matches!(
        Register::try_from(16_u16),
        Err(RegisterConvError::U16(16))
    ));
    assert!(matches!(
        Register::try_from(16_u32),
        Err(RegisterConvError::U32(16))
    ));
    assert!(matches!(
        Register::try_from(16_usize),
        Err(RegisterConvError::Usize(16))
    ));
    assert!(matches!(
        Register::try_from(-1_i8),
        Err(RegisterConvError::I8(-1))
    ));
    assert!(matches!(
        Register::try_from(16_i16),
        Err(RegisterConvError::I16(16))
    ));
    assert!(matches!(
        Register::try_from(-1_i32),
        Err(RegisterConvError::I32(-1))
    ));

    Ok(())
}

impl From<Register> for u8 {
    fn from(r: Register) -> Self {
        r.0
    }
}

impl From<Register> for u16 {
    fn from(r: Register) -> Self {
        From::from(r.0)
    }
}

impl From<Register> for u32 {
    fn from(r: Register) -> Self {
        From::from(r.0)
    }
}

impl From<Register> for usize {
    fn from(r: Register) -> Self {
        usize::from(r.0)
    }
}

#[test]
fn conversions_into() -> Result<(), RegisterConvError> {
    assert_eq!(Into::<u8>::into(Register::try_from(15_u8)?), 15);
    assert_eq!(Into::<u16>::into(Register::try_from(15_u16)?), 15);
    assert_eq!(Into::<u32>::into(Register::try_from(15_u32)?), 15);
    assert_eq!(Into::<usize>::into(Register::try_from(15_usize)?), 15);
    Ok(())
}

/// `Register` conversion error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterConvError {
    ///
    U8(u8),
    ///
    U16(u16),
    ///
    U32(u32),
    ///
    Usize(usize),
    ///
    I8(i8),
    ///
    I16(i16),
    ///
    I32(i32),
}

impl Display for RegisterConvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterConvError::U8(value) => write!(f, "invalid register index: {value}"),
            RegisterConvError::U16(value) => write!(f, "invalid register index: {value}"),
            RegisterConvError::U32(value) => write!(f, "invalid register index: {value}"),
            RegisterConvError::Usize(value) => write!(f, "invalid register index: {value}"),
            RegisterConvError::I8(value) => write!(f, "invalid register index: {value}"),
            RegisterConvError::I16(value) => write!(f, "invalid register index: {value}"),
            RegisterConvError::I32(value) => write!(f, "invalid register index: {value}"),
        }
    }
}

impl Error for RegisterConvError {}

#[test]
fn conv_error_impl_display() {
    assert_eq!(
        Register::try_from(16_u8).unwrap_err().to_string(),
        "invalid register index: 16"
    );
    assert_eq!(
        Register::try_from(-1_i8).unwrap_err().to_string(),
        "invalid register index: -1"
    );
}

bitflags! {
    /// Status register flags, updated by ALU instructions
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Flags: u16 {
        /// The most recent ALU result was zero
        const Z = 0b1000;
        /// Bit 15 of the most recent ALU result was set
        const N = 0b0100;
        /// Unsigned carry or borrow out of bit 15
        const C = 0b0010;
        /// Signed overflow
        const V = 0b0001;
    }
}

/// Architectural register state of one CVERE machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterFile {
    gpr: [u16; NUMBER_OF_REGISTERS],
    pc: u16,
    sp: u16,
    lr: u16,
    flags: Flags,
    ring: Ring,
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterFile {
    /// Creates a register file in the reset state: every register zero,
    /// SP = [`SP_INIT`], ring 2.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            gpr: [0; NUMBER_OF_REGISTERS],
            pc: 0,
            sp: SP_INIT,
            lr: 0,
            flags: Flags::empty(),
            ring: Ring::User,
        }
    }

    /// Reads a general-purpose register. R0 always reads as zero.
    #[must_use]
    pub const fn read(&self, r: Register) -> u16 {
        self.gpr[r.index()]
    }

    /// Writes a general-purpose register. Writes to R0 are silently
    /// discarded; this is architectural, not an error.
    pub fn write(&mut self, r: Register, value: u16) {
        if r.index() != 0 {
            self.gpr[r.index()] = value;
        }
    }

    /// The program counter: the address of the next instruction to fetch
    #[must_use]
    pub const fn pc(&self) -> u16 {
        self.pc
    }

    /// Sets the program counter
    pub fn set_pc(&mut self, value: u16) {
        self.pc = value;
    }

    /// The stack pointer. Keep it even; the base ISA never moves it, so
    /// parity is up to the host's syscall handlers.
    #[must_use]
    pub const fn sp(&self) -> u16 {
        self.sp
    }

    /// Sets the stack pointer
    pub fn set_sp(&mut self, value: u16) {
        self.sp = value;
    }

    /// The link register
    #[must_use]
    pub const fn lr(&self) -> u16 {
        self.lr
    }

    /// Sets the link register
    pub fn set_lr(&mut self, value: u16) {
        self.lr = value;
    }

    /// The status flags
    #[must_use]
    pub const fn flags(&self) -> Flags {
        self.flags
    }

    /// Writes all four status flags at once
    pub fn set_flags(&mut self, z: bool, n: bool, c: bool, v: bool) {
        let mut flags = Flags::empty();
        flags.set(Flags::Z, z);
        flags.set(Flags::N, n);
        flags.set(Flags::C, c);
        flags.set(Flags::V, v);
        self.flags = flags;
    }

    /// The current privilege level
    #[must_use]
    pub const fn ring(&self) -> Ring {
        self.ring
    }

    // Only the syscall gateway changes the privilege level; no instruction
    // and no public API can.
    pub(crate) fn set_ring(&mut self, ring: Ring) {
        self.ring = ring;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_state() {
        let regs = RegisterFile::new();
        for i in 0..NUMBER_OF_REGISTERS {
            assert_eq!(regs.read(Register::try_from(i).unwrap()), 0);
        }
        assert_eq!(regs.pc(), 0);
        assert_eq!(regs.sp(), SP_INIT);
        assert_eq!(regs.lr(), 0);
        assert_eq!(regs.flags(), Flags::empty());
        assert_eq!(regs.ring(), Ring::User);
    }

    #[test]
    fn r0_reads_zero_after_any_write() {
        let mut regs = RegisterFile::new();
        regs.write(R0, 0xFFFF);
        assert_eq!(regs.read(R0), 0);
        regs.write(R0, 0x0042);
        assert_eq!(regs.read(R0), 0);
    }

    #[test]
    fn other_registers_hold_values() {
        let mut regs = RegisterFile::new();
        regs.write(R1, 0xBEEF);
        regs.write(RF, 0x1234);
        assert_eq!(regs.read(R1), 0xBEEF);
        assert_eq!(regs.read(RF), 0x1234);
    }

    #[test]
    fn set_flags_replaces_the_whole_word() {
        let mut regs = RegisterFile::new();
        regs.set_flags(true, false, true, false);
        assert_eq!(regs.flags(), Flags::Z | Flags::C);
        regs.set_flags(false, true, false, false);
        assert_eq!(regs.flags(), Flags::N);
    }
}
