//! CVERE instruction definitions for decoding and encoding

use core::fmt;
use std::fmt::Display;

use crate::{
    common::{imm8::Imm8, off4::Off4, off8::Off8, opcode::Opcode},
    decode::{decode_imm8, decode_off4, decode_off8, decode_rd, decode_rs, decode_rt},
    registers::Register,
    util::bits::merge_bitfields,
};

/// The exact word decoded as [`Instruction::Halt`]
pub const HALT_WORD: u16 = 0xFFFF;

/// The exact word decoded as [`Instruction::Syscall`]
pub const SYSCALL_WORD: u16 = 0xE000;

/// CVERE instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    /// [`add`](crate::instructions::add)
    Add(R),
    /// [`sub`](crate::instructions::sub)
    Sub(R),
    /// [`and`](crate::instructions::and)
    And(R),
    /// [`or`](crate::instructions::or)
    Or(R),
    /// [`xor`](crate::instructions::xor)
    Xor(R),
    /// [`not`](crate::instructions::not)
    Not(R),
    /// [`shl`](crate::instructions::shl)
    Shl(R),
    /// [`shr`](crate::instructions::shr)
    Shr(R),
    /// [`addi`](crate::instructions::addi)
    Addi(I),
    /// [`loadi`](crate::instructions::loadi)
    Loadi(I),
    /// [`load`](crate::instructions::load)
    Load(M),
    /// [`store`](crate::instructions::store)
    Store(M),
    /// [`jmp`](crate::instructions::jmp)
    Jmp(C),
    /// [`beq`](crate::instructions::beq)
    Beq(C),
    /// [`bne`](crate::instructions::bne)
    Bne(C),
    /// [`syscall`](crate::instructions::syscall)
    Syscall,
    /// [`halt`](crate::instructions::halt)
    Halt,
    /// A word whose opcode is unassigned; executing it faults
    Illegal(u16),
}

impl Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Add(r) => write!(f, "ADD {r}"),
            Instruction::Sub(r) => write!(f, "SUB {r}"),
            Instruction::And(r) => write!(f, "AND {r}"),
            Instruction::Or(r) => write!(f, "OR {r}"),
            Instruction::Xor(r) => write!(f, "XOR {r}"),
            Instruction::Not(r) => write!(f, "NOT {}, {}", r.rd, r.rs),
            Instruction::Shl(r) => write!(f, "SHL {r}"),
            Instruction::Shr(r) => write!(f, "SHR {r}"),
            Instruction::Addi(i) => write!(f, "ADDI {i}"),
            Instruction::Loadi(i) => write!(f, "LOADI {i}"),
            Instruction::Load(m) => write!(f, "LOAD {m}"),
            Instruction::Store(m) => write!(f, "STORE {m}"),
            Instruction::Jmp(c) => write!(f, "JMP {}", c.off),
            Instruction::Beq(c) => write!(f, "BEQ {c}"),
            Instruction::Bne(c) => write!(f, "BNE {c}"),
            Instruction::Syscall => write!(f, "SYSCALL"),
            Instruction::Halt => write!(f, "HALT"),
            Instruction::Illegal(word) => write!(f, ".word 0x{word:04X}"),
        }
    }
}

impl Instruction {
    /// Encode the instruction. Every field the hardware ignores (rt of NOT,
    /// rd of JMP) is preserved, so `decode` followed by `encode` reproduces
    /// the original word exactly.
    #[must_use]
    pub const fn encode(self) -> u16 {
        match self {
            Instruction::Add(r) => r.encode(Opcode::ADD),
            Instruction::Sub(r) => r.encode(Opcode::SUB),
            Instruction::And(r) => r.encode(Opcode::AND),
            Instruction::Or(r) => r.encode(Opcode::OR),
            Instruction::Xor(r) => r.encode(Opcode::XOR),
            Instruction::Not(r) => r.encode(Opcode::NOT),
            Instruction::Shl(r) => r.encode(Opcode::SHL),
            Instruction::Shr(r) => r.encode(Opcode::SHR),
            Instruction::Addi(i) => i.encode(Opcode::ADDI),
            Instruction::Loadi(i) => i.encode(Opcode::LOADI),
            Instruction::Load(m) => m.encode(Opcode::LOAD),
            Instruction::Store(m) => m.encode(Opcode::STORE),
            Instruction::Jmp(c) => c.encode(Opcode::JMP),
            Instruction::Beq(c) => c.encode(Opcode::BEQ),
            Instruction::Bne(c) => c.encode(Opcode::BNE),
            Instruction::Syscall => SYSCALL_WORD,
            Instruction::Halt => HALT_WORD,
            Instruction::Illegal(word) => word,
        }
    }
}

/// CVERE R instruction format: `op(4) | rd(4) | rs(4) | rt(4)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct R {
    /// Destination register
    pub rd: Register,
    /// Source register 1
    pub rs: Register,
    /// Source register 2; shift amount for SHL/SHR, ignored by NOT
    pub rt: Register,
}

impl R {
    pub(crate) const fn decode(word: u16) -> Self {
        Self {
            rd: decode_rd(word),
            rs: decode_rs(word),
            rt: decode_rt(word),
        }
    }

    pub(crate) const fn encode(self, op: Opcode) -> u16 {
        merge_bitfields(&[
            (12..16, op.into_u16(), 0..4),
            (8..12, self.rd.into_u16(), 0..4),
            (4..8, self.rs.into_u16(), 0..4),
            (0..4, self.rt.into_u16(), 0..4),
        ])
    }
}

impl Display for R {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.rd, self.rs, self.rt)
    }
}

/// CVERE I instruction format: `op(4) | rd(4) | imm(8)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct I {
    /// Destination register
    pub rd: Register,
    /// 8-bit unsigned immediate, zero-extended
    pub imm: Imm8,
}

impl I {
    pub(crate) const fn decode(word: u16) -> Self {
        Self {
            rd: decode_rd(word),
            imm: decode_imm8(word),
        }
    }

    pub(crate) const fn encode(self, op: Opcode) -> u16 {
        merge_bitfields(&[
            (12..16, op.into_u16(), 0..4),
            (8..12, self.rd.into_u16(), 0..4),
            (0..8, self.imm.into_u16(), 0..8),
        ])
    }
}

impl Display for I {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.rd, self.imm)
    }
}

/// CVERE M instruction format: `op(4) | rd(4) | rs(4) | off(4)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct M {
    /// Register loaded or stored
    pub rd: Register,
    /// Base address register
    pub rs: Register,
    /// 4-bit signed offset added to the base
    pub off: Off4,
}

impl M {
    pub(crate) const fn decode(word: u16) -> Self {
        Self {
            rd: decode_rd(word),
            rs: decode_rs(word),
            off: decode_off4(word),
        }
    }

    pub(crate) const fn encode(self, op: Opcode) -> u16 {
        merge_bitfields(&[
            (12..16, op.into_u16(), 0..4),
            (8..12, self.rd.into_u16(), 0..4),
            (4..8, self.rs.into_u16(), 0..4),
            (0..4, self.off.into_nibble(), 0..4),
        ])
    }
}

impl Display for M {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}[{}]", self.rd, self.rs, self.off)
    }
}

/// CVERE control instruction format: `op(4) | rd(4) | off(8)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct C {
    /// Register tested against zero; ignored by JMP
    pub rd: Register,
    /// 8-bit signed PC-relative offset in words
    pub off: Off8,
}

impl C {
    pub(crate) const fn decode(word: u16) -> Self {
        Self {
            rd: decode_rd(word),
            off: decode_off8(word),
        }
    }

    pub(crate) const fn encode(self, op: Opcode) -> u16 {
        merge_bitfields(&[
            (12..16, op.into_u16(), 0..4),
            (8..12, self.rd.into_u16(), 0..4),
            (0..8, self.off.into_byte(), 0..8),
        ])
    }
}

impl Display for C {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.rd, self.off)
    }
}
