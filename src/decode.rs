//! Decoding facilities

use crate::{
    common::{imm8::Imm8, off4::Off4, off8::Off8, opcode::Opcode},
    instruction::{Instruction, C, I, M, R, HALT_WORD, SYSCALL_WORD},
    registers::Register,
    util::bits::bitfield,
};

/// Decodes a CVERE instruction word.
///
/// Decoding is total: every 16-bit word decodes, and words with an
/// unassigned opcode become [`Instruction::Illegal`] instead of an error.
/// The exact words [`HALT_WORD`] and [`SYSCALL_WORD`] are recognized
/// before opcode-nibble dispatch.
#[must_use]
pub const fn decode(word: u16) -> Instruction {
    match word {
        HALT_WORD => Instruction::Halt,
        SYSCALL_WORD => Instruction::Syscall,
        _ => match Opcode::of(word) {
            Opcode::BEQ => Instruction::Beq(C::decode(word)),
            Opcode::ADD => Instruction::Add(R::decode(word)),
            Opcode::ADDI => Instruction::Addi(I::decode(word)),
            Opcode::SUB => Instruction::Sub(R::decode(word)),
            Opcode::AND => Instruction::And(R::decode(word)),
            Opcode::OR => Instruction::Or(R::decode(word)),
            Opcode::XOR => Instruction::Xor(R::decode(word)),
            Opcode::NOT => Instruction::Not(R::decode(word)),
            Opcode::SHL => Instruction::Shl(R::decode(word)),
            Opcode::SHR => Instruction::Shr(R::decode(word)),
            Opcode::LOAD => Instruction::Load(M::decode(word)),
            Opcode::STORE => Instruction::Store(M::decode(word)),
            Opcode::LOADI => Instruction::Loadi(I::decode(word)),
            Opcode::JMP => Instruction::Jmp(C::decode(word)),
            Opcode::BNE => Instruction::Bne(C::decode(word)),
            _ => Instruction::Illegal(word),
        },
    }
}

pub(crate) const fn decode_rd(word: u16) -> Register {
    Register::from_nibble(bitfield::<8, 12>(word))
}

pub(crate) const fn decode_rs(word: u16) -> Register {
    Register::from_nibble(bitfield::<4, 8>(word))
}

pub(crate) const fn decode_rt(word: u16) -> Register {
    Register::from_nibble(bitfield::<0, 4>(word))
}

#[allow(clippy::cast_possible_truncation)]
pub(crate) const fn decode_imm8(word: u16) -> Imm8 {
    Imm8(bitfield::<0, 8>(word) as u8)
}

pub(crate) const fn decode_off4(word: u16) -> Off4 {
    Off4::from_nibble(bitfield::<0, 4>(word))
}

pub(crate) const fn decode_off8(word: u16) -> Off8 {
    Off8::from_byte(bitfield::<0, 8>(word))
}
