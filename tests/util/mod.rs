#![allow(dead_code)]

use std::error::Error;

use cvere::{
    common::{imm8::Imm8, off4::Off4, off8::Off8},
    decode::decode,
    instruction::{Instruction, C, I, M, R},
    registers::{Register, R1, R2, RF},
    vm::Vm,
};

pub fn test_r(
    encode: impl Fn(Register, Register, Register) -> u16,
    variant: impl Fn(R) -> Instruction + Copy,
) {
    for (rd, rs, rt) in [(R1, R2, RF), (RF, R1, R2), (R2, RF, R1)] {
        let word = encode(rd, rs, rt);
        assert_eq!(decode(word), variant(R { rd, rs, rt }));
        assert_eq!(decode(word).encode(), word);
    }
}

pub fn test_i(
    encode: impl Fn(Register, Imm8) -> u16,
    variant: impl Fn(I) -> Instruction + Copy,
) {
    for imm in [Imm8::from(0_u8), Imm8::from(0x7F_u8), Imm8::from(0xFF_u8)] {
        let word = encode(RF, imm);
        assert_eq!(decode(word), variant(I { rd: RF, imm }));
        assert_eq!(decode(word).encode(), word);
    }
}

pub fn test_m(
    encode: impl Fn(Register, Register, Off4) -> u16,
    variant: impl Fn(M) -> Instruction + Copy,
) -> Result<(), Box<dyn Error>> {
    for value in [-8_i8, -1, 0, 7] {
        let off = Off4::try_from(value)?;
        let word = encode(R1, R2, off);
        assert_eq!(decode(word), variant(M { rd: R1, rs: R2, off }));
        assert_eq!(decode(word).encode(), word);
    }
    Ok(())
}

pub fn test_c(
    encode: impl Fn(Register, Off8) -> u16,
    variant: impl Fn(C) -> Instruction + Copy,
) {
    for value in [i8::MIN, -1, 0, i8::MAX] {
        let off = Off8::from(value);
        let word = encode(RF, off);
        assert_eq!(decode(word), variant(C { rd: RF, off }));
        assert_eq!(decode(word).encode(), word);
    }
}

/// A machine with `words` loaded at address zero.
pub fn vm_with_program(words: &[u16]) -> Vm {
    let mut vm = Vm::new();
    vm.load_program(words, 0x0000)
        .expect("test program fits the code region");
    vm
}

/// The counting loop from the ISA reference: R1 counts up to R2 = 10.
pub const COUNT_TO_TEN: [u16; 6] = [0xC100, 0xC20A, 0x2101, 0x3321, 0xF3FD, 0xFFFF];

/// The add example from the ISA reference: R3 = R1 + R2 = 5 + 3.
pub const ADD_FIVE_AND_THREE: [u16; 4] = [0xC105, 0xC203, 0x1312, 0xFFFF];
