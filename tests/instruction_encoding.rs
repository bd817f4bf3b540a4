mod util;

use std::error::Error;

use cvere::{
    common::{imm8::Imm8, off8::Off8},
    decode::decode,
    instruction::{Instruction, C, R, HALT_WORD, SYSCALL_WORD},
    instructions::{
        add, addi, and, beq, bne, halt, jmp, load, loadi, not, or, shl, shr, store, sub, syscall,
        xor,
    },
    registers::{R0, R1, R2, R3},
};
use util::{test_c, test_i, test_m, test_r};

#[test]
fn _add() {
    test_r(add, Instruction::Add);
}

#[test]
fn _sub() {
    test_r(sub, Instruction::Sub);
}

#[test]
fn _and() {
    test_r(and, Instruction::And);
}

#[test]
fn _or() {
    test_r(or, Instruction::Or);
}

#[test]
fn _xor() {
    test_r(xor, Instruction::Xor);
}

#[test]
fn _shl() {
    test_r(shl, Instruction::Shl);
}

#[test]
fn _shr() {
    test_r(shr, Instruction::Shr);
}

#[test]
fn _not() {
    let word = not(R1, R2);
    assert_eq!(
        decode(word),
        Instruction::Not(R {
            rd: R1,
            rs: R2,
            rt: R0
        })
    );
    assert_eq!(decode(word).encode(), word);
}

#[test]
fn _addi() {
    test_i(addi, Instruction::Addi);
}

#[test]
fn _loadi() {
    test_i(loadi, Instruction::Loadi);
}

#[test]
fn _load() -> Result<(), Box<dyn Error>> {
    test_m(load, Instruction::Load)
}

#[test]
fn _store() -> Result<(), Box<dyn Error>> {
    test_m(store, Instruction::Store)
}

#[test]
fn _jmp() {
    for value in [i8::MIN, -1, 0, i8::MAX] {
        let off = Off8::from(value);
        let word = jmp(off);
        assert_eq!(decode(word), Instruction::Jmp(C { rd: R0, off }));
        assert_eq!(decode(word).encode(), word);
    }
}

#[test]
fn _beq() {
    test_c(beq, Instruction::Beq);
}

#[test]
fn _bne() {
    test_c(bne, Instruction::Bne);
}

#[test]
fn _syscall() {
    assert_eq!(syscall(), SYSCALL_WORD);
    assert_eq!(decode(syscall()), Instruction::Syscall);
}

#[test]
fn _halt() {
    assert_eq!(halt(), HALT_WORD);
    assert_eq!(decode(halt()), Instruction::Halt);
}

#[test]
fn readme_reference_encodings() {
    assert_eq!(loadi(R1, Imm8::from(0x05_u8)), 0xC105);
    assert_eq!(loadi(R2, Imm8::from(0x03_u8)), 0xC203);
    assert_eq!(add(R3, R1, R2), 0x1312);
    assert_eq!(halt(), 0xFFFF);
    assert_eq!(addi(R1, Imm8::from(0x01_u8)), 0x2101);
    assert_eq!(bne(R3, Off8::from(-3_i8)), 0xF3FD);
}

#[test]
fn decode_is_total_and_encode_inverts_it() {
    for word in 0..=u16::MAX {
        assert_eq!(decode(word).encode(), word, "word 0x{word:04X}");
    }
}

#[test]
fn only_the_0xe_nibble_is_illegal() {
    for word in 0..=u16::MAX {
        let illegal = matches!(decode(word), Instruction::Illegal(_));
        let expected = word >> 12 == 0xE && word != SYSCALL_WORD;
        assert_eq!(illegal, expected, "word 0x{word:04X}");
    }
}
