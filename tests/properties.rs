mod util;

use cvere::{
    registers::{Flags, RegisterFile, R0, R1, R2, R3},
    vm::Step,
};
use proptest::prelude::*;
use util::{vm_with_program, COUNT_TO_TEN};

// ALU words operating on R3 <- R1 (op) R2.
const ALU_WORDS: [u16; 5] = [0x1312, 0x3312, 0x4312, 0x5312, 0x6312];

// Opcode nibbles that never branch or touch memory.
const STRAIGHT_LINE_OPS: [u16; 10] = [0x1, 0x2, 0x3, 0x4, 0x5, 0x6, 0x7, 0x8, 0x9, 0xC];

proptest! {
    #[test]
    fn r0_reads_zero_after_any_write(value in any::<u16>()) {
        let mut registers = RegisterFile::new();
        registers.write(R0, value);
        prop_assert_eq!(registers.read(R0), 0);
    }

    #[test]
    fn r0_reads_zero_after_any_loadi(imm in any::<u8>()) {
        // LOADI R0, imm; HALT
        let mut vm = vm_with_program(&[0xC000 | u16::from(imm), 0xFFFF]);
        vm.run(10).unwrap();
        prop_assert_eq!(vm.registers().read(R0), 0);
    }

    #[test]
    fn alu_flags_reflect_the_result(
        a in any::<u16>(),
        b in any::<u16>(),
        word in proptest::sample::select(&ALU_WORDS[..]),
    ) {
        let mut vm = vm_with_program(&[word, 0xFFFF]);
        vm.registers_mut().write(R1, a);
        vm.registers_mut().write(R2, b);
        vm.run(10).unwrap();

        let result = vm.registers().read(R3);
        let flags = vm.registers().flags();
        prop_assert_eq!(flags.contains(Flags::Z), result == 0);
        prop_assert_eq!(flags.contains(Flags::N), result & 0x8000 != 0);
    }

    #[test]
    fn straight_line_steps_advance_pc_by_one(
        op in proptest::sample::select(&STRAIGHT_LINE_OPS[..]),
        low in any::<u16>(),
    ) {
        let word = op << 12 | low & 0x0FFF;
        let mut vm = vm_with_program(&[word]);
        prop_assert_eq!(vm.step(), Ok(Step::Continue));
        prop_assert_eq!(vm.registers().pc(), 1);
    }

    #[test]
    fn taken_jumps_advance_pc_by_one_plus_offset(off in any::<i8>()) {
        #[allow(clippy::cast_sign_loss)]
        let word = 0xD000 | (off as u8 as u16);
        let mut vm = vm_with_program(&[word]);
        prop_assert_eq!(vm.step(), Ok(Step::Continue));
        let expected = 1_u16.wrapping_add(off as i16 as u16);
        prop_assert_eq!(vm.registers().pc(), expected);
    }

    #[test]
    fn taken_branches_advance_pc_by_one_plus_offset(off in any::<i8>(), value in 1..=u16::MAX) {
        // BNE R1 with R1 nonzero is always taken.
        #[allow(clippy::cast_sign_loss)]
        let word = 0xF100 | (off as u8 as u16);
        let mut vm = vm_with_program(&[word]);
        vm.registers_mut().write(R1, value);
        prop_assert_eq!(vm.step(), Ok(Step::Continue));
        let expected = 1_u16.wrapping_add(off as i16 as u16);
        prop_assert_eq!(vm.registers().pc(), expected);
    }

    #[test]
    fn untaken_branches_fall_through(off in any::<i8>()) {
        // BEQ R1 with R1 nonzero falls through.
        #[allow(clippy::cast_sign_loss)]
        let word = 0x0100 | (off as u8 as u16);
        let mut vm = vm_with_program(&[word]);
        vm.registers_mut().write(R1, 1);
        prop_assert_eq!(vm.step(), Ok(Step::Continue));
        prop_assert_eq!(vm.registers().pc(), 1);
    }

    #[test]
    fn reserved_cells_survive_arbitrary_programs(
        words in proptest::collection::vec(any::<u16>(), 1..=64),
    ) {
        let mut vm = vm_with_program(&words);
        let _ = vm.run(200);
        prop_assert_eq!(vm.memory().cells()[0xFFFE], 0);
        prop_assert_eq!(vm.memory().cells()[0xFFFF], 0);
    }

    #[test]
    fn split_runs_match_a_single_run(split in 0_u64..40) {
        let mut first = vm_with_program(&COUNT_TO_TEN);
        let _ = first.run(split);
        let _ = first.run(200);

        let mut second = vm_with_program(&COUNT_TO_TEN);
        let _ = second.run(split + 200);

        prop_assert_eq!(first.registers(), second.registers());
        prop_assert_eq!(first.cycles(), second.cycles());
        prop_assert_eq!(first.halted(), second.halted());
        prop_assert_eq!(first.memory().cells(), second.memory().cells());
    }
}
