//! The CVERE virtual machine: fetch, decode, execute, trap.
//!
//! Each [`Vm::step`] either completes one instruction or reports a fault
//! before any architectural change beyond the PC increment. Architectural
//! faults latch the machine: it stays inspectable but does not resume.
//! Running out of cycle budget is not a latching condition.

use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    common::off8::Off8,
    decode::decode,
    instruction::Instruction,
    memory::{region_at, Access, LoadError, Memory, MemoryFault, MemoryFaultKind},
    privilege::Ring,
    registers::{Register, RegisterFile, R1},
    syscall::{SyscallContext, SyscallHandler, SyscallTable},
};

/// An execution fault surfaced to the embedder.
///
/// Every variant carries the address of the offending instruction. All
/// variants except [`Fault::CycleBudgetExhausted`] latch the machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    /// A word with an unassigned opcode reached execution
    #[error("illegal instruction 0x{word:04X} at 0x{pc:04X}")]
    IllegalInstruction {
        /// Address of the instruction
        pc: u16,
        /// The offending word
        word: u16,
    },
    /// A load or store refused by region policy or privilege
    #[error("protection fault at 0x{addr:04X} from ring {ring}, instruction at 0x{pc:04X}")]
    ProtectionFault {
        /// Address of the instruction
        pc: u16,
        /// The refused address
        addr: u16,
        /// Ring the access was attempted from
        ring: Ring,
    },
    /// An instruction fetch from a non-executable region
    #[error("invalid access at 0x{addr:04X} from ring {ring}, instruction at 0x{pc:04X}")]
    InvalidAccess {
        /// Address of the instruction
        pc: u16,
        /// The refused address
        addr: u16,
        /// Ring the access was attempted from
        ring: Ring,
    },
    /// SYSCALL with a number no handler is installed for
    #[error("unknown syscall {num} at 0x{pc:04X}")]
    UnknownSyscall {
        /// Address of the instruction
        pc: u16,
        /// The unrecognized syscall number
        num: u16,
    },
    /// SYSCALL to a handler requiring more privilege than the caller holds
    #[error("syscall {num} requires ring {required}, called from ring {ring} at 0x{pc:04X}")]
    PrivilegeViolation {
        /// Address of the instruction
        pc: u16,
        /// The gated syscall number
        num: u16,
        /// The caller's ring
        ring: Ring,
        /// The handler's minimum ring
        required: Ring,
    },
    /// `run` reached its cycle bound; the machine is resumable
    #[error("cycle budget exhausted after {cycles} cycles, next instruction at 0x{pc:04X}")]
    CycleBudgetExhausted {
        /// Address of the next instruction
        pc: u16,
        /// Cycles consumed by the bounded call
        cycles: u64,
    },
}

impl Fault {
    fn from_memory(fault: MemoryFault, pc: u16) -> Self {
        match fault.kind {
            MemoryFaultKind::ProtectionFault => Fault::ProtectionFault {
                pc,
                addr: fault.addr,
                ring: fault.ring,
            },
            MemoryFaultKind::InvalidAccess => Fault::InvalidAccess {
                pc,
                addr: fault.addr,
                ring: fault.ring,
            },
        }
    }
}

/// Outcome of a single [`Vm::step`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The instruction completed and the machine can continue
    Continue,
    /// The machine is halted
    Halted,
}

/// One completed execution step, as delivered to a [`TraceSink`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceRecord {
    /// Zero-based index of the step in the machine's lifetime
    pub cycle: u64,
    /// Address the instruction was fetched from
    pub pc: u16,
    /// The fetched word
    pub word: u16,
    /// The decoded instruction
    pub instruction: Instruction,
}

/// Observer receiving one record per completed step, in program order,
/// before the next step begins.
pub trait TraceSink {
    /// Called once per completed step.
    fn record(&mut self, record: &TraceRecord);
}

impl<F> TraceSink for F
where
    F: FnMut(&TraceRecord),
{
    fn record(&mut self, record: &TraceRecord) {
        self(record);
    }
}

/// Architectural state captured by [`Vm::snapshot`]
#[derive(Clone)]
pub struct Snapshot {
    registers: RegisterFile,
    memory: Memory,
    cycles: u64,
    halted: bool,
}

impl Snapshot {
    /// The captured register file
    #[must_use]
    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    /// The captured memory image
    #[must_use]
    pub fn memory(&self) -> &Memory {
        &self.memory
    }
}

/// A CVERE machine: memory, register file, syscall table, cycle counter.
pub struct Vm {
    memory: Memory,
    registers: RegisterFile,
    syscalls: SyscallTable,
    cycles: u64,
    halted: bool,
    fault: Option<Fault>,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    /// Creates a machine in the reset state: memory and registers zeroed,
    /// PC = 0, SP = 0xFFFE, ring 2, no syscall handlers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            memory: Memory::new(),
            registers: RegisterFile::new(),
            syscalls: SyscallTable::default(),
            cycles: 0,
            halted: false,
            fault: None,
        }
    }

    /// The register file
    #[must_use]
    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    /// Mutable access to the register file, for embedder setup and
    /// inspection
    pub fn registers_mut(&mut self) -> &mut RegisterFile {
        &mut self.registers
    }

    /// The memory
    #[must_use]
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Mutable access to memory, for image loads and data seeding
    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    /// Completed execution steps over the machine's lifetime
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Whether the machine has executed HALT
    #[must_use]
    pub fn halted(&self) -> bool {
        self.halted
    }

    /// The latched fault, if the machine has taken one
    #[must_use]
    pub fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }

    /// Installs a syscall handler for `num`, gated at `min_ring`. A
    /// previous handler for the same number is replaced.
    pub fn install_syscall(
        &mut self,
        num: u16,
        min_ring: Ring,
        handler: impl SyscallHandler + 'static,
    ) {
        debug!(num, ring = %min_ring, "syscall handler installed");
        self.syscalls.install(num, min_ring, Box::new(handler));
    }

    /// Copies `words` into executable memory at `base`.
    ///
    /// # Errors
    ///
    /// Refuses programs that would reach 0xF000 or occupy a cell outside
    /// an executable region.
    pub fn load_program(&mut self, words: &[u16], base: u16) -> Result<(), LoadError> {
        let end = base as usize + words.len();
        if end > 0xF000 {
            return Err(LoadError::OutOfBounds {
                base,
                words: words.len(),
            });
        }
        for i in 0..words.len() {
            #[allow(clippy::cast_possible_truncation)]
            let addr = base + i as u16;
            if !region_at(addr).access.contains(Access::EXECUTE) {
                return Err(LoadError::NotExecutable { addr });
            }
        }
        self.memory.write_block(base, words);
        debug!(base, words = words.len(), "program loaded");
        Ok(())
    }

    /// Executes exactly one instruction.
    ///
    /// A halted machine reports [`Step::Halted`] again; a faulted machine
    /// returns its latched fault again. Otherwise the post-condition is
    /// that PC points at the next instruction to execute.
    ///
    /// # Errors
    ///
    /// Any [`Fault`] except [`Fault::CycleBudgetExhausted`].
    pub fn step(&mut self) -> Result<Step, Fault> {
        if let Some(fault) = &self.fault {
            return Err(fault.clone());
        }
        if self.halted {
            return Ok(Step::Halted);
        }
        match self.execute_one() {
            Ok((step, _)) => Ok(step),
            Err(fault) => Err(self.latch(fault)),
        }
    }

    /// Runs until HALT, a fault, or `max_cycles` executed instructions.
    ///
    /// Returns the cycles consumed by this call when the machine halts. An
    /// already-halted machine returns `Ok(0)`.
    ///
    /// # Errors
    ///
    /// [`Fault::CycleBudgetExhausted`] at the bound, in which case the
    /// machine is resumable and a later `run` continues from the current
    /// PC; any other [`Fault`] latches the machine.
    pub fn run(&mut self, max_cycles: u64) -> Result<u64, Fault> {
        self.run_with_sink(max_cycles, None)
    }

    /// [`Vm::run`] with a per-step observer.
    ///
    /// # Errors
    ///
    /// Identical to [`Vm::run`].
    pub fn trace(&mut self, max_cycles: u64, sink: &mut dyn TraceSink) -> Result<u64, Fault> {
        self.run_with_sink(max_cycles, Some(sink))
    }

    /// Captures the architectural state: registers, memory, cycle counter
    /// and the halted flag.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            registers: self.registers.clone(),
            memory: self.memory.clone(),
            cycles: self.cycles,
            halted: self.halted,
        }
    }

    /// Restores previously captured state. Any latched fault is cleared;
    /// installed syscall handlers are unaffected.
    pub fn restore(&mut self, snapshot: &Snapshot) {
        self.registers = snapshot.registers.clone();
        self.memory = snapshot.memory.clone();
        self.cycles = snapshot.cycles;
        self.halted = snapshot.halted;
        self.fault = None;
    }

    fn run_with_sink(
        &mut self,
        max_cycles: u64,
        mut sink: Option<&mut dyn TraceSink>,
    ) -> Result<u64, Fault> {
        if let Some(fault) = &self.fault {
            return Err(fault.clone());
        }
        let mut consumed = 0;
        while consumed < max_cycles {
            if self.halted {
                return Ok(consumed);
            }
            let (step, record) = match self.execute_one() {
                Ok(completed) => completed,
                Err(fault) => return Err(self.latch(fault)),
            };
            consumed += 1;
            if let Some(sink) = sink.as_mut() {
                sink.record(&record);
            }
            if step == Step::Halted {
                return Ok(consumed);
            }
        }
        if self.halted {
            Ok(consumed)
        } else {
            Err(Fault::CycleBudgetExhausted {
                pc: self.registers.pc(),
                cycles: consumed,
            })
        }
    }

    fn latch(&mut self, fault: Fault) -> Fault {
        debug!(%fault, "fault latched");
        self.fault = Some(fault.clone());
        fault
    }

    // Fetch, increment PC, decode, execute. Faults carry the fetch PC.
    fn execute_one(&mut self) -> Result<(Step, TraceRecord), Fault> {
        let pc = self.registers.pc();
        let ring = self.registers.ring();
        let word = self
            .memory
            .fetch_instruction(pc, ring)
            .map_err(|fault| Fault::from_memory(fault, pc))?;
        self.registers.set_pc(pc.wrapping_add(1));
        let instruction = decode(word);
        let record = TraceRecord {
            cycle: self.cycles,
            pc,
            word,
            instruction,
        };
        let step = self.execute(pc, instruction)?;
        self.cycles += 1;
        Ok((step, record))
    }

    fn execute(&mut self, pc: u16, instruction: Instruction) -> Result<Step, Fault> {
        match instruction {
            Instruction::Add(r) => {
                let (a, b) = (self.registers.read(r.rs), self.registers.read(r.rt));
                let (result, carry) = a.overflowing_add(b);
                self.write_arith(r.rd, result, carry, add_overflows(a, b, result));
            }
            Instruction::Sub(r) => {
                let (a, b) = (self.registers.read(r.rs), self.registers.read(r.rt));
                let (result, borrow) = a.overflowing_sub(b);
                self.write_arith(r.rd, result, borrow, sub_overflows(a, b, result));
            }
            Instruction::And(r) => {
                let result = self.registers.read(r.rs) & self.registers.read(r.rt);
                self.write_logical(r.rd, result);
            }
            Instruction::Or(r) => {
                let result = self.registers.read(r.rs) | self.registers.read(r.rt);
                self.write_logical(r.rd, result);
            }
            Instruction::Xor(r) => {
                let result = self.registers.read(r.rs) ^ self.registers.read(r.rt);
                self.write_logical(r.rd, result);
            }
            Instruction::Not(r) => {
                let result = !self.registers.read(r.rs);
                self.write_logical(r.rd, result);
            }
            Instruction::Shl(r) => {
                let amount = self.registers.read(r.rt);
                let value = self.registers.read(r.rs);
                let result = if amount >= 16 { 0 } else { value << amount };
                self.write_logical(r.rd, result);
            }
            Instruction::Shr(r) => {
                let amount = self.registers.read(r.rt);
                let value = self.registers.read(r.rs);
                let result = if amount >= 16 { 0 } else { value >> amount };
                self.write_logical(r.rd, result);
            }
            Instruction::Addi(i) => {
                let a = self.registers.read(i.rd);
                let b = i.imm.into_u16();
                let (result, carry) = a.overflowing_add(b);
                self.write_arith(i.rd, result, carry, add_overflows(a, b, result));
            }
            Instruction::Loadi(i) => {
                self.write_logical(i.rd, i.imm.into_u16());
            }
            Instruction::Load(m) => {
                let ring = self.registers.ring();
                let addr = self.registers.read(m.rs).wrapping_add(m.off.as_word());
                let value = self
                    .memory
                    .load_word(addr, ring)
                    .map_err(|fault| Fault::from_memory(fault, pc))?;
                self.registers.write(m.rd, value);
            }
            Instruction::Store(m) => {
                let ring = self.registers.ring();
                let addr = self.registers.read(m.rs).wrapping_add(m.off.as_word());
                let value = self.registers.read(m.rd);
                self.memory
                    .store_word(addr, value, ring)
                    .map_err(|fault| Fault::from_memory(fault, pc))?;
            }
            Instruction::Jmp(c) => {
                self.branch(c.off);
            }
            Instruction::Beq(c) => {
                if self.registers.read(c.rd) == 0 {
                    self.branch(c.off);
                }
            }
            Instruction::Bne(c) => {
                if self.registers.read(c.rd) != 0 {
                    self.branch(c.off);
                }
            }
            Instruction::Syscall => {
                self.dispatch_syscall(pc)?;
            }
            Instruction::Halt => {
                self.halted = true;
                return Ok(Step::Halted);
            }
            Instruction::Illegal(word) => {
                return Err(Fault::IllegalInstruction { pc, word });
            }
        }
        Ok(Step::Continue)
    }

    // Branch targets are relative to the already-incremented PC.
    fn branch(&mut self, off: Off8) {
        let pc = self.registers.pc();
        self.registers.set_pc(pc.wrapping_add(off.as_word()));
    }

    fn write_arith(&mut self, rd: Register, result: u16, carry: bool, overflow: bool) {
        self.registers.write(rd, result);
        self.registers
            .set_flags(result == 0, result & 0x8000 != 0, carry, overflow);
    }

    fn write_logical(&mut self, rd: Register, result: u16) {
        self.registers.write(rd, result);
        self.registers
            .set_flags(result == 0, result & 0x8000 != 0, false, false);
    }

    fn dispatch_syscall(&mut self, pc: u16) -> Result<(), Fault> {
        let num = self.registers.read(R1);
        let ring = self.registers.ring();
        let Some(entry) = self.syscalls.entry_mut(num) else {
            return Err(Fault::UnknownSyscall { pc, num });
        };
        if entry.min_ring < ring {
            return Err(Fault::PrivilegeViolation {
                pc,
                num,
                ring,
                required: entry.min_ring,
            });
        }
        trace!(num, %ring, "syscall dispatch");
        let mut ctx = SyscallContext::new(&mut self.registers, &mut self.memory, entry.min_ring);
        let result = entry.handler.invoke(&mut ctx);
        self.registers.write(R1, result);
        Ok(())
    }
}

const fn add_overflows(a: u16, b: u16, result: u16) -> bool {
    (a ^ result) & (b ^ result) & 0x8000 != 0
}

const fn sub_overflows(a: u16, b: u16, result: u16) -> bool {
    (a ^ b) & (a ^ result) & 0x8000 != 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::{Flags, R1, R2, R3};

    fn loaded(words: &[u16]) -> Vm {
        let mut vm = Vm::new();
        vm.load_program(words, 0x0000).unwrap();
        vm
    }

    #[test]
    fn signed_overflow_detection() {
        assert!(add_overflows(0x7FFF, 0x0001, 0x8000));
        assert!(!add_overflows(0xFFFF, 0x0001, 0x0000));
        assert!(sub_overflows(0x8000, 0x0001, 0x7FFF));
        assert!(!sub_overflows(0x0000, 0x0001, 0xFFFF));
    }

    #[test]
    fn add_sets_carry_on_wraparound() {
        let mut vm = loaded(&[0x1312, 0xFFFF]); // ADD R3, R1, R2; HALT
        vm.registers_mut().write(R1, 0xFFFF);
        vm.registers_mut().write(R2, 0x0002);
        vm.run(10).unwrap();
        assert_eq!(vm.registers().read(R3), 0x0001);
        let flags = vm.registers().flags();
        assert!(flags.contains(Flags::C));
        assert!(!flags.contains(Flags::Z));
        assert!(!flags.contains(Flags::V));
    }

    #[test]
    fn sub_to_zero_sets_z_and_no_borrow() {
        let mut vm = loaded(&[0x3312, 0xFFFF]); // SUB R3, R1, R2; HALT
        vm.registers_mut().write(R1, 7);
        vm.registers_mut().write(R2, 7);
        vm.run(10).unwrap();
        assert_eq!(vm.registers().read(R3), 0);
        assert_eq!(vm.registers().flags(), Flags::Z);
    }

    #[test]
    fn shifts_of_sixteen_or_more_yield_zero() {
        let mut vm = loaded(&[0x8312, 0xFFFF]); // SHL R3, R1, R2; HALT
        vm.registers_mut().write(R1, 0x1234);
        vm.registers_mut().write(R2, 16);
        vm.run(10).unwrap();
        assert_eq!(vm.registers().read(R3), 0);
        assert!(vm.registers().flags().contains(Flags::Z));
    }

    #[test]
    fn loadi_clears_n_c_v() {
        let mut vm = loaded(&[0xC100, 0xFFFF]); // LOADI R1, 0; HALT
        vm.run(10).unwrap();
        assert_eq!(vm.registers().flags(), Flags::Z);
    }

    #[test]
    fn halted_machine_steps_idempotently() {
        let mut vm = loaded(&[0xFFFF]);
        assert_eq!(vm.step(), Ok(Step::Halted));
        assert_eq!(vm.step(), Ok(Step::Halted));
        assert_eq!(vm.run(5), Ok(0));
        assert_eq!(vm.cycles(), 1);
    }

    #[test]
    fn faulted_machine_returns_the_same_fault() {
        let mut vm = loaded(&[0xE3FD]);
        let fault = vm.step().unwrap_err();
        assert_eq!(
            fault,
            Fault::IllegalInstruction {
                pc: 0,
                word: 0xE3FD
            }
        );
        assert_eq!(vm.step(), Err(fault.clone()));
        assert_eq!(vm.run(10), Err(fault.clone()));
        assert_eq!(vm.fault(), Some(&fault));
        assert!(!vm.halted());
    }

    #[test]
    fn fetch_past_code_region_is_an_invalid_access() {
        // No HALT: execution runs off the end of the code region.
        let mut vm = loaded(&[0xC101]);
        let fault = vm.run(1000).unwrap_err();
        assert!(matches!(
            fault,
            Fault::InvalidAccess {
                pc: 0x0100,
                addr: 0x0100,
                ..
            }
        ));
    }

    #[test]
    fn load_program_refusals() {
        let mut vm = Vm::new();
        assert_eq!(
            vm.load_program(&[0; 2], 0x00FF),
            Err(LoadError::NotExecutable { addr: 0x0100 })
        );
        assert_eq!(
            vm.load_program(&[0; 0x1001], 0xEFFF),
            Err(LoadError::OutOfBounds {
                base: 0xEFFF,
                words: 0x1001,
            })
        );
    }
}
