//! The 80960 execution core: fetch, decode dispatch, and the engines
//! shared between the four instruction formats.

mod cobr;
mod ctrl;
mod mem;
mod reg;

use log::trace;

use crate::bus::SystemBus;
use crate::controls::{ArithControls, ProcessControls, TraceControls};
use crate::fault::{ExecutionResult, Fault};
use crate::instruction::{Instruction, Operand};
use crate::registers::{Registers, Specifier};

/// A single 80960 core.
///
/// The core owns the architectural state and nothing else; emulated memory
/// stays behind the [`SystemBus`] handed to [`Core::step`]. Instructions
/// execute strictly in program order, each one mutating state synchronously
/// before the next is fetched.
#[derive(Debug)]
pub struct Core {
    registers: Registers,
    arith_controls: ArithControls,
    process_controls: ProcessControls,
    trace_controls: TraceControls,
}

impl Core {
    /// Creates a core with an all-zero register file and the instruction
    /// pointer at `reset_ip`.
    pub fn new(reset_ip: u32) -> Self {
        Self {
            registers: Registers::new(reset_ip),
            arith_controls: ArithControls::new(),
            process_controls: ProcessControls::new(),
            trace_controls: TraceControls::new(),
        }
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.registers
    }

    pub fn arith_controls(&self) -> &ArithControls {
        &self.arith_controls
    }

    pub fn arith_controls_mut(&mut self) -> &mut ArithControls {
        &mut self.arith_controls
    }

    pub fn process_controls(&self) -> &ProcessControls {
        &self.process_controls
    }

    pub fn process_controls_mut(&mut self) -> &mut ProcessControls {
        &mut self.process_controls
    }

    pub fn trace_controls(&self) -> &TraceControls {
        &self.trace_controls
    }

    pub fn trace_controls_mut(&mut self) -> &mut TraceControls {
        &mut self.trace_controls
    }

    /// Fetches and executes the instruction at the current instruction
    /// pointer.
    ///
    /// The instruction pointer advances past the instruction before it
    /// executes, so branch displacements are computed from the fetch
    /// address while `bal`/`call` link the next instruction.
    ///
    /// A fault is returned to the caller, which acts as the fault handler;
    /// whatever the instruction committed before faulting stays committed.
    pub fn step<B: SystemBus>(&mut self, bus: &mut B) -> ExecutionResult {
        let ip = self.registers.ip();
        let word = bus.read_word(ip);
        let size = Instruction::size_of(word);
        let extension = if size == 8 {
            bus.read_word(ip.wrapping_add(4))
        } else {
            0
        };
        self.registers.set_ip(ip.wrapping_add(size));
        let instruction = match Instruction::decode(word, extension) {
            Ok(instruction) => instruction,
            Err(error) => {
                trace!("rejected encoding {word:#010x} at {ip:#010x}: {error}");
                return Err(Fault::InvalidOpcode);
            }
        };
        let result = Executor { core: self, bus }.execute(ip, instruction);
        if let Err(fault) = result {
            trace!("fault {:#010x} ({fault}) at {ip:#010x}", fault.code());
        }
        result
    }

    /// Compares `a` with `b` and sets the condition code to one of less
    /// (100), equal (010), or greater (001).
    pub(crate) fn compare(&mut self, a: u32, b: u32, integer: bool) {
        let less = if integer {
            (a as i32) < (b as i32)
        } else {
            a < b
        };
        let cc = if less {
            4
        } else if a == b {
            2
        } else {
            1
        };
        self.arith_controls.set_condition(cc);
    }

    /// The consecutive compare used for range checks: a preceding compare
    /// that reported "not less" is refined to equal (`a <= b`) or greater,
    /// and a "less" outcome is left alone.
    pub(crate) fn compare_conditional(&mut self, a: u32, b: u32, integer: bool) {
        if self.arith_controls.condition() & 4 != 0 {
            return;
        }
        let le = if integer {
            (a as i32) <= (b as i32)
        } else {
            a <= b
        };
        self.arith_controls.set_condition(if le { 2 } else { 1 });
    }
}

/// Executes one decoded instruction against a core and its bus.
pub(crate) struct Executor<'c, B: SystemBus> {
    core: &'c mut Core,
    bus: &'c mut B,
}

impl<'c, B: SystemBus> Executor<'c, B> {
    fn execute(mut self, ip: u32, instruction: Instruction) -> ExecutionResult {
        match instruction {
            Instruction::Ctrl { op, displacement } => self.execute_ctrl(ip, op, displacement),
            Instruction::Cobr {
                op,
                src1,
                src2,
                displacement,
            } => self.execute_cobr(ip, op, src1, src2, displacement),
            Instruction::Reg {
                op,
                src1,
                src2,
                dst,
            } => self.execute_reg(op, src1, src2, dst),
            Instruction::Mem {
                op,
                addressing,
                reg,
            } => self.execute_mem(ip, op, addressing, reg),
        }
    }

    /// Resolves a source operand to its value.
    fn value(&self, operand: Operand) -> u32 {
        match operand {
            Operand::Register(specifier) => self.core.registers.get(specifier),
            Operand::Literal(value) => value as u32,
        }
    }

    fn branch(&mut self, efa: u32) {
        self.core.registers.set_ip(efa);
    }

    fn branch_and_link(&mut self, efa: u32, link: Specifier) {
        // The instruction pointer already holds the next instruction.
        let next = self.core.registers.ip();
        self.core.registers.set(link, next);
        self.branch(efa);
    }

    /// Allocates a new frame and transfers to `efa`.
    ///
    /// > The processor rounds the stack pointer up to the next 64-byte
    /// > boundary to form the new frame pointer, saves the sixteen local
    /// > registers in the frame of the calling procedure, and allocates 64
    /// > bytes for the new set of local registers.
    fn call(&mut self, efa: u32) {
        let registers = &mut self.core.registers;
        let sp = registers.get(Specifier::SP);
        let new_fp = sp.wrapping_add(63) & !63;
        let next = registers.ip();
        registers.set(Specifier::RIP, next);
        let fp = registers.get(Specifier::FP);
        self.store_locals(fp);
        let registers = &mut self.core.registers;
        registers.set(Specifier::PFP, fp);
        registers.set(Specifier::FP, new_fp);
        registers.set(Specifier::SP, new_fp.wrapping_add(64));
        self.branch(efa);
    }

    /// Tears down the current frame and returns through the saved RIP.
    // TODO: fault, system and interrupt return paths (PFP return-status
    // bits non-zero); only the local return is implemented.
    fn ret(&mut self) -> ExecutionResult {
        let pfp = self.core.registers.get(Specifier::PFP);
        if pfp & 0x7 != 0 {
            return Err(Fault::InvalidOpcode);
        }
        let fp = pfp & !63;
        self.core.registers.set(Specifier::FP, fp);
        self.load_locals(fp);
        let rip = self.core.registers.get(Specifier::RIP);
        self.branch(rip);
        Ok(())
    }

    /// Writes the sixteen local registers to sixteen consecutive words at
    /// `base`.
    fn store_locals(&mut self, base: u32) {
        for i in 0..16 {
            let value = self.core.registers.get(Specifier::from_u5(i));
            self.bus.write_word(base.wrapping_add(4 * i as u32), value);
        }
    }

    /// Reloads the sixteen local registers from sixteen consecutive words
    /// at `base`.
    fn load_locals(&mut self, base: u32) {
        for i in 0..16 {
            let value = self.bus.read_word(base.wrapping_add(4 * i as u32));
            self.core.registers.set(Specifier::from_u5(i), value);
        }
    }

    /// Applies the integer overflow policy: fault, unless the mask bit
    /// converts the fault into the sticky flag.
    fn overflow(&mut self) -> ExecutionResult {
        if self.core.arith_controls.overflow_masked() {
            self.core.arith_controls.set_overflow_flag(true);
            Ok(())
        } else {
            Err(Fault::IntegerOverflow)
        }
    }

    /// Rejects a zero divisor before anything is written.
    fn check_divisor(&self, divisor: u32) -> ExecutionResult {
        if divisor == 0 {
            Err(Fault::ZeroDivide)
        } else {
            Ok(())
        }
    }

    /// Rejects supervisor-only work in user mode.
    fn check_supervisor(&self) -> ExecutionResult {
        if self.core.process_controls.is_supervisor() {
            Ok(())
        } else {
            Err(Fault::TypeMismatch)
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Core;
    use crate::bus::SystemBus;
    use crate::ram::Ram;

    /// Where test programs are placed and executed.
    pub const BASE: u32 = 0x4000;

    /// A core about to execute `words` at [`BASE`], over 128 KiB of RAM.
    pub fn setup(words: &[u32]) -> (Core, Ram) {
        let mut ram = Ram::new(0, 0x2_0000);
        for (i, &word) in words.iter().enumerate() {
            ram.write_word(BASE + 4 * i as u32, word);
        }
        (Core::new(BASE), ram)
    }
}
