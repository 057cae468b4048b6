//! MEM-format execution: effective-address computation, loads, stores,
//! `lda`, and the indirect control transfers.

use super::Executor;
use crate::bus::SystemBus;
use crate::fault::ExecutionResult;
use crate::instruction::{Addressing, MemOp, MemSize};
use crate::registers::Specifier;

impl<'c, B: SystemBus> Executor<'c, B> {
    pub(super) fn execute_mem(
        &mut self,
        ip: u32,
        op: MemOp,
        addressing: Addressing,
        reg: Specifier,
    ) -> ExecutionResult {
        let efa = self.effective_address(ip, addressing);
        match op {
            MemOp::Load(size) => {
                self.load(size, efa, reg);
                Ok(())
            }
            MemOp::Store(size) => self.store(size, efa, reg),
            MemOp::Bx => {
                self.branch(efa);
                Ok(())
            }
            MemOp::Balx => {
                self.branch_and_link(efa, reg);
                Ok(())
            }
            MemOp::Callx => {
                self.call(efa);
                Ok(())
            }
            MemOp::Lda => {
                self.core.registers.set(reg, efa);
                Ok(())
            }
        }
    }

    fn effective_address(&self, ip: u32, addressing: Addressing) -> u32 {
        let registers = &self.core.registers;
        match addressing {
            Addressing::Offset { offset } => offset,
            Addressing::OffsetBase { base, offset } => {
                registers.get(base).wrapping_add(offset)
            }
            Addressing::Indirect { base } => registers.get(base),
            Addressing::IpRelative { displacement } => {
                ip.wrapping_add(8).wrapping_add(displacement)
            }
            Addressing::IndirectIndexed { base, index, scale } => registers
                .get(base)
                .wrapping_add(registers.get(index) << scale),
            Addressing::Absolute { displacement } => displacement,
            Addressing::IndirectOffset { base, displacement } => {
                registers.get(base).wrapping_add(displacement)
            }
            Addressing::IndexedOffset {
                index,
                scale,
                displacement,
            } => (registers.get(index) << scale).wrapping_add(displacement),
            Addressing::IndirectIndexedOffset {
                base,
                index,
                scale,
                displacement,
            } => registers
                .get(base)
                .wrapping_add(registers.get(index) << scale)
                .wrapping_add(displacement),
        }
    }

    fn load(&mut self, size: MemSize, efa: u32, reg: Specifier) {
        match size {
            MemSize::Byte { signed } => {
                let x = self.bus.read_byte(efa);
                let value = if signed { x as i8 as u32 } else { x as u32 };
                self.core.registers.set(reg, value);
            }
            MemSize::Short { signed } => {
                let x = self.bus.read_short(efa);
                let value = if signed { x as i16 as u32 } else { x as u32 };
                self.core.registers.set(reg, value);
            }
            MemSize::Word => {
                let value = self.bus.read_word(efa);
                self.core.registers.set(reg, value);
            }
            MemSize::Long => self.load_words(efa, reg, 2),
            MemSize::Triple => self.load_words(efa, reg, 3),
            MemSize::Quad => self.load_words(efa, reg, 4),
        }
    }

    /// Loads `count` consecutive words in ascending address order into the
    /// register group at `reg`.
    fn load_words(&mut self, efa: u32, reg: Specifier, count: u8) {
        for i in 0..count {
            let value = self.bus.read_word(efa.wrapping_add(4 * i as u32));
            self.core
                .registers
                .set(Specifier::from_u5(u8::from(reg) | i), value);
        }
    }

    fn store(&mut self, size: MemSize, efa: u32, reg: Specifier) -> ExecutionResult {
        match size {
            MemSize::Byte { signed } => {
                let x = self.core.registers.get(reg);
                self.bus.write_byte(efa, x as u8);
                // The narrowing check comes after the store; the write is
                // architecturally committed either way.
                if signed && x as i32 != x as u8 as i8 as i32 {
                    return self.overflow();
                }
            }
            MemSize::Short { signed } => {
                let x = self.core.registers.get(reg);
                self.bus.write_short(efa, x as u16);
                if signed && x as i32 != x as u16 as i16 as i32 {
                    return self.overflow();
                }
            }
            MemSize::Word => {
                let value = self.core.registers.get(reg);
                self.bus.write_word(efa, value);
            }
            MemSize::Long => self.store_words(efa, reg, 2),
            MemSize::Triple => self.store_words(efa, reg, 3),
            MemSize::Quad => self.store_words(efa, reg, 4),
        }
        Ok(())
    }

    /// Stores `count` consecutive words in ascending address order from
    /// the register group at `reg`.
    fn store_words(&mut self, efa: u32, reg: Specifier, count: u8) {
        for i in 0..count {
            let value = self.core.registers.get(Specifier::from_u5(u8::from(reg) | i));
            self.bus.write_word(efa.wrapping_add(4 * i as u32), value);
        }
    }
}
