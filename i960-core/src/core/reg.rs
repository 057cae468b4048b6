//! REG-format execution: the triadic register/literal operations.

use super::Executor;
use crate::bits;
use crate::bus::SystemBus;
use crate::fault::ExecutionResult;
use crate::instruction::{BitwiseOp, MulDivKind, Operand, RegOp, ShiftOp};
use crate::registers::Specifier;

/// Memory-mapped interrupt control register.
const INTERRUPT_CONTROL: u32 = 0xFF00_8510;
/// Global interrupt enable, a bit position within the interrupt control
/// register.
const GLOBAL_INT_ENABLE: u32 = 10;

impl<'c, B: SystemBus> Executor<'c, B> {
    pub(super) fn execute_reg(
        &mut self,
        op: RegOp,
        src1: Operand,
        src2: Operand,
        dst: Specifier,
    ) -> ExecutionResult {
        let a = self.value(src1);
        let b = self.value(src2);
        match op {
            RegOp::Bitwise(op) => {
                let r = self.bitwise(op, a, b);
                self.core.registers.set(dst, r);
                Ok(())
            }
            RegOp::AddSub { integer, subtract } => self.add_sub(integer, subtract, a, b, dst),
            RegOp::CompareNarrow { integer, short } => {
                let narrow = |x: u32| match (short, integer) {
                    (false, false) => x as u8 as u32,
                    (false, true) => x as u8 as i8 as u32,
                    (true, false) => x as u16 as u32,
                    (true, true) => x as u16 as i16 as u32,
                };
                self.core.compare(narrow(a), narrow(b), integer);
                Ok(())
            }
            RegOp::Shift(op) => self.shift(op, a, b, dst),
            RegOp::Compare {
                integer,
                conditional,
            } => {
                if conditional {
                    self.core.compare_conditional(a, b, integer);
                } else {
                    self.core.compare(a, b, integer);
                }
                Ok(())
            }
            RegOp::CompareAdjust { integer, decrement } => {
                self.core.compare(a, b, integer);
                // Overflow from the post-adjust is suppressed.
                let r = if decrement {
                    b.wrapping_sub(1)
                } else {
                    b.wrapping_add(1)
                };
                self.core.registers.set(dst, r);
                Ok(())
            }
            RegOp::Scanbyte => {
                let difference = a ^ b;
                let any = difference.to_le_bytes().iter().any(|&byte| byte == 0);
                self.core
                    .arith_controls
                    .set_condition(if any { 2 } else { 0 });
                Ok(())
            }
            RegOp::Bswap => {
                self.core.registers.set(dst, a.swap_bytes());
                Ok(())
            }
            RegOp::Chkbit => {
                let set = bits::bit_select(b, a) != 0;
                self.core.arith_controls.set_condition(if set { 2 } else { 0 });
                Ok(())
            }
            RegOp::AddSubCarry { subtract } => {
                self.add_sub_carry(subtract, a, b, dst);
                Ok(())
            }
            RegOp::IntDis => {
                let icon = self.bus.read_word(INTERRUPT_CONTROL);
                self.check_supervisor()?;
                // The polarity is deliberate: intdis raises the enable bit
                // and inten lowers it.
                self.bus
                    .write_word(INTERRUPT_CONTROL, icon | bits::bit_mask(GLOBAL_INT_ENABLE));
                Ok(())
            }
            RegOp::IntEn => {
                let icon = self.bus.read_word(INTERRUPT_CONTROL);
                self.check_supervisor()?;
                self.bus
                    .write_word(INTERRUPT_CONTROL, icon & !bits::bit_mask(GLOBAL_INT_ENABLE));
                Ok(())
            }
            RegOp::Move { words } => {
                self.core.registers.set(dst, a);
                let src = src1.field();
                for i in 1..words {
                    let value = self.core.registers.get(Specifier::from_u5(src | i));
                    self.core
                        .registers
                        .set(Specifier::from_u5(u8::from(dst) | i), value);
                }
                Ok(())
            }
            RegOp::Eshro => {
                let high = self
                    .core
                    .registers
                    .get(Specifier::from_u5(src2.field() | 1));
                let pair = (high as u64) << 32 | b as u64;
                self.core.registers.set(dst, (pair >> (a & 31)) as u32);
                Ok(())
            }
            RegOp::Atomic { add } => {
                let address = a & !3;
                self.bus.lock();
                let old = self.bus.read_word(address);
                let new = if add {
                    old.wrapping_add(b)
                } else {
                    bits::modify(old, self.core.registers.get(dst), b)
                };
                self.bus.write_word(address, new);
                self.bus.unlock();
                self.core.registers.set(dst, old);
                Ok(())
            }
            RegOp::ScanBit => {
                self.scan_bit(a, dst);
                Ok(())
            }
            RegOp::SpanBit => {
                self.scan_bit(!a, dst);
                Ok(())
            }
            RegOp::ModAc => {
                let old = self.core.arith_controls.modify(b, a);
                self.core.registers.set(dst, old);
                Ok(())
            }
            RegOp::Modify => {
                let old = self.core.registers.get(dst);
                self.core.registers.set(dst, bits::modify(old, b, a));
                Ok(())
            }
            RegOp::Extract => {
                let old = self.core.registers.get(dst);
                self.core.registers.set(dst, bits::extract(old, a, b));
                Ok(())
            }
            RegOp::ModTc => {
                let old = self.core.trace_controls.modify(b, a & 0x00FF_00FF);
                self.core.registers.set(dst, old);
                Ok(())
            }
            RegOp::ModPc => {
                // src1 carries a copy of the mask; src2 is the one used.
                let mask = b;
                if mask != 0 {
                    self.check_supervisor()?;
                }
                let value = self.core.registers.get(dst);
                let old = self.core.process_controls.modify(value, mask);
                self.core.registers.set(dst, old);
                Ok(())
            }
            RegOp::Calls => self.bus.system_call(&mut *self.core, a),
            RegOp::Mark | RegOp::Fmark => {
                // Trace support is not implemented.
                Ok(())
            }
            RegOp::FlushReg | RegOp::SyncF => {
                // No register cache and no imprecise faults to wait out.
                Ok(())
            }
            RegOp::Emul => {
                let product = a as u64 * b as u64;
                self.core.registers.set(dst, product as u32);
                self.core
                    .registers
                    .set(Specifier::from_u5(u8::from(dst) | 1), (product >> 32) as u32);
                Ok(())
            }
            RegOp::Ediv => {
                self.check_divisor(a)?;
                let high = self
                    .core
                    .registers
                    .get(Specifier::from_u5(src2.field() | 1));
                let pair = (high as u64) << 32 | b as u64;
                self.core.registers.set(dst, (pair % a as u64) as u32);
                self.core
                    .registers
                    .set(Specifier::from_u5(u8::from(dst) | 1), (pair / a as u64) as u32);
                Ok(())
            }
            RegOp::MulDiv { integer, kind } => self.mul_div(integer, kind, a, b, dst),
            RegOp::CondAddSub {
                cond,
                integer,
                subtract,
            } => {
                if self.core.arith_controls.test(cond) {
                    self.add_sub(integer, subtract, a, b, dst)
                } else {
                    Ok(())
                }
            }
            RegOp::Select { cond } => {
                let r = if self.core.arith_controls.test(cond) {
                    b
                } else {
                    a
                };
                self.core.registers.set(dst, r);
                Ok(())
            }
        }
    }

    fn bitwise(&self, op: BitwiseOp, a: u32, b: u32) -> u32 {
        match op {
            BitwiseOp::NotBit => b ^ bits::bit_mask(a),
            BitwiseOp::And => a & b,
            BitwiseOp::AndNot => !a & b,
            BitwiseOp::SetBit => b | bits::bit_mask(a),
            BitwiseOp::NotAnd => a & !b,
            BitwiseOp::Xor => a ^ b,
            BitwiseOp::Or => a | b,
            BitwiseOp::Nor => !(a | b),
            BitwiseOp::Xnor => !(a ^ b),
            BitwiseOp::Not => !a,
            BitwiseOp::OrNot => !a | b,
            BitwiseOp::ClrBit => b & !bits::bit_mask(a),
            BitwiseOp::NotOr => a | !b,
            BitwiseOp::Nand => !(a & b),
            BitwiseOp::AlterBit => {
                if self.core.arith_controls.carry() {
                    b | bits::bit_mask(a)
                } else {
                    b & !bits::bit_mask(a)
                }
            }
        }
    }

    /// `dst = src2 ± src1`, with the overflow policy applied to the
    /// integer forms after the destination is written.
    fn add_sub(
        &mut self,
        integer: bool,
        subtract: bool,
        a: u32,
        b: u32,
        dst: Specifier,
    ) -> ExecutionResult {
        let (r, overflowed) = if subtract {
            let r = b.wrapping_sub(a);
            (r, bits::sub_overflows(a, b, r))
        } else {
            let r = b.wrapping_add(a);
            (r, bits::add_overflows(a, b, r))
        };
        self.core.registers.set(dst, r);
        if integer && overflowed {
            self.overflow()
        } else {
            Ok(())
        }
    }

    /// `addc`/`subc`: extended arithmetic through the carry bit. The
    /// condition code receives carry-out in bit 1 and signed overflow in
    /// bit 0; no fault is raised.
    fn add_sub_carry(&mut self, subtract: bool, a: u32, b: u32, dst: Specifier) {
        let carry_in = self.core.arith_controls.carry();
        let (r, carry_out, overflowed) = if subtract {
            // src2 - src1 - 1 + carry, as a borrow chain.
            let (r, borrow) = bits::sbb(b, a, !carry_in);
            (r, !borrow, bits::sub_overflows(a, b, r))
        } else {
            let (r, carry) = bits::adc(b, a, carry_in);
            (r, carry, bits::add_overflows(a, b, r))
        };
        self.core.registers.set(dst, r);
        self.core
            .arith_controls
            .set_condition((carry_out as u32) << 1 | overflowed as u32);
    }

    fn shift(&mut self, op: ShiftOp, a: u32, b: u32, dst: Specifier) -> ExecutionResult {
        let r = match op {
            ShiftOp::Shro => {
                if a < 32 {
                    b >> a
                } else {
                    0
                }
            }
            ShiftOp::Shlo => {
                if a < 32 {
                    b << a
                } else {
                    0
                }
            }
            ShiftOp::Shri => ((b as i32) >> a.min(31)) as u32,
            ShiftOp::Shrdi => {
                let n = a.min(31);
                let mut r = ((b as i32) >> n) as u32;
                // A negative value that shed non-zero bits rounds toward
                // zero instead of toward negative infinity.
                if (b as i32) < 0 && b != r.wrapping_shl(n) {
                    r = r.wrapping_add(1);
                }
                r
            }
            ShiftOp::Rotate => b.rotate_left(a & 31),
            ShiftOp::Shli => {
                let x = (b as i32) as i64;
                let shifted = (x << a.min(32)) as u64;
                self.core.registers.set(dst, shifted as u32);
                // Overflow when anything other than sign copies crossed
                // bit 31.
                if (shifted ^ x as u64) >> 31 != 0 {
                    return self.overflow();
                }
                return Ok(());
            }
        };
        self.core.registers.set(dst, r);
        Ok(())
    }

    /// Finds the most significant set bit: its position into `dst` and a
    /// condition code of 2, or all-ones and 0 when there is none.
    fn scan_bit(&mut self, value: u32, dst: Specifier) {
        let (r, cc) = if value == 0 {
            (u32::MAX, 0)
        } else {
            (31 - value.leading_zeros(), 2)
        };
        self.core.registers.set(dst, r);
        self.core.arith_controls.set_condition(cc);
    }

    fn mul_div(
        &mut self,
        integer: bool,
        kind: MulDivKind,
        a: u32,
        b: u32,
        dst: Specifier,
    ) -> ExecutionResult {
        if !integer {
            match kind {
                MulDivKind::Multiply => self.core.registers.set(dst, a.wrapping_mul(b)),
                MulDivKind::Divide => {
                    self.check_divisor(a)?;
                    self.core.registers.set(dst, b / a);
                }
                MulDivKind::Remainder | MulDivKind::Modulo => {
                    self.check_divisor(a)?;
                    self.core.registers.set(dst, b % a);
                }
            }
            return Ok(());
        }
        let (ai, bi) = (a as i32, b as i32);
        match kind {
            MulDivKind::Multiply => {
                let product = ai as i64 * bi as i64;
                self.core.registers.set(dst, product as u32);
                if product < i32::MIN as i64 || product > i32::MAX as i64 {
                    return self.overflow();
                }
            }
            MulDivKind::Divide => {
                self.check_divisor(a)?;
                let (q, overflowed) = bi.overflowing_div(ai);
                self.core.registers.set(dst, q as u32);
                if overflowed {
                    return self.overflow();
                }
            }
            MulDivKind::Remainder | MulDivKind::Modulo => {
                self.check_divisor(a)?;
                let mut r = bi.wrapping_rem(ai);
                if kind == MulDivKind::Modulo && r != 0 && (ai ^ bi) < 0 {
                    // Pull the remainder over to the divisor's sign.
                    r = r.wrapping_add(ai);
                }
                self.core.registers.set(dst, r as u32);
            }
        }
        Ok(())
    }
}
