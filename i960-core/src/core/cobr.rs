//! COBR-format execution: compare-and-branch, bit-test-and-branch, and
//! test-condition-into-register.

use super::Executor;
use crate::bits;
use crate::bus::SystemBus;
use crate::fault::ExecutionResult;
use crate::instruction::{CobrOp, Operand};
use crate::registers::Specifier;

impl<'c, B: SystemBus> Executor<'c, B> {
    pub(super) fn execute_cobr(
        &mut self,
        ip: u32,
        op: CobrOp,
        src1: Operand,
        src2: Specifier,
        displacement: i32,
    ) -> ExecutionResult {
        let target = ip.wrapping_add_signed(displacement);
        match op {
            CobrOp::Test { cond, dst } => {
                let holds = self.core.arith_controls.test(cond);
                self.core.registers.set(dst, holds as u32);
            }
            CobrOp::BranchOnBit { set } => {
                let pos = self.value(src1);
                let word = self.core.registers.get(src2);
                let matched = (bits::bit_select(word, pos) != 0) == set;
                self.core
                    .arith_controls
                    .set_condition(if matched { 2 } else { 0 });
                if matched {
                    self.branch(target);
                }
            }
            CobrOp::CompareBranch { integer, cond } => {
                let a = self.value(src1);
                let b = self.core.registers.get(src2);
                self.core.compare(a, b, integer);
                if self.core.arith_controls.test(cond) {
                    self.branch(target);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::core::testing::*;
    use crate::instruction::encode::*;
    use crate::registers::Specifier;

    #[test]
    fn test_compare_branch_taken() {
        // cmpibl r3, r4, +0x40 with r3 = 5, r4 = 7
        let (mut core, mut ram) = setup(&[cobr(0x3C, 3, false, 4, 0x40)]);
        core.registers_mut().set(Specifier::from_u5(3), 5);
        core.registers_mut().set(Specifier::from_u5(4), 7);
        core.step(&mut ram).unwrap();
        assert_eq!(4, core.arith_controls().condition());
        assert_eq!(BASE + 0x40, core.registers().ip());
    }

    #[test]
    fn test_compare_branch_not_taken() {
        let (mut core, mut ram) = setup(&[cobr(0x3C, 3, false, 4, 0x40)]);
        core.registers_mut().set(Specifier::from_u5(3), 7);
        core.registers_mut().set(Specifier::from_u5(4), 5);
        core.step(&mut ram).unwrap();
        assert_eq!(1, core.arith_controls().condition());
        assert_eq!(BASE + 4, core.registers().ip());
    }

    #[test]
    fn test_compare_branch_signedness() {
        // cmpobg: unsigned, so 0xFFFF_FFFF is greater than 1.
        let (mut core, mut ram) = setup(&[cobr(0x31, 3, false, 4, 0x40)]);
        core.registers_mut().set(Specifier::from_u5(3), 0xFFFF_FFFF);
        core.registers_mut().set(Specifier::from_u5(4), 1);
        core.step(&mut ram).unwrap();
        assert_eq!(BASE + 0x40, core.registers().ip());

        // cmpibg: signed, so the same pattern is -1 and less than 1.
        let (mut core, mut ram) = setup(&[cobr(0x39, 3, false, 4, 0x40)]);
        core.registers_mut().set(Specifier::from_u5(3), 0xFFFF_FFFF);
        core.registers_mut().set(Specifier::from_u5(4), 1);
        core.step(&mut ram).unwrap();
        assert_eq!(4, core.arith_controls().condition());
        assert_eq!(BASE + 4, core.registers().ip());
    }

    #[test]
    fn test_compare_branch_literal() {
        // cmpobe 10, r4, +8
        let (mut core, mut ram) = setup(&[cobr(0x32, 10, true, 4, 8)]);
        core.registers_mut().set(Specifier::from_u5(4), 10);
        core.step(&mut ram).unwrap();
        assert_eq!(2, core.arith_controls().condition());
        assert_eq!(BASE + 8, core.registers().ip());
    }

    #[test]
    fn test_branch_on_bit_set() {
        // bbs 5, r4, -0x10 with bit 5 of r4 set
        let (mut core, mut ram) = setup(&[cobr(0x37, 5, true, 4, -0x10)]);
        core.registers_mut().set(Specifier::from_u5(4), 0x0000_0020);
        core.step(&mut ram).unwrap();
        assert_eq!(2, core.arith_controls().condition());
        assert_eq!(BASE - 0x10, core.registers().ip());
    }

    #[test]
    fn test_branch_on_bit_clear() {
        // bbc misses on a set bit: condition code clears, no branch.
        let (mut core, mut ram) = setup(&[cobr(0x30, 5, true, 4, 0x20)]);
        core.registers_mut().set(Specifier::from_u5(4), 0x0000_0020);
        core.arith_controls_mut().set_condition(4);
        core.step(&mut ram).unwrap();
        assert_eq!(0, core.arith_controls().condition());
        assert_eq!(BASE + 4, core.registers().ip());

        let (mut core, mut ram) = setup(&[cobr(0x30, 5, true, 4, 0x20)]);
        core.registers_mut().set(Specifier::from_u5(4), 0xFFFF_FFDF);
        core.step(&mut ram).unwrap();
        assert_eq!(2, core.arith_controls().condition());
        assert_eq!(BASE + 0x20, core.registers().ip());
    }

    #[test]
    fn test_test_condition() {
        // testl writes 1 into its register when the code says less.
        let (mut core, mut ram) = setup(&[cobr(0x24, 6, false, 0, 0)]);
        core.arith_controls_mut().set_condition(4);
        core.registers_mut().set(Specifier::from_u5(6), 0xDEAD_BEEF);
        core.step(&mut ram).unwrap();
        assert_eq!(1, core.registers().get(Specifier::from_u5(6)));

        // testno with a non-zero code writes 0.
        let (mut core, mut ram) = setup(&[cobr(0x20, 6, false, 0, 0)]);
        core.arith_controls_mut().set_condition(2);
        core.registers_mut().set(Specifier::from_u5(6), 0xDEAD_BEEF);
        core.step(&mut ram).unwrap();
        assert_eq!(0, core.registers().get(Specifier::from_u5(6)));
    }
}
