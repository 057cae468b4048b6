//! CTRL-format execution: branches, calls, returns, and conditional
//! faults, all addressed by a 24-bit displacement from the instruction.

use super::Executor;
use crate::bus::SystemBus;
use crate::fault::{ExecutionResult, Fault};
use crate::instruction::CtrlOp;
use crate::registers::Specifier;

impl<'c, B: SystemBus> Executor<'c, B> {
    pub(super) fn execute_ctrl(
        &mut self,
        ip: u32,
        op: CtrlOp,
        displacement: i32,
    ) -> ExecutionResult {
        let efa = ip.wrapping_add_signed(displacement);
        match op {
            CtrlOp::Branch => {
                self.branch(efa);
                Ok(())
            }
            CtrlOp::Call => {
                self.call(efa);
                Ok(())
            }
            CtrlOp::Ret => self.ret(),
            CtrlOp::BranchAndLink => {
                self.branch_and_link(efa, Specifier::LP);
                Ok(())
            }
            CtrlOp::BranchIf(cond) => {
                if self.core.arith_controls.test(cond) {
                    self.branch(efa);
                }
                Ok(())
            }
            CtrlOp::FaultIf(cond) => {
                if self.core.arith_controls.test(cond) {
                    Err(Fault::ConstraintRange)
                } else {
                    Ok(())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::bus::SystemBus;
    use crate::core::testing::*;
    use crate::fault::Fault;
    use crate::instruction::encode::*;
    use crate::registers::Specifier;

    #[test]
    fn test_branch() {
        let (mut core, mut ram) = setup(&[ctrl(0x08, 0x40)]);
        core.step(&mut ram).unwrap();
        assert_eq!(BASE + 0x40, core.registers().ip());
    }

    #[test]
    fn test_branch_backwards() {
        let (mut core, mut ram) = setup(&[ctrl(0x08, -0x1000)]);
        core.step(&mut ram).unwrap();
        assert_eq!(BASE - 0x1000, core.registers().ip());
    }

    #[test]
    fn test_branch_and_link() {
        let (mut core, mut ram) = setup(&[ctrl(0x0B, 0x100)]);
        core.step(&mut ram).unwrap();
        assert_eq!(BASE + 0x100, core.registers().ip());
        // The link register holds the address of the next instruction.
        assert_eq!(BASE + 4, core.registers().get(Specifier::LP));
    }

    #[test]
    fn test_conditional_branch() {
        // bl: taken only when the condition code says less.
        let (mut core, mut ram) = setup(&[ctrl(0x14, 0x40), ctrl(0x14, 0x40)]);
        core.arith_controls_mut().set_condition(4);
        core.step(&mut ram).unwrap();
        assert_eq!(BASE + 0x40, core.registers().ip());

        let (mut core, mut ram) = setup(&[ctrl(0x14, 0x40)]);
        core.arith_controls_mut().set_condition(1);
        core.step(&mut ram).unwrap();
        assert_eq!(BASE + 4, core.registers().ip());
    }

    #[test]
    fn test_branch_no_condition() {
        // bno takes only a zero condition code.
        let (mut core, mut ram) = setup(&[ctrl(0x10, 0x40)]);
        core.step(&mut ram).unwrap();
        assert_eq!(BASE + 0x40, core.registers().ip());

        let (mut core, mut ram) = setup(&[ctrl(0x10, 0x40)]);
        core.arith_controls_mut().set_condition(2);
        core.step(&mut ram).unwrap();
        assert_eq!(BASE + 4, core.registers().ip());
    }

    #[test]
    fn test_conditional_fault() {
        let (mut core, mut ram) = setup(&[ctrl(0x1A, 0)]);
        core.arith_controls_mut().set_condition(2);
        assert_eq!(Err(Fault::ConstraintRange), core.step(&mut ram));

        let (mut core, mut ram) = setup(&[ctrl(0x1A, 0)]);
        core.arith_controls_mut().set_condition(1);
        assert_eq!(Ok(()), core.step(&mut ram));
    }

    #[test]
    fn test_call_allocates_frame() {
        let (mut core, mut ram) = setup(&[ctrl(0x09, 0x100)]);
        core.registers_mut().set(Specifier::SP, 0x1040);
        core.registers_mut().set(Specifier::FP, 0x1000);
        for i in 3..16 {
            core.registers_mut()
                .set(Specifier::from_u5(i), 0x1111_0000 + i as u32);
        }
        core.step(&mut ram).unwrap();

        assert_eq!(BASE + 0x100, core.registers().ip());
        // The stack pointer was already aligned, so it becomes the frame.
        assert_eq!(0x1040, core.registers().get(Specifier::FP));
        assert_eq!(0x1080, core.registers().get(Specifier::SP));
        assert_eq!(0x1000, core.registers().get(Specifier::PFP));
        assert_eq!(BASE + 4, core.registers().get(Specifier::RIP));
        // The window went to the old frame, sixteen consecutive words,
        // holding the pre-call values of r0..r15.
        assert_eq!(0x1040, ram.read_word(0x1000 + 4));
        assert_eq!(BASE + 4, ram.read_word(0x1000 + 4 * 2));
        assert_eq!(0x1111_0003, ram.read_word(0x1000 + 4 * 3));
        assert_eq!(0x1111_000F, ram.read_word(0x1000 + 4 * 15));
    }

    #[test]
    fn test_call_ret_round_trip() {
        let (mut core, mut ram) = setup(&[ctrl(0x09, 0x100)]);
        ram.write_word(BASE + 0x100, ctrl(0x0A, 0));
        core.registers_mut().set(Specifier::SP, 0x1044);
        core.registers_mut().set(Specifier::FP, 0x1000);
        for i in 3..16 {
            core.registers_mut()
                .set(Specifier::from_u5(i), 0x2222_0000 + i as u32);
        }

        core.step(&mut ram).unwrap();
        // An unaligned stack pointer rounds up to the next boundary.
        assert_eq!(0x1080, core.registers().get(Specifier::FP));
        assert_eq!(0x10C0, core.registers().get(Specifier::SP));
        core.step(&mut ram).unwrap();

        assert_eq!(BASE + 4, core.registers().ip());
        assert_eq!(0x1000, core.registers().get(Specifier::FP));
        assert_eq!(0x1044, core.registers().get(Specifier::SP));
        for i in 3..16 {
            assert_eq!(
                0x2222_0000 + i as u32,
                core.registers().get(Specifier::from_u5(i))
            );
        }
    }

    #[test]
    fn test_ret_refuses_nonlocal_return() {
        let (mut core, mut ram) = setup(&[ctrl(0x0A, 0)]);
        core.registers_mut().set(Specifier::PFP, 0x1000 | 0x2);
        core.registers_mut().set(Specifier::FP, 0x2000);
        assert_eq!(Err(Fault::InvalidOpcode), core.step(&mut ram));
        // Nothing beyond the instruction pointer moved.
        assert_eq!(0x2000, core.registers().get(Specifier::FP));
    }
}
