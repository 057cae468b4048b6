//! Architectural fault codes.

use thiserror::Error;

/// Result of executing a single instruction. [`Ok`] if execution completed,
/// [`Err`] carrying the fault the instruction raised otherwise.
///
/// The embedder is the fault reporter: partial effects the instruction
/// committed before faulting stay committed, and the instruction pointer
/// has already advanced past the faulting instruction.
pub type ExecutionResult = Result<(), Fault>;

/// A fault record, with the fault type in the high halfword of its code and
/// the subtype in the low halfword.
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq)]
pub enum Fault {
    /// An opcode outside the implemented set, a reserved addressing mode,
    /// or any floating-point encoding.
    #[error("operation fault: invalid opcode")]
    InvalidOpcode,
    /// Signed arithmetic overflowed while the overflow mask bit was clear.
    #[error("arithmetic fault: integer overflow")]
    IntegerOverflow,
    /// A divide or remainder with a zero divisor.
    #[error("arithmetic fault: zero divide")]
    ZeroDivide,
    /// A conditional fault instruction whose condition held.
    #[error("constraint fault: range")]
    ConstraintRange,
    /// A supervisor-only operation executed in user mode.
    #[error("type fault: mismatch")]
    TypeMismatch,
}

impl Fault {
    /// Returns the architectural fault code for this fault.
    pub fn code(self) -> u32 {
        match self {
            Self::InvalidOpcode => 0x0002_0001,
            Self::IntegerOverflow => 0x0003_0001,
            Self::ZeroDivide => 0x0003_0002,
            Self::ConstraintRange => 0x0005_0001,
            Self::TypeMismatch => 0x000A_0001,
        }
    }

    /// Returns the fault type (the high halfword of the code).
    pub fn fault_type(self) -> u32 {
        self.code() >> 16
    }

    /// Returns the fault subtype (the low halfword of the code).
    pub fn subtype(self) -> u32 {
        self.code() & 0xFFFF
    }
}
