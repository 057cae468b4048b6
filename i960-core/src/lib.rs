#[macro_use]
extern crate static_assertions;

pub mod bits;
pub mod bus;
pub mod controls;
pub mod core;
pub mod disasm;
pub mod fault;
pub mod instruction;
pub mod ram;
pub mod registers;

pub use crate::bus::SystemBus;
pub use crate::core::Core;
pub use crate::disasm::{disassemble, Disassembly};
pub use crate::fault::{ExecutionResult, Fault};
pub use crate::ram::Ram;
