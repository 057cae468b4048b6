//! The memory capability consumed by the execution core.

use crate::core::Core;
use crate::fault::ExecutionResult;

/// The external world as the core sees it: a flat little-endian 32-bit
/// address space with byte, short, and word access, an advisory lock for
/// atomic read-modify-write windows, and the supervisor call table.
///
/// Accesses are infallible; a bus decides for itself how to treat addresses
/// nothing is mapped at. Reads take `&mut self` because a read of a
/// memory-mapped device register may well have side effects.
///
/// The interrupt-control register lives at address `0xFF00_8510` on this
/// bus; the core's `intdis`/`inten` instructions read-modify-write its
/// global-interrupt-enable bit like any other word.
pub trait SystemBus {
    /// Reads the byte at `address`.
    fn read_byte(&mut self, address: u32) -> u8;

    /// Reads the little-endian 16-bit short at `address`.
    fn read_short(&mut self, address: u32) -> u16;

    /// Reads the little-endian 32-bit word at `address`.
    fn read_word(&mut self, address: u32) -> u32;

    /// Stores a byte at `address`.
    fn write_byte(&mut self, address: u32, value: u8);

    /// Stores a little-endian 16-bit short at `address`.
    fn write_short(&mut self, address: u32, value: u16);

    /// Stores a little-endian 32-bit word at `address`.
    fn write_word(&mut self, address: u32, value: u32);

    /// Acquires the bus lock fencing an atomic read-modify-write.
    ///
    /// A single-master configuration may leave this as the default no-op.
    /// When several emulated masters share one memory image, the lock must
    /// mutually exclude them for the whole lock/unlock window.
    fn lock(&mut self) {}

    /// Releases the bus lock.
    fn unlock(&mut self) {}

    /// Dispatches a `calls` instruction through the system procedure table.
    ///
    /// The table walk and the supervisor stack switch belong to the board,
    /// not the core, so the core hands over itself and the call-table
    /// index. The default implementation treats the call table as absent
    /// and does nothing.
    fn system_call(&mut self, core: &mut Core, index: u32) -> ExecutionResult {
        let _ = (core, index);
        Ok(())
    }
}
