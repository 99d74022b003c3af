use crate::arch::CpuState;
use crate::cpu_type::CpuType;
use crate::memory_type::{AccessIntent, AddressInfo};
use crate::operation::MemoryOperationInfo;

/// View of an execution core the debugger needs while handling an access.
pub trait DebugTarget {
    /// Resolves a CPU address to its backing store, `None` when nothing is mapped there.
    fn absolute_address(&self, address: u32, intent: AccessIntent) -> Option<AddressInfo>;

    /// Current register snapshot.
    fn state(&self) -> CpuState;

    fn master_clock(&self) -> u64;
}

/// Host-side assembler for architectures that support patching code in place.
pub trait Assembler {
    /// Assembles `source` at `address`, returning the encoded bytes.
    fn assemble(&mut self, source: &str, address: u32) -> Result<Vec<u8>, String>;
}

/// Receives `mark_event` breakpoint hits for the event viewer.
pub trait EventManager {
    fn add_event(
        &mut self,
        cpu: CpuType,
        operation: &MemoryOperationInfo,
        address: Option<AddressInfo>,
    );
}
