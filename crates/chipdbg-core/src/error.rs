use thiserror::Error;

use crate::arch::Capability;
use crate::cpu_type::CpuType;
use crate::memory_type::MemoryType;
use crate::step::StepType;

/// Errors surfaced by the debugger core.
///
/// Heuristic inconsistencies (a return with no matching call, stepping out of an empty
/// callstack) are never errors; these variants only report misuse of the API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DebugError {
    #[error("{capability} is not supported on {cpu}")]
    Unsupported { cpu: CpuType, capability: Capability },
    #[error("no {capability} attached to the {cpu} debugger")]
    CapabilityNotAttached { cpu: CpuType, capability: Capability },
    #[error("{step:?} is not available on {cpu}")]
    UnsupportedStep { cpu: CpuType, step: StepType },
    #[error("no debugger registered for {0}")]
    DebuggerNotInitialized(CpuType),
    #[error("unknown memory operation type {0}")]
    UnknownOperationType(u8),
    #[error("scanline {0} is out of range")]
    InvalidScanline(u32),
    #[error("memory type {0:?} is not available")]
    UnsupportedMemoryType(MemoryType),
    #[error("{memory_type:?} holds {expected} bytes, got {actual}")]
    SizeMismatch {
        memory_type: MemoryType,
        expected: usize,
        actual: usize,
    },
    #[error("address {address:#x} is outside {memory_type:?}")]
    AddressOutOfRange {
        memory_type: MemoryType,
        address: u32,
    },
}
