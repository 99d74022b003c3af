use std::fmt;

use crate::arch::{self, ArchProfile};
use crate::memory_type::MemoryType;

/// Emulated processor families that own a debugger instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CpuType {
    /// Sony SPC700 sound CPU.
    Spc,
    /// Ricoh 2A03 (6502 core) main CPU.
    Nes,
}

impl CpuType {
    pub const ALL: [CpuType; 2] = [CpuType::Spc, CpuType::Nes];

    /// Static description of the architecture (opcode table, capabilities, ...).
    pub fn profile(self) -> &'static ArchProfile {
        match self {
            CpuType::Spc => &arch::spc::PROFILE,
            CpuType::Nes => &arch::nes::PROFILE,
        }
    }

    /// CPU-relative address space used by relative breakpoints.
    pub const fn relative_memory(self) -> MemoryType {
        match self {
            CpuType::Spc => MemoryType::SpcMemory,
            CpuType::Nes => MemoryType::NesMemory,
        }
    }
}

impl fmt::Display for CpuType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.profile().name)
    }
}
