//! Architecture descriptions consumed by the generic [`CpuDebugger`](crate::CpuDebugger).
//!
//! Every supported CPU is a static [`ArchProfile`]: the debugger itself contains no
//! per-architecture branches, it only looks things up here.

use std::fmt;

use bitflags::bitflags;

use crate::config::DebuggerFlags;
use crate::cpu_type::CpuType;
use crate::memory_type::MemoryType;
use crate::opcode::OpcodeTable;
use crate::session::BreakSource;
use crate::step::StepType;

pub mod nes;
pub mod spc;

pub use nes::NesState;
pub use spc::SpcState;

bitflags! {
    /// Optional debugger features an architecture provides.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        const ASSEMBLER = 1 << 0;
        const EVENT_MANAGER = 1 << 1;
        const CODE_DATA_LOGGER = 1 << 2;
    }
}

/// A single optional feature, used when reporting an unsupported query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Assembler,
    EventManager,
    CodeDataLogger,
}

impl Capability {
    pub const fn flag(self) -> Capabilities {
        match self {
            Capability::Assembler => Capabilities::ASSEMBLER,
            Capability::EventManager => Capabilities::EVENT_MANAGER,
            Capability::CodeDataLogger => Capabilities::CODE_DATA_LOGGER,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Capability::Assembler => "assembler",
            Capability::EventManager => "event manager",
            Capability::CodeDataLogger => "code/data logger",
        })
    }
}

/// Opcodes that pause execution on their own when the matching debugger flag is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForcedBreak {
    pub opcodes: &'static [u8],
    pub flag: DebuggerFlags,
    pub source: BreakSource,
}

#[derive(Debug)]
pub struct ArchProfile {
    pub cpu_type: CpuType,
    pub name: &'static str,
    pub opcodes: OpcodeTable,
    /// Mask applied to computed program counters (return addresses wrap inside it).
    pub address_mask: u32,
    /// Flag that turns on interactive debugging for this CPU.
    pub enable_flag: DebuggerFlags,
    pub forced_breaks: &'static [ForcedBreak],
    pub capabilities: Capabilities,
    /// Whether PPU-driven step kinds make sense for this CPU.
    pub has_ppu: bool,
    /// Scanlines per frame, zero without a PPU.
    pub ppu_scanlines: u32,
    /// Region tracked by the code/data logger, if the CPU has one.
    pub cdl_memory: Option<MemoryType>,
}

impl ArchProfile {
    #[inline]
    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(capability.flag())
    }

    pub fn supports_step(&self, step: StepType) -> bool {
        match step {
            StepType::Step | StepType::StepOver | StepType::StepOut => true,
            StepType::PpuStep | StepType::SpecificScanline => self.has_ppu,
        }
    }

    /// Forced break triggered by `opcode` under the current flags.
    pub fn forced_break(&self, opcode: u8, flags: DebuggerFlags) -> Option<BreakSource> {
        self.forced_breaks
            .iter()
            .find(|fb| flags.contains(fb.flag) && fb.opcodes.contains(&opcode))
            .map(|fb| fb.source)
    }

    #[inline]
    pub fn wrap(&self, addr: u32) -> u32 {
        addr & self.address_mask
    }
}

/// Register snapshot of one processor, tagged by architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuState {
    Spc(SpcState),
    Nes(NesState),
}

impl CpuState {
    #[inline]
    pub fn pc(&self) -> u32 {
        match self {
            CpuState::Spc(state) => state.pc as u32,
            CpuState::Nes(state) => state.pc as u32,
        }
    }

    pub fn cpu_type(&self) -> CpuType {
        match self {
            CpuState::Spc(_) => CpuType::Spc,
            CpuState::Nes(_) => CpuType::Nes,
        }
    }
}

impl fmt::Display for CpuState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CpuState::Spc(state) => fmt::Display::fmt(state, f),
            CpuState::Nes(state) => fmt::Display::fmt(state, f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spc_lacks_optional_features() {
        let spc = CpuType::Spc.profile();
        assert!(!spc.supports(Capability::Assembler));
        assert!(!spc.supports(Capability::EventManager));
        assert!(!spc.supports(Capability::CodeDataLogger));
        assert!(!spc.supports_step(StepType::PpuStep));
        assert!(spc.supports_step(StepType::StepOut));
    }

    #[test]
    fn nes_supports_ppu_steps() {
        let nes = CpuType::Nes.profile();
        assert!(nes.supports(Capability::CodeDataLogger));
        assert!(nes.supports_step(StepType::SpecificScanline));
    }

    #[test]
    fn forced_break_requires_flag() {
        let spc = CpuType::Spc.profile();
        assert_eq!(spc.forced_break(0x0F, DebuggerFlags::empty()), None);
        assert_eq!(
            spc.forced_break(0x0F, DebuggerFlags::BREAK_ON_BRK),
            Some(BreakSource::BreakOnBrk)
        );
        assert_eq!(
            spc.forced_break(0xFF, DebuggerFlags::BREAK_ON_BRK | DebuggerFlags::BREAK_ON_STP),
            Some(BreakSource::BreakOnStp)
        );
    }
}
