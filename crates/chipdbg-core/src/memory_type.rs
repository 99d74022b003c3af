//! Memory regions known to the debugger and the canonical address pair.
//!
//! Relative types (`SpcMemory`, `NesMemory`) name a CPU's view of its bus. Every other type
//! is a physical backing store that a relative address resolves to after banking and
//! mirroring have been applied.

use std::fmt;

use crate::cpu_type::CpuType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MemoryType {
    SpcMemory,
    SpcRam,
    /// 64-byte IPL boot ROM overlaying `$FFC0-$FFFF` for reads.
    SpcRom,

    NesMemory,
    NesPrgRom,
    NesInternalRam,
    NesWorkRam,
    NesSaveRam,
    NesChrRom,
    NesChrRam,
    NesNametableRam,
    NesPaletteRam,
    NesSpriteRam,

    /// Memory-mapped I/O registers.
    Register,
}

impl MemoryType {
    /// `true` for CPU views of the bus, as opposed to physical stores.
    pub const fn is_relative(self) -> bool {
        matches!(self, MemoryType::SpcMemory | MemoryType::NesMemory)
    }

    pub const fn is_ppu_memory(self) -> bool {
        matches!(
            self,
            MemoryType::NesChrRom
                | MemoryType::NesChrRam
                | MemoryType::NesNametableRam
                | MemoryType::NesPaletteRam
                | MemoryType::NesSpriteRam
        )
    }

    /// CPU that owns the region, `None` for shared register space.
    pub const fn cpu_type(self) -> Option<CpuType> {
        match self {
            MemoryType::SpcMemory | MemoryType::SpcRam | MemoryType::SpcRom => Some(CpuType::Spc),
            MemoryType::Register => None,
            _ => Some(CpuType::Nes),
        }
    }

    /// Short tag used when listing breakpoints.
    pub const fn short_name(self) -> &'static str {
        match self {
            MemoryType::SpcMemory => "SPC",
            MemoryType::SpcRam => "RAM",
            MemoryType::SpcRom => "ROM",
            MemoryType::NesMemory => "CPU",
            MemoryType::NesPrgRom => "PRG",
            MemoryType::NesInternalRam => "RAM",
            MemoryType::NesWorkRam => "WRAM",
            MemoryType::NesSaveRam => "SRAM",
            MemoryType::NesChrRom | MemoryType::NesChrRam => "CHR",
            MemoryType::NesNametableRam => "NTRAM",
            MemoryType::NesPaletteRam => "PAL",
            MemoryType::NesSpriteRam => "SPR",
            MemoryType::Register => "REG",
        }
    }

    /// Hex digits used to print an address in this region.
    pub(crate) const fn address_digits(self) -> usize {
        match self {
            MemoryType::SpcMemory | MemoryType::NesMemory => 4,
            _ => 6,
        }
    }
}

/// Canonical location of a byte: offset inside a physical memory region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AddressInfo {
    pub address: u32,
    pub memory_type: MemoryType,
}

impl AddressInfo {
    #[inline]
    pub const fn new(address: u32, memory_type: MemoryType) -> Self {
        Self {
            address,
            memory_type,
        }
    }
}

impl fmt::Display for AddressInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:${:0width$X}",
            self.memory_type.short_name(),
            self.address,
            width = self.memory_type.address_digits()
        )
    }
}

/// Direction of the access an address is resolved for.
///
/// Writes must resolve against the writable store even when reads at the same CPU address
/// are served from ROM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessIntent {
    Read,
    Write,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_region_width() {
        assert_eq!(
            AddressInfo::new(0x1F, MemoryType::SpcRom).to_string(),
            "ROM:$00001F"
        );
        assert_eq!(
            AddressInfo::new(0x8000, MemoryType::NesMemory).to_string(),
            "CPU:$8000"
        );
    }

    #[test]
    fn classifies_regions() {
        assert!(MemoryType::SpcMemory.is_relative());
        assert!(!MemoryType::SpcRam.is_relative());
        assert!(MemoryType::NesPaletteRam.is_ppu_memory());
        assert_eq!(MemoryType::SpcRom.cpu_type(), Some(CpuType::Spc));
        assert_eq!(MemoryType::Register.cpu_type(), None);
    }
}
