use std::collections::HashMap;

use tracing::trace;

use crate::cpu_type::CpuType;
use crate::memory_type::{AddressInfo, MemoryType};

/// One decoded instruction boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedInstruction {
    pub cpu_type: CpuType,
    pub opcode: u8,
    pub size: u8,
}

/// Cache of instruction starts discovered while executing.
///
/// Entries are keyed by the resolved address of their first byte. A write anywhere inside a
/// cached instruction drops it so the next fetch decodes the modified bytes.
#[derive(Debug, Default)]
pub struct Disassembler {
    entries: HashMap<AddressInfo, CachedInstruction>,
}

impl Disassembler {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn instruction_size(&self, opcode: u8, cpu_type: CpuType) -> u8 {
        cpu_type.profile().opcodes.size(opcode)
    }

    pub fn build_cache(&mut self, address: AddressInfo, opcode: u8, cpu_type: CpuType) {
        let size = self.instruction_size(opcode, cpu_type);
        self.entries.insert(
            address,
            CachedInstruction {
                cpu_type,
                opcode,
                size,
            },
        );
    }

    /// Drops every cached instruction whose bytes cover `address`.
    pub fn invalidate_cache(&mut self, address: AddressInfo, cpu_type: CpuType) {
        let max_size = cpu_type.profile().opcodes.max_size() as u32;
        for back in 0..max_size.min(address.address.saturating_add(1)) {
            let start = AddressInfo::new(address.address - back, address.memory_type);
            let covers = self
                .entries
                .get(&start)
                .is_some_and(|entry| entry.size as u32 > back);
            if covers {
                trace!(%start, %address, "instruction cache entry invalidated");
                self.entries.remove(&start);
            }
        }
    }

    /// Drops every entry decoded from `memory_type`.
    pub fn invalidate_region(&mut self, memory_type: MemoryType) {
        self.entries.retain(|address, _| address.memory_type != memory_type);
    }

    /// Drops every entry decoded for `cpu_type`.
    pub fn invalidate_cpu(&mut self, cpu_type: CpuType) {
        self.entries.retain(|_, entry| entry.cpu_type != cpu_type);
    }

    #[inline]
    pub fn get(&self, address: &AddressInfo) -> Option<&CachedInstruction> {
        self.entries.get(address)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
