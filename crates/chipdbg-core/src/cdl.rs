//! Code/data logger: remembers how each byte of program ROM was used.

use std::collections::HashMap;

use bitflags::bitflags;

use crate::memory_type::{AddressInfo, MemoryType};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CdlFlags: u8 {
        const CODE = 1 << 0;
        const DATA = 1 << 1;
        /// Target of a subroutine call.
        const SUB_ENTRY_POINT = 1 << 2;
    }
}

#[derive(Debug)]
pub struct CodeDataLogger {
    memory_type: MemoryType,
    flags: HashMap<u32, CdlFlags>,
}

impl CodeDataLogger {
    pub fn new(memory_type: MemoryType) -> Self {
        Self {
            memory_type,
            flags: HashMap::new(),
        }
    }

    #[inline]
    pub fn memory_type(&self) -> MemoryType {
        self.memory_type
    }

    /// Ors `flags` into the byte at `address`; addresses outside the logged region are ignored.
    pub fn mark(&mut self, address: &AddressInfo, flags: CdlFlags) {
        if address.memory_type == self.memory_type {
            *self.flags.entry(address.address).or_default() |= flags;
        }
    }

    pub fn flags(&self, address: u32) -> CdlFlags {
        self.flags.get(&address).copied().unwrap_or_default()
    }

    pub fn is_code(&self, address: u32) -> bool {
        self.flags(address).contains(CdlFlags::CODE)
    }

    /// Number of bytes logged as code and as data.
    pub fn statistics(&self) -> (usize, usize) {
        self.flags.values().fold((0, 0), |(code, data), flags| {
            (
                code + flags.contains(CdlFlags::CODE) as usize,
                data + flags.contains(CdlFlags::DATA) as usize,
            )
        })
    }

    pub fn reset(&mut self) {
        self.flags.clear();
    }
}
