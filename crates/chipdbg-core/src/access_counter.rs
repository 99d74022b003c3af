use std::collections::HashMap;

use crate::memory_type::{AddressInfo, MemoryType};

/// Access statistics for a single byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccessCounts {
    pub read_count: u32,
    pub write_count: u32,
    pub exec_count: u32,
    /// Master clock of the most recent access of each kind.
    pub read_stamp: u64,
    pub write_stamp: u64,
    pub exec_stamp: u64,
}

/// Per-address read/write/exec counters, keyed by resolved address.
#[derive(Debug, Default)]
pub struct MemoryAccessCounter {
    counts: HashMap<AddressInfo, AccessCounts>,
}

impl MemoryAccessCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process_read(&mut self, address: AddressInfo, master_clock: u64) {
        let counts = self.counts.entry(address).or_default();
        counts.read_count = counts.read_count.saturating_add(1);
        counts.read_stamp = master_clock;
    }

    pub fn process_write(&mut self, address: AddressInfo, master_clock: u64) {
        let counts = self.counts.entry(address).or_default();
        counts.write_count = counts.write_count.saturating_add(1);
        counts.write_stamp = master_clock;
    }

    pub fn process_exec(&mut self, address: AddressInfo, master_clock: u64) {
        let counts = self.counts.entry(address).or_default();
        counts.exec_count = counts.exec_count.saturating_add(1);
        counts.exec_stamp = master_clock;
    }

    pub fn counts(&self, address: &AddressInfo) -> AccessCounts {
        self.counts.get(address).copied().unwrap_or_default()
    }

    /// Counters for `len` bytes of `memory_type` starting at `start`.
    pub fn range(&self, memory_type: MemoryType, start: u32, len: u32) -> Vec<AccessCounts> {
        (start..start.saturating_add(len))
            .map(|addr| self.counts(&AddressInfo::new(addr, memory_type)))
            .collect()
    }

    pub fn reset(&mut self) {
        self.counts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_and_stamps_each_kind() {
        let mut counter = MemoryAccessCounter::new();
        let addr = AddressInfo::new(0x10, MemoryType::NesInternalRam);
        counter.process_read(addr, 5);
        counter.process_read(addr, 9);
        counter.process_write(addr, 12);

        let counts = counter.counts(&addr);
        assert_eq!(counts.read_count, 2);
        assert_eq!(counts.read_stamp, 9);
        assert_eq!(counts.write_count, 1);
        assert_eq!(counts.exec_count, 0);

        let range = counter.range(MemoryType::NesInternalRam, 0x0F, 3);
        assert_eq!(range[1], counts);
        assert_eq!(range[0], AccessCounts::default());

        counter.reset();
        assert_eq!(counter.counts(&addr), AccessCounts::default());
    }
}
