//! Direct access to backing stores for memory viewers and editors.

use crate::cpu_type::CpuType;
use crate::disassembler::Disassembler;
use crate::error::DebugError;
use crate::memory_type::{AccessIntent, AddressInfo, MemoryType};
use crate::target::DebugTarget;

/// Storage behind each memory type, provided by the emulator.
pub trait MemoryBuffers {
    fn buffer(&self, memory_type: MemoryType) -> Option<&[u8]>;
    fn buffer_mut(&mut self, memory_type: MemoryType) -> Option<&mut [u8]>;
}

/// Reads and writes memory without going through the CPU bus.
///
/// Edits drop cached instructions covering the modified bytes so the next fetch decodes
/// the new code. Edits through a CPU view are resolved with the target given to
/// [`with_target`](Self::with_target); without one, every cached instruction of that CPU
/// is dropped.
pub struct MemoryDumper<'a> {
    buffers: &'a mut dyn MemoryBuffers,
    disassembler: &'a mut Disassembler,
    target: Option<(CpuType, &'a dyn DebugTarget)>,
}

impl<'a> MemoryDumper<'a> {
    pub fn new(buffers: &'a mut dyn MemoryBuffers, disassembler: &'a mut Disassembler) -> Self {
        Self {
            buffers,
            disassembler,
            target: None,
        }
    }

    /// Resolves edits of `cpu`'s relative memory type through `target`.
    pub fn with_target(mut self, cpu: CpuType, target: &'a dyn DebugTarget) -> Self {
        self.target = Some((cpu, target));
        self
    }

    /// Size of a memory type in bytes, zero when the emulator does not expose it.
    pub fn size(&self, memory_type: MemoryType) -> usize {
        self.buffers.buffer(memory_type).map_or(0, <[u8]>::len)
    }

    pub fn state(&self, memory_type: MemoryType) -> Result<&[u8], DebugError> {
        self.buffers
            .buffer(memory_type)
            .ok_or(DebugError::UnsupportedMemoryType(memory_type))
    }

    /// Replaces the whole content. `data` must match the region size.
    pub fn set_state(&mut self, memory_type: MemoryType, data: &[u8]) -> Result<(), DebugError> {
        let buffer = self.buffer_mut(memory_type)?;
        if buffer.len() != data.len() {
            return Err(DebugError::SizeMismatch {
                memory_type,
                expected: buffer.len(),
                actual: data.len(),
            });
        }
        buffer.copy_from_slice(data);
        if memory_type.is_relative() {
            self.invalidate(memory_type, 0, data.len());
        } else {
            self.disassembler.invalidate_region(memory_type);
        }
        Ok(())
    }

    pub fn value(&self, memory_type: MemoryType, address: u32) -> Result<u8, DebugError> {
        let buffer = self.state(memory_type)?;
        buffer
            .get(address as usize)
            .copied()
            .ok_or(DebugError::AddressOutOfRange {
                memory_type,
                address,
            })
    }

    /// Little-endian 16-bit value.
    pub fn word(&self, memory_type: MemoryType, address: u32) -> Result<u16, DebugError> {
        let lo = self.value(memory_type, address)?;
        let hi = self.value(memory_type, address.wrapping_add(1))?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    /// Bytes from `start` to `end`, both inclusive.
    pub fn values(
        &self,
        memory_type: MemoryType,
        start: u32,
        end: u32,
    ) -> Result<Vec<u8>, DebugError> {
        let buffer = self.state(memory_type)?;
        let out_of_range = |address| DebugError::AddressOutOfRange {
            memory_type,
            address,
        };
        if start > end {
            return Err(out_of_range(start));
        }
        buffer
            .get(start as usize..=end as usize)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| out_of_range(end))
    }

    pub fn set_value(
        &mut self,
        memory_type: MemoryType,
        address: u32,
        value: u8,
    ) -> Result<(), DebugError> {
        self.set_values(memory_type, address, &[value])
    }

    pub fn set_word(
        &mut self,
        memory_type: MemoryType,
        address: u32,
        value: u16,
    ) -> Result<(), DebugError> {
        self.set_values(memory_type, address, &value.to_le_bytes())
    }

    pub fn set_values(
        &mut self,
        memory_type: MemoryType,
        address: u32,
        values: &[u8],
    ) -> Result<(), DebugError> {
        let start = address as usize;
        let buffer = self.buffer_mut(memory_type)?;
        let target = buffer
            .get_mut(start..start + values.len())
            .ok_or(DebugError::AddressOutOfRange {
                memory_type,
                address: address.saturating_add(values.len() as u32).saturating_sub(1),
            })?;
        target.copy_from_slice(values);
        self.invalidate(memory_type, address, values.len());
        Ok(())
    }

    /// Drops cached instructions covering `len` bytes edited at `address`.
    fn invalidate(&mut self, memory_type: MemoryType, address: u32, len: usize) {
        let Some(cpu_type) = cached_cpu(memory_type) else {
            return;
        };
        let addresses = (0..len as u32).map(|offset| address.wrapping_add(offset));

        if !memory_type.is_relative() {
            for addr in addresses {
                self.disassembler
                    .invalidate_cache(AddressInfo::new(addr, memory_type), cpu_type);
            }
            return;
        }

        match self.target {
            Some((cpu, target)) if cpu == cpu_type => {
                for addr in addresses {
                    if let Some(info) = target.absolute_address(addr, AccessIntent::Write) {
                        self.disassembler.invalidate_cache(info, cpu_type);
                    }
                }
            }
            _ => self.disassembler.invalidate_cpu(cpu_type),
        }
    }

    fn buffer_mut(&mut self, memory_type: MemoryType) -> Result<&mut [u8], DebugError> {
        self.buffers
            .buffer_mut(memory_type)
            .ok_or(DebugError::UnsupportedMemoryType(memory_type))
    }
}

/// CPU whose instruction cache can be affected by edits of `memory_type`.
fn cached_cpu(memory_type: MemoryType) -> Option<CpuType> {
    if memory_type.is_ppu_memory() {
        None
    } else {
        memory_type.cpu_type()
    }
}
