//! Ricoh 2A03 main CPU (6502 core without decimal mode).

use std::fmt;

use super::{ArchProfile, Capabilities, ForcedBreak};
use crate::config::DebuggerFlags;
use crate::cpu_type::CpuType;
use crate::memory_type::MemoryType;
use crate::opcode::{OpcodeClass, OpcodeTable, size_table};
use crate::session::BreakSource;

pub const OP_BRK: u8 = 0x00;
pub const OP_JSR: u8 = 0x20;
pub const OP_RTI: u8 = 0x40;
pub const OP_RTS: u8 = 0x60;

/// Opcodes that lock up the CPU (`KIL`/`JAM`).
const JAMS: [u8; 12] = [
    0x02, 0x12, 0x22, 0x32, 0x42, 0x52, 0x62, 0x72, 0x92, 0xB2, 0xD2, 0xF2,
];

/// Size of a 6502 instruction from its `aaabbbcc` encoding.
///
/// Unofficial opcodes follow the addressing mode of their column, which is how the
/// silicon decodes them too.
const fn op_size(op: u8) -> u8 {
    let aaa = op >> 5;
    let bbb = (op >> 2) & 0x07;
    match op & 0x03 {
        0 => match bbb {
            0 => match op {
                // BRK pushes PC+2, so it is treated as a two byte instruction.
                0x00 => 2,
                0x20 => 3,
                0x40 | 0x60 => 1,
                _ => 2,
            },
            1 | 4 | 5 => 2,
            2 | 6 => 1,
            _ => 3,
        },
        2 => match bbb {
            // JAMs in the lower half, immediate operands in the upper half.
            0 => {
                if aaa < 4 {
                    1
                } else {
                    2
                }
            }
            1 | 5 => 2,
            2 | 4 | 6 => 1,
            _ => 3,
        },
        _ => match bbb {
            0 | 1 | 2 | 4 | 5 => 2,
            _ => 3,
        },
    }
}

const SIZES: [u8; 256] = size_table!(op_size);

pub static PROFILE: ArchProfile = ArchProfile {
    cpu_type: CpuType::Nes,
    name: "NES",
    opcodes: OpcodeTable::from_sizes(SIZES)
        .with_class(&[OP_JSR, OP_BRK], OpcodeClass::Call)
        .with_class(&[OP_RTS, OP_RTI], OpcodeClass::Return),
    address_mask: 0xFFFF,
    enable_flag: DebuggerFlags::NES_DEBUGGER_ENABLED,
    forced_breaks: &[
        ForcedBreak {
            opcodes: &[OP_BRK],
            flag: DebuggerFlags::BREAK_ON_BRK,
            source: BreakSource::BreakOnBrk,
        },
        ForcedBreak {
            opcodes: &JAMS,
            flag: DebuggerFlags::BREAK_ON_STP,
            source: BreakSource::BreakOnStp,
        },
    ],
    capabilities: Capabilities::all(),
    has_ppu: true,
    ppu_scanlines: 262,
    cdl_memory: Some(MemoryType::NesPrgRom),
};

/// 6502 register file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NesState {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub ps: u8,
    pub pc: u16,
}

impl fmt::Display for NesState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[a:0x{:02x},x:0x{:02x},y:0x{:02x},s:0x{:02x},p:0x{:02x},pc:0x{:04x}]",
            self.a, self.x, self.y, self.sp, self.ps, self.pc
        )
    }
}
