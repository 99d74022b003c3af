//! SPC700 sound CPU.

use std::fmt;

use super::{ArchProfile, Capabilities, ForcedBreak};
use crate::config::DebuggerFlags;
use crate::cpu_type::CpuType;
use crate::opcode::{OpcodeClass, OpcodeTable, size_table};
use crate::session::BreakSource;

/// `CALL !abs`
pub const OP_CALL: u8 = 0x3F;
/// `PCALL up`
pub const OP_PCALL: u8 = 0x4F;
/// `BRK`
pub const OP_BRK: u8 = 0x0F;
/// `RET`
pub const OP_RET: u8 = 0x6F;
/// `RETI`
pub const OP_RETI: u8 = 0x7F;
/// `STOP`
pub const OP_STOP: u8 = 0xFF;

/// `TCALL 0-15` live in column 1 of the opcode matrix.
const TCALLS: [u8; 16] = [
    0x01, 0x11, 0x21, 0x31, 0x41, 0x51, 0x61, 0x71, 0x81, 0x91, 0xA1, 0xB1, 0xC1, 0xD1, 0xE1,
    0xF1,
];

/// Encoded size of an SPC700 instruction, decoded from the opcode matrix column.
const fn op_size(op: u8) -> u8 {
    let odd_row = (op >> 4) & 1 == 1;
    match op & 0x0F {
        // NOP/CLRP/.. on even rows, relative branches on odd rows.
        0x0 => {
            if odd_row {
                2
            } else {
                1
            }
        }
        // TCALL n
        0x1 => 1,
        // SET1/CLR1 dp.bit
        0x2 => 2,
        // BBS/BBC dp.bit, rel
        0x3 => 3,
        0x4 => 2,
        0x5 => 3,
        // (X) on even rows, !abs+Y on odd rows
        0x6 => {
            if odd_row {
                3
            } else {
                1
            }
        }
        0x7 => 2,
        0x8 => match op {
            0x18 | 0x38 | 0x58 | 0x78 | 0x98 | 0xB8 => 3,
            _ => 2,
        },
        0x9 => match op {
            0x09 | 0x29 | 0x49 | 0x69 | 0x89 | 0xA9 | 0xC9 | 0xE9 => 3,
            0xD9 | 0xF9 => 2,
            _ => 1,
        },
        // mem.bit ops on even rows, word ops on odd rows, MOV dp,dp at $FA
        0xA => {
            if odd_row && op != 0xFA {
                2
            } else {
                3
            }
        }
        0xB => 2,
        0xC => {
            if odd_row {
                1
            } else {
                3
            }
        }
        0xD => match op {
            0x8D | 0xAD | 0xCD => 2,
            _ => 1,
        },
        0xE => match op {
            0x3E | 0x7E | 0xFE => 2,
            0x8E | 0x9E | 0xAE | 0xBE | 0xCE | 0xEE => 1,
            _ => 3,
        },
        _ => match op {
            0x1F | 0x3F | 0x5F | 0x8F => 3,
            0x2F | 0x4F => 2,
            _ => 1,
        },
    }
}

const SIZES: [u8; 256] = size_table!(op_size);

pub static PROFILE: ArchProfile = ArchProfile {
    cpu_type: CpuType::Spc,
    name: "SPC",
    opcodes: OpcodeTable::from_sizes(SIZES)
        .with_class(&TCALLS, OpcodeClass::Call)
        .with_class(&[OP_CALL, OP_PCALL, OP_BRK], OpcodeClass::Call)
        .with_class(&[OP_RET, OP_RETI], OpcodeClass::Return),
    address_mask: 0xFFFF,
    enable_flag: DebuggerFlags::SPC_DEBUGGER_ENABLED,
    forced_breaks: &[
        ForcedBreak {
            opcodes: &[OP_BRK],
            flag: DebuggerFlags::BREAK_ON_BRK,
            source: BreakSource::BreakOnBrk,
        },
        ForcedBreak {
            opcodes: &[OP_STOP],
            flag: DebuggerFlags::BREAK_ON_STP,
            source: BreakSource::BreakOnStp,
        },
    ],
    capabilities: Capabilities::empty(),
    has_ppu: false,
    ppu_scanlines: 0,
    cdl_memory: None,
};

/// SPC700 register file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SpcState {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    /// Processor status word.
    pub ps: u8,
    pub pc: u16,
}

impl fmt::Display for SpcState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[a:0x{:02x},x:0x{:02x},y:0x{:02x},sp:0x{:02x},psw:0x{:02x},pc:0x{:04x}]",
            self.a, self.x, self.y, self.sp, self.ps, self.pc
        )
    }
}
