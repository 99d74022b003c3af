//! Per-architecture opcode lookup used by the call/return heuristics.
//!
//! None of the supported CPUs expose frame pointers, so the callstack is inferred from the
//! instruction stream alone: each opcode is classified as call-like, return-like or neither,
//! and its encoded size tells where a call returns to.

/// Control-flow class of an opcode as far as callstack tracking is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OpcodeClass {
    #[default]
    Other,
    /// Pushes a return address and transfers control (JSR, CALL, BRK, ...).
    Call,
    /// Pops a return address (RTS, RET, RTI, ...).
    Return,
}

/// Opcode class and instruction size for all 256 opcode bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpcodeTable {
    classes: [OpcodeClass; 256],
    sizes: [u8; 256],
    max_size: u8,
}

impl OpcodeTable {
    /// Table where every opcode has the same size and no control-flow class.
    pub const fn uniform(size: u8) -> Self {
        Self::from_sizes([size; 256])
    }

    pub const fn from_sizes(sizes: [u8; 256]) -> Self {
        let mut max_size = 1;
        let mut i = 0;
        while i < sizes.len() {
            if sizes[i] > max_size {
                max_size = sizes[i];
            }
            i += 1;
        }
        Self {
            classes: [OpcodeClass::Other; 256],
            sizes,
            max_size,
        }
    }

    /// Assigns `class` to every opcode in `opcodes`.
    pub const fn with_class(mut self, opcodes: &[u8], class: OpcodeClass) -> Self {
        let mut i = 0;
        while i < opcodes.len() {
            self.classes[opcodes[i] as usize] = class;
            i += 1;
        }
        self
    }

    /// Overrides the encoded size of a single opcode.
    pub const fn with_size(mut self, opcode: u8, size: u8) -> Self {
        self.sizes[opcode as usize] = size;
        if size > self.max_size {
            self.max_size = size;
        }
        self
    }

    #[inline]
    pub const fn class(&self, opcode: u8) -> OpcodeClass {
        self.classes[opcode as usize]
    }

    /// Encoded size in bytes, opcode included.
    #[inline]
    pub const fn size(&self, opcode: u8) -> u8 {
        self.sizes[opcode as usize]
    }

    #[inline]
    pub const fn is_call(&self, opcode: u8) -> bool {
        matches!(self.classes[opcode as usize], OpcodeClass::Call)
    }

    #[inline]
    pub const fn is_return(&self, opcode: u8) -> bool {
        matches!(self.classes[opcode as usize], OpcodeClass::Return)
    }

    /// Largest instruction in the table; bounds how far back a write can hit an instruction.
    #[inline]
    pub const fn max_size(&self) -> u8 {
        self.max_size
    }
}

/// Expands a `const fn(u8) -> u8` size decoder into a full table.
macro_rules! size_table {
    ($decode:path) => {{
        let mut sizes = [0u8; 256];
        let mut i = 0;
        while i < 256 {
            sizes[i] = $decode(i as u8);
            i += 1;
        }
        sizes
    }};
}

pub(crate) use size_table;

#[cfg(test)]
mod tests {
    use super::*;

    const fn two_plus_low_bit(op: u8) -> u8 {
        2 + (op & 1)
    }

    #[test]
    fn builder_assigns_classes_and_sizes() {
        let table = OpcodeTable::uniform(1)
            .with_class(&[0x20], OpcodeClass::Call)
            .with_class(&[0x60, 0x40], OpcodeClass::Return)
            .with_size(0x20, 3);

        assert!(table.is_call(0x20));
        assert!(table.is_return(0x40));
        assert_eq!(table.class(0xEA), OpcodeClass::Other);
        assert_eq!(table.size(0x20), 3);
        assert_eq!(table.size(0x60), 1);
        assert_eq!(table.max_size(), 3);
    }

    #[test]
    fn size_table_expands_decoder() {
        const SIZES: [u8; 256] = size_table!(two_plus_low_bit);
        let table = OpcodeTable::from_sizes(SIZES);
        assert_eq!(table.size(0x10), 2);
        assert_eq!(table.size(0x11), 3);
        assert_eq!(table.max_size(), 3);
    }
}
