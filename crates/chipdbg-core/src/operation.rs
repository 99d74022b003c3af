use crate::error::DebugError;

/// Kind of bus access reported by an execution core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MemoryOperationType {
    /// First byte of an instruction.
    ExecOpCode = 0,
    /// Remaining instruction bytes.
    ExecOperand = 1,
    Read = 2,
    Write = 3,
    /// Timing-only bus read with no architectural effect.
    DummyRead = 4,
}

impl MemoryOperationType {
    #[inline]
    pub const fn is_exec(self) -> bool {
        matches!(
            self,
            MemoryOperationType::ExecOpCode | MemoryOperationType::ExecOperand
        )
    }

    #[inline]
    pub const fn is_write(self) -> bool {
        matches!(self, MemoryOperationType::Write)
    }
}

impl TryFrom<u8> for MemoryOperationType {
    type Error = DebugError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => MemoryOperationType::ExecOpCode,
            1 => MemoryOperationType::ExecOperand,
            2 => MemoryOperationType::Read,
            3 => MemoryOperationType::Write,
            4 => MemoryOperationType::DummyRead,
            other => return Err(DebugError::UnknownOperationType(other)),
        })
    }
}

/// A single access as seen on the CPU side of the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryOperationInfo {
    /// CPU-relative address.
    pub address: u32,
    pub value: u8,
    pub op_type: MemoryOperationType,
}

impl MemoryOperationInfo {
    #[inline]
    pub const fn new(address: u32, value: u8, op_type: MemoryOperationType) -> Self {
        Self {
            address,
            value,
            op_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_discriminants_round_trip() {
        for raw in 0..=4u8 {
            let op = MemoryOperationType::try_from(raw).expect("valid discriminant");
            assert_eq!(op as u8, raw);
        }
    }

    #[test]
    fn unknown_discriminant_is_rejected() {
        assert_eq!(
            MemoryOperationType::try_from(9),
            Err(DebugError::UnknownOperationType(9))
        );
    }

    #[test]
    fn classifies_exec_and_write_accesses() {
        assert!(MemoryOperationType::ExecOpCode.is_exec());
        assert!(MemoryOperationType::ExecOperand.is_exec());
        assert!(!MemoryOperationType::Read.is_exec());
        assert!(MemoryOperationType::Write.is_write());
        assert!(!MemoryOperationType::DummyRead.is_write());
    }
}
