#![allow(dead_code)]

use chipdbg_core::{
    AccessIntent, AddressInfo, CpuState, CpuType, DebugSession, DebugTarget, DebuggerConfig,
    MemoryOperationType, MemoryType, NesState, SpcState,
};
use ctor::ctor;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[ctor]
fn init_tracing() {
    let subscriber = FmtSubscriber::builder()
        .with_file(true)
        .with_line_number(true)
        .with_max_level(Level::DEBUG)
        .pretty()
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");
}

/// Start of the SPC IPL ROM overlay.
pub const IPL_BASE: u32 = 0xFFC0;

/// Minimal memory map for one CPU, enough to resolve addresses like real hardware does.
#[derive(Debug, Clone)]
pub struct FakeCpu {
    pub cpu: CpuType,
    pub pc: u32,
    pub clock: u64,
    /// SPC only: whether the IPL ROM is mapped over the top of ARAM for reads.
    pub ipl_enabled: bool,
}

impl FakeCpu {
    pub fn new(cpu: CpuType) -> Self {
        Self {
            cpu,
            pc: 0,
            clock: 0,
            ipl_enabled: true,
        }
    }
}

impl DebugTarget for FakeCpu {
    fn absolute_address(&self, address: u32, intent: AccessIntent) -> Option<AddressInfo> {
        match self.cpu {
            CpuType::Spc => {
                let address = address & 0xFFFF;
                if self.ipl_enabled && intent == AccessIntent::Read && address >= IPL_BASE {
                    Some(AddressInfo::new(address - IPL_BASE, MemoryType::SpcRom))
                } else {
                    Some(AddressInfo::new(address, MemoryType::SpcRam))
                }
            }
            CpuType::Nes => {
                let (offset, region) = match address {
                    0x0000..=0x1FFF => (address & 0x07FF, MemoryType::NesInternalRam),
                    0x2000..=0x401F => (address, MemoryType::Register),
                    0x6000..=0x7FFF => (address - 0x6000, MemoryType::NesWorkRam),
                    0x8000..=0xFFFF => (address - 0x8000, MemoryType::NesPrgRom),
                    _ => return None,
                };
                Some(AddressInfo::new(offset, region))
            }
        }
    }

    fn state(&self) -> CpuState {
        match self.cpu {
            CpuType::Spc => CpuState::Spc(SpcState {
                pc: self.pc as u16,
                ..Default::default()
            }),
            CpuType::Nes => CpuState::Nes(NesState {
                pc: self.pc as u16,
                ..Default::default()
            }),
        }
    }

    fn master_clock(&self) -> u64 {
        self.clock
    }
}

/// Drives a session the way an execution core would.
pub struct Harness {
    pub session: DebugSession,
    pub cpu: FakeCpu,
}

impl Harness {
    pub fn new(cpu: CpuType) -> Self {
        Self::with_config(cpu, DebuggerConfig::default())
    }

    pub fn with_config(cpu: CpuType, config: DebuggerConfig) -> Self {
        Self {
            session: DebugSession::new(config, &[cpu]),
            cpu: FakeCpu::new(cpu),
        }
    }

    pub fn access(&mut self, addr: u32, value: u8, op_type: MemoryOperationType) -> bool {
        self.cpu.clock += 1;
        self.session
            .process_memory_access(self.cpu.cpu, &self.cpu, addr, value, op_type)
            .expect("debugger registered")
    }

    /// Opcode fetch at `pc`. Returns the pause decision for that fetch.
    pub fn fetch(&mut self, pc: u32, opcode: u8) -> bool {
        self.cpu.pc = pc;
        self.access(pc, opcode, MemoryOperationType::ExecOpCode)
    }

    /// Fetches a whole instruction: opcode then operands. Returns the opcode fetch decision.
    pub fn exec(&mut self, pc: u32, bytes: &[u8]) -> bool {
        let (&opcode, operands) = bytes.split_first().expect("instruction bytes");
        let pause = self.fetch(pc, opcode);
        for (offset, &operand) in operands.iter().enumerate() {
            self.access(pc + 1 + offset as u32, operand, MemoryOperationType::ExecOperand);
        }
        pause
    }

    pub fn read(&mut self, addr: u32, value: u8) -> bool {
        self.access(addr, value, MemoryOperationType::Read)
    }

    pub fn write(&mut self, addr: u32, value: u8) -> bool {
        self.access(addr, value, MemoryOperationType::Write)
    }

    pub fn depth(&self) -> usize {
        self.session
            .callstack(self.cpu.cpu)
            .expect("debugger registered")
            .len()
    }

    pub fn return_pcs(&self) -> Vec<u32> {
        self.session
            .callstack(self.cpu.cpu)
            .expect("debugger registered")
            .iter()
            .map(|frame| frame.return_pc)
            .collect()
    }
}
