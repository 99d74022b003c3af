#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use chipdbg_core::{
    AccessIntent, AddressInfo, CpuState, CpuType, DebugTarget, MemoryBuffers,
    MemoryOperationType, MemoryType, NesState,
};
use chipdbg_runtime::DebugController;
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

pub const NOP: u8 = 0xEA;
pub const LOOP_START: u32 = 0x8000;
pub const LOOP_END: u32 = 0x801F;

/// NES work RAM, the only buffer the fake machine exposes.
pub struct WorkRam(pub Vec<u8>);

impl Default for WorkRam {
    fn default() -> Self {
        Self(vec![0; 0x2000])
    }
}

impl MemoryBuffers for WorkRam {
    fn buffer(&self, memory_type: MemoryType) -> Option<&[u8]> {
        (memory_type == MemoryType::NesWorkRam).then_some(self.0.as_slice())
    }

    fn buffer_mut(&mut self, memory_type: MemoryType) -> Option<&mut [u8]> {
        (memory_type == MemoryType::NesWorkRam).then_some(self.0.as_mut_slice())
    }
}

#[derive(Debug, Default)]
pub struct FakeNes {
    pub pc: u32,
}

impl DebugTarget for FakeNes {
    fn absolute_address(&self, address: u32, _intent: AccessIntent) -> Option<AddressInfo> {
        match address {
            0x6000..=0x7FFF => Some(AddressInfo::new(address - 0x6000, MemoryType::NesWorkRam)),
            0x8000..=0xFFFF => Some(AddressInfo::new(address - 0x8000, MemoryType::NesPrgRom)),
            _ => None,
        }
    }

    fn state(&self) -> CpuState {
        CpuState::Nes(NesState {
            pc: self.pc as u16,
            ..Default::default()
        })
    }

    fn master_clock(&self) -> u64 {
        0
    }
}

/// Emulation thread body: spins over a loop of NOPs until `stop` is raised.
pub fn run_nop_loop(
    controller: &mut DebugController,
    memory: &mut WorkRam,
    stop: &AtomicBool,
) -> Result<()> {
    let mut cpu = FakeNes { pc: LOOP_START };
    while !stop.load(Ordering::Acquire) {
        controller.pump_commands(memory);
        controller.wait_while_paused(memory)?;

        controller.process_memory_access(
            CpuType::Nes,
            &cpu,
            cpu.pc,
            NOP,
            MemoryOperationType::ExecOpCode,
        )?;
        cpu.pc = if cpu.pc == LOOP_END {
            LOOP_START
        } else {
            cpu.pc + 1
        };
    }
    Ok(())
}
