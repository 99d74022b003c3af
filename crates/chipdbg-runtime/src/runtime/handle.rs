use std::{
    sync::{Arc, atomic::Ordering},
    time::Duration,
};

use chipdbg_core::{
    BreakEvent, Breakpoint, CpuState, CpuType, DebuggerConfig, MemoryType, StackFrame, StepType,
};
use crossbeam_channel::{Sender, bounded};

use super::{
    debug::{DebugCommand, DebugReplySender},
    state::DebugState,
    types::{CONTROL_REPLY_TIMEOUT, RuntimeError},
};

/// Cloneable handle used by UI threads to drive a [`DebugController`](super::DebugController).
///
/// Commands are applied by the emulation thread at its next instruction boundary. Queries
/// block until the emulation thread answers or the reply timeout expires.
#[derive(Clone)]
pub struct DebugHandle {
    debug_tx: Sender<DebugCommand>,
    state: Arc<DebugState>,
}

impl DebugHandle {
    pub(crate) fn new(debug_tx: Sender<DebugCommand>, state: Arc<DebugState>) -> Self {
        Self { debug_tx, state }
    }

    fn send(&self, cmd: DebugCommand) -> Result<(), RuntimeError> {
        self.debug_tx
            .send(cmd)
            .map_err(|_| RuntimeError::ControlChannelDisconnected)
    }

    fn send_with_reply<T>(
        &self,
        op: &'static str,
        timeout: Duration,
        build: impl FnOnce(DebugReplySender<T>) -> DebugCommand,
    ) -> Result<T, RuntimeError> {
        let (reply_tx, reply_rx) = bounded::<Result<T, RuntimeError>>(1);
        self.send(build(reply_tx))?;
        match reply_rx.recv_timeout(timeout) {
            Ok(res) => res,
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                Err(RuntimeError::ControlTimeout { op })
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                Err(RuntimeError::ControlChannelDisconnected)
            }
        }
    }

    /// Clears the step request of `cpu` (every CPU when `None`) and resumes.
    pub fn run(&self, cpu: Option<CpuType>) -> Result<(), RuntimeError> {
        self.send(DebugCommand::Run { cpu })
    }

    pub fn step(&self, cpu: CpuType, count: u32, step_type: StepType) -> Result<(), RuntimeError> {
        self.send(DebugCommand::Step {
            cpu,
            count,
            step_type,
        })
    }

    pub fn pause(&self) -> Result<(), RuntimeError> {
        self.send(DebugCommand::Pause)
    }

    pub fn resume(&self) -> Result<(), RuntimeError> {
        self.send(DebugCommand::Resume)
    }

    pub fn set_breakpoints(&self, breakpoints: Vec<Breakpoint>) -> Result<(), RuntimeError> {
        self.send(DebugCommand::SetBreakpoints(breakpoints))
    }

    pub fn set_config(&self, config: DebuggerConfig) -> Result<(), RuntimeError> {
        self.send(DebugCommand::SetConfig(config))
    }

    pub fn set_trace_logging(&self, cpu: CpuType, enabled: bool) -> Result<(), RuntimeError> {
        self.send(DebugCommand::SetTraceLogging { cpu, enabled })
    }

    pub fn reset(&self) -> Result<(), RuntimeError> {
        self.send(DebugCommand::Reset)
    }

    pub fn callstack(&self, cpu: CpuType) -> Result<Vec<StackFrame>, RuntimeError> {
        self.send_with_reply("callstack", CONTROL_REPLY_TIMEOUT, |reply| {
            DebugCommand::GetCallstack { cpu, reply }
        })
    }

    pub fn cpu_state(&self, cpu: CpuType) -> Result<Option<CpuState>, RuntimeError> {
        self.send_with_reply("cpu_state", CONTROL_REPLY_TIMEOUT, |reply| {
            DebugCommand::GetCpuState { cpu, reply }
        })
    }

    pub fn read_memory(
        &self,
        memory_type: MemoryType,
        start: u32,
        len: u32,
    ) -> Result<Vec<u8>, RuntimeError> {
        self.send_with_reply("read_memory", CONTROL_REPLY_TIMEOUT, |reply| {
            DebugCommand::ReadMemory {
                memory_type,
                start,
                len,
                reply,
            }
        })
    }

    pub fn write_memory(
        &self,
        memory_type: MemoryType,
        address: u32,
        data: Vec<u8>,
    ) -> Result<(), RuntimeError> {
        self.send_with_reply("write_memory", CONTROL_REPLY_TIMEOUT, |reply| {
            DebugCommand::WriteMemory {
                memory_type,
                address,
                data,
                reply,
            }
        })
    }

    /// Whether the emulation thread has published a pause.
    #[inline]
    pub fn is_paused(&self) -> bool {
        self.state.paused.load(Ordering::Acquire)
    }

    /// The most recent pause, kept after resuming.
    pub fn last_break(&self) -> Option<BreakEvent> {
        *self.state.last_break.lock()
    }
}
