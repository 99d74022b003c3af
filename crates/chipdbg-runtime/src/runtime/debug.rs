//! Commands and events exchanged between UI threads and the emulation thread.

use chipdbg_core::{
    BreakSource, Breakpoint, CpuState, CpuType, DebuggerConfig, MemoryType, StackFrame, StepType,
};
use crossbeam_channel::Sender;

use super::types::RuntimeError;

/// Reply sender for debug commands that return a value.
pub type DebugReplySender<T> = Sender<Result<T, RuntimeError>>;

/// Debug command sent from a UI thread to the [`DebugController`](super::DebugController).
#[derive(Debug)]
pub enum DebugCommand {
    /// Clears the step request of one CPU, or of every CPU when `None`, and resumes.
    Run { cpu: Option<CpuType> },
    Step {
        cpu: CpuType,
        count: u32,
        step_type: StepType,
    },
    /// Pauses at the next access of any CPU.
    Pause,
    /// Leaves the pause loop without touching step requests.
    Resume,
    SetBreakpoints(Vec<Breakpoint>),
    SetConfig(DebuggerConfig),
    SetTraceLogging { cpu: CpuType, enabled: bool },
    /// Resets every CPU debugger and the shared caches.
    Reset,
    GetCallstack {
        cpu: CpuType,
        reply: DebugReplySender<Vec<StackFrame>>,
    },
    GetCpuState {
        cpu: CpuType,
        reply: DebugReplySender<Option<CpuState>>,
    },
    ReadMemory {
        memory_type: MemoryType,
        start: u32,
        len: u32,
        reply: DebugReplySender<Vec<u8>>,
    },
    WriteMemory {
        memory_type: MemoryType,
        address: u32,
        data: Vec<u8>,
        reply: DebugReplySender<()>,
    },
}

/// Debug event sent from the emulation thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugEvent {
    /// Execution has paused. `cpu` and `pc` are unknown for external pause requests.
    Paused {
        cpu: Option<CpuType>,
        pc: Option<u32>,
        reason: PauseReason,
    },
    Resumed,
    /// Sent right after `Paused` when a user breakpoint caused the pause.
    BreakpointHit { id: u32 },
}

/// Reason for pausing execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseReason {
    /// Hit a user-defined breakpoint.
    Breakpoint,
    /// Completed a step operation.
    Step,
    /// BRK or STP/JAM with the matching break flag on.
    ForcedBreak,
    /// User requested pause.
    UserRequest,
}

impl From<BreakSource> for PauseReason {
    fn from(source: BreakSource) -> Self {
        match source {
            BreakSource::Breakpoint => Self::Breakpoint,
            BreakSource::CpuStep | BreakSource::PpuStep => Self::Step,
            BreakSource::BreakOnBrk | BreakSource::BreakOnStp => Self::ForcedBreak,
            BreakSource::Pause | BreakSource::Unspecified => Self::UserRequest,
        }
    }
}
