//! Instruction-level debugger core for multi-chip emulators.
//!
//! Every bus access of every emulated CPU is fed to a [`DebugSession`]. The session keeps a
//! heuristic callstack per CPU, drives stepping, checks breakpoints and reports whether
//! emulation must pause. It never blocks; `chipdbg-runtime` builds the threaded pause loop on
//! top of it.

pub mod access_counter;
pub mod arch;
pub mod breakpoint;
pub mod callstack;
pub mod cdl;
pub mod config;
pub mod cpu_type;
pub mod debugger;
pub mod disassembler;
pub mod error;
pub mod memory_dumper;
pub mod memory_type;
pub mod opcode;
pub mod operation;
pub mod session;
pub mod step;
pub mod target;
pub mod trace_logger;

pub use arch::{ArchProfile, Capability, CpuState, NesState, SpcState};
pub use breakpoint::{
    Breakpoint, BreakpointAddress, BreakpointManager, BreakpointTypeFlags, ExpressionEvaluator,
};
pub use callstack::{CallstackManager, StackFrame, StackFrameFlags};
pub use config::{DebuggerConfig, DebuggerFlags};
pub use cpu_type::CpuType;
pub use debugger::CpuDebugger;
pub use error::DebugError;
pub use memory_dumper::{MemoryBuffers, MemoryDumper};
pub use memory_type::{AccessIntent, AddressInfo, MemoryType};
pub use operation::{MemoryOperationInfo, MemoryOperationType};
pub use session::{BreakEvent, BreakSource, DebugServices, DebugSession};
pub use step::{StepRequest, StepType};
pub use target::{Assembler, DebugTarget, EventManager};
