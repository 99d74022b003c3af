use bitflags::bitflags;

bitflags! {
    /// Global debugger switches.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct DebuggerFlags: u32 {
        const SPC_DEBUGGER_ENABLED = 1 << 0;
        const NES_DEBUGGER_ENABLED = 1 << 1;
        /// Pause when a `BRK` opcode is fetched.
        const BREAK_ON_BRK = 1 << 2;
        /// Pause when the CPU stops (`STOP`, `KIL`).
        const BREAK_ON_STP = 1 << 3;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DebuggerConfig {
    pub flags: DebuggerFlags,
    /// Rows kept by the trace logger before the oldest are discarded.
    pub trace_log_capacity: usize,
    /// Maximum tracked call depth per CPU.
    pub callstack_limit: usize,
}

impl DebuggerConfig {
    pub const DEFAULT_TRACE_LOG_CAPACITY: usize = 30_000;
    pub const DEFAULT_CALLSTACK_LIMIT: usize = 512;

    #[inline]
    pub fn has_flag(&self, flag: DebuggerFlags) -> bool {
        self.flags.contains(flag)
    }
}

impl Default for DebuggerConfig {
    fn default() -> Self {
        Self {
            flags: DebuggerFlags::SPC_DEBUGGER_ENABLED | DebuggerFlags::NES_DEBUGGER_ENABLED,
            trace_log_capacity: Self::DEFAULT_TRACE_LOG_CAPACITY,
            callstack_limit: Self::DEFAULT_CALLSTACK_LIMIT,
        }
    }
}
