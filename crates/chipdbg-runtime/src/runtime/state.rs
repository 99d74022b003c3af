use std::sync::atomic::AtomicBool;

use chipdbg_core::BreakEvent;
use parking_lot::Mutex;

/// Pause state mirrored out of the emulation thread.
pub(crate) struct DebugState {
    pub(crate) paused: AtomicBool,
    pub(crate) last_break: Mutex<Option<BreakEvent>>,
}

impl DebugState {
    pub(crate) fn new() -> Self {
        Self {
            paused: AtomicBool::new(false),
            last_break: Mutex::new(None),
        }
    }
}
