use std::time::Duration;

use chipdbg_core::DebugError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    #[error("debug command channel disconnected")]
    ControlChannelDisconnected,
    #[error("emulation thread did not respond in time for {op}")]
    ControlTimeout { op: &'static str },
    #[error(transparent)]
    Debug(#[from] DebugError),
}

pub(crate) const CONTROL_REPLY_TIMEOUT: Duration = Duration::from_secs(2);
pub(crate) const PAUSE_POLL_INTERVAL: Duration = Duration::from_millis(1);
