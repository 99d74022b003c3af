mod controller;
mod debug;
mod handle;
mod state;
mod types;

pub use controller::DebugController;
pub use debug::{DebugCommand, DebugEvent, DebugReplySender, PauseReason};
pub use handle::DebugHandle;
pub use types::RuntimeError;
