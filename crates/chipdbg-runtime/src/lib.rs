//! Threaded front end for `chipdbg-core`.
//!
//! The emulation thread owns a [`DebugController`]; UI threads talk to it through cloned
//! [`DebugHandle`]s and receive [`DebugEvent`]s.

pub mod runtime;

pub use runtime::{
    DebugCommand, DebugController, DebugEvent, DebugHandle, DebugReplySender, PauseReason,
    RuntimeError,
};

#[cfg(test)]
mod tests {
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
}
