use std::{
    sync::{Arc, atomic::Ordering},
    thread,
};

use chipdbg_core::{
    CpuType, DebugError, DebugSession, DebugTarget, MemoryBuffers, MemoryOperationType,
    MemoryType, StackFrame,
};
use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};
use tracing::{debug, warn};

use super::{
    debug::{DebugCommand, DebugEvent, PauseReason},
    handle::DebugHandle,
    state::DebugState,
    types::{PAUSE_POLL_INTERVAL, RuntimeError},
};

/// Owns the [`DebugSession`] on the emulation thread.
///
/// The execution core forwards bus accesses through [`process_memory_access`] and, between
/// instructions, calls [`pump_commands`] followed by [`wait_while_paused`].
///
/// [`process_memory_access`]: DebugController::process_memory_access
/// [`pump_commands`]: DebugController::pump_commands
/// [`wait_while_paused`]: DebugController::wait_while_paused
pub struct DebugController {
    session: DebugSession,
    debug_rx: Receiver<DebugCommand>,
    event_tx: Sender<DebugEvent>,
    state: Arc<DebugState>,
    /// Whether the current pause has been published to the handles.
    announced: bool,
}

impl DebugController {
    pub fn new(session: DebugSession) -> (Self, DebugHandle, Receiver<DebugEvent>) {
        let (debug_tx, debug_rx) = unbounded::<DebugCommand>();
        let (event_tx, event_rx) = unbounded::<DebugEvent>();
        let state = Arc::new(DebugState::new());
        let handle = DebugHandle::new(debug_tx, Arc::clone(&state));
        let controller = Self {
            session,
            debug_rx,
            event_tx,
            state,
            announced: false,
        };
        (controller, handle, event_rx)
    }

    #[inline]
    pub fn session(&self) -> &DebugSession {
        &self.session
    }

    #[inline]
    pub fn session_mut(&mut self) -> &mut DebugSession {
        &mut self.session
    }

    pub fn into_session(self) -> DebugSession {
        self.session
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.session.is_paused()
    }

    /// Forwards one bus access to the session. Returns `true` when emulation must pause.
    pub fn process_memory_access(
        &mut self,
        cpu: CpuType,
        target: &dyn DebugTarget,
        addr: u32,
        value: u8,
        op_type: MemoryOperationType,
    ) -> Result<bool, DebugError> {
        let pause = self
            .session
            .process_memory_access(cpu, target, addr, value, op_type)?;
        if pause {
            self.publish_pause_state();
        }
        Ok(pause)
    }

    /// Applies every queued command without blocking. Returns how many were applied.
    pub fn pump_commands(&mut self, memory: &mut dyn MemoryBuffers) -> usize {
        let mut applied = 0;
        while let Ok(cmd) = self.debug_rx.try_recv() {
            self.handle_command(cmd, memory);
            self.publish_pause_state();
            applied += 1;
        }
        applied
    }

    /// Blocks while the session is paused, serving commands until one resumes it.
    ///
    /// Returns [`RuntimeError::ControlChannelDisconnected`] after resuming on its own when
    /// every [`DebugHandle`] has been dropped.
    pub fn wait_while_paused(
        &mut self,
        memory: &mut dyn MemoryBuffers,
    ) -> Result<(), RuntimeError> {
        self.publish_pause_state();

        while self.session.is_paused() {
            match self.debug_rx.try_recv() {
                Ok(cmd) => {
                    self.handle_command(cmd, memory);
                    self.publish_pause_state();
                }
                Err(TryRecvError::Empty) => thread::sleep(PAUSE_POLL_INTERVAL),
                Err(TryRecvError::Disconnected) => {
                    warn!("all debug handles dropped while paused; resuming");
                    self.session.resume();
                    self.publish_pause_state();
                    return Err(RuntimeError::ControlChannelDisconnected);
                }
            }
        }
        Ok(())
    }

    fn handle_command(&mut self, cmd: DebugCommand, memory: &mut dyn MemoryBuffers) {
        debug!(?cmd, "debug command");
        match cmd {
            DebugCommand::Run { cpu: Some(cpu) } => {
                if let Err(err) = self.session.run(cpu) {
                    warn!(%err, "run rejected");
                }
            }
            DebugCommand::Run { cpu: None } => self.session.run_all(),
            DebugCommand::Step {
                cpu,
                count,
                step_type,
            } => {
                if let Err(err) = self.session.step(cpu, count, step_type) {
                    warn!(%err, "step rejected");
                }
            }
            DebugCommand::Pause => self.session.request_break(),
            DebugCommand::Resume => self.session.resume(),
            DebugCommand::SetBreakpoints(breakpoints) => {
                self.session.set_breakpoints(&breakpoints);
            }
            DebugCommand::SetConfig(config) => self.session.set_config(config),
            DebugCommand::SetTraceLogging { cpu, enabled } => {
                self.session.set_trace_logging(cpu, enabled);
            }
            DebugCommand::Reset => self.session.reset_all(),
            DebugCommand::GetCallstack { cpu, reply } => {
                let frames = self
                    .session
                    .callstack(cpu)
                    .map(|frames| frames.iter().copied().collect::<Vec<StackFrame>>())
                    .map_err(RuntimeError::from);
                let _ = reply.send(frames);
            }
            DebugCommand::GetCpuState { cpu, reply } => {
                let _ = reply.send(self.session.cpu_state(cpu).map_err(RuntimeError::from));
            }
            DebugCommand::ReadMemory {
                memory_type,
                start,
                len,
                reply,
            } => {
                let data = self.read_memory(memory, memory_type, start, len);
                let _ = reply.send(data.map_err(RuntimeError::from));
            }
            DebugCommand::WriteMemory {
                memory_type,
                address,
                data,
                reply,
            } => {
                let res = self
                    .session
                    .memory_dumper(memory)
                    .set_values(memory_type, address, &data);
                let _ = reply.send(res.map_err(RuntimeError::from));
            }
        }
    }

    fn read_memory(
        &mut self,
        memory: &mut dyn MemoryBuffers,
        memory_type: MemoryType,
        start: u32,
        len: u32,
    ) -> Result<Vec<u8>, DebugError> {
        let Some(last) = len.checked_sub(1) else {
            return Ok(Vec::new());
        };
        let end = start
            .checked_add(last)
            .ok_or(DebugError::AddressOutOfRange {
                memory_type,
                address: start,
            })?;
        self.session
            .memory_dumper(memory)
            .values(memory_type, start, end)
    }

    /// Mirrors pause transitions of the session into the shared state and the event channel.
    fn publish_pause_state(&mut self) {
        match self.session.break_event().copied() {
            Some(event) if !self.announced => {
                self.announced = true;
                *self.state.last_break.lock() = Some(event);
                self.state.paused.store(true, Ordering::Release);
                debug!(cpu = ?event.cpu, source = %event.source, "paused");

                let _ = self.event_tx.send(DebugEvent::Paused {
                    cpu: event.cpu,
                    pc: event.operation.map(|op| op.address),
                    reason: PauseReason::from(event.source),
                });
                if let Some(id) = event.breakpoint {
                    let _ = self.event_tx.send(DebugEvent::BreakpointHit { id });
                }
            }
            None if self.announced => {
                self.announced = false;
                self.state.paused.store(false, Ordering::Release);
                debug!("resumed");
                let _ = self.event_tx.send(DebugEvent::Resumed);
            }
            _ => {}
        }
    }
}
