//! Debug session: owns one debugger per emulated CPU plus the services they share, and
//! decides when emulation pauses.

use std::collections::VecDeque;
use std::fmt;

use tracing::{debug, warn};

use crate::access_counter::MemoryAccessCounter;
use crate::arch::CpuState;
use crate::breakpoint::{Breakpoint, BreakpointManager, ExpressionEvaluator};
use crate::callstack::StackFrame;
use crate::config::DebuggerConfig;
use crate::cpu_type::CpuType;
use crate::debugger::CpuDebugger;
use crate::disassembler::Disassembler;
use crate::error::DebugError;
use crate::memory_dumper::{MemoryBuffers, MemoryDumper};
use crate::memory_type::AddressInfo;
use crate::operation::{MemoryOperationInfo, MemoryOperationType};
use crate::step::StepType;
use crate::target::{DebugTarget, EventManager};
use crate::trace_logger::TraceLogger;

/// Why emulation paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BreakSource {
    #[default]
    Unspecified,
    Breakpoint,
    CpuStep,
    PpuStep,
    BreakOnBrk,
    BreakOnStp,
    /// Pause requested from outside the emulation.
    Pause,
}

impl fmt::Display for BreakSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BreakSource::Unspecified => "unspecified",
            BreakSource::Breakpoint => "breakpoint",
            BreakSource::CpuStep => "cpu step",
            BreakSource::PpuStep => "ppu step",
            BreakSource::BreakOnBrk => "brk",
            BreakSource::BreakOnStp => "stop",
            BreakSource::Pause => "pause",
        })
    }
}

/// Details of the access that caused a pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakEvent {
    /// `None` for pauses requested from outside.
    pub cpu: Option<CpuType>,
    pub source: BreakSource,
    pub operation: Option<MemoryOperationInfo>,
    pub address: Option<AddressInfo>,
    pub breakpoint: Option<u32>,
}

/// State shared by every CPU debugger of a session.
pub struct DebugServices {
    pub(crate) config: DebuggerConfig,
    pub(crate) disassembler: Disassembler,
    pub(crate) trace_logger: TraceLogger,
    pub(crate) access_counter: MemoryAccessCounter,
    evaluator: Option<Box<dyn ExpressionEvaluator + Send>>,
    break_event: Option<BreakEvent>,
}

impl DebugServices {
    pub fn new(config: DebuggerConfig) -> Self {
        Self {
            trace_logger: TraceLogger::new(config.trace_log_capacity),
            config,
            disassembler: Disassembler::new(),
            access_counter: MemoryAccessCounter::new(),
            evaluator: None,
            break_event: None,
        }
    }

    /// Final pause decision for one access.
    ///
    /// A stepping pause always wins. Otherwise the CPU's breakpoints are checked: matching
    /// `mark_event` breakpoints are reported to `event_manager`, and the first enabled one
    /// whose condition holds pauses emulation.
    #[allow(clippy::too_many_arguments)]
    pub fn process_break_conditions(
        &mut self,
        cpu: CpuType,
        step_pause: bool,
        breakpoints: &BreakpointManager,
        event_manager: Option<&mut dyn EventManager>,
        operation: &MemoryOperationInfo,
        address: Option<AddressInfo>,
        source: BreakSource,
    ) -> bool {
        if step_pause {
            let source = match source {
                BreakSource::Unspecified | BreakSource::Breakpoint => BreakSource::CpuStep,
                other => other,
            };
            self.latch_break(BreakEvent {
                cpu: Some(cpu),
                source,
                operation: Some(*operation),
                address,
                breakpoint: None,
            });
            return true;
        }

        let evaluator = self
            .evaluator
            .as_deref_mut()
            .map(|e| e as &mut dyn ExpressionEvaluator);
        let hit = breakpoints.check(operation, address.as_ref(), evaluator);

        if hit.marked {
            match event_manager {
                Some(events) => events.add_event(cpu, operation, address),
                None => debug!(%cpu, "marked breakpoint hit without an event manager"),
            }
        }

        match hit.pause {
            Some(id) => {
                self.latch_break(BreakEvent {
                    cpu: Some(cpu),
                    source: BreakSource::Breakpoint,
                    operation: Some(*operation),
                    address,
                    breakpoint: Some(id),
                });
                true
            }
            None => false,
        }
    }

    /// Records a pause. Only the first one is kept until the session resumes.
    pub fn latch_break(&mut self, event: BreakEvent) {
        if self.break_event.is_none() {
            debug!(
                cpu = ?event.cpu,
                source = %event.source,
                breakpoint = ?event.breakpoint,
                "break"
            );
            self.break_event = Some(event);
        }
    }

    #[inline]
    pub fn config(&self) -> &DebuggerConfig {
        &self.config
    }

    #[inline]
    pub fn disassembler(&self) -> &Disassembler {
        &self.disassembler
    }

    #[inline]
    pub fn trace_logger(&self) -> &TraceLogger {
        &self.trace_logger
    }

    #[inline]
    pub fn access_counter(&self) -> &MemoryAccessCounter {
        &self.access_counter
    }
}

/// Coordinates the debuggers of every CPU that runs in lockstep.
pub struct DebugSession {
    services: DebugServices,
    debuggers: Vec<CpuDebugger>,
}

impl DebugSession {
    pub fn new(config: DebuggerConfig, cpus: &[CpuType]) -> Self {
        let mut debuggers: Vec<CpuDebugger> = Vec::with_capacity(cpus.len());
        for &cpu in cpus {
            if debuggers.iter().all(|d| d.cpu_type() != cpu) {
                debuggers.push(CpuDebugger::new(cpu, &config));
            }
        }
        debug!(?cpus, "debug session created");
        Self {
            services: DebugServices::new(config),
            debuggers,
        }
    }

    fn parts(
        &mut self,
        cpu: CpuType,
    ) -> Result<(&mut CpuDebugger, &mut DebugServices), DebugError> {
        let debugger = self
            .debuggers
            .iter_mut()
            .find(|d| d.cpu_type() == cpu)
            .ok_or(DebugError::DebuggerNotInitialized(cpu))?;
        Ok((debugger, &mut self.services))
    }

    /// Entry point for every bus access of `cpu`. Returns `true` when emulation must pause.
    pub fn process_memory_access(
        &mut self,
        cpu: CpuType,
        target: &dyn DebugTarget,
        addr: u32,
        value: u8,
        op_type: MemoryOperationType,
    ) -> Result<bool, DebugError> {
        let (debugger, services) = self.parts(cpu)?;
        let pause = if op_type.is_write() {
            debugger.process_write(services, target, addr, value)
        } else {
            debugger.process_read(services, target, addr, value, op_type)
        };
        Ok(pause)
    }

    pub fn process_interrupt(
        &mut self,
        cpu: CpuType,
        target: &dyn DebugTarget,
        original_pc: u32,
        current_pc: u32,
        nmi: bool,
    ) -> Result<(), DebugError> {
        self.debugger_mut(cpu)?
            .process_interrupt(target, original_pc, current_pc, nmi);
        Ok(())
    }

    pub fn process_ppu_cycle(
        &mut self,
        cpu: CpuType,
        scanline: i32,
        cycle: u32,
    ) -> Result<bool, DebugError> {
        let (debugger, services) = self.parts(cpu)?;
        Ok(debugger.process_ppu_cycle(services, scanline, cycle))
    }

    /// Clears the stepping condition of `cpu` and resumes.
    pub fn run(&mut self, cpu: CpuType) -> Result<(), DebugError> {
        self.debugger_mut(cpu)?.run();
        self.services.break_event = None;
        Ok(())
    }

    pub fn run_all(&mut self) {
        for debugger in &mut self.debuggers {
            debugger.run();
        }
        self.services.break_event = None;
        debug!("run");
    }

    /// Steps `cpu`; every other CPU runs freely until it pauses.
    pub fn step(
        &mut self,
        cpu: CpuType,
        count: u32,
        step_type: StepType,
    ) -> Result<(), DebugError> {
        self.debugger_mut(cpu)?.step(count, step_type)?;
        for debugger in self.debuggers.iter_mut().filter(|d| d.cpu_type() != cpu) {
            debugger.run();
        }
        self.services.break_event = None;
        Ok(())
    }

    /// Pauses at the next access of any CPU.
    pub fn request_break(&mut self) {
        self.services.latch_break(BreakEvent {
            cpu: None,
            source: BreakSource::Pause,
            operation: None,
            address: None,
            breakpoint: None,
        });
    }

    /// Continues without changing any step request.
    pub fn resume(&mut self) {
        self.services.break_event = None;
    }

    pub fn reset(&mut self, cpu: CpuType) -> Result<(), DebugError> {
        self.debugger_mut(cpu)?.reset();
        Ok(())
    }

    pub fn reset_all(&mut self) {
        for debugger in &mut self.debuggers {
            debugger.reset();
        }
        self.services.disassembler.clear();
        self.services.access_counter.reset();
        self.services.trace_logger.clear();
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.services.break_event.is_some()
    }

    #[inline]
    pub fn break_event(&self) -> Option<&BreakEvent> {
        self.services.break_event.as_ref()
    }

    /// Takes the pending break, leaving the session running.
    pub fn take_break_event(&mut self) -> Option<BreakEvent> {
        self.services.break_event.take()
    }

    pub fn callstack(&self, cpu: CpuType) -> Result<&VecDeque<StackFrame>, DebugError> {
        Ok(self.debugger(cpu)?.callstack().frames())
    }

    pub fn cpu_state(&self, cpu: CpuType) -> Result<Option<CpuState>, DebugError> {
        Ok(self.debugger(cpu)?.state())
    }

    pub fn breakpoint_manager_mut(
        &mut self,
        cpu: CpuType,
    ) -> Result<&mut BreakpointManager, DebugError> {
        Ok(self.debugger_mut(cpu)?.breakpoint_manager_mut())
    }

    /// Hands each breakpoint to the debugger of its CPU, replacing all previous ones.
    pub fn set_breakpoints(&mut self, breakpoints: &[Breakpoint]) {
        for debugger in &mut self.debuggers {
            debugger
                .breakpoint_manager_mut()
                .set_breakpoints(breakpoints.iter().cloned());
        }
        let orphans = breakpoints
            .iter()
            .filter(|bp| self.debuggers.iter().all(|d| d.cpu_type() != bp.cpu_type))
            .count();
        if orphans > 0 {
            warn!(orphans, "breakpoints for cpus without a debugger were dropped");
        }
    }

    pub fn debugger(&self, cpu: CpuType) -> Result<&CpuDebugger, DebugError> {
        self.debuggers
            .iter()
            .find(|d| d.cpu_type() == cpu)
            .ok_or(DebugError::DebuggerNotInitialized(cpu))
    }

    pub fn debugger_mut(&mut self, cpu: CpuType) -> Result<&mut CpuDebugger, DebugError> {
        self.debuggers
            .iter_mut()
            .find(|d| d.cpu_type() == cpu)
            .ok_or(DebugError::DebuggerNotInitialized(cpu))
    }

    pub fn debuggers(&self) -> impl Iterator<Item = &CpuDebugger> + '_ {
        self.debuggers.iter()
    }

    pub fn memory_dumper<'a>(
        &'a mut self,
        buffers: &'a mut dyn MemoryBuffers,
    ) -> MemoryDumper<'a> {
        MemoryDumper::new(buffers, &mut self.services.disassembler)
    }

    #[inline]
    pub fn services(&self) -> &DebugServices {
        &self.services
    }

    #[inline]
    pub fn config(&self) -> &DebuggerConfig {
        &self.services.config
    }

    /// Applies new flags and trace capacity. Callstack limits apply to new sessions only.
    pub fn set_config(&mut self, config: DebuggerConfig) {
        debug!(flags = ?config.flags, "debugger config updated");
        self.services
            .trace_logger
            .set_capacity(config.trace_log_capacity);
        self.services.config = config;
    }

    pub fn set_trace_logging(&mut self, cpu: CpuType, enabled: bool) {
        self.services.trace_logger.set_enabled(cpu, enabled);
    }

    pub fn set_evaluator(&mut self, evaluator: Box<dyn ExpressionEvaluator + Send>) {
        self.services.evaluator = Some(evaluator);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_cpu_is_reported() {
        let mut session = DebugSession::new(DebuggerConfig::default(), &[CpuType::Spc]);
        assert_eq!(
            session.run(CpuType::Nes),
            Err(DebugError::DebuggerNotInitialized(CpuType::Nes))
        );
        assert!(session.callstack(CpuType::Spc).is_ok_and(|frames| frames.is_empty()));
    }

    #[test]
    fn first_break_is_kept() {
        let mut session = DebugSession::new(DebuggerConfig::default(), &CpuType::ALL);
        session.request_break();
        session.services.latch_break(BreakEvent {
            cpu: Some(CpuType::Spc),
            source: BreakSource::CpuStep,
            operation: None,
            address: None,
            breakpoint: None,
        });
        assert_eq!(
            session.break_event().map(|event| event.source),
            Some(BreakSource::Pause)
        );
        session.resume();
        assert!(!session.is_paused());
    }

    #[test]
    fn duplicate_cpus_share_one_debugger() {
        let session = DebugSession::new(
            DebuggerConfig::default(),
            &[CpuType::Nes, CpuType::Nes, CpuType::Spc],
        );
        assert_eq!(session.debuggers().count(), 2);
    }
}
