//! Per-CPU debugger: classifies every access and keeps stepping, callstack and breakpoint
//! state for one processor.
//!
//! Architecture differences live in the static [`ArchProfile`]; this type has no
//! per-architecture branches.

use tracing::{debug, trace};

use crate::arch::{ArchProfile, Capability, CpuState};
use crate::breakpoint::BreakpointManager;
use crate::callstack::{CallstackManager, StackFrameFlags};
use crate::cdl::{CdlFlags, CodeDataLogger};
use crate::config::DebuggerConfig;
use crate::cpu_type::CpuType;
use crate::error::DebugError;
use crate::memory_type::{AccessIntent, AddressInfo};
use crate::opcode::OpcodeClass;
use crate::operation::{MemoryOperationInfo, MemoryOperationType};
use crate::session::{BreakEvent, BreakSource, DebugServices};
use crate::step::{StepController, StepRequest, StepType};
use crate::target::{Assembler, DebugTarget, EventManager};
use crate::trace_logger::TraceRow;

pub struct CpuDebugger {
    profile: &'static ArchProfile,
    /// Opcode fetched last, `None` right after a reset or an interrupt.
    prev_opcode: Option<u8>,
    prev_pc: u32,
    step: StepController,
    callstack: CallstackManager,
    breakpoints: BreakpointManager,
    cdl: Option<CodeDataLogger>,
    state: Option<CpuState>,
    assembler: Option<Box<dyn Assembler + Send>>,
    event_manager: Option<Box<dyn EventManager + Send>>,
}

impl CpuDebugger {
    pub fn new(cpu_type: CpuType, config: &DebuggerConfig) -> Self {
        let profile = cpu_type.profile();
        let cdl = if profile.supports(Capability::CodeDataLogger) {
            profile.cdl_memory.map(CodeDataLogger::new)
        } else {
            None
        };
        Self {
            profile,
            prev_opcode: None,
            prev_pc: 0,
            step: StepController::new(),
            callstack: CallstackManager::new(config.callstack_limit),
            breakpoints: BreakpointManager::new(cpu_type),
            cdl,
            state: None,
            assembler: None,
            event_manager: None,
        }
    }

    #[inline]
    pub fn cpu_type(&self) -> CpuType {
        self.profile.cpu_type
    }

    #[inline]
    pub fn profile(&self) -> &'static ArchProfile {
        self.profile
    }

    /// Handles every non-write access. Returns `true` when emulation must pause.
    pub fn process_read(
        &mut self,
        services: &mut DebugServices,
        target: &dyn DebugTarget,
        addr: u32,
        value: u8,
        op_type: MemoryOperationType,
    ) -> bool {
        if op_type == MemoryOperationType::DummyRead {
            return false;
        }

        let cpu = self.cpu_type();
        let operation = MemoryOperationInfo::new(addr, value, op_type);
        let address = target.absolute_address(addr, AccessIntent::Read);
        let clock = target.master_clock();

        match op_type {
            MemoryOperationType::ExecOpCode => {
                let (step_pause, source) =
                    self.on_opcode_fetch(services, target, addr, value, address);
                if let Some(info) = address {
                    services.access_counter.process_exec(info, clock);
                }
                services.process_break_conditions(
                    cpu,
                    step_pause,
                    &self.breakpoints,
                    self.event_manager.as_deref_mut().map(|m| m as &mut dyn EventManager),
                    &operation,
                    address,
                    source,
                )
            }
            _ => {
                if let Some(info) = address {
                    if op_type.is_exec() {
                        self.mark_cdl(&info, CdlFlags::CODE);
                        services.access_counter.process_exec(info, clock);
                    } else {
                        self.mark_cdl(&info, CdlFlags::DATA);
                        services.access_counter.process_read(info, clock);
                    }
                }
                self.check_breakpoints(services, &operation, address)
            }
        }
    }

    /// Handles a write. The address is resolved for writing, which may differ from the
    /// region the same CPU address reads from.
    pub fn process_write(
        &mut self,
        services: &mut DebugServices,
        target: &dyn DebugTarget,
        addr: u32,
        value: u8,
    ) -> bool {
        let operation = MemoryOperationInfo::new(addr, value, MemoryOperationType::Write);
        let address = target.absolute_address(addr, AccessIntent::Write);

        let pause = self.check_breakpoints(services, &operation, address);
        if let Some(info) = address {
            services.disassembler.invalidate_cache(info, self.cpu_type());
            services
                .access_counter
                .process_write(info, target.master_clock());
        }
        pause
    }

    /// Opcode fetch bookkeeping. Returns the step decision and the reason to report.
    fn on_opcode_fetch(
        &mut self,
        services: &mut DebugServices,
        target: &dyn DebugTarget,
        pc: u32,
        opcode: u8,
        address: Option<AddressInfo>,
    ) -> (bool, BreakSource) {
        let profile = self.profile;
        let cpu = profile.cpu_type;
        let state = target.state();
        self.state = Some(state);

        let traced = services.trace_logger.is_traced(cpu);
        let enabled = services.config.has_flag(profile.enable_flag);
        if traced || enabled {
            if let Some(info) = address {
                services.disassembler.build_cache(info, opcode, cpu);
            }
        }
        if traced {
            services.trace_logger.log(TraceRow {
                cpu_type: cpu,
                pc,
                opcode,
                size: profile.opcodes.size(opcode),
                state,
            });
        }

        let prev_class = match self.prev_opcode {
            Some(prev) => self.callstack.on_opcode_retired(
                &profile.opcodes,
                profile.address_mask,
                prev,
                self.prev_pc,
                pc,
                |addr| target.absolute_address(addr, AccessIntent::Read),
            ),
            None => OpcodeClass::Other,
        };

        let mut step_pause = self.step.on_opcode_fetch(pc, prev_class);
        self.prev_opcode = Some(opcode);
        self.prev_pc = pc;

        let mut source = BreakSource::CpuStep;
        let forced = if enabled {
            profile.forced_break(opcode, services.config.flags)
        } else {
            None
        };
        if let Some(forced) = forced {
            debug!(%cpu, pc, opcode, ?forced, "forced break");
            self.step.break_now();
            step_pause = true;
            source = forced;
        }

        if let Some(info) = address {
            let mut flags = CdlFlags::CODE;
            if prev_class == OpcodeClass::Call {
                flags |= CdlFlags::SUB_ENTRY_POINT;
            }
            self.mark_cdl(&info, flags);
        }

        (step_pause, source)
    }

    fn check_breakpoints(
        &mut self,
        services: &mut DebugServices,
        operation: &MemoryOperationInfo,
        address: Option<AddressInfo>,
    ) -> bool {
        services.process_break_conditions(
            self.profile.cpu_type,
            false,
            &self.breakpoints,
            self.event_manager.as_deref_mut().map(|m| m as &mut dyn EventManager),
            operation,
            address,
            BreakSource::Breakpoint,
        )
    }

    fn mark_cdl(&mut self, address: &AddressInfo, flags: CdlFlags) {
        if let Some(cdl) = self.cdl.as_mut() {
            cdl.mark(address, flags);
        }
    }

    /// Records entry into an interrupt handler at `current_pc`, interrupting `original_pc`.
    pub fn process_interrupt(
        &mut self,
        target: &dyn DebugTarget,
        original_pc: u32,
        current_pc: u32,
        nmi: bool,
    ) {
        let profile = self.profile;
        let resolve = |addr: u32| target.absolute_address(addr, AccessIntent::Read);

        // The interrupted instruction retired before the handler runs.
        if let Some(prev) = self.prev_opcode.take() {
            self.callstack.on_opcode_retired(
                &profile.opcodes,
                profile.address_mask,
                prev,
                self.prev_pc,
                original_pc,
                resolve,
            );
        }

        let flags = if nmi {
            StackFrameFlags::NMI
        } else {
            StackFrameFlags::IRQ
        };
        trace!(cpu = %profile.cpu_type, original_pc, current_pc, ?flags, "interrupt");
        self.callstack.push_interrupt(
            original_pc,
            resolve(original_pc),
            current_pc,
            resolve(current_pc),
            flags,
        );
    }

    /// Advances PPU-driven step requests by one PPU cycle.
    pub fn process_ppu_cycle(
        &mut self,
        services: &mut DebugServices,
        scanline: i32,
        cycle: u32,
    ) -> bool {
        if !self.profile.has_ppu || !self.step.on_ppu_cycle(scanline, cycle) {
            return false;
        }
        services.latch_break(BreakEvent {
            cpu: Some(self.profile.cpu_type),
            source: BreakSource::PpuStep,
            operation: None,
            address: None,
            breakpoint: None,
        });
        true
    }

    /// Clears any stepping condition.
    pub fn run(&mut self) {
        self.step.run();
    }

    pub fn step(&mut self, count: u32, step_type: StepType) -> Result<(), DebugError> {
        let profile = self.profile;
        let cpu = profile.cpu_type;
        if !profile.supports_step(step_type) {
            return Err(DebugError::UnsupportedStep {
                cpu,
                step: step_type,
            });
        }

        let request = match step_type {
            StepType::Step => StepRequest::Instructions { remaining: count },
            StepType::StepOut => match self.callstack.return_address() {
                Some(address) => StepRequest::StepOut { address },
                None => {
                    debug!(%cpu, "step out with an empty callstack, running instead");
                    StepRequest::Run
                }
            },
            StepType::StepOver => match self.prev_opcode {
                Some(prev) if profile.opcodes.is_call(prev) => StepRequest::StepOver {
                    address: profile
                        .wrap(self.prev_pc.wrapping_add(profile.opcodes.size(prev) as u32)),
                },
                _ => StepRequest::Instructions { remaining: 1 },
            },
            StepType::PpuStep => StepRequest::PpuCycles { remaining: count },
            StepType::SpecificScanline => {
                if count >= profile.ppu_scanlines {
                    return Err(DebugError::InvalidScanline(count));
                }
                StepRequest::Scanline {
                    scanline: count as i32,
                }
            }
        };
        debug!(%cpu, count, ?step_type, ?request, "step");
        self.step.set(request);
        Ok(())
    }

    /// Forgets execution history. The step request is left alone.
    pub fn reset(&mut self) {
        self.callstack.reset();
        self.prev_opcode = None;
        self.prev_pc = 0;
        self.state = None;
    }

    #[inline]
    pub fn supports(&self, capability: Capability) -> bool {
        self.profile.supports(capability)
    }

    fn require(&self, capability: Capability) -> Result<(), DebugError> {
        if self.supports(capability) {
            Ok(())
        } else {
            Err(DebugError::Unsupported {
                cpu: self.cpu_type(),
                capability,
            })
        }
    }

    pub fn attach_assembler(
        &mut self,
        assembler: Box<dyn Assembler + Send>,
    ) -> Result<(), DebugError> {
        self.require(Capability::Assembler)?;
        self.assembler = Some(assembler);
        Ok(())
    }

    pub fn attach_event_manager(
        &mut self,
        event_manager: Box<dyn EventManager + Send>,
    ) -> Result<(), DebugError> {
        self.require(Capability::EventManager)?;
        self.event_manager = Some(event_manager);
        Ok(())
    }

    pub fn assembler(&mut self) -> Result<&mut (dyn Assembler + Send + 'static), DebugError> {
        self.require(Capability::Assembler)?;
        let cpu = self.cpu_type();
        self.assembler
            .as_deref_mut()
            .ok_or(DebugError::CapabilityNotAttached {
                cpu,
                capability: Capability::Assembler,
            })
    }

    pub fn event_manager(
        &mut self,
    ) -> Result<&mut (dyn EventManager + Send + 'static), DebugError> {
        self.require(Capability::EventManager)?;
        let cpu = self.cpu_type();
        self.event_manager
            .as_deref_mut()
            .ok_or(DebugError::CapabilityNotAttached {
                cpu,
                capability: Capability::EventManager,
            })
    }

    pub fn code_data_logger(&self) -> Result<&CodeDataLogger, DebugError> {
        self.require(Capability::CodeDataLogger)?;
        self.cdl.as_ref().ok_or(DebugError::CapabilityNotAttached {
            cpu: self.cpu_type(),
            capability: Capability::CodeDataLogger,
        })
    }

    #[inline]
    pub fn callstack(&self) -> &CallstackManager {
        &self.callstack
    }

    #[inline]
    pub fn breakpoint_manager(&self) -> &BreakpointManager {
        &self.breakpoints
    }

    #[inline]
    pub fn breakpoint_manager_mut(&mut self) -> &mut BreakpointManager {
        &mut self.breakpoints
    }

    /// Registers captured at the last opcode fetch.
    #[inline]
    pub fn state(&self) -> Option<CpuState> {
        self.state
    }

    #[inline]
    pub fn step_request(&self) -> StepRequest {
        self.step.request()
    }

    #[inline]
    pub fn prev_pc(&self) -> u32 {
        self.prev_pc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::NesState;

    #[test]
    fn spc_has_no_optional_features() {
        let mut debugger = CpuDebugger::new(CpuType::Spc, &DebuggerConfig::default());
        assert_eq!(
            debugger.assembler().err(),
            Some(DebugError::Unsupported {
                cpu: CpuType::Spc,
                capability: Capability::Assembler
            })
        );
        assert!(debugger.event_manager().is_err());
        assert!(matches!(
            debugger.code_data_logger(),
            Err(DebugError::Unsupported { .. })
        ));
    }

    #[test]
    fn nes_reports_missing_attachments() {
        let mut debugger = CpuDebugger::new(CpuType::Nes, &DebuggerConfig::default());
        assert_eq!(
            debugger.assembler().err(),
            Some(DebugError::CapabilityNotAttached {
                cpu: CpuType::Nes,
                capability: Capability::Assembler
            })
        );
        assert!(debugger.code_data_logger().is_ok());
    }

    #[test]
    fn ppu_steps_are_rejected_without_ppu() {
        let mut debugger = CpuDebugger::new(CpuType::Spc, &DebuggerConfig::default());
        assert_eq!(
            debugger.step(1, StepType::PpuStep),
            Err(DebugError::UnsupportedStep {
                cpu: CpuType::Spc,
                step: StepType::PpuStep
            })
        );
        assert_eq!(debugger.step_request(), StepRequest::Run);
    }

    #[test]
    fn scanline_must_exist() {
        let mut debugger = CpuDebugger::new(CpuType::Nes, &DebuggerConfig::default());
        assert_eq!(
            debugger.step(400, StepType::SpecificScanline),
            Err(DebugError::InvalidScanline(400))
        );
        debugger
            .step(241, StepType::SpecificScanline)
            .expect("visible scanline");
        assert_eq!(
            debugger.step_request(),
            StepRequest::Scanline { scanline: 241 }
        );
    }

    #[test]
    fn step_out_without_frames_runs() {
        let mut debugger = CpuDebugger::new(CpuType::Nes, &DebuggerConfig::default());
        debugger.step(3, StepType::Step).expect("step");
        debugger.step(1, StepType::StepOut).expect("step out");
        assert_eq!(debugger.step_request(), StepRequest::Run);
    }

    #[test]
    fn reset_keeps_step_request() {
        let mut debugger = CpuDebugger::new(CpuType::Nes, &DebuggerConfig::default());
        debugger.state = Some(CpuState::Nes(NesState::default()));
        debugger.step(2, StepType::Step).expect("step");
        debugger.reset();
        assert_eq!(debugger.state(), None);
        assert_eq!(
            debugger.step_request(),
            StepRequest::Instructions { remaining: 2 }
        );
    }
}
