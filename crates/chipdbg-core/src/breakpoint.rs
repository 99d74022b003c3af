//! User breakpoints and per-CPU matching.

use bitflags::bitflags;
use tracing::warn;

use crate::cpu_type::CpuType;
use crate::memory_type::{AddressInfo, MemoryType};
use crate::operation::{MemoryOperationInfo, MemoryOperationType};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct BreakpointTypeFlags: u8 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const EXECUTE = 1 << 2;
    }
}

impl BreakpointTypeFlags {
    /// Breakpoint type an access can trigger. Dummy reads trigger nothing.
    pub const fn for_operation(op_type: MemoryOperationType) -> Self {
        match op_type {
            MemoryOperationType::ExecOpCode => Self::EXECUTE,
            MemoryOperationType::ExecOperand | MemoryOperationType::Read => Self::READ,
            MemoryOperationType::Write => Self::WRITE,
            MemoryOperationType::DummyRead => Self::empty(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BreakpointAddress {
    Any,
    Single(u32),
    /// Inclusive on both ends.
    Range(u32, u32),
}

impl BreakpointAddress {
    #[inline]
    pub fn contains(&self, address: u32) -> bool {
        match *self {
            BreakpointAddress::Any => true,
            BreakpointAddress::Single(addr) => addr == address,
            BreakpointAddress::Range(start, end) => (start..=end).contains(&address),
        }
    }
}

/// Evaluates breakpoint conditions. Implemented by the host's expression engine.
pub trait ExpressionEvaluator {
    fn evaluate(
        &mut self,
        cpu: CpuType,
        condition: &str,
        operation: &MemoryOperationInfo,
        address: Option<&AddressInfo>,
    ) -> Result<bool, String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Breakpoint {
    pub id: u32,
    pub cpu_type: CpuType,
    /// Relative types match the CPU address, every other type matches the resolved address.
    pub memory_type: MemoryType,
    pub address: BreakpointAddress,
    pub kind: BreakpointTypeFlags,
    pub enabled: bool,
    /// Record an event instead of (or in addition to) pausing.
    pub mark_event: bool,
    pub condition: Option<String>,
}

impl Breakpoint {
    pub fn new(
        id: u32,
        cpu_type: CpuType,
        memory_type: MemoryType,
        address: BreakpointAddress,
        kind: BreakpointTypeFlags,
    ) -> Self {
        Self {
            id,
            cpu_type,
            memory_type,
            address,
            kind,
            enabled: true,
            mark_event: false,
            condition: None,
        }
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// Registers and PPU memory are never executed from.
    pub fn is_cpu_breakpoint(&self) -> bool {
        self.memory_type != MemoryType::Register && !self.memory_type.is_ppu_memory()
    }

    /// Access types this breakpoint reacts to.
    pub fn effective_kind(&self) -> BreakpointTypeFlags {
        if self.is_cpu_breakpoint() {
            self.kind
        } else {
            self.kind - BreakpointTypeFlags::EXECUTE
        }
    }

    /// Whether the access hits this breakpoint, ignoring `enabled` and the condition.
    pub fn matches(&self, operation: &MemoryOperationInfo, address: Option<&AddressInfo>) -> bool {
        if !self
            .effective_kind()
            .intersects(BreakpointTypeFlags::for_operation(operation.op_type))
        {
            return false;
        }

        if self.memory_type == self.cpu_type.relative_memory() {
            self.address.contains(operation.address)
        } else {
            address.is_some_and(|info| {
                info.memory_type == self.memory_type && self.address.contains(info.address)
            })
        }
    }

    /// Short tag such as `SPC:RWX` or `REG:RW`.
    pub fn type_display(&self) -> String {
        let mut out = format!("{}:", self.memory_type.short_name());
        let flag = |set: bool, c: char| if set { c } else { '-' };
        out.push(flag(self.kind.contains(BreakpointTypeFlags::READ), 'R'));
        out.push(flag(self.kind.contains(BreakpointTypeFlags::WRITE), 'W'));
        if self.is_cpu_breakpoint() {
            out.push(flag(self.kind.contains(BreakpointTypeFlags::EXECUTE), 'X'));
        }
        out
    }

    pub fn address_display(&self) -> String {
        let width = self.memory_type.address_digits();
        match self.address {
            BreakpointAddress::Any => "<any>".to_string(),
            BreakpointAddress::Single(addr) => format!("${addr:0width$X}"),
            BreakpointAddress::Range(start, end) => {
                format!("${start:0width$X} - ${end:0width$X}")
            }
        }
    }
}

/// Outcome of checking one access against the breakpoint list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BreakpointHit {
    /// First enabled breakpoint whose condition passed.
    pub pause: Option<u32>,
    /// Whether at least one `mark_event` breakpoint matched.
    pub marked: bool,
}

/// Breakpoints owned by one CPU debugger.
#[derive(Debug)]
pub struct BreakpointManager {
    cpu_type: CpuType,
    breakpoints: Vec<Breakpoint>,
    active: BreakpointTypeFlags,
}

impl BreakpointManager {
    pub fn new(cpu_type: CpuType) -> Self {
        Self {
            cpu_type,
            breakpoints: Vec::new(),
            active: BreakpointTypeFlags::empty(),
        }
    }

    /// Replaces the list, keeping only breakpoints that belong to this CPU.
    pub fn set_breakpoints<I>(&mut self, breakpoints: I)
    where
        I: IntoIterator<Item = Breakpoint>,
    {
        let cpu_type = self.cpu_type;
        self.breakpoints = breakpoints
            .into_iter()
            .filter(|bp| bp.cpu_type == cpu_type)
            .collect();
        self.refresh_active();
    }

    /// Adds or replaces the breakpoint with the same id.
    pub fn add(&mut self, breakpoint: Breakpoint) {
        if breakpoint.cpu_type != self.cpu_type {
            warn!(
                cpu = %self.cpu_type,
                breakpoint = breakpoint.id,
                "ignoring breakpoint for another cpu"
            );
            return;
        }
        match self.breakpoints.iter_mut().find(|bp| bp.id == breakpoint.id) {
            Some(existing) => *existing = breakpoint,
            None => self.breakpoints.push(breakpoint),
        }
        self.refresh_active();
    }

    pub fn remove(&mut self, id: u32) -> Option<Breakpoint> {
        let index = self.breakpoints.iter().position(|bp| bp.id == id)?;
        let removed = self.breakpoints.remove(index);
        self.refresh_active();
        Some(removed)
    }

    #[inline]
    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.breakpoints
    }

    /// Access types at least one live breakpoint listens to.
    #[inline]
    pub fn active_types(&self) -> BreakpointTypeFlags {
        self.active
    }

    fn refresh_active(&mut self) {
        self.active = self
            .breakpoints
            .iter()
            .filter(|bp| bp.enabled || bp.mark_event)
            .fold(BreakpointTypeFlags::empty(), |acc, bp| {
                acc | bp.effective_kind()
            });
    }

    /// Checks an access against every live breakpoint.
    ///
    /// A condition that fails to evaluate counts as true so the user notices the broken
    /// expression.
    pub fn check(
        &self,
        operation: &MemoryOperationInfo,
        address: Option<&AddressInfo>,
        mut evaluator: Option<&mut (dyn ExpressionEvaluator + '_)>,
    ) -> BreakpointHit {
        let mut hit = BreakpointHit::default();
        if !self
            .active
            .intersects(BreakpointTypeFlags::for_operation(operation.op_type))
        {
            return hit;
        }

        for bp in &self.breakpoints {
            if !(bp.enabled || bp.mark_event) || !bp.matches(operation, address) {
                continue;
            }

            let passed = match (bp.condition.as_deref(), evaluator.as_deref_mut()) {
                (Some(condition), Some(evaluator)) if !condition.trim().is_empty() => evaluator
                    .evaluate(self.cpu_type, condition, operation, address)
                    .unwrap_or_else(|err| {
                        warn!(breakpoint = bp.id, %err, "breakpoint condition failed");
                        true
                    }),
                _ => true,
            };
            if !passed {
                continue;
            }

            hit.marked |= bp.mark_event;
            if bp.enabled && hit.pause.is_none() {
                hit.pause = Some(bp.id);
            }
        }
        hit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(bool);

    impl ExpressionEvaluator for Fixed {
        fn evaluate(
            &mut self,
            _: CpuType,
            _: &str,
            _: &MemoryOperationInfo,
            _: Option<&AddressInfo>,
        ) -> Result<bool, String> {
            Ok(self.0)
        }
    }

    struct Broken;

    impl ExpressionEvaluator for Broken {
        fn evaluate(
            &mut self,
            _: CpuType,
            condition: &str,
            _: &MemoryOperationInfo,
            _: Option<&AddressInfo>,
        ) -> Result<bool, String> {
            Err(format!("cannot parse `{condition}`"))
        }
    }

    fn write_at(addr: u32) -> MemoryOperationInfo {
        MemoryOperationInfo::new(addr, 0, MemoryOperationType::Write)
    }

    #[test]
    fn relative_breakpoint_matches_cpu_address() {
        let bp = Breakpoint::new(
            1,
            CpuType::Spc,
            MemoryType::SpcMemory,
            BreakpointAddress::Range(0x00F0, 0x00FF),
            BreakpointTypeFlags::WRITE,
        );
        assert!(bp.matches(&write_at(0xF4), None));
        assert!(!bp.matches(&write_at(0x100), None));
        let read = MemoryOperationInfo::new(0xF4, 0, MemoryOperationType::Read);
        assert!(!bp.matches(&read, None));
    }

    #[test]
    fn other_cpu_view_never_matches() {
        let bp = Breakpoint::new(
            4,
            CpuType::Spc,
            MemoryType::NesMemory,
            BreakpointAddress::Single(0x00F4),
            BreakpointTypeFlags::WRITE,
        );
        let ram = AddressInfo::new(0x00F4, MemoryType::SpcRam);
        assert!(!bp.matches(&write_at(0xF4), None));
        assert!(!bp.matches(&write_at(0xF4), Some(&ram)));
    }

    #[test]
    fn absolute_breakpoint_matches_resolved_address() {
        let bp = Breakpoint::new(
            2,
            CpuType::Spc,
            MemoryType::SpcRam,
            BreakpointAddress::Single(0xFFC0),
            BreakpointTypeFlags::WRITE,
        );
        let ram = AddressInfo::new(0xFFC0, MemoryType::SpcRam);
        let rom = AddressInfo::new(0x0000, MemoryType::SpcRom);
        assert!(bp.matches(&write_at(0xFFC0), Some(&ram)));
        assert!(!bp.matches(&write_at(0xFFC0), Some(&rom)));
        assert!(!bp.matches(&write_at(0xFFC0), None));
    }

    #[test]
    fn register_breakpoints_cannot_execute() {
        let bp = Breakpoint::new(
            3,
            CpuType::Nes,
            MemoryType::Register,
            BreakpointAddress::Any,
            BreakpointTypeFlags::all(),
        );
        assert!(!bp.is_cpu_breakpoint());
        assert_eq!(bp.effective_kind(), BreakpointTypeFlags::READ | BreakpointTypeFlags::WRITE);
        assert_eq!(bp.type_display(), "REG:RW");
    }

    #[test]
    fn displays_type_and_address() {
        let mut bp = Breakpoint::new(
            4,
            CpuType::Spc,
            MemoryType::SpcMemory,
            BreakpointAddress::Single(0x1234),
            BreakpointTypeFlags::all(),
        );
        assert_eq!(bp.type_display(), "SPC:RWX");
        assert_eq!(bp.address_display(), "$1234");

        bp.memory_type = MemoryType::SpcRam;
        bp.kind = BreakpointTypeFlags::EXECUTE;
        bp.address = BreakpointAddress::Range(0x1234, 0x12FF);
        assert_eq!(bp.type_display(), "RAM:--X");
        assert_eq!(bp.address_display(), "$001234 - $0012FF");

        bp.address = BreakpointAddress::Any;
        assert_eq!(bp.address_display(), "<any>");
    }

    #[test]
    fn manager_filters_foreign_breakpoints() {
        let mut manager = BreakpointManager::new(CpuType::Spc);
        manager.set_breakpoints([
            Breakpoint::new(
                1,
                CpuType::Spc,
                MemoryType::SpcMemory,
                BreakpointAddress::Any,
                BreakpointTypeFlags::EXECUTE,
            ),
            Breakpoint::new(
                2,
                CpuType::Nes,
                MemoryType::NesMemory,
                BreakpointAddress::Any,
                BreakpointTypeFlags::READ,
            ),
        ]);
        assert_eq!(manager.breakpoints().len(), 1);
        assert_eq!(manager.active_types(), BreakpointTypeFlags::EXECUTE);

        assert!(manager.remove(1).is_some());
        assert!(manager.active_types().is_empty());
    }

    #[test]
    fn conditions_gate_the_hit() {
        let mut manager = BreakpointManager::new(CpuType::Spc);
        manager.add(
            Breakpoint::new(
                7,
                CpuType::Spc,
                MemoryType::SpcMemory,
                BreakpointAddress::Single(0x20),
                BreakpointTypeFlags::WRITE,
            )
            .with_condition("A == $10"),
        );

        let op = write_at(0x20);
        assert_eq!(manager.check(&op, None, Some(&mut Fixed(false))).pause, None);
        assert_eq!(manager.check(&op, None, Some(&mut Fixed(true))).pause, Some(7));
        // Broken expressions pause.
        assert_eq!(manager.check(&op, None, Some(&mut Broken)).pause, Some(7));
        // No evaluator attached: the condition is not checked.
        assert_eq!(manager.check(&op, None, None).pause, Some(7));
    }

    #[test]
    fn mark_event_breakpoints_do_not_pause_when_disabled() {
        let mut manager = BreakpointManager::new(CpuType::Nes);
        let mut bp = Breakpoint::new(
            9,
            CpuType::Nes,
            MemoryType::NesMemory,
            BreakpointAddress::Single(0x2000),
            BreakpointTypeFlags::WRITE,
        );
        bp.enabled = false;
        bp.mark_event = true;
        manager.add(bp);

        let hit = manager.check(&write_at(0x2000), None, None);
        assert!(hit.marked);
        assert_eq!(hit.pause, None);
    }
}
