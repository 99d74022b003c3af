//! Ring buffer of executed instructions.
//!
//! Formatting and persistence belong to the host; this only records rows and mirrors them
//! to the `chipdbg::trace` tracing target.

use std::collections::VecDeque;

use tracing::trace;

use crate::arch::CpuState;
use crate::cpu_type::CpuType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceRow {
    pub cpu_type: CpuType,
    pub pc: u32,
    pub opcode: u8,
    pub size: u8,
    /// Registers before the instruction executed.
    pub state: CpuState,
}

#[derive(Debug)]
pub struct TraceLogger {
    rows: VecDeque<TraceRow>,
    capacity: usize,
    enabled: Vec<CpuType>,
}

impl TraceLogger {
    pub fn new(capacity: usize) -> Self {
        Self {
            rows: VecDeque::with_capacity(capacity.min(4096)),
            capacity: capacity.max(1),
            enabled: Vec::new(),
        }
    }

    pub fn set_enabled(&mut self, cpu_type: CpuType, enabled: bool) {
        self.enabled.retain(|&cpu| cpu != cpu_type);
        if enabled {
            self.enabled.push(cpu_type);
        }
    }

    #[inline]
    pub fn is_traced(&self, cpu_type: CpuType) -> bool {
        self.enabled.contains(&cpu_type)
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.rows.len() > self.capacity {
            self.rows.pop_front();
        }
    }

    pub fn log(&mut self, row: TraceRow) {
        trace!(
            target: "chipdbg::trace",
            cpu = %row.cpu_type,
            pc = row.pc,
            opcode = row.opcode,
            state = %row.state,
            "exec"
        );
        if self.rows.len() == self.capacity {
            self.rows.pop_front();
        }
        self.rows.push_back(row);
    }

    /// Rows from oldest to newest.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &TraceRow> + '_ {
        self.rows.iter()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }
}
