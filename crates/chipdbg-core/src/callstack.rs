//! Heuristic callstack reconstructed from the retired opcode stream.

use std::collections::VecDeque;

use bitflags::bitflags;
use tracing::trace;

use crate::memory_type::AddressInfo;
use crate::opcode::{OpcodeClass, OpcodeTable};

bitflags! {
    /// How a frame was entered. Empty for a regular subroutine call.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct StackFrameFlags: u8 {
        const NMI = 1 << 0;
        const IRQ = 1 << 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StackFrame {
    /// Resolved address of the call instruction.
    pub source: Option<AddressInfo>,
    pub source_pc: u32,
    /// Resolved address of the first instruction of the callee.
    pub target: Option<AddressInfo>,
    pub target_pc: u32,
    pub return_address: Option<AddressInfo>,
    pub return_pc: u32,
    pub flags: StackFrameFlags,
}

/// Tracks nested calls of one CPU.
///
/// Frames are pushed and popped purely from opcode classes, so the stack can drift from the
/// real hardware stack when code manipulates return addresses by hand. Mismatches are
/// tolerated: a return always pops at most one frame.
#[derive(Debug)]
pub struct CallstackManager {
    frames: VecDeque<StackFrame>,
    limit: usize,
}

impl CallstackManager {
    pub fn new(limit: usize) -> Self {
        Self {
            frames: VecDeque::new(),
            limit: limit.max(1),
        }
    }

    /// Updates the stack for the opcode that just finished executing.
    ///
    /// `prev_opcode` ran at `prev_pc`, and control is now at `pc`. Returns the class of
    /// `prev_opcode` so the step controller can reuse it.
    pub fn on_opcode_retired<F>(
        &mut self,
        opcodes: &OpcodeTable,
        address_mask: u32,
        prev_opcode: u8,
        prev_pc: u32,
        pc: u32,
        mut resolve: F,
    ) -> OpcodeClass
    where
        F: FnMut(u32) -> Option<AddressInfo>,
    {
        let class = opcodes.class(prev_opcode);
        match class {
            OpcodeClass::Call => {
                let return_pc =
                    prev_pc.wrapping_add(opcodes.size(prev_opcode) as u32) & address_mask;
                self.push(StackFrame {
                    source: resolve(prev_pc),
                    source_pc: prev_pc,
                    target: resolve(pc),
                    target_pc: pc,
                    return_address: resolve(return_pc),
                    return_pc,
                    flags: StackFrameFlags::empty(),
                });
            }
            OpcodeClass::Return => {
                self.pop(resolve(pc), pc);
            }
            OpcodeClass::Other => {}
        }
        class
    }

    /// Records entry into an interrupt handler. The interrupted PC is where it returns to.
    pub fn push_interrupt(
        &mut self,
        original_pc: u32,
        original: Option<AddressInfo>,
        handler_pc: u32,
        handler: Option<AddressInfo>,
        flags: StackFrameFlags,
    ) {
        self.push(StackFrame {
            source: original,
            source_pc: original_pc,
            target: handler,
            target_pc: handler_pc,
            return_address: original,
            return_pc: original_pc,
            flags,
        });
    }

    pub fn push(&mut self, frame: StackFrame) {
        if self.frames.len() >= self.limit {
            // Deep recursion or a stack that never unwinds: forget the outermost frame.
            self.frames.pop_front();
        }
        trace!(
            source_pc = frame.source_pc,
            target_pc = frame.target_pc,
            depth = self.frames.len() + 1,
            "callstack push"
        );
        self.frames.push_back(frame);
    }

    /// Pops the innermost frame on a return to `dest_pc`.
    pub fn pop(&mut self, dest: Option<AddressInfo>, dest_pc: u32) -> Option<StackFrame> {
        let frame = self.frames.pop_back();
        match &frame {
            Some(frame) if frame.return_pc != dest_pc => {
                trace!(
                    expected = frame.return_pc,
                    actual = dest_pc,
                    ?dest,
                    "return does not match innermost frame"
                );
            }
            None => trace!(dest_pc, "return with empty callstack"),
            _ => {}
        }
        frame
    }

    /// Address the innermost call returns to.
    pub fn return_address(&self) -> Option<u32> {
        self.frames.back().map(|frame| frame.return_pc)
    }

    /// Frames from outermost to innermost.
    #[inline]
    pub fn frames(&self) -> &VecDeque<StackFrame> {
        &self.frames
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn reset(&mut self) {
        self.frames.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_type::MemoryType;

    const JSR: u8 = 0x20;
    const RTS: u8 = 0x60;

    fn table() -> OpcodeTable {
        OpcodeTable::uniform(1)
            .with_size(JSR, 3)
            .with_class(&[JSR], OpcodeClass::Call)
            .with_class(&[RTS], OpcodeClass::Return)
    }

    fn ram(addr: u32) -> Option<AddressInfo> {
        Some(AddressInfo::new(addr, MemoryType::NesInternalRam))
    }

    #[test]
    fn call_then_return_restores_depth() {
        let opcodes = table();
        let mut stack = CallstackManager::new(16);

        let class = stack.on_opcode_retired(&opcodes, 0xFFFF, JSR, 0x100, 0x200, ram);
        assert_eq!(class, OpcodeClass::Call);
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.return_address(), Some(0x103));
        assert_eq!(stack.frames()[0].target, ram(0x200));

        stack.on_opcode_retired(&opcodes, 0xFFFF, RTS, 0x200, 0x103, ram);
        assert_eq!(stack.depth(), 0);
        assert_eq!(stack.return_address(), None);
    }

    #[test]
    fn mismatched_return_pops_one_frame() {
        let opcodes = table();
        let mut stack = CallstackManager::new(16);
        stack.on_opcode_retired(&opcodes, 0xFFFF, JSR, 0x100, 0x200, ram);
        stack.on_opcode_retired(&opcodes, 0xFFFF, JSR, 0x200, 0x300, ram);

        let popped = stack.on_opcode_retired(&opcodes, 0xFFFF, RTS, 0x300, 0x9000, ram);
        assert_eq!(popped, OpcodeClass::Return);
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.return_address(), Some(0x103));
    }

    #[test]
    fn return_on_empty_stack_is_ignored() {
        let mut stack = CallstackManager::new(16);
        assert_eq!(stack.pop(None, 0x1234), None);
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn return_address_wraps_inside_mask() {
        let opcodes = table();
        let mut stack = CallstackManager::new(16);
        stack.on_opcode_retired(&opcodes, 0xFFFF, JSR, 0xFFFE, 0x8000, |_| None);
        assert_eq!(stack.return_address(), Some(0x0001));
    }

    #[test]
    fn limit_drops_outermost_frame() {
        let opcodes = table();
        let mut stack = CallstackManager::new(2);
        for pc in [0x100, 0x200, 0x300] {
            stack.on_opcode_retired(&opcodes, 0xFFFF, JSR, pc, pc + 0x100, |_| None);
        }
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.frames()[0].source_pc, 0x200);
        assert_eq!(stack.return_address(), Some(0x303));
    }

    #[test]
    fn eviction_keeps_frames_in_call_order() {
        let opcodes = table();
        let mut stack = CallstackManager::new(3);
        for pc in (1..=40).map(|n| n * 0x100) {
            stack.on_opcode_retired(&opcodes, 0xFFFF, JSR, pc, pc + 0x80, |_| None);
        }
        let sources: Vec<u32> = stack.frames().iter().map(|frame| frame.source_pc).collect();
        assert_eq!(sources, [0x2600, 0x2700, 0x2800]);

        stack.on_opcode_retired(&opcodes, 0xFFFF, RTS, 0x2880, 0x2803, |_| None);
        assert_eq!(stack.return_address(), Some(0x2703));
    }

    #[test]
    fn interrupt_frame_returns_to_interrupted_pc() {
        let mut stack = CallstackManager::new(4);
        stack.push_interrupt(0x8123, ram(0x123), 0xC000, None, StackFrameFlags::NMI);
        let frame = stack.frames()[0];
        assert_eq!(frame.return_pc, 0x8123);
        assert!(frame.flags.contains(StackFrameFlags::NMI));
    }
}
