//! Step controller: decides, at each opcode fetch or PPU cycle, whether stepping wants a pause.

use tracing::trace;

use crate::opcode::OpcodeClass;

/// Stepping command issued by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StepType {
    /// Execute N instructions.
    Step,
    /// Run until the instruction after the current call returns.
    StepOver,
    /// Run until the current subroutine returns.
    StepOut,
    /// Execute N PPU cycles.
    PpuStep,
    /// Run until the PPU starts the given scanline.
    SpecificScanline,
}

/// Active stop condition for one CPU.
///
/// Always replaced as a whole: exactly one variant decides when stepping pauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepRequest {
    #[default]
    Run,
    /// Opcode fetches left before pausing. Zero means "pause at every fetch".
    Instructions { remaining: u32 },
    /// Pause at the first fetch of `address`.
    StepOver { address: u32 },
    /// Pause at the first fetch of `address` that directly follows a return.
    StepOut { address: u32 },
    PpuCycles { remaining: u32 },
    Scanline { scanline: i32 },
}

#[derive(Debug, Default)]
pub struct StepController {
    request: StepRequest,
}

impl StepController {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn request(&self) -> StepRequest {
        self.request
    }

    pub fn run(&mut self) {
        self.request = StepRequest::Run;
    }

    pub fn set(&mut self, request: StepRequest) {
        trace!(?request, "step request installed");
        self.request = request;
    }

    /// Pause at the current fetch and every one after it.
    pub fn break_now(&mut self) {
        self.request = StepRequest::Instructions { remaining: 0 };
    }

    /// Evaluates an opcode fetch at `pc`, given the class of the opcode retired just before.
    pub fn on_opcode_fetch(&mut self, pc: u32, prev_class: OpcodeClass) -> bool {
        match self.request {
            StepRequest::StepOver { address } if address == pc => self.break_now(),
            StepRequest::StepOut { address }
                if address == pc && prev_class == OpcodeClass::Return =>
            {
                self.break_now()
            }
            _ => {}
        }

        match &mut self.request {
            StepRequest::Instructions { remaining } => {
                *remaining = remaining.saturating_sub(1);
                *remaining == 0
            }
            _ => false,
        }
    }

    /// Evaluates one PPU cycle. Only the PPU-driven requests react to it.
    pub fn on_ppu_cycle(&mut self, scanline: i32, cycle: u32) -> bool {
        let hit = match &mut self.request {
            StepRequest::PpuCycles { remaining } => {
                *remaining = remaining.saturating_sub(1);
                *remaining == 0
            }
            StepRequest::Scanline { scanline: target } => *target == scanline && cycle == 0,
            _ => false,
        };
        if hit {
            self.break_now();
        }
        hit
    }
}
