use super::status::StatusRegister;

/// Number of global registers (`G0..G31`, of which `G16..G31` need `SR.H`).
pub const GLOBAL_REGISTER_COUNT: usize = 32;
/// Number of physical local registers, addressed modulo 64 through `SR.FP`.
pub const LOCAL_REGISTER_COUNT: usize = 64;

/// Program counter (`G0`).
pub const PC_REGISTER: u8 = 0;
/// Status register (`G1`).
pub const SR_REGISTER: u8 = 1;
/// Floating-point exception register (`G2`).
pub const FER_REGISTER: u8 = 2;
/// Stack pointer (`G18`).
pub const SP_REGISTER: u8 = 18;
/// Upper stack bound (`G19`).
pub const UB_REGISTER: u8 = 19;
/// Bus control register (`G20`).
pub const BCR_REGISTER: u8 = 20;
/// Timer prescaler register (`G21`).
pub const TPR_REGISTER: u8 = 21;
/// Timer compare register (`G22`).
pub const TCR_REGISTER: u8 = 22;
/// Timer register (`G23`).
pub const TR_REGISTER: u8 = 23;
/// Watchdog compare register (`G24`).
pub const WCR_REGISTER: u8 = 24;
/// Input status register (`G25`), owned by the external interrupt lines.
pub const ISR_REGISTER: u8 = 25;
/// Function control register (`G26`).
pub const FCR_REGISTER: u8 = 26;
/// Memory control register (`G27`).
pub const MCR_REGISTER: u8 = 27;

/// Registers that read back as zero through `MOV`: `BCR`, `TPR`, `FCR`, `MCR`.
pub const WRITE_ONLY_REGISTER_MASK: u32 = (1 << BCR_REGISTER)
    | (1 << TPR_REGISTER)
    | (1 << FCR_REGISTER)
    | (1 << MCR_REGISTER);

/// Physical local-bank index for an instruction-relative register code.
#[must_use]
pub const fn local_index(code: u8, fp: u8) -> usize {
    (code as usize + fp as usize) & (LOCAL_REGISTER_COUNT - 1)
}

/// Returns `true` when reads of global `code` are masked to zero.
#[must_use]
pub const fn is_write_only(code: u8) -> bool {
    code < 32 && WRITE_ONLY_REGISTER_MASK & (1 << code) != 0
}

/// Raw storage for the global and local register banks.
///
/// Accessors here never apply side effects; the timer, trap-entry and
/// interrupt-lockout behavior of special globals lives on [`crate::Cpu`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterFile {
    global: [u32; GLOBAL_REGISTER_COUNT],
    local: [u32; LOCAL_REGISTER_COUNT],
    /// Status register; mirrors `G1`.
    pub sr: StatusRegister,
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterFile {
    /// Creates an all-zero register file.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            global: [0; GLOBAL_REGISTER_COUNT],
            local: [0; LOCAL_REGISTER_COUNT],
            sr: StatusRegister::from_bits(0),
        }
    }

    /// Reads global `code` (modulo 32) without side effects.
    #[must_use]
    pub const fn global(&self, code: u8) -> u32 {
        let code = code & 0x1f;
        if code == SR_REGISTER {
            self.sr.bits()
        } else {
            self.global[code as usize]
        }
    }

    /// Writes global `code` (modulo 32) without side effects.
    pub const fn set_global(&mut self, code: u8, value: u32) {
        let code = code & 0x1f;
        if code == SR_REGISTER {
            self.sr = StatusRegister::from_bits(value);
        } else {
            self.global[code as usize] = value;
        }
    }

    /// Reads local `code` relative to the current frame pointer.
    #[must_use]
    pub const fn local(&self, code: u8) -> u32 {
        self.local[local_index(code, self.sr.fp())]
    }

    /// Writes local `code` relative to the current frame pointer.
    pub const fn set_local(&mut self, code: u8, value: u32) {
        self.local[local_index(code, self.sr.fp())] = value;
    }

    /// Reads a physical local register (index modulo 64).
    #[must_use]
    pub const fn local_abs(&self, index: usize) -> u32 {
        self.local[index & (LOCAL_REGISTER_COUNT - 1)]
    }

    /// Writes a physical local register (index modulo 64).
    pub const fn set_local_abs(&mut self, index: usize, value: u32) {
        self.local[index & (LOCAL_REGISTER_COUNT - 1)] = value;
    }

    /// Program counter.
    #[must_use]
    pub const fn pc(&self) -> u32 {
        self.global[PC_REGISTER as usize]
    }

    /// Stores the program counter with bit 0 cleared.
    pub const fn set_pc(&mut self, value: u32) {
        self.global[PC_REGISTER as usize] = value & !1;
    }

    /// Stack pointer.
    #[must_use]
    pub const fn sp(&self) -> u32 {
        self.global[SP_REGISTER as usize]
    }

    /// Stores the stack pointer verbatim.
    pub const fn set_sp(&mut self, value: u32) {
        self.global[SP_REGISTER as usize] = value;
    }

    /// Snapshot of all globals with `SR` folded into slot 1.
    #[must_use]
    pub const fn globals(&self) -> [u32; GLOBAL_REGISTER_COUNT] {
        let mut out = self.global;
        out[SR_REGISTER as usize] = self.sr.bits();
        out
    }

    /// The physical local bank.
    #[must_use]
    pub const fn locals(&self) -> &[u32; LOCAL_REGISTER_COUNT] {
        &self.local
    }

    /// The 16 locals visible at the current frame pointer, `L0` first.
    #[must_use]
    pub fn window(&self) -> [u32; 16] {
        let mut out = [0; 16];
        for (code, slot) in (0u8..).zip(out.iter_mut()) {
            *slot = self.local(code);
        }
        out
    }
}
