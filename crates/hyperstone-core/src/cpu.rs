//! CPU state, lifecycle and the side effects of special global registers.

use tracing::{debug, warn};

use crate::api::{flags_string, CpuConfig, CpuSnapshot};
use crate::decoder::InstructionCursor;
use crate::fault::{CpuError, GuestException};
use crate::interrupt::{resolve_interrupt, InterruptLine, InterruptSource, INPUT_LINE_COUNT};
use crate::memory::Bus;
use crate::state::{
    local_index, DelaySlot, RegisterFile, StatusRegister, BCR_REGISTER, FCR_REGISTER, ISR_REGISTER,
    MCR_REGISTER, PC_REGISTER, SP_REGISTER, SR_REGISTER, SR_RESERVED, TCR_REGISTER, TPR_REGISTER,
    TR_REGISTER, UB_REGISTER,
};
use crate::timer::{Timer, FCR_TIMER_INHIBIT, TPR_DEFERRED_CHANGE};
use crate::timing::{scaled_cycle_cost, CycleCostKind};
use crate::trap::{TrapEntry, TRAPNO_RESET};

/// `TPR` value loaded at reset: clock-scale field 3, tick period 2.
pub const RESET_TPR: u32 = 0x0c00_0000;

/// One Hyperstone core: register banks, timer, trap base and cycle accounting.
#[derive(Debug, Clone)]
pub struct Cpu {
    pub(crate) regs: RegisterFile,
    config: CpuConfig,
    pub(crate) trap_entry: TrapEntry,
    pub(crate) timer: Timer,
    pub(crate) delay: DelaySlot,
    pub(crate) op: u16,
    pub(crate) ppc: u32,
    pub(crate) instruction_length: u8,
    pub(crate) intblock: i32,
    pub(crate) cycles: u64,
    pub(crate) slice_budget: i64,
    pub(crate) icount: i64,
    pub(crate) instructions: u64,
    pub(crate) fatal: Option<CpuError>,
    pub(crate) iram: Vec<u8>,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new(CpuConfig::default())
    }
}

impl Cpu {
    /// Creates a CPU with all registers and on-chip RAM zeroed.
    ///
    /// Call [`Self::reset`] before running.
    #[must_use]
    pub fn new(config: CpuConfig) -> Self {
        Self {
            regs: RegisterFile::new(),
            config,
            trap_entry: TrapEntry::Mem3,
            timer: Timer::new(config.clock_scale_mask),
            delay: DelaySlot::new(),
            op: 0,
            ppc: 0,
            instruction_length: 1,
            intblock: 0,
            cycles: 0,
            slice_budget: 0,
            icount: 0,
            instructions: 0,
            fatal: None,
            iram: vec![0; config.iram_size.bytes()],
        }
    }

    /// Applies the power-on reset sequence.
    ///
    /// Control registers are written through [`Self::set_global`] so their
    /// side effects (timer prescale, trap base, interrupt lockout) apply.
    /// The entry itself costs two clocks at the reset prescale. On-chip RAM
    /// keeps its contents.
    pub fn reset(&mut self) {
        self.timer.reset_clocks_per_tick();
        self.timer.set_interrupt_pending(false);
        self.trap_entry = TrapEntry::Mem3;
        self.delay = DelaySlot::default();
        self.fatal = None;

        self.set_global(BCR_REGISTER, !0);
        self.set_global(MCR_REGISTER, !0);
        self.set_global(FCR_REGISTER, !0);
        self.set_global(TPR_REGISTER, RESET_TPR);

        let vector = self.trap_addr(TRAPNO_RESET);
        self.regs.set_pc(vector);
        let sr = &mut self.regs.sr;
        sr.set_fp(0);
        sr.set_fl(2);
        sr.set_m(false);
        sr.set_t(false);
        sr.set_l(true);
        sr.set_s(true);
        let return_pc = (self.regs.pc() & !1) | u32::from(self.regs.sr.s());
        self.regs.set_local(0, return_pc);
        let sr_bits = self.regs.sr.bits();
        self.regs.set_local(1, sr_bits);

        let entry = scaled_cycle_cost(CycleCostKind::EntrySequence, self.timer.clock_scale());
        self.cycles += u64::try_from(entry).unwrap_or(0);

        debug!(pc = format_args!("{vector:#010x}"), "cpu reset");
    }

    /// Construction parameters.
    #[must_use]
    pub const fn config(&self) -> &CpuConfig {
        &self.config
    }

    /// On-chip RAM, indexed by offset into the mirrored window.
    #[must_use]
    pub fn iram(&self) -> &[u8] {
        &self.iram
    }

    /// Mutable on-chip RAM, for host preloading.
    pub fn iram_mut(&mut self) -> &mut [u8] {
        &mut self.iram
    }

    /// Register banks, without side effects.
    #[must_use]
    pub const fn regs(&self) -> &RegisterFile {
        &self.regs
    }

    /// Mutable register banks, bypassing every write side effect.
    pub const fn regs_mut(&mut self) -> &mut RegisterFile {
        &mut self.regs
    }

    /// Timer state.
    #[must_use]
    pub const fn timer(&self) -> &Timer {
        &self.timer
    }

    /// Active trap-entry base.
    #[must_use]
    pub const fn trap_entry(&self) -> TrapEntry {
        self.trap_entry
    }

    /// Vector address of trap `trapno` under the active base.
    #[must_use]
    pub const fn trap_addr(&self, trapno: u8) -> u32 {
        self.trap_entry.trap_addr(trapno)
    }

    /// Address of the instruction executed most recently, or of the last entry sequence.
    #[must_use]
    pub const fn ppc(&self) -> u32 {
        self.ppc
    }

    /// Remaining interrupt-recognition lockout, in instructions.
    #[must_use]
    pub const fn intblock(&self) -> i32 {
        self.intblock
    }

    /// Latched fatal error, cleared only by [`Self::reset`].
    #[must_use]
    pub const fn fatal_error(&self) -> Option<CpuError> {
        self.fatal
    }

    /// Instructions retired since construction.
    #[must_use]
    pub const fn instructions_retired(&self) -> u64 {
        self.instructions
    }

    /// Cycles consumed since construction, including the running slice.
    #[must_use]
    pub fn total_cycles(&self) -> u64 {
        let in_slice = u64::try_from(self.slice_budget - self.icount).unwrap_or(0);
        self.cycles + in_slice
    }

    /// Cycle budget left in the running slice.
    #[must_use]
    pub const fn remaining_cycles(&self) -> i64 {
        self.icount
    }

    /// Accounts idle cycles between slices (e.g. while the host is stalled).
    pub const fn advance_cycles(&mut self, cycles: u64) {
        self.cycles += cycles;
    }

    /// Absolute cycle of the next timer callback, if one is scheduled.
    #[must_use]
    pub const fn next_timer_deadline(&self) -> Option<u64> {
        match self.timer.deadline() {
            Some(deadline) => Some(deadline.at_cycle),
            None => None,
        }
    }

    /// Timer deadline callback: applies a deferred prescale, then either
    /// raises the compare interrupt or reschedules.
    pub fn timer_expired(&mut self) {
        let Some(deadline) = self.timer.take_deadline() else {
            return;
        };
        let now = self.total_cycles();
        if deadline.reload_prescale {
            let tpr = self.regs.global(TPR_REGISTER);
            let tpr = self.timer.update_prescale(now, tpr);
            self.regs.set_global(TPR_REGISTER, tpr);
        }
        let tcr = self.regs.global(TCR_REGISTER);
        if self.timer.compute_tr(now).wrapping_sub(tcr) & 0x8000_0000 == 0 {
            self.timer.set_interrupt_pending(true);
        } else {
            self.adjust_timer_interrupt();
        }
    }

    /// Drives host input line `line` (`0..8`); lines map onto `ISR` bits.
    pub fn set_input(&mut self, line: usize, asserted: bool) {
        if line >= INPUT_LINE_COUNT {
            warn!(line, "input line out of range");
            return;
        }
        let mask = 1u32 << line;
        let isr = self.regs.global(ISR_REGISTER);
        let isr = if asserted { isr | mask } else { isr & !mask };
        self.regs.set_global(ISR_REGISTER, isr);
    }

    /// Drives an external interrupt line.
    pub fn set_interrupt_line(&mut self, line: InterruptLine, asserted: bool) {
        self.set_input(line as usize, asserted);
    }

    /// Reads global `code`; `TR` yields the live tick count and debits half a tick.
    pub fn global(&mut self, code: u8) -> u32 {
        let code = code & 0x1f;
        if code == TR_REGISTER {
            self.read_tr()
        } else {
            self.regs.global(code)
        }
    }

    /// Writes global `code` with its architectural side effects.
    pub fn set_global(&mut self, code: u8, value: u32) {
        let code = code & 0x1f;
        match code {
            PC_REGISTER => self.regs.set_pc(value),
            SR_REGISTER => self.write_sr(value),
            SP_REGISTER | UB_REGISTER => self.regs.set_global(code, value & !3),
            TPR_REGISTER => self.write_tpr(value),
            TCR_REGISTER => self.write_tcr(value),
            TR_REGISTER => self.write_tr(value),
            ISR_REGISTER => {}
            FCR_REGISTER => self.write_fcr(value),
            MCR_REGISTER => self.write_mcr(value),
            _ => self.regs.set_global(code, value),
        }
    }

    /// Reads local `code` relative to the frame pointer.
    #[must_use]
    pub const fn local(&self, code: u8) -> u32 {
        self.regs.local(code)
    }

    /// Writes local `code` relative to the frame pointer.
    pub const fn set_local(&mut self, code: u8, value: u32) {
        self.regs.set_local(code, value);
    }

    /// Read-only export of the architectural state.
    #[must_use]
    pub fn snapshot(&self) -> CpuSnapshot {
        CpuSnapshot {
            global_regs: self.regs.globals(),
            local_regs: self.regs.locals().to_vec(),
            current_locals: self.regs.window().to_vec(),
            flags: flags_string(self.regs.sr),
            trap_entry: self.trap_entry,
            timer_interrupt_pending: self.timer.interrupt_pending(),
            delay_target: self.delay.target(),
            total_cycles: self.total_cycles(),
        }
    }

    fn read_tr(&mut self) -> u32 {
        let value = self.timer.compute_tr(self.total_cycles());
        let half_tick = i64::from(self.timer.clocks_per_tick() / 2);
        if self.icount > half_tick {
            self.icount -= half_tick;
        }
        value
    }

    const fn write_sr(&mut self, value: u32) {
        self.regs.sr.set_low(value);
        self.regs.sr = StatusRegister::from_bits(self.regs.sr.bits() & !SR_RESERVED);
        self.block_interrupts(1);
    }

    fn write_tpr(&mut self, value: u32) {
        self.regs.set_global(TPR_REGISTER, value);
        if value & TPR_DEFERRED_CHANGE == 0 {
            let tpr = self.timer.update_prescale(self.total_cycles(), value);
            self.regs.set_global(TPR_REGISTER, tpr);
        }
        self.adjust_timer_interrupt();
    }

    fn write_tcr(&mut self, value: u32) {
        if self.regs.global(TCR_REGISTER) != value {
            self.regs.set_global(TCR_REGISTER, value);
            self.adjust_timer_interrupt();
            self.block_interrupts(1);
        }
    }

    fn write_tr(&mut self, value: u32) {
        self.regs.set_global(TR_REGISTER, value);
        self.timer.rebase(self.total_cycles(), value);
        self.adjust_timer_interrupt();
    }

    fn write_fcr(&mut self, value: u32) {
        let changed = self.regs.global(FCR_REGISTER) ^ value;
        self.regs.set_global(FCR_REGISTER, value);
        if changed & FCR_TIMER_INHIBIT != 0 {
            self.adjust_timer_interrupt();
        }
        self.block_interrupts(1);
    }

    fn write_mcr(&mut self, value: u32) {
        self.regs.set_global(MCR_REGISTER, value);
        if let Some(entry) = TrapEntry::from_mcr(value) {
            self.trap_entry = entry;
        } else {
            warn!(
                selector = (value & 0x7000) >> 12,
                "reserved trap entry selector ignored"
            );
        }
    }

    pub(crate) fn adjust_timer_interrupt(&mut self) {
        let now = self.total_cycles();
        let tpr = self.regs.global(TPR_REGISTER);
        let tcr = self.regs.global(TCR_REGISTER);
        let fcr = self.regs.global(FCR_REGISTER);
        self.timer.adjust_interrupt(now, tpr, tcr, fcr);
    }

    /// Raises the interrupt lockout to at least `instructions`.
    pub(crate) const fn block_interrupts(&mut self, instructions: i32) {
        if self.intblock < instructions {
            self.intblock = instructions;
        }
    }

    pub(crate) fn charge(&mut self, kind: CycleCostKind) {
        self.icount -= scaled_cycle_cost(kind, self.timer.clock_scale());
    }

    pub(crate) const fn cursor(&self) -> InstructionCursor {
        InstructionCursor {
            pc: self.regs.pc(),
            length: self.instruction_length,
        }
    }

    pub(crate) const fn commit_cursor(&mut self, cursor: InstructionCursor) {
        self.regs.set_pc(cursor.pc);
        self.instruction_length = cursor.length;
    }

    /// Redirects `PC` to a pending delayed-branch target.
    pub(crate) fn check_delay_pc(&mut self) {
        if let Some(target) = self.delay.take() {
            self.regs.set_pc(target);
        }
    }

    fn enter_frame(&mut self, addr: u32, frame_length: u8, interrupt: bool) {
        let new_fp = self.regs.sr.fp().wrapping_add(self.regs.sr.fl());
        self.regs.sr.set_ilc(self.instruction_length);
        let old_sr = self.regs.sr.bits();

        self.regs.sr.set_fl(frame_length);
        self.regs.sr.set_fp(new_fp);
        let return_pc = (self.regs.pc() & !1) | u32::from(self.regs.sr.s());
        self.regs.set_local(0, return_pc);
        self.regs.set_local(1, old_sr);

        let sr = &mut self.regs.sr;
        sr.set_m(false);
        sr.set_t(false);
        sr.set_l(true);
        sr.set_s(true);
        if interrupt {
            sr.set_i(true);
        }

        self.ppc = self.regs.pc();
        self.regs.set_pc(addr);
        self.charge(CycleCostKind::EntrySequence);
    }

    /// Synchronous trap entry (frame length 6).
    pub(crate) fn execute_trap(&mut self, addr: u32) {
        debug!(addr = format_args!("{addr:#010x}"), "trap entry");
        self.enter_frame(addr, 6, false);
    }

    /// Hardware interrupt entry (frame length 2, sets `I`).
    pub(crate) fn execute_int(&mut self, addr: u32) {
        debug!(addr = format_args!("{addr:#010x}"), "interrupt entry");
        self.enter_frame(addr, 2, true);
    }

    /// Internal exception entry (frame length 2).
    pub(crate) fn execute_exception(&mut self, addr: u32) {
        debug!(addr = format_args!("{addr:#010x}"), "exception entry");
        self.enter_frame(addr, 2, false);
    }

    pub(crate) fn raise(&mut self, exception: GuestException) {
        debug!(?exception, pc = format_args!("{:#010x}", self.ppc), "guest exception");
        let addr = self.trap_addr(exception.trap_number());
        self.execute_exception(addr);
    }

    /// Defers the current opcode to its guest emulation routine, preserving
    /// both source registers in the new frame.
    pub(crate) fn execute_software(&mut self) {
        self.check_delay_pc();

        let fp = self.regs.sr.fp();
        let src = (self.op & 0xf) as u8;
        let dst = ((self.op & 0xf0) >> 4) as u8;
        let sreg = self.regs.local(src);
        let sregf = self.regs.local(src + 1);
        self.regs.sr.set_ilc(1);

        let addr = self.trap_entry.emu_code_addr((self.op >> 8) as u8);
        let new_fp = fp.wrapping_add(self.regs.sr.fl());
        let dst_slot = u32::try_from(local_index(dst, fp)).unwrap_or(0);
        let stack_of_dst = (self.regs.sp() & !0xff)
            .wrapping_add(0x100)
            .wrapping_add(dst_slot * 4);
        let old_sr = self.regs.sr.bits();

        self.regs.sr.set_fl(6);
        self.regs.sr.set_fp(new_fp);
        let return_pc = (self.regs.pc() & !1) | u32::from(self.regs.sr.s());
        self.regs.set_local(0, stack_of_dst);
        self.regs.set_local(1, sreg);
        self.regs.set_local(2, sregf);
        self.regs.set_local(3, return_pc);
        self.regs.set_local(4, old_sr);

        let sr = &mut self.regs.sr;
        sr.set_m(false);
        sr.set_t(false);
        sr.set_l(true);

        debug!(
            op = format_args!("{:#06x}", self.op),
            addr = format_args!("{addr:#010x}"),
            "software emulation entry"
        );
        self.ppc = self.regs.pc();
        self.regs.set_pc(addr);
        self.charge(CycleCostKind::SoftwareEntry);
    }

    /// Takes the highest-priority eligible interrupt, if recognition is open.
    pub(crate) fn check_interrupts(&mut self, bus: &mut dyn Bus) {
        if self.regs.sr.l() || self.intblock > 0 {
            return;
        }
        let isr = self.regs.global(ISR_REGISTER);
        let fcr = self.regs.global(FCR_REGISTER);
        let Some(source) = resolve_interrupt(isr, fcr, self.timer.interrupt_pending()) else {
            return;
        };

        let addr = self.trap_addr(source.trap_number());
        match source {
            InterruptSource::Timer => {
                self.timer.set_interrupt_pending(false);
                self.execute_int(addr);
            }
            InterruptSource::Line(line) => {
                self.execute_int(addr);
                bus.acknowledge_interrupt(line);
            }
        }
    }
}
