//! Instruction execution pipeline: slice loop, dispatch and the pull-based driver.

mod alu;
mod control;
mod extend;
/// Flag computation helpers shared by the arithmetic handlers.
pub mod flags;
mod immediate;
mod memory;
mod operands;
mod shift;

pub use operands::Operand;

use tracing::error;

use crate::api::RunOutcome;
use crate::cpu::Cpu;
use crate::encoding::{lookup, OpcodeEntry, Operation};
use crate::fault::{CpuError, GuestException};
use crate::memory::{Bus, VariantBus};
use crate::state::{StatusRegister, SR_H};

impl Cpu {
    /// Runs for at least `cycles` cycles, servicing timer deadlines between slices.
    ///
    /// Each slice is cut at the next timer deadline so the compare interrupt
    /// is raised at the cycle it is due, then recognized at the start of the
    /// following slice.
    ///
    /// # Errors
    ///
    /// Returns [`CpuError`] when a fatal opcode executes, or immediately when
    /// one is already latched.
    pub fn run(&mut self, bus: &mut dyn Bus, cycles: u64) -> Result<RunOutcome, CpuError> {
        let start_cycles = self.cycles;
        let start_instructions = self.instructions;
        let end = self.cycles.saturating_add(cycles);

        while self.cycles < end {
            self.service_timer();
            let remaining = end - self.cycles;
            let slice = match self.next_timer_deadline() {
                Some(at) if at > self.cycles => (at - self.cycles).min(remaining),
                Some(_) => 1,
                None => remaining,
            };
            self.execute_slice(bus, slice)?;
        }
        self.service_timer();

        Ok(RunOutcome {
            cycles: self.cycles - start_cycles,
            instructions: self.instructions - start_instructions,
        })
    }

    /// Executes instructions until `cycles` are consumed, without timer servicing.
    ///
    /// Interrupts are checked once on entry and again whenever the
    /// recognition lockout counts down to zero. At least one instruction
    /// executes for any non-zero budget. Returns the cycles consumed.
    ///
    /// # Errors
    ///
    /// Returns [`CpuError`] when a fatal opcode executes, or immediately when
    /// one is already latched.
    pub fn execute_slice(&mut self, bus: &mut dyn Bus, cycles: u64) -> Result<u64, CpuError> {
        if let Some(err) = self.fatal {
            return Err(err);
        }
        if cycles == 0 {
            return Ok(0);
        }

        let budget = i64::try_from(cycles).unwrap_or(i64::MAX);
        self.slice_budget = budget;
        self.icount = budget;

        if self.intblock < 0 {
            self.intblock = 0;
        }

        let mut iram = std::mem::take(&mut self.iram);
        let mut bus = VariantBus::new(bus, &mut iram, *self.config());
        self.check_interrupts(&mut bus);
        let result = loop {
            if let Err(err) = self.execute_one(&mut bus) {
                break Err(err);
            }
            if self.icount <= 0 {
                break Ok(());
            }
        };
        self.iram = iram;

        let consumed = u64::try_from(self.slice_budget - self.icount).unwrap_or(0);
        self.cycles += consumed;
        self.slice_budget = 0;
        self.icount = 0;

        result.map(|()| consumed)
    }

    /// Executes a single instruction (plus any interrupt taken before it).
    ///
    /// # Errors
    ///
    /// See [`Self::execute_slice`].
    pub fn step(&mut self, bus: &mut dyn Bus) -> Result<u64, CpuError> {
        self.execute_slice(bus, 1)
    }

    fn service_timer(&mut self) {
        if self
            .next_timer_deadline()
            .is_some_and(|at| at <= self.total_cycles())
        {
            self.timer_expired();
        }
    }

    fn execute_one(&mut self, bus: &mut dyn Bus) -> Result<(), CpuError> {
        let old_h = self.regs.sr.bits() & SR_H;
        let pc = self.regs.pc();
        self.ppc = pc;
        self.op = bus.fetch_op(pc);
        self.regs.set_pc(pc.wrapping_add(2));
        self.instruction_length = 1;

        let entry = lookup(self.op);
        if let Err(err) = self.dispatch(entry, bus) {
            self.fatal = Some(err);
            return Err(err);
        }

        self.regs.sr = StatusRegister::from_bits(self.regs.sr.bits() ^ old_h);
        self.regs.sr.set_ilc(self.instruction_length);

        if self.regs.sr.t() && self.regs.sr.p() && !self.delay.is_pending() {
            self.raise(GuestException::Trace);
        }

        self.instructions += 1;
        self.intblock = self.intblock.saturating_sub(1);
        if self.intblock == 0 {
            self.check_interrupts(bus);
        }
        Ok(())
    }

    fn dispatch(&mut self, entry: OpcodeEntry, bus: &mut dyn Bus) -> Result<(), CpuError> {
        let dst = Operand::dst(entry, self.op);
        let src = Operand::src(entry, self.op);

        match entry.operation {
            Operation::Chk => self.op_chk(dst, src),
            Operation::Movd => self.op_movd(dst, src, bus),
            Operation::Divu => self.op_divide(dst, src, false),
            Operation::Divs => self.op_divide(dst, src, true),
            Operation::Xm => self.op_xm(dst, src, bus),
            Operation::Mask => self.op_mask(dst, src, bus),
            Operation::Sum => self.op_sum(dst, src, bus),
            Operation::Sums => self.op_sums(dst, src, bus),
            Operation::Cmp => self.op_cmp(dst, src),
            Operation::Mov => self.op_mov(dst, src),
            Operation::Add => self.op_add(dst, src),
            Operation::Adds => self.op_adds(dst, src),
            Operation::Cmpb => self.op_cmpb(dst, src),
            Operation::Andn => self.op_logical(dst, src, |d, s| d & !s),
            Operation::Or => self.op_logical(dst, src, |d, s| d | s),
            Operation::Xor => self.op_logical(dst, src, |d, s| d ^ s),
            Operation::Subc => self.op_subc(dst, src),
            Operation::Not => self.op_not(dst, src),
            Operation::Sub => self.op_sub(dst, src),
            Operation::Subs => self.op_subs(dst, src),
            Operation::Addc => self.op_addc(dst, src),
            Operation::And => self.op_logical(dst, src, |d, s| d & s),
            Operation::Neg => self.op_neg(dst, src),
            Operation::Negs => self.op_negs(dst, src),

            Operation::Cmpi => self.op_cmpi(dst, bus),
            Operation::Movi => self.op_movi(dst, bus),
            Operation::Addi => self.op_addi(dst, bus),
            Operation::Addsi => self.op_addsi(dst, bus),
            Operation::Cmpbi => self.op_cmpbi(dst, bus),
            Operation::Andni => self.op_andni(dst, bus),
            Operation::Ori => self.op_logical_immediate(dst, bus, |d, i| d | i),
            Operation::Xori => self.op_logical_immediate(dst, bus, |d, i| d ^ i),

            Operation::Shrdi => self.op_shift_double_immediate(dst, shift::ShiftKind::Logical),
            Operation::Sardi => self.op_shift_double_immediate(dst, shift::ShiftKind::Arithmetic),
            Operation::Shldi => self.op_shift_double_immediate(dst, shift::ShiftKind::Left),
            Operation::Shrd => self.op_shift_double(dst, src, shift::ShiftKind::Logical),
            Operation::Sard => self.op_shift_double(dst, src, shift::ShiftKind::Arithmetic),
            Operation::Shld => self.op_shift_double(dst, src, shift::ShiftKind::Left),
            Operation::Shr => self.op_shift(dst, src, shift::ShiftKind::Logical),
            Operation::Sar => self.op_shift(dst, src, shift::ShiftKind::Arithmetic),
            Operation::Shl => self.op_shift(dst, src, shift::ShiftKind::Left),
            Operation::Shri => self.op_shift_immediate(dst, shift::ShiftKind::Logical),
            Operation::Sari => self.op_shift_immediate(dst, shift::ShiftKind::Arithmetic),
            Operation::Shli => self.op_shift_immediate(dst, shift::ShiftKind::Left),
            Operation::Testlz => self.op_testlz(dst, src),
            Operation::Rol => self.op_rol(dst, src),

            Operation::LoadDisplacement => self.op_load_displacement(dst, src, bus),
            Operation::LoadNext => self.op_load_next(dst, src, bus),
            Operation::StoreDisplacement => self.op_store_displacement(dst, src, bus),
            Operation::StoreNext => self.op_store_next(dst, src, bus),
            Operation::LdwR
            | Operation::LddR
            | Operation::LdwP
            | Operation::LddP
            | Operation::StwR
            | Operation::StdR
            | Operation::StwP
            | Operation::StdP => self.op_register_memory(entry.operation, dst, src, bus),

            Operation::Mulu => self.op_mulu(dst, src),
            Operation::Muls => self.op_muls(dst, src),
            Operation::Mul => self.op_mul(dst, src),
            Operation::Set => self.op_set(dst),

            Operation::Software => self.execute_software(),
            Operation::Extend => self.op_extend(dst, src, bus),
            Operation::Do => {
                error!(
                    pc = format_args!("{:#010x}", self.ppc),
                    op = format_args!("{:#06x}", self.op),
                    "unimplemented opcode"
                );
                return Err(CpuError::UnimplementedOpcode {
                    pc: self.ppc,
                    opcode: self.op,
                });
            }

            Operation::DelayedBranch(condition) => self.op_delayed_branch(condition, bus),
            Operation::Dbr => self.op_dbr(bus),
            Operation::Frame => self.op_frame(bus),
            Operation::Call => self.op_call(src, bus),
            Operation::Branch(condition) => self.op_branch(condition, bus),
            Operation::Br => self.op_br(bus),
            Operation::Trap => self.op_trap(),
            Operation::Reserved => self.op_reserved(),
        }
        Ok(())
    }
}
