//! Branches, delayed branches, `SET`, `FRAME`, `CALL` and `TRAPxx`.

use tracing::{trace, warn};

use super::Operand;
use crate::cpu::Cpu;
use crate::decoder::n_value;
use crate::encoding::BranchCondition;
use crate::fault::GuestException;
use crate::memory::Bus;
use crate::state::{StatusRegister, UB_REGISTER};
use crate::timing::CycleCostKind;
use crate::trap::TrapCondition;

/// Result of a `SET` variant, or `None` for reserved encodings.
fn set_value(n: u8, sr: StatusRegister, sp: u32) -> Option<u32> {
    let condition = |code: u8| match code {
        15 => !sr.v(),
        code => TrapCondition::from_code(code).is_some_and(|c| c.holds(sr)),
    };
    match n {
        0 => {
            let fp = u32::from(sr.fp());
            let carry = if sp & 0x100 != 0 && fp & 0x40 == 0 {
                0x200
            } else {
                0
            };
            Some(((sp & 0xffff_fe00) | (fp << 2)).wrapping_add(carry))
        }
        2 => Some(1),
        3 => Some(0),
        4..=15 => Some(u32::from(condition(n))),
        18 => Some(u32::MAX),
        20..=31 => Some(if condition(n - 16) { u32::MAX } else { 0 }),
        _ => None,
    }
}

impl Cpu {
    /// `SETADR`, `SET1`/`SET0`, `SETxx` (1 or 0) and `SETxxM` (-1 or 0).
    pub(super) fn op_set(&mut self, dst: Operand) {
        self.check_delay_pc();
        let n = n_value(self.op);
        if dst.is_pc() {
            warn!(
                op = format_args!("{:#06x}", self.op),
                "SET into PC is undefined"
            );
        } else if let Some(value) = set_value(n, self.regs.sr, self.regs.sp()) {
            self.write(dst, value);
        } else {
            warn!(n, "reserved SET variant");
        }
        self.charge(CycleCostKind::Alu);
    }

    fn take_branch(&mut self, bus: &mut dyn Bus) {
        let mut cursor = self.cursor();
        let offset = cursor.decode_pcrel(self.op, bus);
        self.commit_cursor(cursor);
        self.check_delay_pc();

        self.ppc = self.regs.pc();
        self.regs.set_pc(self.ppc.wrapping_add(offset));
        self.regs.sr.set_m(false);
        self.charge(CycleCostKind::BranchTaken);
    }

    fn skip_branch(&mut self) {
        let mut cursor = self.cursor();
        cursor.ignore_pcrel(self.op);
        self.commit_cursor(cursor);
        self.check_delay_pc();
        self.charge(CycleCostKind::BranchNotTaken);
    }

    pub(super) fn op_branch(&mut self, condition: BranchCondition, bus: &mut dyn Bus) {
        if condition.holds(self.regs.sr) {
            self.take_branch(bus);
        } else {
            self.skip_branch();
        }
    }

    pub(super) fn op_br(&mut self, bus: &mut dyn Bus) {
        self.take_branch(bus);
    }

    /// Arms the delay slot; the target is relative to the (possibly
    /// already redirected) `PC` after this instruction.
    fn arm_delayed_branch(&mut self, bus: &mut dyn Bus) {
        let mut cursor = self.cursor();
        let offset = cursor.decode_pcrel(self.op, bus);
        self.commit_cursor(cursor);
        self.check_delay_pc();

        let target = self.regs.pc().wrapping_add(offset);
        trace!(
            target = format_args!("{target:#010x}"),
            "delayed branch armed"
        );
        self.delay.arm(target);
        self.block_interrupts(2);
        self.charge(CycleCostKind::DelayedBranchTaken);
    }

    pub(super) fn op_delayed_branch(&mut self, condition: BranchCondition, bus: &mut dyn Bus) {
        if condition.holds(self.regs.sr) {
            self.arm_delayed_branch(bus);
        } else {
            self.skip_branch();
        }
    }

    pub(super) fn op_dbr(&mut self, bus: &mut dyn Bus) {
        self.arm_delayed_branch(bus);
    }

    /// `FRAME Ld, Ls`: moves `FP` back by `Ls`, sets `FL` to `Ld`, and spills
    /// locals to the memory stack until the new frame plus a 10-register
    /// reserve fits in the bank.
    pub(super) fn op_frame(&mut self, bus: &mut dyn Bus) {
        self.check_delay_pc();
        let src_code = (self.op & 0xf) as u8;
        let dst_code = ((self.op >> 4) & 0xf) as u8;

        let fp = self.regs.sr.fp().wrapping_sub(src_code) & 0x7f;
        let sr = &mut self.regs.sr;
        sr.set_fp(fp);
        sr.set_fl(dst_code);
        sr.set_m(false);

        let sp_slot = i32::from(((self.regs.sp() & 0x1fc) >> 2) as u8);
        let frame_end = i32::from(fp) + i32::from(self.regs.sr.fl());
        let mut difference = sp_slot + (64 - 10) - frame_end;
        if difference > 63 {
            difference -= 128;
        } else if difference < -64 {
            difference += 128;
        }

        if difference < 0 {
            let overflowed = self.regs.sp() >= self.regs.global(UB_REGISTER);
            while difference < 0 {
                let sp = self.regs.sp();
                let value = self.regs.local_abs(((sp & 0xfc) >> 2) as usize);
                bus.write_word(sp & !3, value);
                self.regs.set_sp(sp.wrapping_add(4));
                difference += 1;
            }
            if overflowed {
                self.raise(GuestException::Frame);
            }
        }
        self.charge(CycleCostKind::ControlTransfer);
    }

    /// `CALL Ld, Rs, const`: jumps to `Rs + const` and opens a frame at
    /// `Ld` (code 0 means 16) holding the return `PC` and `SR`.
    pub(super) fn op_call(&mut self, src: Operand, bus: &mut dyn Bus) {
        let mut cursor = self.cursor();
        let constant = cursor.decode_const(bus);
        self.commit_cursor(cursor);
        self.check_delay_pc();

        let dst_code = match (self.op >> 4) & 0xf {
            0 => 16,
            code => code as u8,
        };
        let sreg = if src.is_sr() { 0 } else { self.read(src) };
        let target = (constant & !1).wrapping_add(sreg);

        self.regs.sr.set_ilc(self.instruction_length);
        let return_pc = (self.regs.pc() & !1) | u32::from(self.regs.sr.s());
        let sr_bits = self.regs.sr.bits();
        self.regs.set_local(dst_code, return_pc);
        self.regs.set_local(dst_code + 1, sr_bits);

        let fp = self.regs.sr.fp().wrapping_add(dst_code);
        let sr = &mut self.regs.sr;
        sr.set_fp(fp);
        sr.set_fl(6);
        sr.set_m(false);

        self.ppc = self.regs.pc();
        self.regs.set_pc(target);
        self.block_interrupts(2);
        self.charge(CycleCostKind::ControlTransfer);
    }

    pub(super) fn op_trap(&mut self) {
        self.check_delay_pc();
        let (trapno, code) = TrapCondition::split_opcode(self.op);
        let taken = TrapCondition::from_code(code).is_some_and(|c| c.holds(self.regs.sr));
        if taken {
            let addr = self.trap_addr(trapno);
            self.execute_trap(addr);
        }
        self.charge(CycleCostKind::ControlTransfer);
    }

    /// Reserved opcodes are logged and otherwise ignored; they still consume
    /// a cycle so a run over unmapped memory makes progress.
    pub(super) fn op_reserved(&mut self) {
        warn!(
            pc = format_args!("{:#010x}", self.ppc),
            op = format_args!("{:#06x}", self.op),
            "reserved opcode"
        );
        self.charge(CycleCostKind::Alu);
    }
}
