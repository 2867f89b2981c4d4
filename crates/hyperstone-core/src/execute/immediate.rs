//! `Rimm` format: register with a nybble or extension-word immediate.

use super::flags;
use super::Operand;
use crate::cpu::Cpu;
use crate::decoder::n_value;
use crate::encoding::RegisterBank;
use crate::fault::GuestException;
use crate::memory::Bus;
use crate::timing::CycleCostKind;

impl Cpu {
    fn fetch_immediate(&mut self, bus: &mut dyn Bus) -> u32 {
        let mut cursor = self.cursor();
        let imm = cursor.decode_immediate(self.op, bus);
        self.commit_cursor(cursor);
        self.check_delay_pc();
        imm
    }

    /// Destination and addend of `ADDI`/`ADDSI`; `n = 0` adds the
    /// round-to-even carry `C & (!Z | Rd[0])`.
    fn add_immediate_operands(&mut self, dst: Operand, bus: &mut dyn Bus) -> (u32, u32) {
        if n_value(self.op) == 0 {
            self.check_delay_pc();
            let dreg = self.read(dst);
            let sr = self.regs.sr;
            (dreg, u32::from(sr.c() && (!sr.z() || dreg & 1 != 0)))
        } else {
            let imm = self.fetch_immediate(bus);
            (self.read(dst), imm)
        }
    }

    pub(super) fn op_cmpi(&mut self, dst: Operand, bus: &mut dyn Bus) {
        let imm = self.fetch_immediate(bus);
        let dreg = self.read(dst);
        self.compare(dreg, imm);
        self.charge(CycleCostKind::Alu);
    }

    pub(super) fn op_movi(&mut self, dst: Operand, bus: &mut dyn Bus) {
        let high = self.regs.sr.h();
        if high && dst.bank == RegisterBank::Global && !self.regs.sr.s() {
            let mut cursor = self.cursor();
            cursor.ignore_immediate(self.op);
            self.commit_cursor(cursor);
            self.check_delay_pc();
            self.raise(GuestException::Privilege);
            self.charge(CycleCostKind::Alu);
            return;
        }

        let imm = self.fetch_immediate(bus);
        let dst = match dst.bank {
            RegisterBank::Global if high => Operand::global(dst.code + 16),
            _ => dst,
        };
        self.write(dst, imm);
        if dst.is_pc() {
            self.regs.sr.set_m(false);
        }
        let sr = &mut self.regs.sr;
        sr.set_zn(imm);
        sr.set_v(false);
        self.charge(CycleCostKind::Alu);
    }

    pub(super) fn op_addi(&mut self, dst: Operand, bus: &mut dyn Bus) {
        let (dreg, imm) = self.add_immediate_operands(dst, bus);
        let result = flags::add(dreg, imm, 0);
        self.write(dst, result.value);
        result.apply(&mut self.regs.sr);
        if dst.is_pc() {
            self.regs.sr.set_m(false);
        }
        self.charge(CycleCostKind::Alu);
    }

    pub(super) fn op_addsi(&mut self, dst: Operand, bus: &mut dyn Bus) {
        let (dreg, imm) = self.add_immediate_operands(dst, bus);
        let result = flags::add(dreg, imm, 0);
        self.write(dst, result.value);
        let sr = &mut self.regs.sr;
        sr.set_v(result.overflow);
        sr.set_zn(result.value);
        if dst.is_pc() {
            self.regs.sr.set_m(false);
        }
        self.charge(CycleCostKind::Alu);
        if result.overflow {
            self.raise(GuestException::Range);
        }
    }

    /// `CMPBI`; `n = 0` is `ANYBZ`, testing whether any byte of `Rd` is zero.
    pub(super) fn op_cmpbi(&mut self, dst: Operand, bus: &mut dyn Bus) {
        let zero = if n_value(self.op) == 0 {
            self.check_delay_pc();
            let dreg = self.read(dst);
            dreg.to_be_bytes().contains(&0)
        } else {
            let imm = self.fetch_immediate(bus);
            self.read(dst) & imm == 0
        };
        self.regs.sr.set_z(zero);
        self.charge(CycleCostKind::Alu);
    }

    /// `ANDNI`; `n = 31` clears everything but the sign bit.
    pub(super) fn op_andni(&mut self, dst: Operand, bus: &mut dyn Bus) {
        let imm = if n_value(self.op) == 31 {
            self.check_delay_pc();
            0x7fff_ffff
        } else {
            self.fetch_immediate(bus)
        };
        self.op_logical_with(dst, imm, |d, i| d & !i);
    }

    pub(super) fn op_logical_immediate(
        &mut self,
        dst: Operand,
        bus: &mut dyn Bus,
        operation: fn(u32, u32) -> u32,
    ) {
        let imm = self.fetch_immediate(bus);
        self.op_logical_with(dst, imm, operation);
    }

    fn op_logical_with(&mut self, dst: Operand, imm: u32, operation: fn(u32, u32) -> u32) {
        let value = operation(self.read(dst), imm);
        self.write(dst, value);
        if dst.is_pc() {
            self.regs.sr.set_m(false);
        }
        flags::apply_logical(&mut self.regs.sr, value);
        self.charge(CycleCostKind::Alu);
    }
}
