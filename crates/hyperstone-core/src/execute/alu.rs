//! Register-register arithmetic, logic, moves, division and multiplication.

use tracing::{debug, warn};

use super::flags::{self, ArithmeticResult};
use super::Operand;
use crate::cpu::Cpu;
use crate::encoding::RegisterBank;
use crate::fault::GuestException;
use crate::memory::Bus;
use crate::state::{is_write_only, StatusRegister, SR_S};
use crate::timing::CycleCostKind;

const SIGNED_HALF_RANGE: std::ops::RangeInclusive<i32> = -0x8000..=0x7fff;

impl Cpu {
    const fn finish_destination(&mut self, dst: Operand) {
        if dst.is_pc() {
            self.regs.sr.set_m(false);
        }
    }

    /// Operand and carry for `ADDC`/`SUBC`: a global `SR` source contributes only `C`.
    fn carry_operand(&mut self, src: Operand) -> (u32, u32) {
        let carry = self.regs.sr.carry();
        if src.is_sr() {
            (0, carry)
        } else {
            (self.read(src), carry)
        }
    }

    fn store_arith(&mut self, dst: Operand, result: ArithmeticResult) {
        self.write(dst, result.value);
        result.apply(&mut self.regs.sr);
        self.finish_destination(dst);
    }

    /// Signed variants: `C` untouched, range error on overflow.
    fn store_signed(&mut self, dst: Operand, result: ArithmeticResult) {
        self.write(dst, result.value);
        let sr = &mut self.regs.sr;
        sr.set_v(result.overflow);
        sr.set_zn(result.value);
        self.finish_destination(dst);
        if result.overflow {
            self.raise(GuestException::Range);
        }
    }

    pub(super) fn op_chk(&mut self, dst: Operand, src: Operand) {
        self.check_delay_pc();
        let dreg = self.read(dst);
        let out_of_range = if src.is_sr() {
            dreg == 0
        } else {
            let sreg = self.read(src);
            if src.is_pc() {
                dreg >= sreg
            } else {
                dreg > sreg
            }
        };
        if out_of_range {
            self.raise(GuestException::Range);
        }
        self.charge(CycleCostKind::Alu);
    }

    pub(super) fn op_movd(&mut self, dst: Operand, src: Operand, bus: &mut dyn Bus) {
        self.check_delay_pc();
        if dst.is_pc() {
            self.op_ret(src, bus);
            return;
        }

        let dstf = dst.next();
        if src.is_sr() {
            self.write(dst, 0);
            self.write(dstf, 0);
            self.regs.sr.set_z(true);
            self.regs.sr.set_n(false);
        } else {
            let sreg = self.read(src);
            let sregf = self.read(src.next());
            self.write(dst, sreg);
            self.write(dstf, sregf);
            self.regs.sr.set_z(sreg | sregf == 0);
            self.regs.sr.set_n(sreg & 0x8000_0000 != 0);
        }
        self.charge(CycleCostKind::DoubleAlu);
    }

    /// `RET`: restores `PC` and `SR` from a register pair, then refills
    /// locals from the memory stack until `SP` catches up with `FP`.
    fn op_ret(&mut self, src: Operand, bus: &mut dyn Bus) {
        if src.is_sr() {
            warn!(
                pc = format_args!("{:#010x}", self.ppc),
                "RET with SR source is undefined"
            );
            self.charge(CycleCostKind::ControlTransfer);
            return;
        }

        let old_s = self.regs.sr.s();
        let old_l = self.regs.sr.l();
        let sreg = self.read(src);
        let sregf = self.read(src.next());

        self.ppc = self.regs.pc();
        self.regs.set_pc(sreg);
        let restored = (sregf & 0xffe0_0000) | ((sreg & 1) * SR_S) | (sregf & 0x0003_ffff);
        self.regs.sr = StatusRegister::from_bits(restored);
        self.block_interrupts(1);
        self.instruction_length = 0;

        let sp_slot = i32::from(((self.regs.sp() & 0x1fc) >> 2) as u8);
        let mut difference = i32::from(self.regs.sr.fp()) - sp_slot;
        if difference > 63 {
            difference -= 128;
        } else if difference < -64 {
            difference += 128;
        }
        while difference < 0 {
            let sp = self.regs.sp().wrapping_sub(4);
            self.regs.set_sp(sp);
            let value = bus.read_word(sp);
            self.regs.set_local_abs(((sp & 0xfc) >> 2) as usize, value);
            difference += 1;
        }

        let sr = self.regs.sr;
        if (!old_s && sr.s()) || (!sr.s() && !old_l && sr.l()) {
            self.raise(GuestException::Privilege);
        }
        debug!(pc = format_args!("{:#010x}", self.regs.pc()), "return");
        self.charge(CycleCostKind::ControlTransfer);
    }

    pub(super) fn op_divide(&mut self, dst: Operand, src: Operand, signed: bool) {
        self.check_delay_pc();
        let dstf = dst.next();
        if src.same_register(dst) || src.same_register(dstf) || src.is_pc() || src.is_sr() {
            warn!(
                op = format_args!("{:#06x}", self.op),
                "divide with overlapping or special operands is undefined"
            );
            self.charge(CycleCostKind::Divide);
            return;
        }

        let sreg = self.read(src);
        let dreg = self.read(dst);
        let dregf = self.read(dstf);
        let dividend = (u64::from(dreg) << 32) | u64::from(dregf);

        if sreg == 0 || (signed && dreg & 0x8000_0000 != 0) {
            self.regs.sr.set_v(true);
            self.raise(GuestException::Range);
        } else {
            let (quotient, remainder) = if signed {
                let dividend = dividend as i64;
                let divisor = i64::from(sreg as i32);
                ((dividend / divisor) as u32, (dividend % divisor) as u32)
            } else {
                let divisor = u64::from(sreg);
                ((dividend / divisor) as u32, (dividend % divisor) as u32)
            };
            self.write(dst, remainder);
            self.write(dstf, quotient);
            let sr = &mut self.regs.sr;
            sr.set_zn(quotient);
            sr.set_v(false);
        }
        self.charge(CycleCostKind::Divide);
    }

    /// `XMx` bounds-checks and scales an index; `XXx` only scales.
    pub(super) fn op_xm(&mut self, dst: Operand, src: Operand, bus: &mut dyn Bus) {
        let mut cursor = self.cursor();
        let index = cursor.decode_index_limit(bus);
        self.commit_cursor(cursor);
        self.check_delay_pc();

        if src.is_pc() || src.is_sr() {
            warn!(
                op = format_args!("{:#06x}", self.op),
                "index move from PC or SR is undefined"
            );
            self.charge(CycleCostKind::Alu);
            return;
        }

        let sreg = self.read(src);
        if index.sub_type < 4 {
            self.write(dst, sreg << index.sub_type);
            if sreg > index.limit {
                self.raise(GuestException::Range);
            }
        } else {
            self.write(dst, sreg << (index.sub_type - 4));
        }
        self.charge(CycleCostKind::Alu);
    }

    pub(super) fn op_mask(&mut self, dst: Operand, src: Operand, bus: &mut dyn Bus) {
        let mut cursor = self.cursor();
        let mask = cursor.decode_const(bus);
        self.commit_cursor(cursor);
        self.check_delay_pc();

        let value = self.read(src) & mask;
        self.write(dst, value);
        flags::apply_logical(&mut self.regs.sr, value);
        self.charge(CycleCostKind::Alu);
    }

    pub(super) fn op_sum(&mut self, dst: Operand, src: Operand, bus: &mut dyn Bus) {
        let mut cursor = self.cursor();
        let constant = cursor.decode_const(bus);
        self.commit_cursor(cursor);
        self.check_delay_pc();

        let sreg = self.read_arith(src);
        self.store_arith(dst, flags::add(sreg, constant, 0));
        self.charge(CycleCostKind::Alu);
    }

    pub(super) fn op_sums(&mut self, dst: Operand, src: Operand, bus: &mut dyn Bus) {
        let mut cursor = self.cursor();
        let constant = cursor.decode_const(bus);
        self.commit_cursor(cursor);
        self.check_delay_pc();

        let sreg = self.read_arith(src);
        self.charge(CycleCostKind::Alu);
        self.store_signed(dst, flags::add(sreg, constant, 0));
    }

    /// Sets flags for `dreg - sreg` without storing the difference.
    pub(super) const fn compare(&mut self, dreg: u32, sreg: u32) {
        let result = flags::sub(dreg, sreg, 0);
        let sr = &mut self.regs.sr;
        sr.set_v(result.overflow);
        sr.set_z(dreg == sreg);
        sr.set_n((dreg as i32) < (sreg as i32));
        sr.set_c(dreg < sreg);
    }

    pub(super) fn op_cmp(&mut self, dst: Operand, src: Operand) {
        self.check_delay_pc();
        let sreg = self.read_arith(src);
        let dreg = self.read(dst);
        self.compare(dreg, sreg);
        self.charge(CycleCostKind::Alu);
    }

    /// `MOV`; with `H` set, global codes address `G16..G31`.
    pub(super) fn op_mov(&mut self, dst: Operand, src: Operand) {
        self.check_delay_pc();
        let high = self.regs.sr.h();

        if high && dst.bank == RegisterBank::Global && !self.regs.sr.s() {
            self.raise(GuestException::Privilege);
            self.charge(CycleCostKind::Alu);
            return;
        }

        let src = high_global(src, high);
        let dst = high_global(dst, high);
        let sreg = if src.bank == RegisterBank::Global && is_write_only(src.code) {
            0
        } else {
            self.read(src)
        };

        self.write(dst, sreg);
        self.finish_destination(dst);
        self.regs.sr.set_zn(sreg);
        self.charge(CycleCostKind::Alu);
    }

    pub(super) fn op_add(&mut self, dst: Operand, src: Operand) {
        self.check_delay_pc();
        let sreg = self.read_arith(src);
        let dreg = self.read(dst);
        self.store_arith(dst, flags::add(dreg, sreg, 0));
        self.charge(CycleCostKind::Alu);
    }

    pub(super) fn op_adds(&mut self, dst: Operand, src: Operand) {
        self.check_delay_pc();
        let sreg = self.read_arith(src);
        let dreg = self.read(dst);
        self.charge(CycleCostKind::Alu);
        self.store_signed(dst, flags::add(dreg, sreg, 0));
    }

    pub(super) fn op_cmpb(&mut self, dst: Operand, src: Operand) {
        self.check_delay_pc();
        let sreg = self.read(src);
        let dreg = self.read(dst);
        self.regs.sr.set_z(dreg & sreg == 0);
        self.charge(CycleCostKind::Alu);
    }

    /// `AND`, `ANDN`, `OR`, `XOR`.
    pub(super) fn op_logical(
        &mut self,
        dst: Operand,
        src: Operand,
        operation: fn(u32, u32) -> u32,
    ) {
        self.check_delay_pc();
        let sreg = self.read(src);
        let dreg = self.read(dst);
        let value = operation(dreg, sreg);
        self.write(dst, value);
        self.finish_destination(dst);
        flags::apply_logical(&mut self.regs.sr, value);
        self.charge(CycleCostKind::Alu);
    }

    pub(super) fn op_subc(&mut self, dst: Operand, src: Operand) {
        self.check_delay_pc();
        let (sreg, carry) = self.carry_operand(src);
        let dreg = self.read(dst);
        let result = flags::sub(dreg, sreg, carry);
        self.write(dst, result.value);
        result.apply_chained(&mut self.regs.sr);
        self.finish_destination(dst);
        self.charge(CycleCostKind::Alu);
    }

    pub(super) fn op_not(&mut self, dst: Operand, src: Operand) {
        self.check_delay_pc();
        let value = !self.read(src);
        self.write(dst, value);
        self.finish_destination(dst);
        flags::apply_logical(&mut self.regs.sr, value);
        self.charge(CycleCostKind::Alu);
    }

    pub(super) fn op_sub(&mut self, dst: Operand, src: Operand) {
        self.check_delay_pc();
        let sreg = self.read_arith(src);
        let dreg = self.read(dst);
        self.store_arith(dst, flags::sub(dreg, sreg, 0));
        self.charge(CycleCostKind::Alu);
    }

    pub(super) fn op_subs(&mut self, dst: Operand, src: Operand) {
        self.check_delay_pc();
        let sreg = self.read_arith(src);
        let dreg = self.read(dst);
        self.charge(CycleCostKind::Alu);
        self.store_signed(dst, flags::sub(dreg, sreg, 0));
    }

    pub(super) fn op_addc(&mut self, dst: Operand, src: Operand) {
        self.check_delay_pc();
        let (sreg, carry) = self.carry_operand(src);
        let dreg = self.read(dst);
        let result = flags::add(dreg, sreg, carry);
        self.write(dst, result.value);
        result.apply_chained(&mut self.regs.sr);
        self.finish_destination(dst);
        self.charge(CycleCostKind::Alu);
    }

    pub(super) fn op_neg(&mut self, dst: Operand, src: Operand) {
        self.check_delay_pc();
        let sreg = self.read_arith(src);
        self.store_arith(dst, flags::sub(0, sreg, 0));
        self.charge(CycleCostKind::Alu);
    }

    pub(super) fn op_negs(&mut self, dst: Operand, src: Operand) {
        self.check_delay_pc();
        let sreg = self.read_arith(src);
        self.charge(CycleCostKind::Alu);
        self.store_signed(dst, flags::sub(0, sreg, 0));
    }

    fn multiply_operands_valid(&self, dst: Operand, src: Operand) -> bool {
        if dst.is_pc() || dst.is_sr() || src.is_pc() || src.is_sr() {
            warn!(
                op = format_args!("{:#06x}", self.op),
                "multiply with PC or SR operand is undefined"
            );
            return false;
        }
        true
    }

    /// `MULU`: 64-bit unsigned product into the register pair, high word first.
    pub(super) fn op_mulu(&mut self, dst: Operand, src: Operand) {
        self.check_delay_pc();
        if !self.multiply_operands_valid(dst, src) {
            self.charge(CycleCostKind::MulDoubleLong);
            return;
        }
        let sreg = self.read(src);
        let dreg = self.read(dst);
        let product = u64::from(dreg) * u64::from(sreg);
        self.store_double_product(dst, product);
        if sreg <= 0xffff && dreg <= 0xffff {
            self.charge(CycleCostKind::MulDoubleShort);
        } else {
            self.charge(CycleCostKind::MulDoubleLong);
        }
    }

    /// `MULS`: 64-bit signed product into the register pair, high word first.
    pub(super) fn op_muls(&mut self, dst: Operand, src: Operand) {
        self.check_delay_pc();
        if !self.multiply_operands_valid(dst, src) {
            self.charge(CycleCostKind::MulDoubleLong);
            return;
        }
        let sreg = self.read(src) as i32;
        let dreg = self.read(dst) as i32;
        let product = i64::from(dreg) * i64::from(sreg);
        self.store_double_product(dst, product as u64);
        if SIGNED_HALF_RANGE.contains(&sreg) && SIGNED_HALF_RANGE.contains(&dreg) {
            self.charge(CycleCostKind::MulDoubleShort);
        } else {
            self.charge(CycleCostKind::MulDoubleLong);
        }
    }

    fn store_double_product(&mut self, dst: Operand, product: u64) {
        let high = (product >> 32) as u32;
        self.write(dst, high);
        self.write(dst.next(), product as u32);
        let sr = &mut self.regs.sr;
        sr.set_z(product == 0);
        sr.set_n(high & 0x8000_0000 != 0);
    }

    /// `MUL`: low 32 bits of the product.
    pub(super) fn op_mul(&mut self, dst: Operand, src: Operand) {
        self.check_delay_pc();
        if !self.multiply_operands_valid(dst, src) {
            self.charge(CycleCostKind::MulLong);
            return;
        }
        let sreg = self.read(src) as i32;
        let dreg = self.read(dst) as i32;
        let value = dreg.wrapping_mul(sreg) as u32;
        self.write(dst, value);
        self.regs.sr.set_zn(value);
        if SIGNED_HALF_RANGE.contains(&sreg) && SIGNED_HALF_RANGE.contains(&dreg) {
            self.charge(CycleCostKind::MulShort);
        } else {
            self.charge(CycleCostKind::MulLong);
        }
    }
}

const fn high_global(operand: Operand, high: bool) -> Operand {
    match operand.bank {
        RegisterBank::Global if high => Operand::global(operand.code + 16),
        _ => operand,
    }
}
