//! Single- and double-word shifts, `TESTLZ` and `ROL`.

use tracing::warn;

use super::Operand;
use crate::cpu::Cpu;
use crate::decoder::n_value;
use crate::timing::CycleCostKind;

/// Direction and fill of a shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShiftKind {
    /// Right, zero fill.
    Logical,
    /// Right, sign fill.
    Arithmetic,
    /// Left, zero fill; sets `V` when the signed value does not survive.
    Left,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Shifted<T> {
    value: T,
    carry: bool,
    overflow: bool,
}

const fn shift_word(kind: ShiftKind, value: u32, n: u32) -> Shifted<u32> {
    let n = n & 0x1f;
    if n == 0 {
        return Shifted {
            value,
            carry: false,
            overflow: false,
        };
    }
    match kind {
        ShiftKind::Logical => Shifted {
            value: value >> n,
            carry: (value >> (n - 1)) & 1 != 0,
            overflow: false,
        },
        ShiftKind::Arithmetic => Shifted {
            value: ((value as i32) >> n) as u32,
            carry: (value >> (n - 1)) & 1 != 0,
            overflow: false,
        },
        ShiftKind::Left => {
            let shifted = value << n;
            Shifted {
                value: shifted,
                carry: (value << (n - 1)) & 0x8000_0000 != 0,
                overflow: ((shifted as i32) >> n) as u32 != value,
            }
        }
    }
}

const fn shift_double(kind: ShiftKind, value: u64, n: u32) -> Shifted<u64> {
    let n = n & 0x3f;
    if n == 0 {
        return Shifted {
            value,
            carry: false,
            overflow: false,
        };
    }
    match kind {
        ShiftKind::Logical => Shifted {
            value: value >> n,
            carry: (value >> (n - 1)) & 1 != 0,
            overflow: false,
        },
        ShiftKind::Arithmetic => Shifted {
            value: ((value as i64) >> n) as u64,
            carry: (value >> (n - 1)) & 1 != 0,
            overflow: false,
        },
        ShiftKind::Left => {
            let shifted = value << n;
            Shifted {
                value: shifted,
                carry: (value << (n - 1)) & 0x8000_0000_0000_0000 != 0,
                overflow: ((shifted as i64) >> n) as u64 != value,
            }
        }
    }
}

impl Cpu {
    fn store_double_shift(&mut self, dst: Operand, kind: ShiftKind, n: u32) {
        let dstf = dst.next();
        let value = (u64::from(self.read(dst)) << 32) | u64::from(self.read(dstf));
        let result = shift_double(kind, value, n);
        let high = (result.value >> 32) as u32;
        self.write(dst, high);
        self.write(dstf, result.value as u32);

        let sr = &mut self.regs.sr;
        sr.set_c(result.carry);
        sr.set_z(result.value == 0);
        sr.set_n(high & 0x8000_0000 != 0);
        if kind == ShiftKind::Left {
            sr.set_v(result.overflow);
        }
        self.charge(CycleCostKind::Alu);
    }

    fn store_word_shift(&mut self, dst: Operand, kind: ShiftKind, n: u32) {
        let result = shift_word(kind, self.read(dst), n);
        self.write(dst, result.value);

        let sr = &mut self.regs.sr;
        sr.set_c(result.carry);
        sr.set_zn(result.value);
        if kind == ShiftKind::Left {
            sr.set_v(result.overflow);
        }
        self.charge(CycleCostKind::Alu);
    }

    /// `SHRDI`/`SARDI`/`SHLDI`: shifts the `Ld:Ldf` pair by `n`.
    pub(super) fn op_shift_double_immediate(&mut self, dst: Operand, kind: ShiftKind) {
        self.check_delay_pc();
        let n = u32::from(n_value(self.op));
        self.store_double_shift(dst, kind, n);
    }

    /// `SHRD`/`SARD`/`SHLD`: shifts the `Ld:Ldf` pair by `Ls & 0x3f`.
    pub(super) fn op_shift_double(&mut self, dst: Operand, src: Operand, kind: ShiftKind) {
        self.check_delay_pc();
        if src.same_register(dst) || src.same_register(dst.next()) {
            warn!(
                op = format_args!("{:#06x}", self.op),
                "double shift counted by its own operand is undefined"
            );
            self.charge(CycleCostKind::Alu);
            return;
        }
        let n = self.read(src) & 0x3f;
        self.store_double_shift(dst, kind, n);
    }

    /// `SHR`/`SAR`/`SHL`: shifts `Ld` by `Ls & 0x1f`.
    pub(super) fn op_shift(&mut self, dst: Operand, src: Operand, kind: ShiftKind) {
        self.check_delay_pc();
        let n = self.read(src) & 0x1f;
        self.store_word_shift(dst, kind, n);
    }

    /// `SHRI`/`SARI`/`SHLI`: shifts `Rd` by `n`.
    pub(super) fn op_shift_immediate(&mut self, dst: Operand, kind: ShiftKind) {
        self.check_delay_pc();
        let n = u32::from(n_value(self.op));
        self.store_word_shift(dst, kind, n);
    }

    pub(super) fn op_testlz(&mut self, dst: Operand, src: Operand) {
        self.check_delay_pc();
        let zeros = self.read(src).leading_zeros();
        self.write(dst, zeros);
        self.charge(CycleCostKind::Alu);
    }

    /// `ROL`: rotates `Ld` left by `Ls & 0x1f`; `C` receives the bit carried
    /// round into bit 0 and `V` flags a sign that did not survive a plain shift.
    pub(super) fn op_rol(&mut self, dst: Operand, src: Operand) {
        self.check_delay_pc();
        let n = self.read(src) & 0x1f;
        let dreg = self.read(dst);
        let value = dreg.rotate_left(n);
        let overflow = shift_word(ShiftKind::Left, dreg, n).overflow;
        self.write(dst, value);

        let sr = &mut self.regs.sr;
        sr.set_c(n != 0 && value & 1 != 0);
        sr.set_v(overflow);
        sr.set_zn(value);
        self.charge(CycleCostKind::Alu);
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rstest::rstest;

    use super::{shift_double, shift_word, ShiftKind};
    use crate::cpu::Cpu;
    use crate::execute::Operand;
    use crate::state::TPR_REGISTER;

    #[rstest]
    #[case(ShiftKind::Logical, 0x8000_0003, 1, 0x4000_0001, true)]
    #[case(ShiftKind::Arithmetic, 0x8000_0002, 1, 0xc000_0001, false)]
    #[case(ShiftKind::Left, 0xc000_0000, 1, 0x8000_0000, true)]
    #[case(ShiftKind::Left, 0x0000_0001, 0, 0x0000_0001, false)]
    fn word_shifts_report_last_bit_out(
        #[case] kind: ShiftKind,
        #[case] value: u32,
        #[case] n: u32,
        #[case] expected: u32,
        #[case] carry: bool,
    ) {
        let result = shift_word(kind, value, n);
        assert_eq!(result.value, expected);
        assert_eq!(result.carry, carry);
    }

    #[test]
    fn left_shift_overflow_tracks_sign_loss() {
        assert!(!shift_word(ShiftKind::Left, 0xc000_0000, 1).overflow);
        assert!(shift_word(ShiftKind::Left, 0x4000_0000, 1).overflow);
        assert!(
            shift_double(ShiftKind::Left, 0x4000_0000_0000_0000, 1).overflow
        );
    }

    #[test]
    fn double_shift_moves_bits_across_the_pair() {
        let mut cpu = Cpu::default();
        cpu.reset();
        cpu.set_global(TPR_REGISTER, 0);
        cpu.op = 0x8024;
        cpu.regs.set_local(2, 0x0000_0001);
        cpu.regs.set_local(3, 0x0000_0000);
        cpu.op_shift_double_immediate(Operand::local(2), ShiftKind::Logical);
        assert_eq!((cpu.local(2), cpu.local(3)), (0, 0x1000_0000));
        assert!(!cpu.regs.sr.z());
    }

    proptest! {
        #[test]
        fn rotate_matches_std(value in any::<u32>(), n in 0u32..32) {
            let mut cpu = Cpu::default();
            cpu.reset();
            cpu.regs.set_local(0, value);
            cpu.regs.set_local(1, n);
            cpu.op_rol(Operand::local(0), Operand::local(1));
            prop_assert_eq!(cpu.local(0), value.rotate_left(n));
        }
    }
}
