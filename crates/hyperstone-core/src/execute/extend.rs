//! `EXTEND`: DSP multiply and multiply-accumulate into `G14:G15`.

use tracing::warn;

use super::Operand;
use crate::cpu::Cpu;
use crate::memory::Bus;
use crate::timing::CycleCostKind;

const EMUL: u16 = 0x100;
const EMUL_N: u16 = 0x102;
const EMULU: u16 = 0x104;
const EMULS: u16 = 0x106;
const EMAC: u16 = 0x10a;
const EMACD: u16 = 0x10e;
const EMSUB: u16 = 0x11a;
const EMSUBD: u16 = 0x11e;
const EHMAC: u16 = 0x02a;
const EHMACD: u16 = 0x02e;
const EHCMULD: u16 = 0x046;
const EHCMACD: u16 = 0x04e;
const EHCSUMD: u16 = 0x086;
const EHCFFTD: u16 = 0x096;
const EHCFFTSD: u16 = 0x296;

const ACC_HIGH: u8 = 14;
const ACC_LOW: u8 = 15;

const fn high_half(value: u32) -> i64 {
    (value >> 16) as u16 as i16 as i64
}

const fn low_half(value: u32) -> i64 {
    value as u16 as i16 as i64
}

const fn signed(value: u32) -> i64 {
    value as i32 as i64
}

/// Sum of the two halfword products.
const fn halfword_mac(dreg: u32, sreg: u32) -> i64 {
    high_half(dreg) * high_half(sreg) + low_half(dreg) * low_half(sreg)
}

/// Real and imaginary parts of a halfword complex product.
const fn complex_product(dreg: u32, sreg: u32) -> (i64, i64) {
    let real = high_half(dreg) * high_half(sreg) - low_half(dreg) * low_half(sreg);
    let imag = high_half(dreg) * low_half(sreg) + low_half(dreg) * high_half(sreg);
    (real, imag)
}

const fn pack_halves(high: i64, low: i64) -> u32 {
    ((high as u32 & 0xffff) << 16) | (low as u32 & 0xffff)
}

impl Cpu {
    fn accumulator(&self) -> u64 {
        (u64::from(self.regs.global(ACC_HIGH)) << 32) | u64::from(self.regs.global(ACC_LOW))
    }

    const fn set_accumulator(&mut self, value: u64) {
        self.regs.set_global(ACC_HIGH, (value >> 32) as u32);
        self.regs.set_global(ACC_LOW, value as u32);
    }

    const fn add_low(&mut self, addend: i64) {
        let value = self.regs.global(ACC_LOW).wrapping_add(addend as u32);
        self.regs.set_global(ACC_LOW, value);
    }

    /// `EXTEND Ld, Ls, function`: both operands are always locals.
    pub(super) fn op_extend(&mut self, dst: Operand, src: Operand, bus: &mut dyn Bus) {
        let mut cursor = self.cursor();
        let function = cursor.decode_extend(bus);
        self.commit_cursor(cursor);
        self.check_delay_pc();

        let sreg = self.regs.local(src.code);
        let dreg = self.regs.local(dst.code);

        match function {
            EMUL | EMUL_N => {
                let product = sreg.wrapping_mul(dreg);
                self.regs.set_global(ACC_LOW, product);
            }
            EMULU => self.set_accumulator(u64::from(dreg) * u64::from(sreg)),
            EMULS => self.set_accumulator((signed(dreg) * signed(sreg)) as u64),
            EMAC => self.add_low(signed(dreg) * signed(sreg)),
            EMACD => {
                let product = (signed(dreg) * signed(sreg)) as u64;
                let value = self.accumulator().wrapping_add(product);
                self.set_accumulator(value);
            }
            EMSUB => self.add_low((signed(dreg) * signed(sreg)).wrapping_neg()),
            EMSUBD => {
                let product = (signed(dreg) * signed(sreg)) as u64;
                let value = self.accumulator().wrapping_sub(product);
                self.set_accumulator(value);
            }
            EHMAC => self.add_low(halfword_mac(dreg, sreg)),
            EHMACD => {
                let value = self.accumulator().wrapping_add(halfword_mac(dreg, sreg) as u64);
                self.set_accumulator(value);
            }
            EHCMULD => {
                let (real, imag) = complex_product(dreg, sreg);
                self.regs.set_global(ACC_HIGH, real as u32);
                self.regs.set_global(ACC_LOW, imag as u32);
            }
            EHCMACD => {
                let (real, imag) = complex_product(dreg, sreg);
                let high = self.regs.global(ACC_HIGH).wrapping_add(real as u32);
                let low = self.regs.global(ACC_LOW).wrapping_add(imag as u32);
                self.regs.set_global(ACC_HIGH, high);
                self.regs.set_global(ACC_LOW, low);
            }
            EHCSUMD => {
                let sum = pack_halves(
                    high_half(dreg) + high_half(sreg),
                    low_half(dreg) + low_half(sreg),
                );
                let difference = pack_halves(
                    high_half(dreg) - high_half(sreg),
                    low_half(dreg) - low_half(sreg),
                );
                self.regs.set_global(ACC_HIGH, sum);
                self.regs.set_global(ACC_LOW, difference);
            }
            EHCFFTD | EHCFFTSD => {
                warn!(
                    function = format_args!("{function:#05x}"),
                    "unsupported FFT step"
                );
            }
            _ => {
                warn!(
                    function = format_args!("{function:#06x}"),
                    "unknown EXTEND function"
                );
            }
        }
        self.charge(CycleCostKind::Extend);
    }
}
