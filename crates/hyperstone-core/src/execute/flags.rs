//! Carry and overflow rules for the adder, shared by every arithmetic handler.

use crate::state::StatusRegister;

/// Sum or difference together with the flags the adder produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArithmeticResult {
    /// Low 32 bits of the result.
    pub value: u32,
    /// Carry out of bit 31 (borrow for subtraction).
    pub carry: bool,
    /// Signed overflow.
    pub overflow: bool,
}

impl ArithmeticResult {
    /// Stores `C`, `V`, `Z` and `N` from this result.
    pub const fn apply(self, sr: &mut StatusRegister) {
        sr.set_c(self.carry);
        sr.set_v(self.overflow);
        sr.set_zn(self.value);
    }

    /// Like [`Self::apply`], but `Z` stays set only if it was already set,
    /// which lets `ADDC`/`SUBC` chains test a multi-word result for zero.
    pub const fn apply_chained(self, sr: &mut StatusRegister) {
        let was_zero = sr.z();
        self.apply(sr);
        sr.set_z(was_zero && self.value == 0);
    }
}

/// Flags of a logical result: `N` and `Z` from the value, `V` and `C` cleared.
pub const fn apply_logical(sr: &mut StatusRegister, value: u32) {
    sr.set_zn(value);
    sr.set_v(false);
    sr.set_c(false);
}

/// `a + b + carry_in`.
#[must_use]
pub const fn add(a: u32, b: u32, carry_in: u32) -> ArithmeticResult {
    let wide = a as u64 + b as u64 + (carry_in & 1) as u64;
    let value = wide as u32;
    ArithmeticResult {
        value,
        carry: wide >> 32 != 0,
        overflow: ((a ^ value) & (b ^ value)) & 0x8000_0000 != 0,
    }
}

/// `minuend - subtrahend - borrow_in`.
#[must_use]
pub const fn sub(minuend: u32, subtrahend: u32, borrow_in: u32) -> ArithmeticResult {
    let wide = (minuend as u64)
        .wrapping_sub(subtrahend as u64)
        .wrapping_sub((borrow_in & 1) as u64);
    let value = wide as u32;
    ArithmeticResult {
        value,
        carry: wide & 0x1_0000_0000 != 0,
        overflow: ((minuend ^ subtrahend) & (minuend ^ value)) & 0x8000_0000 != 0,
    }
}

#[cfg(test)]
mod tests {
    use super::{add, apply_logical, sub};
    use crate::state::{StatusRegister, SR_C, SR_V, SR_Z};

    #[test]
    fn add_reports_unsigned_carry_and_signed_overflow() {
        let r = add(u32::MAX, 1, 0);
        assert_eq!((r.value, r.carry, r.overflow), (0, true, false));
        let r = add(0x7fff_ffff, 1, 0);
        assert_eq!((r.value, r.carry, r.overflow), (0x8000_0000, false, true));
        let r = add(u32::MAX, 0, 1);
        assert!(r.carry);
    }

    #[test]
    fn sub_borrows_below_zero() {
        let r = sub(0, 1, 0);
        assert_eq!((r.value, r.carry, r.overflow), (u32::MAX, true, false));
        let r = sub(0x8000_0000, 1, 0);
        assert_eq!((r.value, r.carry, r.overflow), (0x7fff_ffff, false, true));
        let r = sub(5, 5, 1);
        assert_eq!(r.value, u32::MAX);
        assert!(r.carry);
    }

    #[test]
    fn logical_result_clears_carry_and_overflow() {
        let mut sr = StatusRegister::from_bits(SR_C | SR_V | SR_Z);
        apply_logical(&mut sr, 0x8000_0001);
        assert!(sr.n());
        assert!(!sr.z());
        assert!(!sr.v());
        assert!(!sr.c());

        apply_logical(&mut sr, 0);
        assert!(sr.z());
        assert!(!sr.n());
    }

    #[test]
    fn chained_zero_needs_previous_zero() {
        let mut sr = StatusRegister::default();
        sub(3, 3, 0).apply_chained(&mut sr);
        assert!(!sr.z());

        let mut sr = StatusRegister::from_bits(SR_Z);
        sub(3, 3, 0).apply_chained(&mut sr);
        assert!(sr.z());
    }
}
