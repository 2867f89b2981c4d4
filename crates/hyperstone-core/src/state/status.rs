//! Bit-packed status register (`SR`, global register 1).

/// `SR` bit 0: carry/borrow.
pub const SR_C: u32 = 1 << 0;
/// `SR` bit 1: zero result.
pub const SR_Z: u32 = 1 << 1;
/// `SR` bit 2: negative result.
pub const SR_N: u32 = 1 << 2;
/// `SR` bit 3: signed overflow.
pub const SR_V: u32 = 1 << 3;
/// `SR` bit 4: delayed-branch pending (cleared by every taken branch).
pub const SR_M: u32 = 1 << 4;
/// `SR` bit 5: high global register set selector for the next `MOV`/`MOVI`.
pub const SR_H: u32 = 1 << 5;
/// `SR` bit 6: reserved, forced to zero on every architectural `SR` write.
pub const SR_RESERVED: u32 = 1 << 6;
/// `SR` bit 7: interrupt-mode flag, set on hardware interrupt entry.
pub const SR_I: u32 = 1 << 7;
/// `SR` bits 8..=12: floating-point trap enable.
pub const SR_FTE_MASK: u32 = 0x0000_1f00;
/// `SR` bits 13..=14: floating-point rounding mode.
pub const SR_FRM_MASK: u32 = 0x0000_6000;
/// `SR` bit 15: interrupt lock.
pub const SR_L: u32 = 1 << 15;
/// `SR` bit 16: trace enable.
pub const SR_T: u32 = 1 << 16;
/// `SR` bit 17: trace pending.
pub const SR_P: u32 = 1 << 17;
/// `SR` bit 18: supervisor state.
pub const SR_S: u32 = 1 << 18;
/// `SR` bits 19..=20: instruction length code of the last instruction.
pub const SR_ILC_MASK: u32 = 0x0018_0000;
/// `SR` bits 21..=24: frame length (`0` decodes as 16).
pub const SR_FL_MASK: u32 = 0x01e0_0000;
/// `SR` bits 25..=31: frame pointer into the local register bank.
pub const SR_FP_MASK: u32 = 0xfe00_0000;

const SR_ILC_SHIFT: u32 = 19;
const SR_FL_SHIFT: u32 = 21;
const SR_FP_SHIFT: u32 = 25;

/// Status register with one accessor pair per architectural field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct StatusRegister(u32);

macro_rules! flag_accessors {
    ($($(#[$doc:meta])* $get:ident, $set:ident => $mask:expr;)*) => {
        $(
            $(#[$doc])*
            #[must_use]
            pub const fn $get(self) -> bool {
                self.0 & $mask != 0
            }

            #[doc = concat!("Sets or clears the bit read by [`Self::", stringify!($get), "`].")]
            pub const fn $set(&mut self, enabled: bool) {
                if enabled {
                    self.0 |= $mask;
                } else {
                    self.0 &= !$mask;
                }
            }
        )*
    };
}

impl StatusRegister {
    /// Wraps a raw 32-bit `SR` image.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw 32-bit `SR` image.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Replaces the low 16 bits (condition flags, `FTE`, `FRM`, `L`),
    /// leaving `T`, `P`, `S`, `ILC`, `FL` and `FP` untouched.
    pub const fn set_low(&mut self, value: u32) {
        self.0 = (self.0 & 0xffff_0000) | (value & 0x0000_ffff);
    }

    flag_accessors! {
        /// Carry flag (bit 0).
        c, set_c => SR_C;
        /// Zero flag (bit 1).
        z, set_z => SR_Z;
        /// Negative flag (bit 2).
        n, set_n => SR_N;
        /// Overflow flag (bit 3).
        v, set_v => SR_V;
        /// Delayed-branch flag (bit 4).
        m, set_m => SR_M;
        /// High global register flag (bit 5).
        h, set_h => SR_H;
        /// Interrupt-mode flag (bit 7).
        i, set_i => SR_I;
        /// Interrupt-lock flag (bit 15).
        l, set_l => SR_L;
        /// Trace-enable flag (bit 16).
        t, set_t => SR_T;
        /// Trace-pending flag (bit 17).
        p, set_p => SR_P;
        /// Supervisor flag (bit 18).
        s, set_s => SR_S;
    }

    /// Carry flag as `0` or `1`, the form consumed by carry-chained arithmetic.
    #[must_use]
    pub const fn carry(self) -> u32 {
        self.0 & SR_C
    }

    /// Sets `Z` and `N` from a 32-bit result.
    pub const fn set_zn(&mut self, value: u32) {
        self.set_z(value == 0);
        self.set_n(value & 0x8000_0000 != 0);
    }

    /// Floating-point trap enable field (bits 8..=12).
    #[must_use]
    pub const fn fte(self) -> u8 {
        ((self.0 & SR_FTE_MASK) >> 8) as u8
    }

    /// Floating-point rounding mode field (bits 13..=14).
    #[must_use]
    pub const fn frm(self) -> u8 {
        ((self.0 & SR_FRM_MASK) >> 13) as u8
    }

    /// Instruction length code, in halfwords (0..=3).
    #[must_use]
    pub const fn ilc(self) -> u8 {
        ((self.0 & SR_ILC_MASK) >> SR_ILC_SHIFT) as u8
    }

    /// Stores an instruction length code (low two bits of `length`).
    pub const fn set_ilc(&mut self, length: u8) {
        self.0 = (self.0 & !SR_ILC_MASK) | (((length as u32) & 0x3) << SR_ILC_SHIFT);
    }

    /// Frame length as encoded (0..=15).
    #[must_use]
    pub const fn fl_raw(self) -> u8 {
        ((self.0 & SR_FL_MASK) >> SR_FL_SHIFT) as u8
    }

    /// Effective frame length: an encoded `0` means 16 registers.
    #[must_use]
    pub const fn fl(self) -> u8 {
        match self.fl_raw() {
            0 => 16,
            length => length,
        }
    }

    /// Stores a frame length; `16` is encoded as `0`.
    pub const fn set_fl(&mut self, length: u8) {
        self.0 = (self.0 & !SR_FL_MASK) | (((length as u32) & 0xf) << SR_FL_SHIFT);
    }

    /// Frame pointer (7 bits).
    #[must_use]
    pub const fn fp(self) -> u8 {
        ((self.0 & SR_FP_MASK) >> SR_FP_SHIFT) as u8
    }

    /// Stores a frame pointer, keeping only its low 7 bits.
    pub const fn set_fp(&mut self, fp: u8) {
        self.0 = (self.0 & !SR_FP_MASK) | (((fp as u32) & 0x7f) << SR_FP_SHIFT);
    }
}

#[cfg(test)]
mod tests {
    use super::{StatusRegister, SR_C, SR_H, SR_L, SR_S};

    #[test]
    fn flag_bits_sit_at_documented_positions() {
        let mut sr = StatusRegister::default();
        sr.set_c(true);
        sr.set_h(true);
        sr.set_l(true);
        sr.set_s(true);
        assert_eq!(sr.bits(), SR_C | SR_H | SR_L | SR_S);
        assert_eq!(sr.bits(), 0x0004_8021);

        sr.set_h(false);
        assert!(!sr.h());
        assert!(sr.c() && sr.l() && sr.s());
    }

    #[test]
    fn frame_length_zero_decodes_as_sixteen() {
        let mut sr = StatusRegister::default();
        sr.set_fl(16);
        assert_eq!(sr.fl_raw(), 0);
        assert_eq!(sr.fl(), 16);

        sr.set_fl(6);
        assert_eq!(sr.fl(), 6);
        assert_eq!(sr.bits(), 6 << 21);
    }

    #[test]
    fn frame_pointer_wraps_at_seven_bits() {
        let mut sr = StatusRegister::default();
        sr.set_fp(0x85);
        assert_eq!(sr.fp(), 0x05);
        assert_eq!(sr.bits(), 0x05 << 25);

        sr.set_fp(0x7f);
        assert_eq!(sr.bits(), 0xfe00_0000);
    }

    #[test]
    fn low_half_write_preserves_frame_state() {
        let mut sr = StatusRegister::default();
        sr.set_fp(9);
        sr.set_fl(4);
        sr.set_ilc(2);
        sr.set_s(true);

        sr.set_low(0xffff_ffff);

        assert_eq!(sr.fp(), 9);
        assert_eq!(sr.fl(), 4);
        assert_eq!(sr.ilc(), 2);
        assert!(sr.s());
        assert!(!sr.t());
        assert_eq!(sr.bits() & 0xffff, 0xffff);
    }

    #[test]
    fn zn_follow_result_sign_and_zero() {
        let mut sr = StatusRegister::default();
        sr.set_zn(0);
        assert!(sr.z() && !sr.n());
        sr.set_zn(0x8000_0000);
        assert!(!sr.z() && sr.n());
        sr.set_zn(1);
        assert!(!sr.z() && !sr.n());
    }

    #[test]
    fn fte_and_frm_fields_extract() {
        let sr = StatusRegister::from_bits(0x0000_7f00);
        assert_eq!(sr.fte(), 0x1f);
        assert_eq!(sr.frm(), 0x3);
    }
}
