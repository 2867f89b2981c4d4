//! Trap numbers, trap-entry base selection and trap/emulation vector resolution.

use crate::state::StatusRegister;

/// Trap number of the `IO2` interrupt.
pub const TRAPNO_IO2: u8 = 48;
/// Trap number of the `IO1` interrupt.
pub const TRAPNO_IO1: u8 = 49;
/// Trap number of the `INT4` interrupt.
pub const TRAPNO_INT4: u8 = 50;
/// Trap number of the `INT3` interrupt.
pub const TRAPNO_INT3: u8 = 51;
/// Trap number of the `INT2` interrupt.
pub const TRAPNO_INT2: u8 = 52;
/// Trap number of the `INT1` interrupt.
pub const TRAPNO_INT1: u8 = 53;
/// Trap number of the `IO3` interrupt.
pub const TRAPNO_IO3: u8 = 54;
/// Trap number of the timer interrupt.
pub const TRAPNO_TIMER: u8 = 55;
/// Trap number of the trace exception.
pub const TRAPNO_TRACE_EXCEPTION: u8 = 57;
/// Trap number of the parity error.
pub const TRAPNO_PARITY_ERROR: u8 = 58;
/// Trap number of the extended-overflow exception.
pub const TRAPNO_EXTENDED_OVERFLOW: u8 = 59;
/// Trap number shared by range, privilege and frame errors.
pub const TRAPNO_RANGE_ERROR: u8 = 60;
/// Alias of [`TRAPNO_RANGE_ERROR`] for privilege violations.
pub const TRAPNO_PRIVILEGE_ERROR: u8 = TRAPNO_RANGE_ERROR;
/// Alias of [`TRAPNO_RANGE_ERROR`] for frame errors.
pub const TRAPNO_FRAME_ERROR: u8 = TRAPNO_RANGE_ERROR;
/// Trap number of the reset vector.
pub const TRAPNO_RESET: u8 = 62;
/// Trap number of the error entry.
pub const TRAPNO_ERROR_ENTRY: u8 = 63;

/// Trap-entry base address class, selected through `MCR` bits 14..=12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum TrapEntry {
    /// External memory area 0 (`0x00000000`).
    Mem0,
    /// External memory area 1 (`0x40000000`).
    Mem1,
    /// External memory area 2 (`0x80000000`).
    Mem2,
    /// On-chip memory (`0xc0000000`).
    Iram,
    /// External memory area 3 (`0xffffff00`), the reset default.
    Mem3,
}

impl TrapEntry {
    /// Decodes the 3-bit `MCR` selector; reserved values yield `None`.
    #[must_use]
    pub const fn from_selector(selector: u32) -> Option<Self> {
        match selector {
            0 => Some(Self::Mem0),
            1 => Some(Self::Mem1),
            2 => Some(Self::Mem2),
            3 => Some(Self::Iram),
            7 => Some(Self::Mem3),
            _ => None,
        }
    }

    /// Extracts and decodes the selector field of an `MCR` value.
    #[must_use]
    pub const fn from_mcr(mcr: u32) -> Option<Self> {
        Self::from_selector((mcr & 0x7000) >> 12)
    }

    /// Base address anchoring the trap table.
    #[must_use]
    pub const fn base(self) -> u32 {
        match self {
            Self::Mem0 => 0x0000_0000,
            Self::Mem1 => 0x4000_0000,
            Self::Mem2 => 0x8000_0000,
            Self::Iram => 0xc000_0000,
            Self::Mem3 => 0xffff_ff00,
        }
    }

    /// Vector address of trap `trapno`.
    ///
    /// The table grows upward from `MEM3` and downward from every other base.
    #[must_use]
    pub const fn trap_addr(self, trapno: u8) -> u32 {
        let trapno = (trapno & 0x3f) as u32;
        match self {
            Self::Mem3 => self.base() | (trapno * 4),
            _ => self.base() | ((63 - trapno) * 4),
        }
    }

    /// Entry address of the software-emulation routine for opcode byte `op_byte`.
    #[must_use]
    pub const fn emu_code_addr(self, op_byte: u8) -> u32 {
        let num = op_byte as u32;
        match self {
            Self::Mem3 => (self.base().wrapping_sub(0x100)) | ((num & 0xf) << 4),
            _ => self.base() | (0x10c | ((0xcf_u32.wrapping_sub(num) & 0xf) << 4)),
        }
    }
}

/// Condition tested by a `TRAPxx` instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum TrapCondition {
    /// Less or equal: `N | Z`.
    Le,
    /// Greater than: `!(N | Z)`.
    Gt,
    /// Less than: `N`.
    Lt,
    /// Greater or equal: `!N`.
    Ge,
    /// Smaller or equal (unsigned): `C | Z`.
    Se,
    /// Higher than (unsigned): `!(C | Z)`.
    Ht,
    /// Smaller than (unsigned): `C`.
    St,
    /// Higher or equal (unsigned): `!C`.
    He,
    /// Equal: `Z`.
    E,
    /// Not equal: `!Z`.
    Ne,
    /// Overflow: `V`.
    V,
    /// Always taken.
    Always,
}

impl TrapCondition {
    /// Decodes the 4-bit condition code; codes below 4 are not trap encodings.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            4 => Some(Self::Le),
            5 => Some(Self::Gt),
            6 => Some(Self::Lt),
            7 => Some(Self::Ge),
            8 => Some(Self::Se),
            9 => Some(Self::Ht),
            10 => Some(Self::St),
            11 => Some(Self::He),
            12 => Some(Self::E),
            13 => Some(Self::Ne),
            14 => Some(Self::V),
            15 => Some(Self::Always),
            _ => None,
        }
    }

    /// Splits a `TRAPxx` instruction word into `(trap number, condition code)`.
    #[must_use]
    pub const fn split_opcode(op: u16) -> (u8, u8) {
        let trapno = ((op & 0xfc) >> 2) as u8;
        let code = (((op & 0x300) >> 6) | (op & 0x3)) as u8;
        (trapno, code)
    }

    /// Evaluates the condition against the current flags.
    #[must_use]
    pub const fn holds(self, sr: StatusRegister) -> bool {
        match self {
            Self::Le => sr.n() || sr.z(),
            Self::Gt => !(sr.n() || sr.z()),
            Self::Lt => sr.n(),
            Self::Ge => !sr.n(),
            Self::Se => sr.c() || sr.z(),
            Self::Ht => !(sr.c() || sr.z()),
            Self::St => sr.c(),
            Self::He => !sr.c(),
            Self::E => sr.z(),
            Self::Ne => !sr.z(),
            Self::V => sr.v(),
            Self::Always => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{TrapCondition, TrapEntry, TRAPNO_RESET};
    use crate::state::{StatusRegister, SR_C, SR_N, SR_V, SR_Z};

    #[test]
    fn reset_vector_under_mem3_is_top_of_memory() {
        assert_eq!(TrapEntry::Mem3.trap_addr(TRAPNO_RESET), 0xffff_fff8);
    }

    #[test]
    fn non_mem3_tables_grow_downward() {
        assert_eq!(TrapEntry::Mem0.trap_addr(5), 232);
        assert_eq!(TrapEntry::Mem1.trap_addr(63), 0x4000_0000);
        assert_eq!(TrapEntry::Iram.trap_addr(0), 0xc000_00fc);
    }

    #[test]
    fn selector_decode_rejects_reserved_values() {
        assert_eq!(TrapEntry::from_selector(3), Some(TrapEntry::Iram));
        assert_eq!(TrapEntry::from_selector(7), Some(TrapEntry::Mem3));
        for reserved in 4..7 {
            assert_eq!(TrapEntry::from_selector(reserved), None);
        }
        assert_eq!(TrapEntry::from_mcr(0xffff_ffff), Some(TrapEntry::Mem3));
    }

    #[test]
    fn emulation_entry_addresses_follow_opcode_nybble() {
        assert_eq!(TrapEntry::Mem3.emu_code_addr(0xc0), 0xffff_fe00);
        assert_eq!(TrapEntry::Mem3.emu_code_addr(0xcd), 0xffff_fed0);
        assert_eq!(TrapEntry::Mem0.emu_code_addr(0xcf), 0x10c);
        assert_eq!(TrapEntry::Mem0.emu_code_addr(0xc0), 0x1fc);
    }

    #[test]
    fn trap_opcode_fields_split() {
        assert_eq!(TrapCondition::split_opcode(0xff17), (5, 15));
        assert_eq!(TrapCondition::split_opcode(0xfd00), (0, 4));
    }

    #[test]
    fn conditions_read_flags() {
        let flags = |bits| StatusRegister::from_bits(bits);
        assert!(TrapCondition::Le.holds(flags(SR_Z)));
        assert!(!TrapCondition::Gt.holds(flags(SR_N)));
        assert!(TrapCondition::Se.holds(flags(SR_C)));
        assert!(TrapCondition::He.holds(flags(0)));
        assert!(TrapCondition::V.holds(flags(SR_V)));
        assert!(TrapCondition::Always.holds(flags(0)));
        assert_eq!(TrapCondition::from_code(3), None);
    }
}
