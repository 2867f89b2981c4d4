//! Operand decoding for the multi-halfword instruction formats.
//!
//! Every decoder advances the cursor's `pc` past the halfwords it consumes
//! and raises `length` to the instruction's total size in halfwords. The
//! `ignore_*` companions consume exactly the same halfwords without reading
//! them, so the length code never diverges from the bytes actually used.

use crate::memory::Bus;

/// Nybble-indexed short immediates for `Rimm` formats with `OP` bit 8 set.
///
/// Slots 17..=19 are placeholders: those codes fetch extension halfwords.
pub const IMMEDIATE_VALUES: [u32; 32] = [
    0,
    1,
    2,
    3,
    4,
    5,
    6,
    7,
    8,
    9,
    10,
    11,
    12,
    13,
    14,
    15,
    16,
    0,
    0,
    0,
    32,
    64,
    128,
    0x8000_0000,
    (-8_i32) as u32,
    (-7_i32) as u32,
    (-6_i32) as u32,
    (-5_i32) as u32,
    (-4_i32) as u32,
    (-3_i32) as u32,
    (-2_i32) as u32,
    (-1_i32) as u32,
];

/// Fetch position and running length of the instruction being decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstructionCursor {
    /// Address of the next halfword to consume.
    pub pc: u32,
    /// Instruction length so far, in halfwords.
    pub length: u8,
}

/// Sub-type and signed displacement of a load/store with displacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Displacement {
    /// Bits 13..=12 of the first extension halfword.
    pub sub_type: u8,
    /// Sign-extended displacement; its low two bits further select the form.
    pub value: u32,
}

/// Sub-type and limit of an `XMx`/`XXx` instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexLimit {
    /// Bits 14..=12 of the first extension halfword.
    pub sub_type: u8,
    /// Unsigned upper bound.
    pub limit: u32,
}

/// `N` operand of `Rimm`, `Ln` and `SET` formats: `OP` bit 8 then bits 3..=0.
#[must_use]
pub const fn n_value(op: u16) -> u8 {
    (((op & 0x100) >> 4) | (op & 0xf)) as u8
}

impl InstructionCursor {
    /// Starts a cursor just past the first instruction halfword.
    #[must_use]
    pub const fn new(pc: u32) -> Self {
        Self { pc, length: 1 }
    }

    fn next_halfword(&mut self, bus: &mut dyn Bus) -> u16 {
        let value = bus.fetch_op(self.pc);
        self.pc = self.pc.wrapping_add(2);
        value
    }

    const fn skip(&mut self, halfwords: u8) {
        self.pc = self.pc.wrapping_add(halfwords as u32 * 2);
        self.length = 1 + halfwords;
    }

    /// Decodes a nybble-coded immediate (`OP` bits 3..=0).
    ///
    /// Code 1 reads a 32-bit literal, 2 a zero-extended and 3 a one-extended
    /// 16-bit literal; every other code selects from [`IMMEDIATE_VALUES`].
    pub fn decode_immediate_s(&mut self, op: u16, bus: &mut dyn Bus) -> u32 {
        match op & 0xf {
            1 => {
                let high = u32::from(self.next_halfword(bus));
                let low = u32::from(self.next_halfword(bus));
                self.length = 3;
                (high << 16) | low
            }
            2 => {
                let value = u32::from(self.next_halfword(bus));
                self.length = 2;
                value
            }
            3 => {
                let value = 0xffff_0000 | u32::from(self.next_halfword(bus));
                self.length = 2;
                value
            }
            nybble => IMMEDIATE_VALUES[16 + nybble as usize],
        }
    }

    /// Consumes the extension halfwords [`Self::decode_immediate_s`] would read.
    pub const fn ignore_immediate_s(&mut self, op: u16) {
        match op & 0xf {
            1 => self.skip(2),
            2 | 3 => self.skip(1),
            _ => self.length = 1,
        }
    }

    /// Decodes a `Rimm` immediate: `OP` bit 8 clear gives the bare nybble,
    /// set gives [`Self::decode_immediate_s`].
    pub fn decode_immediate(&mut self, op: u16, bus: &mut dyn Bus) -> u32 {
        if op & 0x100 == 0 {
            u32::from(op & 0xf)
        } else {
            self.decode_immediate_s(op, bus)
        }
    }

    /// Consumes the extension halfwords [`Self::decode_immediate`] would read.
    pub const fn ignore_immediate(&mut self, op: u16) {
        if op & 0x100 != 0 {
            self.ignore_immediate_s(op);
        }
    }

    /// Decodes a one- or two-halfword constant with 14 or 30 significant bits.
    pub fn decode_const(&mut self, bus: &mut dyn Bus) -> u32 {
        let first = u32::from(self.next_halfword(bus));
        if first & 0x8000 != 0 {
            let second = u32::from(self.next_halfword(bus));
            self.length = 3;
            let mut value = ((first & 0x3fff) << 16) | second;
            if first & 0x4000 != 0 {
                value |= 0xc000_0000;
            }
            value
        } else {
            self.length = 2;
            let mut value = first & 0x3fff;
            if first & 0x4000 != 0 {
                value |= 0xffff_c000;
            }
            value
        }
    }

    /// Decodes a branch displacement; the result is always even.
    ///
    /// `OP` bit 7 selects the long form, whose extension halfword carries the
    /// low 16 bits with its bit 0 acting as the sign.
    pub fn decode_pcrel(&mut self, op: u16, bus: &mut dyn Bus) -> u32 {
        if op & 0x80 != 0 {
            let next = u32::from(self.next_halfword(bus));
            self.length = 2;
            let mut offset = (u32::from(op & 0x7f) << 16) | (next & 0xfffe);
            if next & 1 != 0 {
                offset |= 0xff80_0000;
            }
            offset
        } else {
            let mut offset = u32::from(op & 0x7e);
            if op & 1 != 0 {
                offset |= 0xffff_ff80;
            }
            offset
        }
    }

    /// Consumes the extension halfword [`Self::decode_pcrel`] would read.
    pub const fn ignore_pcrel(&mut self, op: u16) {
        if op & 0x80 != 0 {
            self.skip(1);
        }
    }

    /// Decodes the displacement of a `LDxx`/`STxx` displacement or next form.
    pub fn decode_displacement(&mut self, bus: &mut dyn Bus) -> Displacement {
        let first = u32::from(self.next_halfword(bus));
        let sub_type = ((first & 0x3000) >> 12) as u8;
        let value = if first & 0x8000 != 0 {
            let second = u32::from(self.next_halfword(bus));
            self.length = 3;
            let mut value = ((first & 0xfff) << 16) | second;
            if first & 0x4000 != 0 {
                value |= 0xf000_0000;
            }
            value
        } else {
            self.length = 2;
            let mut value = first & 0xfff;
            if first & 0x4000 != 0 {
                value |= 0xffff_f000;
            }
            value
        };
        Displacement { sub_type, value }
    }

    /// Decodes the sub-type and limit of an index move.
    pub fn decode_index_limit(&mut self, bus: &mut dyn Bus) -> IndexLimit {
        let first = u32::from(self.next_halfword(bus));
        let sub_type = ((first & 0x7000) >> 12) as u8;
        let limit = if first & 0x8000 != 0 {
            let second = u32::from(self.next_halfword(bus));
            self.length = 3;
            ((first & 0xfff) << 16) | second
        } else {
            self.length = 2;
            first & 0xfff
        };
        IndexLimit { sub_type, limit }
    }

    /// Reads the function halfword of an `EXTEND` instruction.
    pub fn decode_extend(&mut self, bus: &mut dyn Bus) -> u16 {
        let function = self.next_halfword(bus);
        self.length = 2;
        function
    }
}
