use crate::cpu::Cpu;
use crate::encoding::{OpcodeEntry, RegisterBank};
use crate::state::{PC_REGISTER, SR_REGISTER};

/// One register operand resolved from an instruction field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Operand {
    /// Bank the code addresses.
    pub bank: RegisterBank,
    /// Register code (`0..16` from the opcode, wider for `H`-adjusted globals).
    pub code: u8,
}

impl Operand {
    /// Destination operand: `OP` bits 7..=4.
    #[must_use]
    pub const fn dst(entry: OpcodeEntry, op: u16) -> Self {
        Self {
            bank: entry.dst,
            code: ((op >> 4) & 0xf) as u8,
        }
    }

    /// Source operand: `OP` bits 3..=0.
    #[must_use]
    pub const fn src(entry: OpcodeEntry, op: u16) -> Self {
        Self {
            bank: entry.src,
            code: (op & 0xf) as u8,
        }
    }

    /// Global operand with an explicit code.
    #[must_use]
    pub const fn global(code: u8) -> Self {
        Self {
            bank: RegisterBank::Global,
            code,
        }
    }

    /// Local operand with an explicit code.
    #[must_use]
    pub const fn local(code: u8) -> Self {
        Self {
            bank: RegisterBank::Local,
            code,
        }
    }

    /// `true` for `G0`.
    #[must_use]
    pub const fn is_pc(self) -> bool {
        matches!(self.bank, RegisterBank::Global) && self.code == PC_REGISTER
    }

    /// `true` for `G1`.
    #[must_use]
    pub const fn is_sr(self) -> bool {
        matches!(self.bank, RegisterBank::Global) && self.code == SR_REGISTER
    }

    /// The "f" partner of a double-word operand: the next register in the same bank.
    #[must_use]
    pub const fn next(self) -> Self {
        let code = match self.bank {
            RegisterBank::Global => (self.code + 1) & 0x1f,
            RegisterBank::Local => (self.code + 1) & 0x3f,
        };
        Self {
            bank: self.bank,
            code,
        }
    }

    /// `true` when both operands name the same register.
    #[must_use]
    pub const fn same_register(self, other: Self) -> bool {
        let same_bank = matches!(
            (self.bank, other.bank),
            (RegisterBank::Global, RegisterBank::Global)
                | (RegisterBank::Local, RegisterBank::Local)
        );
        same_bank && self.code == other.code
    }
}

impl Cpu {
    /// Reads an operand; globals go through [`Cpu::global`] so `TR` stays live.
    pub(crate) fn read(&mut self, operand: Operand) -> u32 {
        match operand.bank {
            RegisterBank::Global => self.global(operand.code),
            RegisterBank::Local => self.regs.local(operand.code),
        }
    }

    /// Writes an operand; globals go through [`Cpu::set_global`] side effects.
    pub(crate) fn write(&mut self, operand: Operand, value: u32) {
        match operand.bank {
            RegisterBank::Global => self.set_global(operand.code, value),
            RegisterBank::Local => self.regs.set_local(operand.code, value),
        }
    }

    /// Reads an arithmetic source: a global `SR` source yields the carry bit.
    pub(crate) fn read_arith(&mut self, operand: Operand) -> u32 {
        if operand.is_sr() {
            self.regs.sr.carry()
        } else {
            self.read(operand)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Operand;
    use crate::encoding::{lookup, RegisterBank};

    #[test]
    fn fields_follow_the_table_banks() {
        let op = 0x2b_35;
        let entry = lookup(op);
        assert_eq!(Operand::dst(entry, op), Operand::local(3));
        assert_eq!(Operand::src(entry, op), Operand::local(5));
    }

    #[test]
    fn partner_register_wraps_within_its_bank() {
        assert_eq!(Operand::global(31).next().code, 0);
        assert_eq!(Operand::local(15).next().code, 16);
        assert_eq!(Operand::local(63).next().code, 0);
    }

    #[test]
    fn same_register_requires_matching_bank() {
        assert!(Operand::local(4).same_register(Operand::local(4)));
        assert!(!Operand::local(4).same_register(Operand::global(4)));
        assert!(Operand::global(0).is_pc());
        assert!(!Operand::local(1).is_sr());
        assert_eq!(Operand::global(1).bank, RegisterBank::Global);
    }
}
