//! Static 256-entry dispatch table keyed by the high byte of the instruction word.

use crate::state::StatusRegister;

/// Register bank an operand field addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RegisterBank {
    /// Global register `G0..G15` (or `G16..G31` through `SR.H`).
    Global,
    /// Local register, relative to `SR.FP`.
    Local,
}

impl RegisterBank {
    const fn from_bit(local: bool) -> Self {
        if local {
            Self::Local
        } else {
            Self::Global
        }
    }
}

/// Condition of a relative or delayed branch, in opcode order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum BranchCondition {
    /// Overflow set.
    V,
    /// Overflow clear.
    Nv,
    /// Zero set.
    E,
    /// Zero clear.
    Ne,
    /// Carry set.
    C,
    /// Carry clear.
    Nc,
    /// `C | Z`.
    Se,
    /// `!(C | Z)`.
    Ht,
    /// Negative set.
    N,
    /// Negative clear.
    Nn,
    /// `N | Z`.
    Le,
    /// `!(N | Z)`.
    Gt,
}

impl BranchCondition {
    /// Conditions in opcode order (`0xe0`/`0xf0` onward).
    pub const ALL: [Self; 12] = [
        Self::V,
        Self::Nv,
        Self::E,
        Self::Ne,
        Self::C,
        Self::Nc,
        Self::Se,
        Self::Ht,
        Self::N,
        Self::Nn,
        Self::Le,
        Self::Gt,
    ];

    /// Evaluates the condition against the current flags.
    #[must_use]
    pub const fn holds(self, sr: StatusRegister) -> bool {
        match self {
            Self::V => sr.v(),
            Self::Nv => !sr.v(),
            Self::E => sr.z(),
            Self::Ne => !sr.z(),
            Self::C => sr.c(),
            Self::Nc => !sr.c(),
            Self::Se => sr.c() || sr.z(),
            Self::Ht => !(sr.c() || sr.z()),
            Self::N => sr.n(),
            Self::Nn => !sr.n(),
            Self::Le => sr.n() || sr.z(),
            Self::Gt => !(sr.n() || sr.z()),
        }
    }
}

/// Instruction selected by one dispatch-table slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum Operation {
    Chk,
    Movd,
    Divu,
    Divs,
    Xm,
    Mask,
    Sum,
    Sums,
    Cmp,
    Mov,
    Add,
    Adds,
    Cmpb,
    Andn,
    Or,
    Xor,
    Subc,
    Not,
    Sub,
    Subs,
    Addc,
    And,
    Neg,
    Negs,
    Cmpi,
    Movi,
    Addi,
    Addsi,
    Cmpbi,
    Andni,
    Ori,
    Xori,
    Shrdi,
    Shrd,
    Shr,
    Sardi,
    Sard,
    Sar,
    Shldi,
    Shld,
    Shl,
    Testlz,
    Rol,
    /// `LDxx.D`/`LDxx.A`/`LDxx.IOD` with displacement.
    LoadDisplacement,
    /// `LDxx.N` post-increment and `LDW.S` stack forms.
    LoadNext,
    /// `STxx.D`/`STxx.A`/`STxx.IOD` with displacement.
    StoreDisplacement,
    /// `STxx.N` post-increment and `STW.S` stack forms.
    StoreNext,
    Shri,
    Sari,
    Shli,
    Mulu,
    Muls,
    Set,
    Mul,
    /// Floating-point and other opcodes deferred to guest software.
    Software,
    Extend,
    Do,
    LdwR,
    LddR,
    LdwP,
    LddP,
    StwR,
    StdR,
    StwP,
    StdP,
    DelayedBranch(BranchCondition),
    Dbr,
    Frame,
    Call,
    Branch(BranchCondition),
    Br,
    Trap,
    Reserved,
}

/// One dispatch-table slot: the operation plus its operand banks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct OpcodeEntry {
    /// Operation to execute.
    pub operation: Operation,
    /// Bank of the destination field (bits 7..=4).
    pub dst: RegisterBank,
    /// Bank of the source field (bits 3..=0).
    pub src: RegisterBank,
}

const fn entry(operation: Operation, dst: RegisterBank, src: RegisterBank) -> OpcodeEntry {
    OpcodeEntry {
        operation,
        dst,
        src,
    }
}

/// Two-bit sub-selector: bit 1 picks a local destination, bit 0 a local source.
const fn rr(operation: Operation, byte: u8) -> OpcodeEntry {
    entry(
        operation,
        RegisterBank::from_bit(byte & 0x2 != 0),
        RegisterBank::from_bit(byte & 0x1 != 0),
    )
}

/// Destination-only selector; bit 0 belongs to the immediate field.
const fn rimm(operation: Operation, byte: u8) -> OpcodeEntry {
    let dst = RegisterBank::from_bit(byte & 0x2 != 0);
    entry(operation, dst, dst)
}

const fn local(operation: Operation) -> OpcodeEntry {
    entry(operation, RegisterBank::Local, RegisterBank::Local)
}

const fn none(operation: Operation) -> OpcodeEntry {
    entry(operation, RegisterBank::Global, RegisterBank::Global)
}

#[allow(clippy::too_many_lines)]
const fn decode_entry(byte: u8) -> OpcodeEntry {
    const RR_GROUPS: [Operation; 24] = [
        Operation::Chk,
        Operation::Movd,
        Operation::Divu,
        Operation::Divs,
        Operation::Xm,
        Operation::Mask,
        Operation::Sum,
        Operation::Sums,
        Operation::Cmp,
        Operation::Mov,
        Operation::Add,
        Operation::Adds,
        Operation::Cmpb,
        Operation::Andn,
        Operation::Or,
        Operation::Xor,
        Operation::Subc,
        Operation::Not,
        Operation::Sub,
        Operation::Subs,
        Operation::Addc,
        Operation::And,
        Operation::Neg,
        Operation::Negs,
    ];
    const IMM_GROUPS: [Operation; 8] = [
        Operation::Cmpi,
        Operation::Movi,
        Operation::Addi,
        Operation::Addsi,
        Operation::Cmpbi,
        Operation::Andni,
        Operation::Ori,
        Operation::Xori,
    ];
    const LOCAL_SHIFTS: [Operation; 16] = [
        Operation::Shrdi,
        Operation::Shrdi,
        Operation::Shrd,
        Operation::Shr,
        Operation::Sardi,
        Operation::Sardi,
        Operation::Sard,
        Operation::Sar,
        Operation::Shldi,
        Operation::Shldi,
        Operation::Shld,
        Operation::Shl,
        Operation::Reserved,
        Operation::Reserved,
        Operation::Testlz,
        Operation::Rol,
    ];
    const MEMORY_GROUPS: [Operation; 4] = [
        Operation::LoadDisplacement,
        Operation::LoadNext,
        Operation::StoreDisplacement,
        Operation::StoreNext,
    ];
    const MUL_GROUPS: [Operation; 4] = [
        Operation::Mulu,
        Operation::Muls,
        Operation::Set,
        Operation::Mul,
    ];
    const REGISTER_MEMORY: [Operation; 8] = [
        Operation::LdwR,
        Operation::LddR,
        Operation::LdwP,
        Operation::LddP,
        Operation::StwR,
        Operation::StdR,
        Operation::StwP,
        Operation::StdP,
    ];

    let group = (byte >> 2) as usize;
    match byte {
        0x00..=0x5f => rr(RR_GROUPS[group], byte),
        0x60..=0x7f => rimm(IMM_GROUPS[group - 0x18], byte),
        0x80..=0x8f => local(LOCAL_SHIFTS[(byte & 0xf) as usize]),
        0x90..=0x9f => rr(MEMORY_GROUPS[group - 0x24], byte),
        0xa0..=0xa3 => rimm(Operation::Shri, byte),
        0xa4..=0xa7 => rimm(Operation::Sari, byte),
        0xa8..=0xab => rimm(Operation::Shli, byte),
        0xac..=0xaf => none(Operation::Reserved),
        0xb8..=0xbb => rimm(Operation::Set, byte),
        0xb0..=0xbf => rr(MUL_GROUPS[group - 0x2c], byte),
        0xc0..=0xcd => local(Operation::Software),
        0xce => local(Operation::Extend),
        0xcf => none(Operation::Do),
        0xd0..=0xdf => entry(
            REGISTER_MEMORY[((byte & 0xf) >> 1) as usize],
            RegisterBank::Local,
            RegisterBank::from_bit(byte & 0x1 != 0),
        ),
        0xe0..=0xeb => none(Operation::DelayedBranch(
            BranchCondition::ALL[(byte - 0xe0) as usize],
        )),
        0xec => none(Operation::Dbr),
        0xed => local(Operation::Frame),
        0xee | 0xef => entry(
            Operation::Call,
            RegisterBank::Local,
            RegisterBank::from_bit(byte & 0x1 != 0),
        ),
        0xf0..=0xfb => none(Operation::Branch(
            BranchCondition::ALL[(byte - 0xf0) as usize],
        )),
        0xfc => none(Operation::Br),
        0xfd..=0xff => none(Operation::Trap),
    }
}

const fn build_table() -> [OpcodeEntry; 256] {
    let mut table = [none(Operation::Reserved); 256];
    let mut byte = 0usize;
    while byte < 256 {
        table[byte] = decode_entry(byte as u8);
        byte += 1;
    }
    table
}

/// Dispatch table indexed by `OP >> 8`.
pub const OPCODE_TABLE: [OpcodeEntry; 256] = build_table();

/// Looks up the dispatch entry for an instruction word.
#[must_use]
pub const fn lookup(op: u16) -> OpcodeEntry {
    OPCODE_TABLE[(op >> 8) as usize]
}
