//! Public host-facing configuration, run results and state export types.

use std::fmt::Write as _;

use crate::memory::IramSize;
use crate::state::{StatusRegister, GLOBAL_REGISTER_COUNT};
use crate::trap::TrapEntry;

/// Supported device variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum Variant {
    E116T,
    E116Xt,
    E116Xs,
    E116Xsr,
    E132N,
    E132T,
    E132Xn,
    E132Xt,
    #[default]
    E132Xs,
    E132Xsr,
    Gms30c2116,
    Gms30c2132,
    Gms30c2216,
    Gms30c2232,
}

impl Variant {
    /// Every supported variant.
    pub const ALL: [Self; 14] = [
        Self::E116T,
        Self::E116Xt,
        Self::E116Xs,
        Self::E116Xsr,
        Self::E132N,
        Self::E132T,
        Self::E132Xn,
        Self::E132Xt,
        Self::E132Xs,
        Self::E132Xsr,
        Self::Gms30c2116,
        Self::Gms30c2132,
        Self::Gms30c2216,
        Self::Gms30c2232,
    ];

    /// Device configuration for this variant.
    #[must_use]
    pub const fn config(self) -> CpuConfig {
        let (program_bus_width, iram_size, clock_scale_mask) = match self {
            Self::E116T | Self::Gms30c2116 => (BusWidth::Bits16, IramSize::Kib4, 0),
            Self::E116Xt => (BusWidth::Bits16, IramSize::Kib8, 3),
            Self::E116Xs | Self::E116Xsr => (BusWidth::Bits16, IramSize::Kib16, 7),
            Self::E132N | Self::E132T | Self::Gms30c2132 => (BusWidth::Bits32, IramSize::Kib4, 0),
            Self::E132Xn | Self::E132Xt => (BusWidth::Bits32, IramSize::Kib8, 3),
            Self::E132Xs | Self::E132Xsr => (BusWidth::Bits32, IramSize::Kib16, 7),
            Self::Gms30c2216 => (BusWidth::Bits16, IramSize::Kib8, 0),
            Self::Gms30c2232 => (BusWidth::Bits32, IramSize::Kib8, 0),
        };
        CpuConfig {
            variant: self,
            program_bus_width,
            io_bus_width: program_bus_width,
            iram_size,
            clock_scale_mask,
        }
    }
}

/// External data-bus width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum BusWidth {
    /// 16-bit bus (E1-16 family).
    Bits16,
    /// 32-bit bus (E1-32 family).
    Bits32,
}

/// Immutable construction parameters of one CPU instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CpuConfig {
    /// Variant the remaining fields were derived from.
    pub variant: Variant,
    /// Program bus width.
    pub program_bus_width: BusWidth,
    /// I/O bus width.
    pub io_bus_width: BusWidth,
    /// On-chip RAM size.
    pub iram_size: IramSize,
    /// Mask applied to the `TPR` clock-scale field.
    pub clock_scale_mask: u32,
}

impl Default for CpuConfig {
    fn default() -> Self {
        Variant::default().config()
    }
}

/// Result of one [`crate::Cpu::run`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RunOutcome {
    /// Cycles consumed, including any overshoot of the final instruction.
    pub cycles: u64,
    /// Instructions retired.
    pub instructions: u64,
}

/// Read-only view of the architectural state for debuggers and tooling.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CpuSnapshot {
    /// All 32 globals, `SR` in slot 1.
    pub global_regs: [u32; GLOBAL_REGISTER_COUNT],
    /// The 64 physical locals.
    pub local_regs: Vec<u32>,
    /// The 16 locals visible at the current frame pointer.
    pub current_locals: Vec<u32>,
    /// Rendered status flags, see [`flags_string`].
    pub flags: String,
    /// Active trap-entry base.
    pub trap_entry: TrapEntry,
    /// Whether the timer interrupt is waiting for recognition.
    pub timer_interrupt_pending: bool,
    /// Pending delayed-branch target.
    pub delay_target: Option<u32>,
    /// Total cycles consumed since construction.
    pub total_cycles: u64,
}

/// Renders `SR` as twelve flag columns followed by the numeric fields.
///
/// Columns, left to right: `S P T L I ? H M V N Z C`; a clear flag shows `.`.
#[must_use]
pub fn flags_string(sr: StatusRegister) -> String {
    let columns = [
        (sr.s(), 'S'),
        (sr.p(), 'P'),
        (sr.t(), 'T'),
        (sr.l(), 'L'),
        (sr.i(), 'I'),
        (sr.bits() & crate::state::SR_RESERVED != 0, '?'),
        (sr.h(), 'H'),
        (sr.m(), 'M'),
        (sr.v(), 'V'),
        (sr.n(), 'N'),
        (sr.z(), 'Z'),
        (sr.c(), 'C'),
    ];
    let mut out: String = columns
        .iter()
        .map(|&(set, ch)| if set { ch } else { '.' })
        .collect();
    let _ = write!(
        out,
        " FTE:{:X} FRM:{:X} ILC:{} FL:{} FP:{}",
        sr.fte(),
        sr.frm(),
        sr.ilc(),
        sr.fl(),
        sr.fp()
    );
    out
}
