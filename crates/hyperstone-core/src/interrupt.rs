//! External interrupt lines and the fixed-priority recognition ladder.

use crate::trap::{
    TRAPNO_INT1, TRAPNO_INT2, TRAPNO_INT3, TRAPNO_INT4, TRAPNO_IO1, TRAPNO_IO2, TRAPNO_IO3,
    TRAPNO_TIMER,
};

/// Number of host-settable input lines.
pub const INPUT_LINE_COUNT: usize = 8;

/// `ISR` bits owned by the seven external interrupt lines.
pub const ISR_LINE_MASK: u32 = 0x7f;

/// `FCR` bits selecting the timer priority tier.
pub const FCR_TIMER_PRIORITY_MASK: u32 = 0x00b0_0000;

/// Level-sensitive external interrupt line; the discriminant is the `ISR` bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum InterruptLine {
    Int1 = 0,
    Int2 = 1,
    Int3 = 2,
    Int4 = 3,
    Io1 = 4,
    Io2 = 5,
    Io3 = 6,
}

impl InterruptLine {
    /// All external lines in `ISR` bit order.
    pub const ALL: [Self; 7] = [
        Self::Int1,
        Self::Int2,
        Self::Int3,
        Self::Int4,
        Self::Io1,
        Self::Io2,
        Self::Io3,
    ];

    /// Maps a host input-line number to an external line; line 7 and above yield `None`.
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Int1),
            1 => Some(Self::Int2),
            2 => Some(Self::Int3),
            3 => Some(Self::Int4),
            4 => Some(Self::Io1),
            5 => Some(Self::Io2),
            6 => Some(Self::Io3),
            _ => None,
        }
    }

    /// `ISR` bit mask of this line.
    #[must_use]
    pub const fn isr_mask(self) -> u32 {
        1 << (self as u32)
    }

    /// Trap number taken when this line fires.
    #[must_use]
    pub const fn trap_number(self) -> u8 {
        match self {
            Self::Int1 => TRAPNO_INT1,
            Self::Int2 => TRAPNO_INT2,
            Self::Int3 => TRAPNO_INT3,
            Self::Int4 => TRAPNO_INT4,
            Self::Io1 => TRAPNO_IO1,
            Self::Io2 => TRAPNO_IO2,
            Self::Io3 => TRAPNO_IO3,
        }
    }
}

/// Source selected by one pass over the ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum InterruptSource {
    /// The on-chip timer compare interrupt.
    Timer,
    /// An external line.
    Line(InterruptLine),
}

impl InterruptSource {
    /// Trap number whose vector receives this interrupt.
    #[must_use]
    pub const fn trap_number(self) -> u8 {
        match self {
            Self::Timer => TRAPNO_TIMER,
            Self::Line(line) => line.trap_number(),
        }
    }
}

/// One rung of the ladder: `source` is eligible when `(FCR & mask) == expected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LadderRung {
    /// Source tested on this rung.
    pub source: InterruptSource,
    /// `FCR` bits examined.
    pub mask: u32,
    /// Required value of the examined bits.
    pub expected: u32,
}

const fn rung(source: InterruptSource, mask: u32, expected: u32) -> LadderRung {
    LadderRung {
        source,
        mask,
        expected,
    }
}

/// Recognition order, highest priority first.
pub const INTERRUPT_LADDER: [LadderRung; 11] = [
    rung(
        InterruptSource::Line(InterruptLine::Io3),
        0x0000_0500,
        0x0000_0400,
    ),
    rung(InterruptSource::Timer, FCR_TIMER_PRIORITY_MASK, 0x0030_0000),
    rung(InterruptSource::Line(InterruptLine::Int1), 0x1000_0000, 0),
    rung(InterruptSource::Timer, FCR_TIMER_PRIORITY_MASK, 0x0020_0000),
    rung(InterruptSource::Line(InterruptLine::Int2), 0x2000_0000, 0),
    rung(InterruptSource::Timer, FCR_TIMER_PRIORITY_MASK, 0x0010_0000),
    rung(InterruptSource::Line(InterruptLine::Int3), 0x4000_0000, 0),
    rung(InterruptSource::Timer, FCR_TIMER_PRIORITY_MASK, 0),
    rung(InterruptSource::Line(InterruptLine::Int4), 0x8000_0000, 0),
    rung(
        InterruptSource::Line(InterruptLine::Io1),
        0x0000_0005,
        0x0000_0004,
    ),
    rung(
        InterruptSource::Line(InterruptLine::Io2),
        0x0000_0050,
        0x0000_0040,
    ),
];

/// Picks the first eligible pending source, or `None` when nothing may fire.
///
/// Lock and `intblock` gating are the caller's concern; this only applies
/// the pending state and the `FCR` enable masks.
#[must_use]
pub fn resolve_interrupt(isr: u32, fcr: u32, timer_pending: bool) -> Option<InterruptSource> {
    if !timer_pending && isr & ISR_LINE_MASK == 0 {
        return None;
    }

    INTERRUPT_LADDER
        .iter()
        .find(|rung| {
            let pending = match rung.source {
                InterruptSource::Timer => timer_pending,
                InterruptSource::Line(line) => isr & line.isr_mask() != 0,
            };
            pending && fcr & rung.mask == rung.expected
        })
        .map(|rung| rung.source)
}
