//! On-chip RAM (IRAM) placement and address mirroring.

/// First address of the IRAM window.
pub const IRAM_BASE: u32 = 0xc000_0000;
/// Last address of the IRAM window; the RAM repeats across the whole window.
pub const IRAM_WINDOW_END: u32 = 0xdfff_ffff;

/// On-chip RAM capacity of a device variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum IramSize {
    /// 4 KiB.
    Kib4,
    /// 8 KiB.
    Kib8,
    /// 16 KiB.
    Kib16,
}

impl IramSize {
    /// Capacity in bytes.
    #[must_use]
    pub const fn bytes(self) -> usize {
        match self {
            Self::Kib4 => 0x1000,
            Self::Kib8 => 0x2000,
            Self::Kib16 => 0x4000,
        }
    }

    /// Address bits ignored inside the window, producing the mirrors.
    #[must_use]
    pub const fn mirror_mask(self) -> u32 {
        match self {
            Self::Kib4 => 0x1fff_f000,
            Self::Kib8 => 0x1fff_e000,
            Self::Kib16 => 0x1fff_c000,
        }
    }
}

/// Byte offset into IRAM for `addr`, or `None` when `addr` is outside the window.
#[must_use]
pub const fn iram_offset(addr: u32, size: IramSize) -> Option<usize> {
    if addr & 0xe000_0000 == IRAM_BASE {
        Some((addr & !(IRAM_BASE | size.mirror_mask())) as usize)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::{iram_offset, IramSize, IRAM_WINDOW_END};

    #[test]
    fn mirrors_repeat_every_capacity() {
        assert_eq!(iram_offset(0xc000_0010, IramSize::Kib4), Some(0x10));
        assert_eq!(iram_offset(0xc000_1010, IramSize::Kib4), Some(0x10));
        assert_eq!(iram_offset(0xc000_1010, IramSize::Kib8), Some(0x1010));
        assert_eq!(iram_offset(IRAM_WINDOW_END, IramSize::Kib16), Some(0x3fff));
    }

    #[test]
    fn addresses_outside_window_are_not_iram() {
        assert_eq!(iram_offset(0xbfff_ffff, IramSize::Kib4), None);
        assert_eq!(iram_offset(0xe000_0000, IramSize::Kib4), None);
    }

    #[test]
    fn mirror_mask_and_capacity_cover_window() {
        for size in [IramSize::Kib4, IramSize::Kib8, IramSize::Kib16] {
            let covered = size.mirror_mask() | (size.bytes() as u32 - 1);
            assert_eq!(covered, 0x1fff_ffff);
        }
    }
}
