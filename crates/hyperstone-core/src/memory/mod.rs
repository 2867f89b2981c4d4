//! Host bus contract, on-chip RAM map and an in-crate flat memory bus.

/// Variant view of the host bus: on-chip RAM and bus-width splitting.
pub mod access;
/// Sparse big-endian memory used by tests, demos and the fuzz harness.
pub mod flat;
/// On-chip RAM placement and mirroring.
pub mod map;

pub use access::VariantBus;
pub use flat::FlatMemory;
pub use map::{iram_offset, IramSize, IRAM_BASE, IRAM_WINDOW_END};

use crate::interrupt::InterruptLine;

/// Maps a data address onto the 15-bit I/O port space used by `LDW.IOD`/`STW.IOD`.
#[must_use]
pub const fn io_address(addr: u32) -> u32 {
    (addr >> 11) & 0x7ffc
}

/// Memory, I/O and interrupt-acknowledge services the core consumes.
///
/// All accesses are big-endian. The core aligns word addresses down to a
/// multiple of four and halfword addresses down to a multiple of two before
/// calling in, so implementations never see misaligned requests.
pub trait Bus {
    /// Reads one byte.
    fn read_byte(&mut self, addr: u32) -> u8;
    /// Reads one halfword.
    fn read_half(&mut self, addr: u32) -> u16;
    /// Reads one word.
    fn read_word(&mut self, addr: u32) -> u32;
    /// Writes one byte.
    fn write_byte(&mut self, addr: u32, value: u8);
    /// Writes one halfword.
    fn write_half(&mut self, addr: u32, value: u16);
    /// Writes one word.
    fn write_word(&mut self, addr: u32, value: u32);

    /// Fetches one instruction halfword. Defaults to a data halfword read.
    fn fetch_op(&mut self, addr: u32) -> u16 {
        self.read_half(addr)
    }

    /// Reads a word from the I/O space (`port` already mapped by [`io_address`]).
    fn io_read_word(&mut self, port: u32) -> u32;
    /// Writes a word to the I/O space (`port` already mapped by [`io_address`]).
    fn io_write_word(&mut self, port: u32, value: u32);

    /// Reads one half of an I/O port; used by variants with a 16-bit I/O bus.
    ///
    /// `port & 2` selects the low half. Defaults to a slice of the port word.
    fn io_read_half(&mut self, port: u32) -> u16 {
        let word = self.io_read_word(port & !3);
        if port & 2 == 0 {
            (word >> 16) as u16
        } else {
            word as u16
        }
    }

    /// Writes one half of an I/O port; used by variants with a 16-bit I/O bus.
    ///
    /// Defaults to a read-modify-write of the port word.
    fn io_write_half(&mut self, port: u32, value: u16) {
        let word = self.io_read_word(port & !3);
        let merged = if port & 2 == 0 {
            (word & 0x0000_ffff) | (u32::from(value) << 16)
        } else {
            (word & 0xffff_0000) | u32::from(value)
        };
        self.io_write_word(port & !3, merged);
    }

    /// Called after an external line's interrupt has been taken.
    fn acknowledge_interrupt(&mut self, _line: InterruptLine) {}
}

#[cfg(test)]
mod tests {
    use super::{io_address, Bus, FlatMemory};

    #[test]
    fn io_addresses_keep_fifteen_word_aligned_bits() {
        assert_eq!(io_address(0), 0);
        assert_eq!(io_address(0x0000_2000), 0x4);
        assert_eq!(io_address(0xffff_ffff), 0x7ffc);
    }

    #[test]
    fn io_halves_slice_the_port_word() {
        let mut bus = FlatMemory::new();
        bus.set_io_port(0x20, 0x1234_5678);
        assert_eq!(bus.io_read_half(0x20), 0x1234);
        assert_eq!(bus.io_read_half(0x22), 0x5678);

        bus.io_write_half(0x22, 0xbeef);
        assert_eq!(bus.io_port(0x20), 0x1234_beef);
        bus.io_write_half(0x20, 0xdead);
        assert_eq!(bus.io_port(0x20), 0xdead_beef);
    }
}
