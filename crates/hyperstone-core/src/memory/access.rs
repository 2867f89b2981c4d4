//! Variant access policy: on-chip RAM and external bus-width splitting.

use super::map::iram_offset;
use super::Bus;
use crate::api::{BusWidth, CpuConfig};
use crate::interrupt::InterruptLine;

/// Host bus as seen through one device variant.
///
/// Accesses inside the IRAM window are served from the core's on-chip RAM
/// and never reach the host. On a 16-bit program bus every word transfer
/// becomes two halfword transfers, high half first; on a 16-bit I/O bus
/// every port word becomes two [`Bus::io_read_half`]/[`Bus::io_write_half`]
/// transfers.
pub struct VariantBus<'a> {
    host: &'a mut dyn Bus,
    iram: &'a mut [u8],
    config: CpuConfig,
}

impl<'a> VariantBus<'a> {
    /// Wraps `host` with on-chip RAM `iram`, laid out per `config`.
    #[must_use]
    pub const fn new(host: &'a mut dyn Bus, iram: &'a mut [u8], config: CpuConfig) -> Self {
        Self { host, iram, config }
    }

    fn iram_index(&self, addr: u32) -> Option<usize> {
        if self.iram.is_empty() {
            return None;
        }
        iram_offset(addr, self.config.iram_size)
            .map(|offset| offset % self.iram.len())
    }

    fn iram_read(&self, index: usize, bytes: usize) -> u32 {
        let len = self.iram.len();
        let mut value = 0;
        for n in 0..bytes {
            value = (value << 8) | u32::from(self.iram[(index + n) % len]);
        }
        value
    }

    fn iram_write(&mut self, index: usize, bytes: usize, value: u32) {
        let len = self.iram.len();
        for n in 0..bytes {
            let shift = 8 * (bytes - 1 - n);
            self.iram[(index + n) % len] = (value >> shift) as u8;
        }
    }

    const fn narrow_program_bus(&self) -> bool {
        matches!(self.config.program_bus_width, BusWidth::Bits16)
    }

    const fn narrow_io_bus(&self) -> bool {
        matches!(self.config.io_bus_width, BusWidth::Bits16)
    }
}

impl Bus for VariantBus<'_> {
    fn read_byte(&mut self, addr: u32) -> u8 {
        match self.iram_index(addr) {
            Some(index) => self.iram_read(index, 1) as u8,
            None => self.host.read_byte(addr),
        }
    }

    fn read_half(&mut self, addr: u32) -> u16 {
        match self.iram_index(addr) {
            Some(index) => self.iram_read(index, 2) as u16,
            None => self.host.read_half(addr),
        }
    }

    fn read_word(&mut self, addr: u32) -> u32 {
        if let Some(index) = self.iram_index(addr) {
            return self.iram_read(index, 4);
        }
        if self.narrow_program_bus() {
            let high = self.host.read_half(addr);
            let low = self.host.read_half(addr.wrapping_add(2));
            (u32::from(high) << 16) | u32::from(low)
        } else {
            self.host.read_word(addr)
        }
    }

    fn write_byte(&mut self, addr: u32, value: u8) {
        match self.iram_index(addr) {
            Some(index) => self.iram_write(index, 1, u32::from(value)),
            None => self.host.write_byte(addr, value),
        }
    }

    fn write_half(&mut self, addr: u32, value: u16) {
        match self.iram_index(addr) {
            Some(index) => self.iram_write(index, 2, u32::from(value)),
            None => self.host.write_half(addr, value),
        }
    }

    fn write_word(&mut self, addr: u32, value: u32) {
        if let Some(index) = self.iram_index(addr) {
            self.iram_write(index, 4, value);
        } else if self.narrow_program_bus() {
            self.host.write_half(addr, (value >> 16) as u16);
            self.host.write_half(addr.wrapping_add(2), value as u16);
        } else {
            self.host.write_word(addr, value);
        }
    }

    fn fetch_op(&mut self, addr: u32) -> u16 {
        match self.iram_index(addr) {
            Some(index) => self.iram_read(index, 2) as u16,
            None => self.host.fetch_op(addr),
        }
    }

    fn io_read_word(&mut self, port: u32) -> u32 {
        if self.narrow_io_bus() {
            let high = self.host.io_read_half(port);
            let low = self.host.io_read_half(port.wrapping_add(2));
            (u32::from(high) << 16) | u32::from(low)
        } else {
            self.host.io_read_word(port)
        }
    }

    fn io_write_word(&mut self, port: u32, value: u32) {
        if self.narrow_io_bus() {
            self.host.io_write_half(port, (value >> 16) as u16);
            self.host.io_write_half(port.wrapping_add(2), value as u16);
        } else {
            self.host.io_write_word(port, value);
        }
    }

    fn acknowledge_interrupt(&mut self, line: InterruptLine) {
        self.host.acknowledge_interrupt(line);
    }
}
