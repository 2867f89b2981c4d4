use std::collections::HashMap;

use super::Bus;
use crate::interrupt::InterruptLine;

const PAGE_BYTES: usize = 0x1000;
const PAGE_SHIFT: u32 = 12;

/// Sparse 4 GiB big-endian memory.
///
/// Unwritten bytes read as zero. The I/O space is a separate word store and
/// every interrupt acknowledge is recorded in order.
#[derive(Debug, Clone, Default)]
pub struct FlatMemory {
    pages: HashMap<u32, Box<[u8; PAGE_BYTES]>>,
    io: HashMap<u32, u32>,
    acknowledged: Vec<InterruptLine>,
}

impl FlatMemory {
    /// Creates an empty memory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies raw bytes into memory starting at `addr`.
    pub fn load(&mut self, addr: u32, bytes: &[u8]) {
        for (offset, byte) in (0u32..).zip(bytes) {
            self.store(addr.wrapping_add(offset), *byte);
        }
    }

    /// Copies big-endian halfwords (instruction words) starting at `addr`.
    pub fn load_halfwords(&mut self, addr: u32, words: &[u16]) {
        for (index, word) in (0u32..).zip(words) {
            self.write_half(addr.wrapping_add(index * 2), *word);
        }
    }

    /// Current value of I/O port `port`.
    #[must_use]
    pub fn io_port(&self, port: u32) -> u32 {
        self.io.get(&port).copied().unwrap_or(0)
    }

    /// Presets I/O port `port`.
    pub fn set_io_port(&mut self, port: u32, value: u32) {
        self.io.insert(port, value);
    }

    /// Interrupt lines acknowledged so far, oldest first.
    #[must_use]
    pub fn acknowledged(&self) -> &[InterruptLine] {
        &self.acknowledged
    }

    fn fetch(&self, addr: u32) -> u8 {
        self.pages
            .get(&(addr >> PAGE_SHIFT))
            .map_or(0, |page| page[(addr as usize) & (PAGE_BYTES - 1)])
    }

    fn store(&mut self, addr: u32, value: u8) {
        let page = self
            .pages
            .entry(addr >> PAGE_SHIFT)
            .or_insert_with(|| Box::new([0; PAGE_BYTES]));
        page[(addr as usize) & (PAGE_BYTES - 1)] = value;
    }
}

impl Bus for FlatMemory {
    fn read_byte(&mut self, addr: u32) -> u8 {
        self.fetch(addr)
    }

    fn read_half(&mut self, addr: u32) -> u16 {
        u16::from_be_bytes([self.fetch(addr), self.fetch(addr.wrapping_add(1))])
    }

    fn read_word(&mut self, addr: u32) -> u32 {
        u32::from_be_bytes([
            self.fetch(addr),
            self.fetch(addr.wrapping_add(1)),
            self.fetch(addr.wrapping_add(2)),
            self.fetch(addr.wrapping_add(3)),
        ])
    }

    fn write_byte(&mut self, addr: u32, value: u8) {
        self.store(addr, value);
    }

    fn write_half(&mut self, addr: u32, value: u16) {
        for (offset, byte) in (0u32..).zip(value.to_be_bytes()) {
            self.store(addr.wrapping_add(offset), byte);
        }
    }

    fn write_word(&mut self, addr: u32, value: u32) {
        for (offset, byte) in (0u32..).zip(value.to_be_bytes()) {
            self.store(addr.wrapping_add(offset), byte);
        }
    }

    fn io_read_word(&mut self, port: u32) -> u32 {
        self.io_port(port)
    }

    fn io_write_word(&mut self, port: u32, value: u32) {
        self.set_io_port(port, value);
    }

    fn acknowledge_interrupt(&mut self, line: InterruptLine) {
        self.acknowledged.push(line);
    }
}

#[cfg(test)]
mod tests {
    use super::FlatMemory;
    use crate::interrupt::InterruptLine;
    use crate::memory::Bus;

    #[test]
    fn words_are_big_endian() {
        let mut memory = FlatMemory::new();
        memory.write_word(0x100, 0x1122_3344);
        assert_eq!(memory.read_byte(0x100), 0x11);
        assert_eq!(memory.read_half(0x102), 0x3344);
        assert_eq!(memory.read_word(0x100), 0x1122_3344);
    }

    #[test]
    fn untouched_memory_reads_zero() {
        let mut memory = FlatMemory::new();
        assert_eq!(memory.read_word(0xdead_bee0), 0);
    }

    #[test]
    fn writes_straddling_pages_land_in_both() {
        let mut memory = FlatMemory::new();
        memory.write_word(0x0fff, 0xaabb_ccdd);
        assert_eq!(memory.read_byte(0x0fff), 0xaa);
        assert_eq!(memory.read_byte(0x1002), 0xdd);
    }

    #[test]
    fn acknowledges_are_recorded_in_order() {
        let mut memory = FlatMemory::new();
        memory.acknowledge_interrupt(InterruptLine::Io3);
        memory.acknowledge_interrupt(InterruptLine::Int1);
        assert_eq!(
            memory.acknowledged(),
            &[InterruptLine::Io3, InterruptLine::Int1]
        );
    }

    #[test]
    fn halfword_program_loads_sequentially() {
        let mut memory = FlatMemory::new();
        memory.load_halfwords(0x200, &[0x1234, 0xabcd]);
        assert_eq!(memory.fetch_op(0x200), 0x1234);
        assert_eq!(memory.fetch_op(0x202), 0xabcd);
    }
}
