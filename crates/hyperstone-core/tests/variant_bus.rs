//! Bus-width splitting and on-chip RAM as observed by the host.

use hyperstone_core::memory::Bus;
use hyperstone_core::state::PC_REGISTER;
use hyperstone_core::{Cpu, FlatMemory, InterruptLine, Variant};
use proptest as _;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;
use tracing as _;

const PROGRAM: u32 = 0x1000;
// STW.D L2, L4, 8
const STW_WORD: [u16; 2] = [0x9b24, 0x3008];
// LDW.D L2, L5, 8
const LDW_WORD: [u16; 2] = [0x9325, 0x3008];
// STW.IOD L2, L4, 2
const STW_IO: [u16; 2] = [0x9b24, 0x3002];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    ReadHalf(u32),
    ReadWord(u32),
    WriteHalf(u32, u16),
    WriteWord(u32, u32),
    IoReadHalf(u32),
    IoReadWord(u32),
    IoWriteHalf(u32, u16),
    IoWriteWord(u32, u32),
}

/// Flat memory that logs every data transfer; instruction fetches are not logged.
#[derive(Debug, Default)]
struct RecordingBus {
    memory: FlatMemory,
    log: Vec<Access>,
}

impl Bus for RecordingBus {
    fn read_byte(&mut self, addr: u32) -> u8 {
        self.memory.read_byte(addr)
    }

    fn read_half(&mut self, addr: u32) -> u16 {
        self.log.push(Access::ReadHalf(addr));
        self.memory.read_half(addr)
    }

    fn read_word(&mut self, addr: u32) -> u32 {
        self.log.push(Access::ReadWord(addr));
        self.memory.read_word(addr)
    }

    fn write_byte(&mut self, addr: u32, value: u8) {
        self.memory.write_byte(addr, value);
    }

    fn write_half(&mut self, addr: u32, value: u16) {
        self.log.push(Access::WriteHalf(addr, value));
        self.memory.write_half(addr, value);
    }

    fn write_word(&mut self, addr: u32, value: u32) {
        self.log.push(Access::WriteWord(addr, value));
        self.memory.write_word(addr, value);
    }

    fn fetch_op(&mut self, addr: u32) -> u16 {
        self.memory.fetch_op(addr)
    }

    fn io_read_word(&mut self, port: u32) -> u32 {
        self.log.push(Access::IoReadWord(port));
        self.memory.io_read_word(port)
    }

    fn io_write_word(&mut self, port: u32, value: u32) {
        self.log.push(Access::IoWriteWord(port, value));
        self.memory.io_write_word(port, value);
    }

    fn io_read_half(&mut self, port: u32) -> u16 {
        self.log.push(Access::IoReadHalf(port));
        self.memory.io_read_half(port)
    }

    fn io_write_half(&mut self, port: u32, value: u16) {
        self.log.push(Access::IoWriteHalf(port, value));
        self.memory.io_write_half(port, value);
    }

    fn acknowledge_interrupt(&mut self, line: InterruptLine) {
        self.memory.acknowledge_interrupt(line);
    }
}

fn boot(variant: Variant, program: &[u16]) -> (Cpu, RecordingBus) {
    let mut bus = RecordingBus::default();
    bus.memory.load_halfwords(PROGRAM, program);
    let mut cpu = Cpu::new(variant.config());
    cpu.reset();
    cpu.set_global(PC_REGISTER, PROGRAM);
    (cpu, bus)
}

#[rstest]
#[case::sixteen_bit(Variant::E116T, true)]
#[case::thirty_two_bit(Variant::E132Xs, false)]
fn word_stores_follow_the_program_bus_width(#[case] variant: Variant, #[case] split: bool) {
    let (mut cpu, mut bus) = boot(variant, &STW_WORD);
    cpu.set_local(2, 0x4000);
    cpu.set_local(4, 0x1234_5678);

    cpu.step(&mut bus).expect("store executes");

    let expected = if split {
        vec![
            Access::WriteHalf(0x4008, 0x1234),
            Access::WriteHalf(0x400a, 0x5678),
        ]
    } else {
        vec![Access::WriteWord(0x4008, 0x1234_5678)]
    };
    assert_eq!(bus.log, expected);
    assert_eq!(bus.memory.read_word(0x4008), 0x1234_5678);
}

#[rstest]
#[case::sixteen_bit(Variant::E116Xs, true)]
#[case::thirty_two_bit(Variant::E132N, false)]
fn word_loads_follow_the_program_bus_width(#[case] variant: Variant, #[case] split: bool) {
    let (mut cpu, mut bus) = boot(variant, &LDW_WORD);
    bus.memory.write_word(0x4008, 0xdead_beef);
    cpu.set_local(2, 0x4000);

    cpu.step(&mut bus).expect("load executes");

    let expected = if split {
        vec![Access::ReadHalf(0x4008), Access::ReadHalf(0x400a)]
    } else {
        vec![Access::ReadWord(0x4008)]
    };
    assert_eq!(bus.log, expected);
    assert_eq!(cpu.local(5), 0xdead_beef);
}

#[rstest]
#[case::sixteen_bit(Variant::Gms30c2216, true)]
#[case::thirty_two_bit(Variant::Gms30c2232, false)]
fn io_stores_follow_the_io_bus_width(#[case] variant: Variant, #[case] split: bool) {
    let (mut cpu, mut bus) = boot(variant, &STW_IO);
    cpu.set_local(2, 0x4000);
    cpu.set_local(4, 0xcafe_f00d);

    cpu.step(&mut bus).expect("I/O store executes");

    let expected = if split {
        vec![
            Access::IoWriteHalf(8, 0xcafe),
            Access::IoWriteHalf(10, 0xf00d),
        ]
    } else {
        vec![Access::IoWriteWord(8, 0xcafe_f00d)]
    };
    assert_eq!(bus.log, expected);
    assert_eq!(bus.memory.io_port(8), 0xcafe_f00d);
}

#[rstest]
#[case::four_kib(Variant::E132N, 0x0008)]
#[case::eight_kib(Variant::E132Xt, 0x1008)]
#[case::sixteen_kib(Variant::E132Xs, 0x1008)]
fn iram_stores_stay_on_chip_and_fold_by_size(#[case] variant: Variant, #[case] offset: usize) {
    let (mut cpu, mut bus) = boot(variant, &STW_WORD);
    cpu.set_local(2, 0xc000_1000);
    cpu.set_local(4, 0x0102_0304);

    cpu.step(&mut bus).expect("store executes");

    assert!(bus.log.is_empty());
    assert_eq!(&cpu.iram()[offset..offset + 4], &[1, 2, 3, 4]);
    assert_eq!(cpu.iram().len(), variant.config().iram_size.bytes());
}

#[test]
fn programs_run_from_a_mirror_of_on_chip_ram() {
    let (mut cpu, mut bus) = boot(Variant::E132N, &[]);
    // MOVI L2, 5
    cpu.iram_mut()[0x20..0x22].copy_from_slice(&0x6625_u16.to_be_bytes());
    cpu.set_global(PC_REGISTER, 0xd000_3020);

    cpu.step(&mut bus).expect("MOVI executes");

    assert_eq!(cpu.local(2), 5);
    assert_eq!(cpu.regs().pc(), 0xd000_3022);
}

#[test]
fn on_chip_ram_survives_reset() {
    let (mut cpu, _) = boot(Variant::E116Xt, &[]);
    cpu.iram_mut()[0] = 0xaa;
    cpu.reset();
    assert_eq!(cpu.iram()[0], 0xaa);
}
