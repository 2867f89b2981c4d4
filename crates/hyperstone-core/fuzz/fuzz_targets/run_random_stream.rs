#![no_main]

use hyperstone_core::state::{FCR_REGISTER, PC_REGISTER, SR_REGISTER};
use hyperstone_core::{Cpu, FlatMemory, Variant};
use libfuzzer_sys::fuzz_target;

const PROGRAM: u32 = 0x1000;

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }

    let variant = Variant::ALL[usize::from(data[0]) % Variant::ALL.len()];
    let lines = data[1];
    let mut bus = FlatMemory::new();
    bus.load(PROGRAM, &data[4..]);

    let mut cpu = Cpu::new(variant.config());
    cpu.reset();
    cpu.set_global(PC_REGISTER, PROGRAM);
    cpu.set_global(FCR_REGISTER, u32::from(data[2]) << 8);
    cpu.set_global(SR_REGISTER, u32::from(data[3]) << 8);
    for line in 0..8 {
        cpu.set_input(line, lines & (1 << line) != 0);
    }

    // Only a DO opcode may stop the run early.
    let _ = cpu.run(&mut bus, 2_000);
    let _ = cpu.snapshot();
});
