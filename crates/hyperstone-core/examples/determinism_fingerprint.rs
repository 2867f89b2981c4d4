//! Deterministic run fingerprint used for cross-host comparison.

use hyperstone_core::memory::Bus;
use hyperstone_core::state::{FCR_REGISTER, PC_REGISTER, SR_L, SR_REGISTER, TCR_REGISTER};
use hyperstone_core::trap::TRAPNO_TIMER;
use hyperstone_core::{Cpu, FlatMemory};
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;
use tracing as _;

const PROGRAM: u32 = 0x1000;

// Sums L3 into L2 forever while the timer interrupt spins at its vector.
const LOOP: [u16; 4] = [
    0x6631, // MOVI L3, 1
    0x2b23, // ADD L2, L3
    0x9b22, 0x3000, // STW.D L2, L2, 0
];

fn hash_bytes(hash: &mut u64, bytes: &[u8]) {
    for byte in bytes {
        *hash ^= u64::from(*byte);
        *hash = hash.wrapping_mul(0x1000_0000_01B3);
    }
}

fn fingerprint() -> String {
    let mut bus = FlatMemory::new();
    bus.load_halfwords(PROGRAM, &LOOP);
    bus.load_halfwords(PROGRAM + 8, &[0xfc77]); // BR -10

    let mut cpu = Cpu::default();
    cpu.reset();
    bus.load_halfwords(cpu.trap_addr(TRAPNO_TIMER), &[0xfc7f]); // BR -2
    cpu.set_global(PC_REGISTER, PROGRAM);
    cpu.set_global(TCR_REGISTER, 40);
    cpu.set_global(FCR_REGISTER, 0);
    let low = cpu.regs().sr.bits() & 0xffff & !SR_L;
    cpu.set_global(SR_REGISTER, low);

    let outcome = match cpu.run(&mut bus, 4_000) {
        Ok(outcome) => outcome,
        Err(err) => return format!("fatal: {err}"),
    };

    let mut hash = 0xcbf2_9ce4_8422_2325_u64;
    hash_bytes(&mut hash, &outcome.cycles.to_le_bytes());
    hash_bytes(&mut hash, &outcome.instructions.to_le_bytes());

    let snapshot = cpu.snapshot();
    for value in snapshot.global_regs.iter().chain(&snapshot.local_regs) {
        hash_bytes(&mut hash, &value.to_le_bytes());
    }
    hash_bytes(&mut hash, snapshot.flags.as_bytes());
    hash_bytes(&mut hash, &bus.read_word(cpu.local(2) & !3).to_le_bytes());

    format!("{hash:016x}")
}

fn main() {
    println!("{}", fingerprint());
}
