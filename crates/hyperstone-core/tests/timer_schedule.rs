//! Timer register reads, prescale changes and the pull-based run driver.

use hyperstone_core::state::{
    FCR_REGISTER, PC_REGISTER, SR_H, SR_L, SR_REGISTER, TCR_REGISTER, TPR_REGISTER, TR_REGISTER,
};
use hyperstone_core::trap::TRAPNO_TIMER;
use hyperstone_core::{Cpu, FlatMemory};
use proptest as _;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;
use tracing as _;

const PROGRAM: u32 = 0x1000;
// MOVI L2, 1
const MOVI_L2_1: u16 = 0x6621;
// MOV L2, G7 (G23 with H set)
const MOV_L2_G7: u16 = 0x2627;
// BR -2
const SPIN: u16 = 0xfc7f;

fn boot(program: &[u16]) -> (Cpu, FlatMemory) {
    let mut bus = FlatMemory::new();
    bus.load_halfwords(PROGRAM, program);
    let mut cpu = Cpu::default();
    cpu.reset();
    cpu.set_global(PC_REGISTER, PROGRAM);
    (cpu, bus)
}

#[test]
fn timer_read_scales_elapsed_cycles_and_debits_half_a_tick() {
    let (mut cpu, mut bus) = boot(&[MOV_L2_G7]);
    // Prescale shift 2, six clocks per tick.
    cpu.set_global(TPR_REGISTER, (2 << 26) | (4 << 16));
    let base = cpu.timer().base_value();
    cpu.advance_cycles(100);
    let low = cpu.regs().sr.bits() & 0xffff;
    cpu.set_global(SR_REGISTER, low | SR_H);

    let consumed = cpu.execute_slice(&mut bus, 5).expect("MOV executes");

    assert_eq!(cpu.local(2), base + (100 >> 2) / 6);
    // One ALU clock at scale 2 plus the three-cycle debit.
    assert_eq!(consumed, 4 + 3);
}

#[test]
fn direct_tr_read_outside_a_slice_has_no_debit() {
    let (mut cpu, _) = boot(&[]);
    let start = cpu.total_cycles();
    cpu.set_global(TPR_REGISTER, 0);
    cpu.set_global(TR_REGISTER, 500);
    cpu.advance_cycles(20);
    assert_eq!(cpu.global(TR_REGISTER), 510);
    assert_eq!(cpu.total_cycles() - start, 20);
}

#[rstest]
#[case(0, 0, 37)]
#[case(1, 3, 37)]
#[case(3, 0, 1000)]
fn prescale_change_keeps_elapsed_ticks(
    #[case] scale: u32,
    #[case] period: u32,
    #[case] elapsed: u64,
) {
    let (mut cpu, _) = boot(&[]);
    cpu.set_global(TPR_REGISTER, 0);
    cpu.advance_cycles(elapsed);
    let before = cpu.global(TR_REGISTER);
    cpu.set_global(TPR_REGISTER, (scale << 26) | (period << 16));
    assert_eq!(cpu.global(TR_REGISTER), before);
}

#[test]
fn run_driver_raises_and_takes_the_compare_interrupt() {
    let (mut cpu, mut bus) = boot(&[MOVI_L2_1; 64]);
    bus.load_halfwords(cpu.trap_addr(TRAPNO_TIMER), &[SPIN]);
    let start = cpu.total_cycles();
    cpu.set_global(TPR_REGISTER, 0);
    cpu.set_global(TR_REGISTER, 0);
    cpu.set_global(TCR_REGISTER, 10);
    cpu.set_global(FCR_REGISTER, 0);
    let low = cpu.regs().sr.bits() & 0xffff & !SR_L;
    cpu.set_global(SR_REGISTER, low);

    // Two clocks per tick: tick 10 lands just after cycle 20.
    assert_eq!(cpu.next_timer_deadline(), Some(start + 21));

    let outcome = cpu.run(&mut bus, 100).expect("run completes");

    assert!(outcome.cycles >= 100);
    assert_eq!(cpu.regs().pc(), cpu.trap_addr(TRAPNO_TIMER));
    assert!(cpu.regs().sr.i());
    assert!(!cpu.timer().interrupt_pending());
    assert_eq!(cpu.next_timer_deadline(), None);
}

#[test]
fn deferred_prescale_change_applies_at_the_next_tick() {
    let (mut cpu, mut bus) = boot(&[SPIN]);
    cpu.set_global(TPR_REGISTER, 0);
    cpu.set_global(TPR_REGISTER, 0x8000_0000 | (1 << 26));
    assert_eq!(cpu.timer().clock_scale(), 0);
    assert!(cpu.next_timer_deadline().is_some());

    cpu.run(&mut bus, 16).expect("run completes");
    assert_eq!(cpu.timer().clock_scale(), 1);
    assert_eq!(cpu.global(TPR_REGISTER) & 0x8000_0000, 0);
}
