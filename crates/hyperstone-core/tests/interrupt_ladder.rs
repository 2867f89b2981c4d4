//! External interrupt recognition through the execution loop.

use hyperstone_core::interrupt::INPUT_LINE_COUNT;
use hyperstone_core::state::{
    FCR_REGISTER, PC_REGISTER, SR_L, SR_REGISTER, TCR_REGISTER, TPR_REGISTER, TR_REGISTER,
};
use hyperstone_core::trap::{TRAPNO_INT1, TRAPNO_IO3, TRAPNO_TIMER};
use hyperstone_core::{Cpu, FlatMemory, InterruptLine};
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;
use tracing as _;

const PROGRAM: u32 = 0x1000;
// MOVI L2, 1
const MOVI_L2_1: u16 = 0x6621;
// BR -2
const SPIN: u16 = 0xfc7f;
// DBR +4
const DBR_PLUS_4: u16 = 0xec04;
// MOVI L5, 1
const MOVI_L5_1: u16 = 0x6651;
// MOVI L6, 1
const MOVI_L6_1: u16 = 0x6661;

fn unlock(cpu: &mut Cpu) {
    let low = cpu.regs().sr.bits() & 0xffff & !SR_L;
    cpu.set_global(SR_REGISTER, low);
}

fn latch_timer_compare(cpu: &mut Cpu) {
    cpu.set_global(TPR_REGISTER, 0);
    cpu.set_global(TR_REGISTER, 0);
    cpu.set_global(TCR_REGISTER, 1);
    let deadline = cpu.next_timer_deadline().expect("compare scheduled");
    cpu.advance_cycles(deadline - cpu.total_cycles());
    cpu.timer_expired();
    assert!(cpu.timer().interrupt_pending());
}

fn boot() -> (Cpu, FlatMemory) {
    let mut bus = FlatMemory::new();
    bus.load_halfwords(PROGRAM, &[MOVI_L2_1; 8]);
    let mut cpu = Cpu::default();
    cpu.reset();
    bus.load_halfwords(cpu.trap_addr(TRAPNO_IO3), &[SPIN]);
    bus.load_halfwords(cpu.trap_addr(TRAPNO_INT1), &[SPIN]);
    cpu.set_global(PC_REGISTER, PROGRAM);
    (cpu, bus)
}

#[test]
fn io3_is_taken_before_int1() {
    let (mut cpu, mut bus) = boot();
    cpu.set_global(FCR_REGISTER, 0x0000_0400);
    cpu.set_interrupt_line(InterruptLine::Int1, true);
    cpu.set_interrupt_line(InterruptLine::Io3, true);
    unlock(&mut cpu);

    // The SR write holds recognition off for one instruction.
    cpu.step(&mut bus).expect("first instruction");
    assert_eq!(cpu.regs().pc(), cpu.trap_addr(TRAPNO_IO3));
    assert_eq!(bus.acknowledged(), &[InterruptLine::Io3]);

    let sr = cpu.regs().sr;
    assert!(sr.i() && sr.l() && sr.s());
    assert_eq!(sr.fl(), 2);
    assert_eq!(cpu.local(0), (PROGRAM + 2) | 1);

    cpu.set_interrupt_line(InterruptLine::Io3, false);
    unlock(&mut cpu);
    cpu.step(&mut bus).expect("spin");
    assert_eq!(cpu.regs().pc(), cpu.trap_addr(TRAPNO_INT1));
    assert_eq!(
        bus.acknowledged(),
        &[InterruptLine::Io3, InterruptLine::Int1]
    );
}

#[test]
fn taking_a_line_leaves_the_timer_pending() {
    let (mut cpu, mut bus) = boot();
    bus.load_halfwords(cpu.trap_addr(TRAPNO_TIMER), &[SPIN]);
    cpu.set_global(FCR_REGISTER, 0);
    latch_timer_compare(&mut cpu);
    cpu.set_interrupt_line(InterruptLine::Int1, true);
    unlock(&mut cpu);

    // With timer priority 0, INT1 outranks the timer.
    cpu.step(&mut bus).expect("first instruction");
    assert_eq!(cpu.regs().pc(), cpu.trap_addr(TRAPNO_INT1));
    assert!(cpu.timer().interrupt_pending());
    assert_eq!(bus.acknowledged(), &[InterruptLine::Int1]);

    cpu.set_interrupt_line(InterruptLine::Int1, false);
    unlock(&mut cpu);
    cpu.step(&mut bus).expect("spin");
    assert_eq!(cpu.regs().pc(), cpu.trap_addr(TRAPNO_TIMER));
    assert!(!cpu.timer().interrupt_pending());
    assert_eq!(bus.acknowledged(), &[InterruptLine::Int1]);
}

#[test]
fn taking_the_timer_leaves_a_line_pending() {
    let (mut cpu, mut bus) = boot();
    bus.load_halfwords(cpu.trap_addr(TRAPNO_TIMER), &[SPIN]);
    // Timer priority 3 sits above INT1.
    cpu.set_global(FCR_REGISTER, 0x0030_0000);
    latch_timer_compare(&mut cpu);
    cpu.set_interrupt_line(InterruptLine::Int1, true);
    unlock(&mut cpu);

    cpu.step(&mut bus).expect("first instruction");
    assert_eq!(cpu.regs().pc(), cpu.trap_addr(TRAPNO_TIMER));
    assert!(!cpu.timer().interrupt_pending());
    assert!(bus.acknowledged().is_empty());

    unlock(&mut cpu);
    cpu.step(&mut bus).expect("spin");
    assert_eq!(cpu.regs().pc(), cpu.trap_addr(TRAPNO_INT1));
    assert_eq!(bus.acknowledged(), &[InterruptLine::Int1]);
}

#[test]
fn pending_line_waits_for_the_delay_slot() {
    let (mut cpu, mut bus) = boot();
    bus.load_halfwords(PROGRAM, &[DBR_PLUS_4, MOVI_L5_1, MOVI_L6_1]);
    cpu.set_global(FCR_REGISTER, 0);
    cpu.set_interrupt_line(InterruptLine::Int1, true);
    unlock(&mut cpu);

    cpu.step(&mut bus).expect("DBR");
    assert_eq!(cpu.regs().pc(), PROGRAM + 2);
    assert_eq!(cpu.intblock(), 1);
    assert_eq!(cpu.snapshot().delay_target, Some(PROGRAM + 6));
    assert!(bus.acknowledged().is_empty());

    cpu.step(&mut bus).expect("delay slot");
    assert_eq!(cpu.regs().pc(), cpu.trap_addr(TRAPNO_INT1));
    assert_eq!(cpu.local(0), (PROGRAM + 6) | 1);
    assert_eq!(bus.acknowledged(), &[InterruptLine::Int1]);
    let snapshot = cpu.snapshot();
    assert_eq!(snapshot.delay_target, None);
    assert_eq!(snapshot.local_regs[5], 1);
    assert_eq!(snapshot.local_regs[6], 0);
}

#[test]
fn locked_cpu_keeps_lines_pending() {
    let (mut cpu, mut bus) = boot();
    cpu.set_global(FCR_REGISTER, 0);
    cpu.set_interrupt_line(InterruptLine::Int1, true);

    for _ in 0..4 {
        cpu.step(&mut bus).expect("straight-line code");
    }
    assert_eq!(cpu.regs().pc(), PROGRAM + 8);
    assert!(bus.acknowledged().is_empty());
}

#[test]
fn fcr_inhibit_bit_masks_its_line() {
    let (mut cpu, mut bus) = boot();
    cpu.set_global(FCR_REGISTER, 0x1000_0000);
    cpu.set_interrupt_line(InterruptLine::Int1, true);
    unlock(&mut cpu);

    cpu.step(&mut bus).expect("first instruction");
    cpu.step(&mut bus).expect("second instruction");
    assert_eq!(cpu.regs().pc(), PROGRAM + 4);
    assert!(bus.acknowledged().is_empty());
}

#[test]
fn out_of_range_input_is_ignored() {
    let (mut cpu, _) = boot();
    let before = cpu.snapshot();
    cpu.set_input(INPUT_LINE_COUNT, true);
    assert_eq!(cpu.snapshot(), before);
}
