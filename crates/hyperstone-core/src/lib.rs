//! Cycle-counted interpreter core for the Hyperstone E1-32/E1-16 CPU family.
//!
//! The host owns memory, I/O and interrupt wiring through [`Bus`] and drives
//! execution with [`Cpu::run`] or [`Cpu::execute_slice`].

// Register fields are packed into and sliced out of 32-bit words throughout.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_lossless
)]

/// Host bus contract, on-chip RAM map and flat test memory.
pub mod memory;
pub use memory::{io_address, Bus, FlatMemory, IramSize, VariantBus};

/// Public host-facing configuration and state export.
pub mod api;
pub use api::{flags_string, BusWidth, CpuConfig, CpuSnapshot, RunOutcome, Variant};

/// Architectural CPU state model primitives.
pub mod state;
pub use state::{DelaySlot, RegisterFile, StatusRegister};

/// CPU lifecycle and special-register side effects.
pub mod cpu;
pub use cpu::{Cpu, RESET_TPR};

/// Static opcode dispatch table.
pub mod encoding;
pub use encoding::{lookup, BranchCondition, OpcodeEntry, Operation, RegisterBank, OPCODE_TABLE};

/// Immediate, constant and displacement decoding.
pub mod decoder;
pub use decoder::{InstructionCursor, IMMEDIATE_VALUES};

/// Fatal host errors and guest exceptions.
pub mod fault;
pub use fault::{CpuError, GuestException};

/// Trap numbers and vector resolution.
pub mod trap;
pub use trap::{TrapCondition, TrapEntry};

/// Interrupt lines and priority resolution.
pub mod interrupt;
pub use interrupt::{resolve_interrupt, InterruptLine, InterruptSource, INTERRUPT_LADDER};

/// On-chip timer.
pub mod timer;
pub use timer::{Timer, TimerDeadline};

/// Deterministic instruction cycle-cost table and lookup helpers.
pub mod timing;
pub use timing::{cycle_cost, scaled_cycle_cost, CycleCostKind, CYCLE_COST_TABLE};

/// Instruction execution pipeline.
pub mod execute;
pub use execute::Operand;

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
