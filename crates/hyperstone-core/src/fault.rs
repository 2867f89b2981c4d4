use thiserror::Error;

use crate::trap::{
    TRAPNO_FRAME_ERROR, TRAPNO_PRIVILEGE_ERROR, TRAPNO_RANGE_ERROR, TRAPNO_TRACE_EXCEPTION,
};

/// Host-visible failures that stop execution.
///
/// Guest-visible conditions (range, privilege, frame, trace) never surface
/// here; they enter the guest exception vector as [`GuestException`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum CpuError {
    /// The `DO` opcode (`0xcf`) has no defined semantics on this core.
    #[error("unimplemented opcode {opcode:#06x} at pc {pc:#010x}")]
    UnimplementedOpcode {
        /// Address of the offending instruction.
        pc: u32,
        /// Full 16-bit instruction word.
        opcode: u16,
    },
}

impl CpuError {
    /// Address of the instruction that raised the error.
    #[must_use]
    pub const fn pc(self) -> u32 {
        match self {
            Self::UnimplementedOpcode { pc, .. } => pc,
        }
    }
}

/// Guest exceptions delivered through the trap vector with a two-register frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum GuestException {
    /// Arithmetic overflow, `CHK` bound violation, `XMx` limit or divide error.
    Range,
    /// User-mode write to a high global register or illegal `RET` transition.
    Privilege,
    /// `FRAME` spill crossed the upper stack bound.
    Frame,
    /// Single-step trace after an instruction with `SR.T` and `SR.P` set.
    Trace,
}

impl GuestException {
    /// Trap number whose vector receives this exception.
    #[must_use]
    pub const fn trap_number(self) -> u8 {
        match self {
            Self::Range => TRAPNO_RANGE_ERROR,
            Self::Privilege => TRAPNO_PRIVILEGE_ERROR,
            Self::Frame => TRAPNO_FRAME_ERROR,
            Self::Trace => TRAPNO_TRACE_EXCEPTION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CpuError, GuestException};

    #[test]
    fn error_message_names_pc_and_opcode() {
        let err = CpuError::UnimplementedOpcode {
            pc: 0x1000,
            opcode: 0xcf12,
        };
        assert_eq!(
            err.to_string(),
            "unimplemented opcode 0xcf12 at pc 0x00001000"
        );
        assert_eq!(err.pc(), 0x1000);
    }

    #[test]
    fn range_privilege_and_frame_share_a_vector() {
        assert_eq!(GuestException::Range.trap_number(), 60);
        assert_eq!(GuestException::Privilege.trap_number(), 60);
        assert_eq!(GuestException::Frame.trap_number(), 60);
        assert_eq!(GuestException::Trace.trap_number(), 57);
    }
}
