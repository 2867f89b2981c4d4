//! Architectural CPU state model primitives.

/// Pending delayed-branch tracking.
pub mod delay;
/// Global and local register banks.
pub mod registers;
/// Status register layout and field accessors.
pub mod status;

pub use delay::DelaySlot;
pub use registers::{
    is_write_only, local_index, RegisterFile, BCR_REGISTER, FCR_REGISTER, FER_REGISTER,
    GLOBAL_REGISTER_COUNT, ISR_REGISTER, LOCAL_REGISTER_COUNT, MCR_REGISTER, PC_REGISTER,
    SP_REGISTER, SR_REGISTER, TCR_REGISTER, TPR_REGISTER, TR_REGISTER, UB_REGISTER, WCR_REGISTER,
    WRITE_ONLY_REGISTER_MASK,
};
pub use status::{
    StatusRegister, SR_C, SR_FL_MASK, SR_FP_MASK, SR_FRM_MASK, SR_FTE_MASK, SR_H, SR_I, SR_ILC_MASK,
    SR_L, SR_M, SR_N, SR_P, SR_RESERVED, SR_S, SR_T, SR_V, SR_Z,
};
