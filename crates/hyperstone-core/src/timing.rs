/// Instruction and entry-sequence forms with fixed base cycle costs.
///
/// Every cost is expressed in processor clocks and scaled by the current
/// timer clock-scale shift (`cost << clock_scale`) when it is charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum CycleCostKind {
    /// Register/immediate arithmetic, logic, moves and single shifts.
    Alu,
    /// 64-bit shifts, `TESTLZ` and `MOVD`.
    DoubleAlu,
    /// Conditional branch or delayed branch whose predicate is false.
    BranchNotTaken,
    /// Taken relative branch (`Bxx`, `BR`).
    BranchTaken,
    /// Taken delayed branch (`DBxx`, `DBR`).
    DelayedBranchTaken,
    /// `RET`, `CALL`, `FRAME` and `TRAPxx` issue.
    ControlTransfer,
    /// Single-word load or store.
    MemoryWord,
    /// Double-word load or store.
    MemoryDouble,
    /// Stack-relative `LDW.S`/`STW.S`.
    MemoryStack,
    /// `MUL` with both operands in signed 16-bit range.
    MulShort,
    /// `MUL` with a wide operand.
    MulLong,
    /// `MULU`/`MULS` with both operands in 16-bit range.
    MulDoubleShort,
    /// `MULU`/`MULS` with a wide operand.
    MulDoubleLong,
    /// `DIVU`/`DIVS`.
    Divide,
    /// Extended DSP instruction (`EXTEND` prefix).
    Extend,
    /// Trap, interrupt or exception frame entry.
    EntrySequence,
    /// Software-emulated instruction entry.
    SoftwareEntry,
}

/// Single source-of-truth base cycle-cost table.
pub const CYCLE_COST_TABLE: &[(CycleCostKind, u16)] = &[
    (CycleCostKind::Alu, 1),
    (CycleCostKind::DoubleAlu, 2),
    (CycleCostKind::BranchNotTaken, 1),
    (CycleCostKind::BranchTaken, 2),
    (CycleCostKind::DelayedBranchTaken, 1),
    (CycleCostKind::ControlTransfer, 1),
    (CycleCostKind::MemoryWord, 1),
    (CycleCostKind::MemoryDouble, 2),
    (CycleCostKind::MemoryStack, 3),
    (CycleCostKind::MulShort, 3),
    (CycleCostKind::MulLong, 5),
    (CycleCostKind::MulDoubleShort, 4),
    (CycleCostKind::MulDoubleLong, 6),
    (CycleCostKind::Divide, 36),
    (CycleCostKind::Extend, 1),
    (CycleCostKind::EntrySequence, 2),
    (CycleCostKind::SoftwareEntry, 6),
];

/// Looks up the base cycle cost for a cycle-cost kind.
#[must_use]
pub fn cycle_cost(kind: CycleCostKind) -> Option<u16> {
    CYCLE_COST_TABLE
        .iter()
        .find(|(entry_kind, _)| *entry_kind == kind)
        .map(|&(_, cycles)| cycles)
}

/// Base cost of `kind` scaled by a clock-scale shift.
#[must_use]
pub fn scaled_cycle_cost(kind: CycleCostKind, clock_scale: u32) -> i64 {
    i64::from(cycle_cost(kind).unwrap_or(1)) << clock_scale
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{cycle_cost, scaled_cycle_cost, CycleCostKind, CYCLE_COST_TABLE};

    #[test]
    fn table_contains_unique_kinds() {
        let kinds: HashSet<_> = CYCLE_COST_TABLE.iter().map(|(kind, _)| *kind).collect();
        assert_eq!(kinds.len(), CYCLE_COST_TABLE.len());
    }

    #[test]
    fn table_values_match_canonical_costs() {
        assert_eq!(cycle_cost(CycleCostKind::Alu), Some(1));
        assert_eq!(cycle_cost(CycleCostKind::BranchTaken), Some(2));
        assert_eq!(cycle_cost(CycleCostKind::MemoryStack), Some(3));
        assert_eq!(cycle_cost(CycleCostKind::Divide), Some(36));
        assert_eq!(cycle_cost(CycleCostKind::EntrySequence), Some(2));
        assert_eq!(cycle_cost(CycleCostKind::SoftwareEntry), Some(6));
    }

    #[test]
    fn every_table_entry_resolves_via_lookup() {
        for (kind, expected_cycles) in CYCLE_COST_TABLE {
            assert_eq!(cycle_cost(*kind), Some(*expected_cycles));
        }
    }

    #[test]
    fn scaling_multiplies_by_power_of_two() {
        assert_eq!(scaled_cycle_cost(CycleCostKind::Alu, 0), 1);
        assert_eq!(scaled_cycle_cost(CycleCostKind::EntrySequence, 3), 16);
        assert_eq!(scaled_cycle_cost(CycleCostKind::Divide, 2), 144);
    }
}
