//! On-chip timer: tick counting, prescale changes and compare-deadline scheduling.
//!
//! The timer never observes time on its own. Every operation takes the
//! current cycle count `now` from the CPU, and the next deadline is exposed
//! through [`Timer::deadline`] for the driver to honor.

use tracing::trace;

/// `TPR` bit deferring a prescale change to the next tick boundary.
pub const TPR_DEFERRED_CHANGE: u32 = 0x8000_0000;

/// `FCR` bit inhibiting the timer interrupt.
pub const FCR_TIMER_INHIBIT: u32 = 0x0080_0000;

/// Tick period in clocks after reset.
pub const RESET_CLOCKS_PER_TICK: u32 = 2;

/// A scheduled timer callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TimerDeadline {
    /// Absolute cycle at which the callback fires.
    pub at_cycle: u64,
    /// Whether the callback applies a deferred prescale change first.
    pub reload_prescale: bool,
}

/// Timer state owned by one CPU instance.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Timer {
    base_cycles: u64,
    base_value: u32,
    clocks_per_tick: u32,
    clock_scale: u32,
    clock_scale_mask: u32,
    interrupt_pending: bool,
    deadline: Option<TimerDeadline>,
}

impl Timer {
    /// Creates a stopped timer for a variant with the given clock-scale mask.
    #[must_use]
    pub const fn new(clock_scale_mask: u32) -> Self {
        Self {
            base_cycles: 0,
            base_value: 0,
            clocks_per_tick: RESET_CLOCKS_PER_TICK,
            clock_scale: 0,
            clock_scale_mask,
            interrupt_pending: false,
            deadline: None,
        }
    }

    /// Restores the reset tick period.
    pub const fn reset_clocks_per_tick(&mut self) {
        self.clocks_per_tick = RESET_CLOCKS_PER_TICK;
    }

    /// Current clock-scale shift applied to cycle costs and tick timing.
    #[must_use]
    pub const fn clock_scale(&self) -> u32 {
        self.clock_scale
    }

    /// Current tick period in scaled clocks.
    #[must_use]
    pub const fn clocks_per_tick(&self) -> u32 {
        self.clocks_per_tick
    }

    /// Cycle count at which the tick base was last reseeded.
    #[must_use]
    pub const fn base_cycles(&self) -> u64 {
        self.base_cycles
    }

    /// Tick value at [`Self::base_cycles`].
    #[must_use]
    pub const fn base_value(&self) -> u32 {
        self.base_value
    }

    /// Whether a compare match is waiting for recognition.
    #[must_use]
    pub const fn interrupt_pending(&self) -> bool {
        self.interrupt_pending
    }

    /// Sets or clears the pending compare match.
    pub const fn set_interrupt_pending(&mut self, pending: bool) {
        self.interrupt_pending = pending;
    }

    /// Next scheduled callback, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<TimerDeadline> {
        self.deadline
    }

    /// Removes and returns the scheduled callback.
    pub const fn take_deadline(&mut self) -> Option<TimerDeadline> {
        let deadline = self.deadline;
        self.deadline = None;
        deadline
    }

    /// Live tick count at cycle `now`.
    #[must_use]
    pub fn compute_tr(&self, now: u64) -> u32 {
        let elapsed_clocks = now.saturating_sub(self.base_cycles) >> self.clock_scale;
        let ticks = elapsed_clocks / u64::from(self.clocks_per_tick);
        self.base_value.wrapping_add(ticks as u32)
    }

    /// Reseeds the tick base, as a `TR` write does.
    pub const fn rebase(&mut self, now: u64, value: u32) {
        self.base_value = value;
        self.base_cycles = now;
    }

    /// Applies the prescale encoded in `tpr` at cycle `now`.
    ///
    /// The tick value is sampled under the old prescale before the base is
    /// moved, so no tick is lost or repeated. Returns `tpr` with the
    /// deferred-change bit cleared.
    pub fn update_prescale(&mut self, now: u64, tpr: u32) -> u32 {
        let previous = self.compute_tr(now);
        let tpr = tpr & !TPR_DEFERRED_CHANGE;
        self.clock_scale = (tpr >> 26) & self.clock_scale_mask;
        self.clocks_per_tick = ((tpr >> 16) & 0xff) + 2;
        self.base_value = previous;
        self.base_cycles = now;
        trace!(
            clock_scale = self.clock_scale,
            clocks_per_tick = self.clocks_per_tick,
            tr = previous,
            "timer prescale updated"
        );
        tpr
    }

    /// Recomputes the compare deadline from the current register values.
    pub fn adjust_interrupt(&mut self, now: u64, tpr: u32, tcr: u32, fcr: u32) {
        let scale = self.clock_scale;
        let cycles_since_base = now.saturating_sub(self.base_cycles);
        let clocks_since_base = cycles_since_base >> scale;
        let mut cycles_until_next_clock = cycles_since_base - (clocks_since_base << scale);
        if cycles_until_next_clock == 0 {
            cycles_until_next_clock = 1 << scale;
        }
        let clocks_per_tick = u64::from(self.clocks_per_tick);

        if tpr & TPR_DEFERRED_CHANGE != 0 {
            let clocks_until_tick = clocks_per_tick - (clocks_since_base % clocks_per_tick);
            let cycles_until_tick = (clocks_until_tick << scale) + cycles_until_next_clock;
            self.deadline = Some(TimerDeadline {
                at_cycle: now + cycles_until_tick + 1,
                reload_prescale: true,
            });
        } else if fcr & FCR_TIMER_INHIBIT == 0 {
            let current = self
                .base_value
                .wrapping_add((clocks_since_base / clocks_per_tick) as u32);
            let delta = tcr.wrapping_sub(current);
            if delta > 0x8000_0000 {
                if !self.interrupt_pending {
                    self.deadline = Some(TimerDeadline {
                        at_cycle: now,
                        reload_prescale: false,
                    });
                }
            } else {
                let clocks_until_int = u64::from(delta) * clocks_per_tick;
                let cycles_until_int = (clocks_until_int << scale) + cycles_until_next_clock;
                self.deadline = Some(TimerDeadline {
                    at_cycle: now + cycles_until_int,
                    reload_prescale: false,
                });
            }
        } else {
            self.deadline = None;
        }

        trace!(deadline = ?self.deadline, "timer deadline adjusted");
    }
}

#[cfg(test)]
mod tests {
    use super::{Timer, TimerDeadline, FCR_TIMER_INHIBIT, TPR_DEFERRED_CHANGE};

    fn prescaled(scale: u32, period_field: u32) -> Timer {
        let mut timer = Timer::new(7);
        timer.update_prescale(0, (scale << 26) | (period_field << 16));
        timer
    }

    #[test]
    fn ticks_advance_every_scaled_period() {
        let timer = prescaled(2, 0);
        assert_eq!(timer.clocks_per_tick(), 2);
        assert_eq!(timer.compute_tr(7), 0);
        assert_eq!(timer.compute_tr(8), 1);
        assert_eq!(timer.compute_tr(100), 12);
    }

    #[test]
    fn prescale_change_keeps_the_current_tick() {
        let mut timer = prescaled(0, 0);
        let before = timer.compute_tr(1000);
        let tpr = timer.update_prescale(1000, TPR_DEFERRED_CHANGE | (3 << 26) | (6 << 16));
        assert_eq!(tpr & TPR_DEFERRED_CHANGE, 0);
        assert_eq!(timer.compute_tr(1000), before);
        assert_eq!(timer.clock_scale(), 3);
        assert_eq!(timer.clocks_per_tick(), 8);
    }

    #[test]
    fn clock_scale_is_masked_by_variant() {
        let mut timer = Timer::new(0);
        timer.update_prescale(0, 7 << 26);
        assert_eq!(timer.clock_scale(), 0);
    }

    #[test]
    fn future_compare_schedules_after_delta_ticks() {
        let mut timer = prescaled(0, 0);
        timer.adjust_interrupt(0, 0, 10, 0);
        assert_eq!(
            timer.deadline(),
            Some(TimerDeadline {
                at_cycle: 21,
                reload_prescale: false
            })
        );
    }

    #[test]
    fn past_compare_fires_immediately_unless_pending() {
        let mut timer = prescaled(0, 0);
        timer.rebase(0, 100);
        timer.adjust_interrupt(0, 0, 10, 0);
        assert_eq!(timer.deadline().map(|d| d.at_cycle), Some(0));

        timer.take_deadline();
        timer.set_interrupt_pending(true);
        timer.adjust_interrupt(0, 0, 10, 0);
        assert_eq!(timer.deadline(), None);
    }

    #[test]
    fn inhibit_disables_scheduling() {
        let mut timer = prescaled(0, 0);
        timer.adjust_interrupt(0, 0, 10, 0);
        timer.adjust_interrupt(0, 0, 10, FCR_TIMER_INHIBIT);
        assert_eq!(timer.deadline(), None);
    }

    #[test]
    fn deferred_prescale_schedules_at_next_tick_boundary() {
        let mut timer = prescaled(0, 0);
        timer.adjust_interrupt(3, TPR_DEFERRED_CHANGE, 0, FCR_TIMER_INHIBIT);
        let deadline = timer.deadline();
        assert_eq!(
            deadline,
            Some(TimerDeadline {
                at_cycle: 3 + 1 + 1 + 1,
                reload_prescale: true
            })
        );
    }
}
