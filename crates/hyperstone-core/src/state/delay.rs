/// Pending delayed-branch target recorded by a taken `DBxx`/`DBR`.
///
/// The instruction following the delayed branch executes first; the first
/// operand-decode checkpoint of that instruction then redirects `PC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DelaySlot {
    target: Option<u32>,
}

impl DelaySlot {
    /// Creates an empty slot.
    #[must_use]
    pub const fn new() -> Self {
        Self { target: None }
    }

    /// Records a pending redirect to `target`.
    pub const fn arm(&mut self, target: u32) {
        self.target = Some(target);
    }

    /// Returns `true` while a redirect is pending.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        self.target.is_some()
    }

    /// Pending target, if any.
    #[must_use]
    pub const fn target(self) -> Option<u32> {
        self.target
    }

    /// Consumes the pending redirect.
    pub const fn take(&mut self) -> Option<u32> {
        self.target.take()
    }
}
