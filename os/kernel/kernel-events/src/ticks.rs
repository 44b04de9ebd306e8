use crate::bridge::InterruptContext;
use core::sync::atomic::{AtomicU64, Ordering};

/// Timer interrupts since boot.
///
/// Written only by the timer handler (incrementing needs an
/// [`InterruptContext`]), read from anywhere.
pub struct TickCounter(AtomicU64);

impl Default for TickCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl TickCounter {
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    #[inline]
    pub fn read(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn increment(&self, _ctx: &InterruptContext) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
    }
}
