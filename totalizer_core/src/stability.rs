//! Motion-free settling gate.

use crate::timer::TickTimer;

/// Tracks how long a reading has been free of motion.
///
/// The timer is re-armed on every observation that reports motion, and on the
/// first observation after a reset. A reading is stable once no motion has been
/// seen for `min_stable_ms`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StabilityGate {
    min_stable_ms: u32,
    timer: TickTimer,
}

impl StabilityGate {
    pub const fn new(min_stable_ms: u32) -> Self {
        Self {
            min_stable_ms,
            timer: TickTimer::new(),
        }
    }

    /// Feed one observation; returns whether the reading is stable at `now`.
    pub fn observe(&mut self, in_motion: bool, now: u32) -> bool {
        if in_motion || !self.timer.is_armed() {
            self.timer.arm(now, self.min_stable_ms);
        }
        !in_motion && self.timer.expired(now)
    }

    /// Forget any settling progress; the next observation starts over.
    pub fn reset(&mut self) {
        self.timer.disarm();
    }

    pub const fn min_stable_ms(&self) -> u32 {
        self.min_stable_ms
    }
}
