//! Wrap-safe millisecond timers on a free-running `u32` tick.
//!
//! The tick wraps every ~49.7 days. Elapsed time is `now.wrapping_sub(armed_at)`,
//! which stays correct across a wrap as long as a single interval is shorter
//! than the wrap period. Expiry is evaluated on query only.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickTimer {
    armed_at: Option<u32>,
    duration_ms: u32,
}

impl TickTimer {
    pub const fn new() -> Self {
        Self {
            armed_at: None,
            duration_ms: 0,
        }
    }

    /// (Re)start the timer at `now`.
    pub fn arm(&mut self, now: u32, duration_ms: u32) {
        self.armed_at = Some(now);
        self.duration_ms = duration_ms;
    }

    pub fn disarm(&mut self) {
        self.armed_at = None;
    }

    pub const fn is_armed(&self) -> bool {
        self.armed_at.is_some()
    }

    pub const fn duration_ms(&self) -> u32 {
        self.duration_ms
    }

    /// Milliseconds since the timer was armed, `None` when idle.
    pub fn elapsed_ms(&self, now: u32) -> Option<u32> {
        self.armed_at.map(|t| now.wrapping_sub(t))
    }

    /// Armed and at least `duration_ms` have passed.
    pub fn expired(&self, now: u32) -> bool {
        self.elapsed_ms(now).is_some_and(|e| e >= self.duration_ms)
    }
}
