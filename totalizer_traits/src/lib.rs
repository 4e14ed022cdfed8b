//! Collaborator seams for the totalizer.
//!
//! The totalizing engine never talks to an ADC, a filter or a display directly.
//! Everything it consumes from the weighing side arrives through [`WeightSource`],
//! and all timing goes through [`Clock`].

pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// Error type used at the trait boundary; implementations may return any error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// One per-tick reading of a weighing channel, as produced by the filter stage.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WeightSnapshot {
    /// Current weight, already unit-converted and net/gross-selected.
    pub weight: f32,
    /// Reading is changing faster than the configured noise band.
    pub in_motion: bool,
    /// Load exceeds capacity (or the converter is saturated).
    pub overloaded: bool,
    /// Channel is enabled and currently active.
    pub active: bool,
}

/// Display rounding for a channel: decimal places and rounding increment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Countby {
    pub decimals: u8,
    pub increment: f32,
}

impl Default for Countby {
    fn default() -> Self {
        Self {
            decimals: 0,
            increment: 1.0,
        }
    }
}

pub trait WeightSource {
    /// Read the latest filtered snapshot for `channel`.
    fn snapshot(&mut self, channel: usize) -> Result<WeightSnapshot, BoxError>;

    /// Rounding increment and decimal places used when presenting `channel`.
    fn display_countby(&self, channel: usize) -> Countby;

    /// Sampling interval of the active filter for `channel`, in milliseconds.
    fn filter_interval_ms(&self, channel: usize) -> u32;
}

impl<T: WeightSource + ?Sized> WeightSource for Box<T> {
    fn snapshot(&mut self, channel: usize) -> Result<WeightSnapshot, BoxError> {
        (**self).snapshot(channel)
    }

    fn display_countby(&self, channel: usize) -> Countby {
        (**self).display_countby(channel)
    }

    fn filter_interval_ms(&self, channel: usize) -> u32 {
        (**self).filter_interval_ms(channel)
    }
}
