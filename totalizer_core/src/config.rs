//! Runtime configuration of one totalizing channel.
//!
//! This is what the engine is built from. It is separate from the
//! TOML-deserialized `totalizer_config::ChannelCfg`; see `conversions`.

use crate::error::BuildError;
use totalizer_config::{DEFAULT_THRESHOLD_PCT, TotalMode};

/// Per-channel totalizing parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelConfig {
    /// Channel capacity in display units.
    pub capacity: f32,
    pub mode: TotalMode,
    /// Rise threshold in % of capacity. 0 selects the default of 0.5 %.
    pub rise_pct: f32,
    /// Drop threshold in % of capacity. 0 selects the default of 0.5 %.
    pub drop_pct: f32,
    /// A reading must be free of motion this long before it qualifies.
    pub min_stable_ms: u32,
    /// Configured debounce window for a manual command.
    pub pending_ms: u32,
    /// On-accept window, inclusive on both ends.
    pub accept_lower: f32,
    pub accept_upper: f32,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            capacity: 100.0,
            mode: TotalMode::Disabled,
            rise_pct: 0.0,
            drop_pct: 0.0,
            min_stable_ms: 500,
            pending_ms: 1000,
            accept_lower: 0.0,
            accept_upper: 0.0,
        }
    }
}

impl ChannelConfig {
    pub fn validate(&self) -> Result<(), BuildError> {
        if !self.capacity.is_finite() || self.capacity <= 0.0 {
            return Err(BuildError::InvalidConfig("capacity must be > 0"));
        }
        for pct in [self.rise_pct, self.drop_pct] {
            if !pct.is_finite() || !(0.0..=100.0).contains(&pct) {
                return Err(BuildError::InvalidConfig(
                    "threshold percentage must be in [0, 100]",
                ));
            }
        }
        let t = self.thresholds();
        if t.drop > t.rise {
            return Err(BuildError::InvalidConfig(
                "drop threshold must not exceed rise threshold",
            ));
        }
        if self.mode == TotalMode::OnAccept {
            self.validate_accept_window()?;
        }
        Ok(())
    }

    /// The on-accept window must sit above the drop threshold, otherwise a
    /// committed load re-arms itself and is counted again.
    pub fn validate_accept_window(&self) -> Result<(), BuildError> {
        if !self.accept_lower.is_finite()
            || !self.accept_upper.is_finite()
            || self.accept_lower <= self.thresholds().drop
            || self.accept_upper < self.accept_lower
        {
            return Err(BuildError::InvalidConfig(
                "on-accept window must satisfy drop threshold < lower <= upper",
            ));
        }
        Ok(())
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds::from_pct(self.capacity, self.rise_pct, self.drop_pct)
    }
}

/// Absolute rise/drop thresholds in weight units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Weight at or above which a load is considered present.
    pub rise: f32,
    /// Weight at or below which a load is considered removed.
    pub drop: f32,
}

impl Thresholds {
    pub fn from_pct(capacity: f32, rise_pct: f32, drop_pct: f32) -> Self {
        Self {
            rise: threshold_from_pct(capacity, rise_pct),
            drop: threshold_from_pct(capacity, drop_pct),
        }
    }
}

/// `capacity * pct / 100`, with 0 % healed to [`DEFAULT_THRESHOLD_PCT`].
#[inline]
pub fn threshold_from_pct(capacity: f32, pct: f32) -> f32 {
    let pct = if pct == 0.0 { DEFAULT_THRESHOLD_PCT } else { pct };
    capacity * (pct / 100.0)
}
