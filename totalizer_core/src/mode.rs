//! Mode-specific transient state.
//!
//! `ModeState` carries only what a strategy needs: the accept window for
//! On-Accept and the up/down accumulators for Load-Drop.

use totalizer_config::TotalMode;
use totalizer_traits::Countby;

use crate::config::ChannelConfig;
use crate::util::round_to_countby;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModeState {
    Disabled,
    AutoLoad,
    AutoNormal,
    AutoPeak,
    OnCommand,
    OnAccept { lower: f32, upper: f32 },
    LoadDrop(LoadDropAcc),
}

impl ModeState {
    /// Fresh state for `mode`; the accept window comes from `cfg`.
    pub fn new(mode: TotalMode, cfg: &ChannelConfig) -> Self {
        match mode {
            TotalMode::Disabled => Self::Disabled,
            TotalMode::AutoLoad => Self::AutoLoad,
            TotalMode::AutoNormal => Self::AutoNormal,
            TotalMode::AutoPeak => Self::AutoPeak,
            TotalMode::OnCommand => Self::OnCommand,
            TotalMode::OnAccept => Self::OnAccept {
                lower: cfg.accept_lower,
                upper: cfg.accept_upper,
            },
            TotalMode::LoadDrop => Self::LoadDrop(LoadDropAcc::default()),
        }
    }

    pub const fn mode(&self) -> TotalMode {
        match self {
            Self::Disabled => TotalMode::Disabled,
            Self::AutoLoad => TotalMode::AutoLoad,
            Self::AutoNormal => TotalMode::AutoNormal,
            Self::AutoPeak => TotalMode::AutoPeak,
            Self::OnCommand => TotalMode::OnCommand,
            Self::OnAccept { .. } => TotalMode::OnAccept,
            Self::LoadDrop(_) => TotalMode::LoadDrop,
        }
    }

    /// Zero any accumulated payload, keeping the mode.
    pub fn reset(&mut self) {
        if let Self::LoadDrop(acc) = self {
            acc.reset();
        }
    }
}

/// How a load-drop sample was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sample {
    Up,
    Down,
}

/// Running up/down averages of a load-drop cycle.
///
/// A sample above `discriminator` (90 % of the up-average) is "up": pending
/// "down" samples are folded back in before it is added. Anything else is
/// "down" and accrues separately, so a brief dip does not drag the average.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoadDropAcc {
    pub up_sum: f64,
    pub up_count: u32,
    pub down_sum: f64,
    pub down_count: u32,
    /// Up-average rounded to the display countby.
    pub up_avg: f32,
    pub discriminator: f32,
}

impl LoadDropAcc {
    pub const DISCRIMINATOR_RATIO: f32 = 0.9;

    pub fn observe(&mut self, weight: f32, countby: Countby) -> Sample {
        if self.up_count > 0 && weight <= self.discriminator {
            self.down_sum += f64::from(weight);
            self.down_count = self.down_count.saturating_add(1);
            return Sample::Down;
        }

        self.up_sum += self.down_sum + f64::from(weight);
        self.up_count = self
            .up_count
            .saturating_add(self.down_count)
            .saturating_add(1);
        self.down_sum = 0.0;
        self.down_count = 0;

        #[allow(clippy::cast_possible_truncation)]
        let mean = (self.up_sum / f64::from(self.up_count)) as f32;
        self.up_avg = round_to_countby(mean, countby);
        self.discriminator = Self::DISCRIMINATOR_RATIO * self.up_avg;
        Sample::Up
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CB: Countby = Countby {
        decimals: 1,
        increment: 0.1,
    };

    #[test]
    fn first_sample_seeds_average() {
        let mut acc = LoadDropAcc::default();
        assert_eq!(acc.observe(50.0, CB), Sample::Up);
        assert_eq!(acc.up_avg, 50.0);
        assert!((acc.discriminator - 45.0).abs() < 1e-4);
    }

    #[test]
    fn dip_is_held_back_until_next_up() {
        let mut acc = LoadDropAcc::default();
        for _ in 0..4 {
            acc.observe(100.0, CB);
        }
        assert_eq!(acc.observe(85.0, CB), Sample::Down);
        assert_eq!(acc.up_avg, 100.0);
        assert_eq!(acc.down_count, 1);

        assert_eq!(acc.observe(102.0, CB), Sample::Up);
        assert_eq!(acc.down_count, 0);
        assert_eq!(acc.up_count, 6);
        // (400 + 85 + 102) / 6 = 97.83
        assert!((acc.up_avg - 97.8).abs() < 1e-3);
    }

    #[test]
    fn mode_state_round_trips_mode() {
        let cfg = ChannelConfig::default();
        for m in TotalMode::ALL {
            assert_eq!(ModeState::new(m, &cfg).mode(), m);
        }
    }

    #[test]
    fn reset_clears_load_drop_payload() {
        let mut st = ModeState::new(TotalMode::LoadDrop, &ChannelConfig::default());
        if let ModeState::LoadDrop(acc) = &mut st {
            acc.observe(10.0, CB);
        }
        st.reset();
        assert_eq!(st, ModeState::LoadDrop(LoadDropAcc::default()));
    }
}
