//! Durable per-channel statistics.

use totalizer_config::TotalMode;

/// Statistics that survive a power cycle, plus the active mode.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChannelTotals {
    pub total_wt: f64,
    pub sum_sq_total_wt: f64,
    pub max_total_wt: f32,
    pub min_total_wt: f32,
    pub num_total: u16,
    pub mode: TotalMode,
}

impl ChannelTotals {
    /// Ceiling of `num_total`; further commits are not counted.
    pub const MAX_COUNT: u16 = u16::MAX;

    pub fn empty(mode: TotalMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub const fn is_saturated(&self) -> bool {
        self.num_total == Self::MAX_COUNT
    }

    /// Fold one committed weight in. Returns `false` (and changes nothing) when
    /// the counter is saturated.
    pub fn add(&mut self, w: f32) -> bool {
        let Some(n) = self.num_total.checked_add(1) else {
            return false;
        };
        if self.num_total == 0 {
            self.max_total_wt = w;
            self.min_total_wt = w;
        } else {
            self.max_total_wt = self.max_total_wt.max(w);
            self.min_total_wt = self.min_total_wt.min(w);
        }
        self.num_total = n;
        let w = f64::from(w);
        self.total_wt += w;
        self.sum_sq_total_wt += w * w;
        true
    }

    /// Reverse a previous [`add`](Self::add) of `w`.
    ///
    /// An extreme equal to `w` is replaced by the mean of what remains, bounded
    /// by the other extreme. This is not the true runner-up when several totals
    /// tie at the extreme.
    pub fn remove(&mut self, w: f32) -> bool {
        if self.num_total == 0 || w == 0.0 {
            return false;
        }
        self.num_total -= 1;
        if self.num_total == 0 {
            self.zero_stats();
            return true;
        }
        let wd = f64::from(w);
        self.total_wt -= wd;
        self.sum_sq_total_wt = (self.sum_sq_total_wt - wd * wd).max(0.0);

        #[allow(clippy::cast_possible_truncation)]
        let mean = (self.total_wt / f64::from(self.num_total)) as f32;
        let (max, min) = (self.max_total_wt, self.min_total_wt);
        if w == max {
            self.max_total_wt = mean.max(min).min(max);
        }
        if w == min {
            self.min_total_wt = mean.min(max).max(min);
        }
        true
    }

    /// Zero the statistics; returns `false` when there was nothing to clear.
    pub fn clear(&mut self) -> bool {
        if self.num_total == 0 {
            return false;
        }
        self.zero_stats();
        true
    }

    fn zero_stats(&mut self) {
        self.total_wt = 0.0;
        self.sum_sq_total_wt = 0.0;
        self.max_total_wt = 0.0;
        self.min_total_wt = 0.0;
        self.num_total = 0;
    }

    pub fn mean(&self) -> Option<f64> {
        (self.num_total > 0).then(|| self.total_wt / f64::from(self.num_total))
    }

    /// Sample standard deviation; needs at least two totals.
    pub fn std_dev(&self) -> Option<f64> {
        if self.num_total < 2 {
            return None;
        }
        let n = f64::from(self.num_total);
        let var = (self.sum_sq_total_wt - self.total_wt * self.total_wt / n) / (n - 1.0);
        Some(var.max(0.0).sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_add_initializes_extremes() {
        let mut t = ChannelTotals::default();
        assert!(t.add(12.0));
        assert_eq!((t.max_total_wt, t.min_total_wt), (12.0, 12.0));
        t.add(20.0);
        t.add(8.0);
        assert_eq!((t.max_total_wt, t.min_total_wt), (20.0, 8.0));
        assert_eq!(t.num_total, 3);
        assert!((t.total_wt - 40.0).abs() < 1e-9);
        assert!((t.sum_sq_total_wt - 608.0).abs() < 1e-9);
    }

    #[test]
    fn saturated_add_changes_nothing() {
        let mut t = ChannelTotals {
            num_total: ChannelTotals::MAX_COUNT,
            total_wt: 1.0,
            sum_sq_total_wt: 2.0,
            max_total_wt: 3.0,
            min_total_wt: 0.5,
            ..ChannelTotals::default()
        };
        let before = t;
        assert!(!t.add(99.0));
        assert_eq!(t, before);
    }

    #[test]
    fn remove_last_single_total_zeroes_everything() {
        let mut t = ChannelTotals::default();
        t.add(0.1);
        assert!(t.remove(0.1));
        assert_eq!(t, ChannelTotals::default());
    }

    #[test]
    fn stats() {
        let mut t = ChannelTotals::default();
        assert_eq!(t.mean(), None);
        t.add(10.0);
        assert_eq!(t.std_dev(), None);
        t.add(20.0);
        assert_eq!(t.mean(), Some(15.0));
        let sd = t.std_dev().unwrap_or_default();
        assert!((sd - 7.071_067_8).abs() < 1e-6);
    }

    #[test]
    fn clear_on_empty_is_noop() {
        let mut t = ChannelTotals::empty(TotalMode::AutoLoad);
        assert!(!t.clear());
        t.add(5.0);
        assert!(t.clear());
        assert_eq!(t, ChannelTotals::empty(TotalMode::AutoLoad));
    }
}
