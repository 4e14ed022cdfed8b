//! Conversions bridging `totalizer_config` types to core types.

use crate::config::ChannelConfig;
use crate::totals::ChannelTotals;
use totalizer_config::PersistedTotals;

impl From<&totalizer_config::ChannelCfg> for ChannelConfig {
    fn from(c: &totalizer_config::ChannelCfg) -> Self {
        Self {
            capacity: c.capacity,
            mode: c.mode,
            rise_pct: c.rise_pct,
            drop_pct: c.drop_pct,
            min_stable_ms: c.min_stable_ms,
            pending_ms: c.pending_ms,
            accept_lower: c.accept_lower,
            accept_upper: c.accept_upper,
        }
    }
}

impl From<&PersistedTotals> for ChannelTotals {
    fn from(p: &PersistedTotals) -> Self {
        Self {
            total_wt: p.total_wt,
            sum_sq_total_wt: p.sum_sq_total_wt,
            max_total_wt: p.max_total_wt,
            min_total_wt: p.min_total_wt,
            num_total: p.num_total,
            mode: p.mode,
        }
    }
}

impl ChannelTotals {
    /// Durable record of these totals for `channel`.
    pub const fn to_persisted(&self, channel: usize) -> PersistedTotals {
        PersistedTotals {
            channel,
            total_wt: self.total_wt,
            sum_sq_total_wt: self.sum_sq_total_wt,
            max_total_wt: self.max_total_wt,
            min_total_wt: self.min_total_wt,
            num_total: self.num_total,
            mode: self.mode,
        }
    }
}
