//! The multi-channel totalizer (`TotalizerCore`).
//!
//! Owns the weight source, the totals store and one [`ChannelTotalizer`] per
//! channel. Reads a snapshot per call, hands it to the channel together with
//! the current tick, and persists whenever the channel's totals changed.
//! Sensor and store failures are logged and swallowed.

use std::sync::Arc;
use std::time::Instant;

use totalizer_config::TotalMode;
use totalizer_traits::{Clock, WeightSnapshot, WeightSource};
use tracing::{info, warn};

use crate::channel::ChannelTotalizer;
use crate::hw_error::{map_sensor_error, map_store_error};
use crate::status::{CommandOutcome, CommitOutcome, TotalStatus};
use crate::store::TotalsStore;
use crate::totals::ChannelTotals;

/// Unified core for both dynamic (boxed) and generic (static dispatch) variants.
pub struct TotalizerCore<W: WeightSource, P: TotalsStore> {
    pub(crate) source: W,
    pub(crate) store: P,
    pub(crate) channels: Vec<ChannelTotalizer>,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) epoch: Instant,
}

impl<W: WeightSource, P: TotalsStore> core::fmt::Debug for TotalizerCore<W, P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TotalizerCore")
            .field("channels", &self.channels)
            .finish_non_exhaustive()
    }
}

impl<W: WeightSource, P: TotalsStore> TotalizerCore<W, P> {
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn channel(&self, channel: usize) -> Option<&ChannelTotalizer> {
        self.channels.get(channel)
    }

    pub fn channels(&self) -> &[ChannelTotalizer] {
        &self.channels
    }

    pub const fn source(&self) -> &W {
        &self.source
    }

    pub const fn source_mut(&mut self) -> &mut W {
        &mut self.source
    }

    pub const fn store(&self) -> &P {
        &self.store
    }

    /// Free-running millisecond tick; wraps at `u32::MAX`.
    pub fn now_ms(&self) -> u32 {
        #[allow(clippy::cast_possible_truncation)]
        let tick = self.clock.ms_since(self.epoch) as u32;
        tick
    }

    fn read(&mut self, channel: usize) -> Option<WeightSnapshot> {
        match self.source.snapshot(channel) {
            Ok(s) => Some(s),
            Err(e) => {
                let err = map_sensor_error(&*e);
                warn!(channel, error = %err, "sensor read failed; channel frozen");
                None
            }
        }
    }

    fn persist(&mut self, channel: usize) {
        let Some(totals) = self.channels.get(channel).map(|c| *c.totals()) else {
            return;
        };
        if let Err(e) = self.store.persist_totals(channel, &totals) {
            let err = map_store_error(&*e);
            warn!(channel, error = %err, "persist totals failed");
        }
    }

    fn persist_if(&mut self, channel: usize, commit: Option<CommitOutcome>) {
        if commit.is_some_and(|c| c.persists()) {
            self.persist(channel);
        }
    }

    // ── Control-tick entry points ────────────────────────────────────────────

    /// Run one evaluation tick on `channel`. `None` for an unknown channel.
    pub fn evaluate(&mut self, channel: usize) -> Option<TotalStatus> {
        if channel >= self.channels.len() {
            return None;
        }
        let now = self.now_ms();
        let Some(snap) = self.read(channel) else {
            return Some(TotalStatus::Frozen);
        };
        let countby = self.source.display_countby(channel);
        let status = self.channels.get_mut(channel)?.evaluate(&snap, countby, now);
        self.persist_if(channel, status.commit());
        Some(status)
    }

    /// Evaluate every channel in index order.
    pub fn evaluate_all(&mut self) -> Vec<TotalStatus> {
        (0..self.channels.len())
            .filter_map(|ch| self.evaluate(ch))
            .collect()
    }

    /// Handle a "total" key press or host totalize command on `channel`.
    pub fn handle_command(&mut self, channel: usize) -> Option<CommandOutcome> {
        if channel >= self.channels.len() {
            return None;
        }
        let now = self.now_ms();
        let Some(snap) = self.read(channel) else {
            return Some(CommandOutcome::Ignored);
        };
        let interval = self.source.filter_interval_ms(channel);
        let outcome = self
            .channels
            .get_mut(channel)?
            .handle_command(&snap, interval, now);
        self.persist_if(channel, outcome.commit());
        Some(outcome)
    }

    // ── Accumulator ──────────────────────────────────────────────────────────

    /// Commit the held candidate on `channel`, if any.
    pub fn commit(&mut self, channel: usize) -> Option<CommitOutcome> {
        let outcome = self.channels.get_mut(channel)?.commit();
        self.persist_if(channel, outcome);
        outcome
    }

    pub fn clear_total(&mut self, channel: usize) -> bool {
        let cleared = self
            .channels
            .get_mut(channel)
            .is_some_and(ChannelTotalizer::clear_total);
        if cleared {
            self.persist(channel);
        }
        cleared
    }

    pub fn remove_last_total(&mut self, channel: usize) -> bool {
        let removed = self
            .channels
            .get_mut(channel)
            .is_some_and(ChannelTotalizer::remove_last_total);
        if removed {
            self.persist(channel);
        }
        removed
    }

    pub fn skip_next_total(&mut self, channel: usize) {
        if let Some(ch) = self.channels.get_mut(channel) {
            ch.skip_next_total();
        }
    }

    /// Switch `channel` to `mode`; transient state is dropped and the new mode persisted.
    /// `false` for an out-of-range channel or a refused mode.
    pub fn set_total_mode(&mut self, channel: usize, mode: TotalMode) -> bool {
        let Some(ch) = self.channels.get_mut(channel) else {
            return false;
        };
        if !ch.set_mode(mode) {
            return false;
        }
        self.persist(channel);
        true
    }

    /// Clear every channel's totals and transient state.
    pub fn master_reset(&mut self) {
        for ch in &mut self.channels {
            ch.master_reset();
        }
        for ch in 0..self.channels.len() {
            self.persist(ch);
        }
        info!(channels = self.channels.len(), "master reset");
    }

    // ── Read accessors ───────────────────────────────────────────────────────

    pub fn totals(&self, channel: usize) -> Option<ChannelTotals> {
        self.channels.get(channel).map(|c| *c.totals())
    }

    pub fn total_wt(&self, channel: usize) -> Option<f64> {
        self.totals(channel).map(|t| t.total_wt)
    }

    pub fn num_total(&self, channel: usize) -> Option<u16> {
        self.totals(channel).map(|t| t.num_total)
    }

    pub fn sum_sq_total_wt(&self, channel: usize) -> Option<f64> {
        self.totals(channel).map(|t| t.sum_sq_total_wt)
    }

    pub fn max_total_wt(&self, channel: usize) -> Option<f32> {
        self.totals(channel).map(|t| t.max_total_wt)
    }

    pub fn min_total_wt(&self, channel: usize) -> Option<f32> {
        self.totals(channel).map(|t| t.min_total_wt)
    }

    pub fn total_mode(&self, channel: usize) -> Option<TotalMode> {
        self.channels.get(channel).map(ChannelTotalizer::mode)
    }

    pub fn mean_total_wt(&self, channel: usize) -> Option<f64> {
        self.totals(channel).and_then(|t| t.mean())
    }

    pub fn std_dev_total_wt(&self, channel: usize) -> Option<f64> {
        self.totals(channel).and_then(|t| t.std_dev())
    }

    pub fn qualified_wt(&self, channel: usize) -> Option<f32> {
        self.channels.get(channel).map(ChannelTotalizer::qualified_wt)
    }

    pub fn is_ok_to_total(&self, channel: usize) -> Option<bool> {
        self.channels.get(channel).map(ChannelTotalizer::is_ok_to_total)
    }

    /// Read and clear the "new total" UI event.
    pub fn take_new_total_event(&mut self, channel: usize) -> bool {
        self.channels
            .get_mut(channel)
            .is_some_and(ChannelTotalizer::take_new_total_event)
    }

    /// Read and clear the "already totalized" UI event.
    pub fn take_not_allow_event(&mut self, channel: usize) -> bool {
        self.channels
            .get_mut(channel)
            .is_some_and(ChannelTotalizer::take_not_allow_event)
    }
}
