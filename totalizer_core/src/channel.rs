//! Per-channel totalizing state machine.
//!
//! A `ChannelTotalizer` owns everything one weighing channel needs: its
//! thresholds, the mode payload, status flags, timers and the durable
//! [`ChannelTotals`]. It never reads a sensor or touches storage itself; the
//! caller passes in a [`WeightSnapshot`] and a millisecond tick, and persists
//! whenever an operation reports that the totals changed.
//!
//! ## Cycle
//!
//! Every mode alternates between two phases. While armed, a strategy may
//! qualify a candidate weight (`qualified_wt != 0`, `ok_to_total`). A commit
//! folds the candidate into the totals and sets `not_allow`; the channel then
//! ignores the load until the weight falls to the drop threshold, which re-arms
//! it. A load therefore produces at most one total.

use totalizer_config::TotalMode;
use totalizer_traits::{Countby, WeightSnapshot};
use tracing::{debug, info, trace, warn};

use crate::config::{ChannelConfig, Thresholds};
use crate::mode::ModeState;
use crate::stability::StabilityGate;
use crate::status::{CommandOutcome, CommitOutcome, TotalStatus};
use crate::timer::TickTimer;
use crate::totals::ChannelTotals;
use crate::util::pending_window_ms;

/// Status bits of a channel.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusFlags {
    /// Commit suppressed until the load drops.
    pub not_allow: bool,
    /// Load-drop cycle armed by a command.
    pub start_load_drop: bool,
    /// Auto modes paused by a command.
    pub disabled_auto: bool,
    /// A candidate is held and may be committed.
    pub ok_to_total: bool,
    /// A manual command is waiting for a candidate.
    pub pending_total: bool,
    /// Veto the next commit.
    pub skip_next: bool,
    /// Single-shot: a total was just counted.
    pub new_total_event: bool,
    /// Single-shot: a command arrived while the load was already totalized.
    pub not_allow_event: bool,
}

#[derive(Debug, Clone)]
pub struct ChannelTotalizer {
    index: usize,
    cfg: ChannelConfig,
    thresholds: Thresholds,
    mode: ModeState,
    flags: StatusFlags,
    qualified_wt: f32,
    last_committed_wt: f32,
    gate: StabilityGate,
    pending: TickTimer,
    totals: ChannelTotals,
    saturation_warned: bool,
}

impl ChannelTotalizer {
    /// Fresh channel with zeroed totals in the configured mode.
    pub fn new(index: usize, cfg: ChannelConfig) -> Self {
        Self {
            index,
            thresholds: cfg.thresholds(),
            mode: ModeState::new(cfg.mode, &cfg),
            flags: StatusFlags::default(),
            qualified_wt: 0.0,
            last_committed_wt: 0.0,
            gate: StabilityGate::new(cfg.min_stable_ms),
            pending: TickTimer::new(),
            totals: ChannelTotals::empty(cfg.mode),
            saturation_warned: false,
            cfg,
        }
    }

    /// Adopt previously persisted totals, including their mode.
    ///
    /// A persisted on-accept mode whose window is not usable with this
    /// channel's config falls back to the configured mode.
    pub fn restore(&mut self, mut totals: ChannelTotals) {
        if totals.mode == TotalMode::OnAccept && self.cfg.validate_accept_window().is_err() {
            warn!(
                channel = self.index,
                configured = %self.cfg.mode,
                "persisted on-accept mode has no valid window; using configured mode"
            );
            totals.mode = self.cfg.mode;
        }
        self.mode = ModeState::new(totals.mode, &self.cfg);
        self.totals = totals;
        self.last_committed_wt = 0.0;
        self.reset_transient();
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub const fn index(&self) -> usize {
        self.index
    }

    pub const fn config(&self) -> &ChannelConfig {
        &self.cfg
    }

    pub const fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub const fn mode(&self) -> TotalMode {
        self.mode.mode()
    }

    pub const fn mode_state(&self) -> &ModeState {
        &self.mode
    }

    pub const fn flags(&self) -> StatusFlags {
        self.flags
    }

    pub const fn qualified_wt(&self) -> f32 {
        self.qualified_wt
    }

    pub const fn last_committed_wt(&self) -> f32 {
        self.last_committed_wt
    }

    pub const fn totals(&self) -> &ChannelTotals {
        &self.totals
    }

    pub const fn is_ok_to_total(&self) -> bool {
        self.flags.ok_to_total
    }

    /// Read and clear the "new total" UI event.
    pub fn take_new_total_event(&mut self) -> bool {
        std::mem::take(&mut self.flags.new_total_event)
    }

    /// Read and clear the "already totalized" UI event.
    pub fn take_not_allow_event(&mut self) -> bool {
        std::mem::take(&mut self.flags.not_allow_event)
    }

    // ── Evaluation ───────────────────────────────────────────────────────────

    /// Run the mode strategy for one control tick.
    pub fn evaluate(&mut self, snap: &WeightSnapshot, countby: Countby, now: u32) -> TotalStatus {
        if Self::is_frozen(snap) {
            trace!(
                channel = self.index,
                overloaded = snap.overloaded,
                active = snap.active,
                weight = snap.weight,
                "frozen"
            );
            return TotalStatus::Frozen;
        }

        let state = self.mode;
        if matches!(state, ModeState::Disabled) {
            self.flags.ok_to_total = false;
            return TotalStatus::Disabled;
        }

        self.expire_pending(now);
        self.rearm_on_drop(snap.weight);

        let status = match state {
            _ if state.mode().is_auto() && self.flags.disabled_auto => {
                self.gate.reset();
                TotalStatus::Paused
            }
            ModeState::Disabled => TotalStatus::Disabled,
            ModeState::AutoLoad => self.auto_load(snap, now),
            ModeState::AutoNormal => self.auto_track(snap, now, false),
            ModeState::AutoPeak => self.auto_track(snap, now, true),
            ModeState::OnCommand => self.on_command(snap, now),
            ModeState::OnAccept { lower, upper } => self.on_accept(snap, now, lower, upper),
            ModeState::LoadDrop(_) => self.load_drop(snap, countby),
        };
        trace!(channel = self.index, weight = snap.weight, ?status, "evaluated");
        status
    }

    /// Overloaded, inactive or non-finite readings leave all state untouched.
    fn is_frozen(snap: &WeightSnapshot) -> bool {
        snap.overloaded || !snap.active || !snap.weight.is_finite()
    }

    fn expire_pending(&mut self, now: u32) {
        if self.flags.pending_total && self.pending.expired(now) {
            self.flags.pending_total = false;
            self.pending.disarm();
            debug!(channel = self.index, "pending window expired");
        }
    }

    fn rearm_on_drop(&mut self, weight: f32) {
        if self.flags.not_allow && weight <= self.thresholds.drop {
            self.flags.not_allow = false;
            debug!(channel = self.index, weight, "load dropped; re-armed");
        }
    }

    fn auto_load(&mut self, snap: &WeightSnapshot, now: u32) -> TotalStatus {
        if self.flags.not_allow {
            self.gate.reset();
            return TotalStatus::Suppressed;
        }
        if snap.weight < self.thresholds.rise {
            self.gate.reset();
            return TotalStatus::Idle;
        }
        if self.gate.observe(snap.in_motion, now) {
            self.qualify(snap.weight);
            return self.commit_status();
        }
        TotalStatus::Idle
    }

    /// Auto-Normal keeps the latest stable weight, Auto-Peak the largest.
    /// Either commits once the load is removed.
    fn auto_track(&mut self, snap: &WeightSnapshot, now: u32, peak: bool) -> TotalStatus {
        if self.flags.not_allow {
            self.gate.reset();
            return TotalStatus::Suppressed;
        }
        self.track_candidate(snap, now, peak);
        if snap.weight <= self.thresholds.drop && self.qualified_wt != 0.0 {
            return self.commit_status();
        }
        self.candidate_status()
    }

    fn on_command(&mut self, snap: &WeightSnapshot, now: u32) -> TotalStatus {
        if self.flags.not_allow {
            self.gate.reset();
            return TotalStatus::Suppressed;
        }
        self.track_candidate(snap, now, false);
        if snap.weight <= self.thresholds.drop && self.qualified_wt != 0.0 {
            debug!(
                channel = self.index,
                weight = self.qualified_wt,
                "load removed; candidate discarded"
            );
            self.discard_candidate();
        }
        if self.flags.pending_total && self.flags.ok_to_total {
            return self.commit_status();
        }
        self.candidate_status()
    }

    fn on_accept(&mut self, snap: &WeightSnapshot, now: u32, lower: f32, upper: f32) -> TotalStatus {
        if self.flags.not_allow {
            self.gate.reset();
            return TotalStatus::Suppressed;
        }
        if snap.weight <= self.thresholds.drop || !(lower..=upper).contains(&snap.weight) {
            self.gate.reset();
            self.discard_candidate();
            return TotalStatus::Idle;
        }
        if self.gate.observe(snap.in_motion, now) {
            self.qualify(snap.weight);
            return self.commit_status();
        }
        TotalStatus::Idle
    }

    fn load_drop(&mut self, snap: &WeightSnapshot, countby: Countby) -> TotalStatus {
        if self.flags.not_allow {
            return TotalStatus::Suppressed;
        }
        if !self.flags.start_load_drop {
            return TotalStatus::Idle;
        }
        let w = snap.weight;
        if w >= self.thresholds.rise {
            let ModeState::LoadDrop(acc) = &mut self.mode else {
                return TotalStatus::Idle;
            };
            let sample = acc.observe(w, countby);
            let avg = acc.up_avg;
            trace!(channel = self.index, weight = w, ?sample, avg, "load-drop sample");
            if avg != 0.0 {
                self.qualify(avg);
            }
        } else if self.flags.ok_to_total && w <= self.thresholds.drop {
            return self.commit_status();
        }
        self.candidate_status()
    }

    fn track_candidate(&mut self, snap: &WeightSnapshot, now: u32, peak: bool) {
        let w = snap.weight;
        if w < self.thresholds.rise {
            self.gate.reset();
            return;
        }
        if self.gate.observe(snap.in_motion, now) && (!peak || w > self.qualified_wt) {
            self.qualify(w);
        }
    }

    fn qualify(&mut self, w: f32) {
        if self.qualified_wt != w {
            debug!(channel = self.index, weight = w, "qualified");
        }
        self.qualified_wt = w;
        self.flags.ok_to_total = w != 0.0;
    }

    fn discard_candidate(&mut self) {
        self.qualified_wt = 0.0;
        self.flags.ok_to_total = false;
    }

    fn candidate_status(&self) -> TotalStatus {
        if self.flags.not_allow {
            TotalStatus::Suppressed
        } else if self.qualified_wt != 0.0 {
            TotalStatus::Qualified(self.qualified_wt)
        } else {
            TotalStatus::Idle
        }
    }

    fn commit_status(&mut self) -> TotalStatus {
        self.commit()
            .map_or_else(|| self.candidate_status(), TotalStatus::Committed)
    }

    // ── Accumulator ──────────────────────────────────────────────────────────

    /// Commit the held candidate. `None` when there is nothing to commit.
    ///
    /// A pending skip consumes the candidate without counting it. A saturated
    /// counter leaves the statistics untouched. In every case the cycle closes:
    /// `not_allow` is set and pending/ok flags are cleared.
    pub fn commit(&mut self) -> Option<CommitOutcome> {
        let w = self.qualified_wt;
        if w == 0.0 {
            return None;
        }

        let outcome = if self.flags.skip_next {
            self.flags.skip_next = false;
            info!(channel = self.index, weight = w, "totalization skipped");
            CommitOutcome::Vetoed(w)
        } else if self.totals.add(w) {
            self.last_committed_wt = w;
            self.flags.new_total_event = true;
            self.saturation_warned = false;
            info!(
                channel = self.index,
                weight = w,
                count = self.totals.num_total,
                total = self.totals.total_wt,
                "total committed"
            );
            CommitOutcome::Counted(w)
        } else {
            if !self.saturation_warned {
                warn!(
                    channel = self.index,
                    max = ChannelTotals::MAX_COUNT,
                    "total count saturated; commits are not counted until cleared"
                );
                self.saturation_warned = true;
            }
            CommitOutcome::Saturated(w)
        };

        self.qualified_wt = 0.0;
        self.flags.not_allow = true;
        self.flags.ok_to_total = false;
        self.flags.pending_total = false;
        self.flags.start_load_drop = false;
        self.pending.disarm();
        self.gate.reset();
        Some(outcome)
    }

    /// Zero the totals, the candidate and load-drop accumulators.
    /// Returns `false` (nothing changed) when no total had been counted.
    pub fn clear_total(&mut self) -> bool {
        if !self.totals.clear() {
            return false;
        }
        self.discard_candidate();
        self.mode.reset();
        self.last_committed_wt = 0.0;
        self.saturation_warned = false;
        info!(channel = self.index, "totals cleared");
        true
    }

    /// Reverse the most recent commit. Only one commit can be reversed.
    pub fn remove_last_total(&mut self) -> bool {
        let w = self.last_committed_wt;
        if self.totals.num_total == 0 || w == 0.0 {
            return false;
        }
        self.totals.remove(w);
        self.last_committed_wt = 0.0;
        info!(
            channel = self.index,
            weight = w,
            count = self.totals.num_total,
            "last total removed"
        );
        true
    }

    /// Veto the next commit on this channel.
    pub fn skip_next_total(&mut self) {
        self.flags.skip_next = true;
        debug!(channel = self.index, "next total will be skipped");
    }

    /// Switch the totalize mode. Refused (returns `false`) for on-accept when
    /// the configured window is not usable.
    pub fn set_mode(&mut self, mode: TotalMode) -> bool {
        if mode == TotalMode::OnAccept && self.cfg.validate_accept_window().is_err() {
            warn!(
                channel = self.index,
                lower = self.cfg.accept_lower,
                upper = self.cfg.accept_upper,
                drop = self.thresholds.drop,
                "on-accept refused; accept window invalid"
            );
            return false;
        }
        self.mode = ModeState::new(mode, &self.cfg);
        self.totals.mode = mode;
        self.reset_transient();
        info!(channel = self.index, %mode, "total mode changed");
        true
    }

    /// Clear totals unconditionally and drop every transient flag and timer.
    pub fn master_reset(&mut self) {
        self.totals.clear();
        self.last_committed_wt = 0.0;
        self.saturation_warned = false;
        self.reset_transient();
    }

    fn reset_transient(&mut self) {
        self.flags = StatusFlags::default();
        self.qualified_wt = 0.0;
        self.gate.reset();
        self.pending.disarm();
        self.mode.reset();
    }

    // ── Commands ─────────────────────────────────────────────────────────────

    /// React to a "total" key or host command.
    pub fn handle_command(
        &mut self,
        snap: &WeightSnapshot,
        filter_interval_ms: u32,
        now: u32,
    ) -> CommandOutcome {
        if Self::is_frozen(snap) {
            debug!(channel = self.index, "command ignored; channel frozen");
            return CommandOutcome::Ignored;
        }
        let w = snap.weight;
        match self.mode.mode() {
            TotalMode::Disabled => CommandOutcome::Ignored,
            TotalMode::AutoLoad | TotalMode::AutoNormal | TotalMode::AutoPeak => {
                self.flags.disabled_auto = !self.flags.disabled_auto;
                self.discard_candidate();
                self.gate.reset();
                if self.flags.disabled_auto {
                    info!(channel = self.index, "auto totalizing paused");
                    CommandOutcome::AutoPaused
                } else {
                    info!(channel = self.index, "auto totalizing resumed");
                    CommandOutcome::AutoResumed
                }
            }
            TotalMode::LoadDrop => {
                if w <= self.thresholds.drop {
                    debug!(channel = self.index, weight = w, "load-drop not armed; no load");
                    return CommandOutcome::Ignored;
                }
                self.mode.reset();
                self.discard_candidate();
                self.flags.start_load_drop = true;
                info!(channel = self.index, weight = w, "load-drop cycle armed");
                CommandOutcome::LoadDropArmed
            }
            mode @ (TotalMode::OnCommand | TotalMode::OnAccept) => {
                let load_present = mode == TotalMode::OnAccept || w > self.thresholds.drop;
                if self.flags.ok_to_total
                    && load_present
                    && let Some(c) = self.commit()
                {
                    return CommandOutcome::Committed(c);
                }
                if self.flags.not_allow {
                    self.flags.not_allow_event = true;
                }
                let window_ms = pending_window_ms(self.cfg.pending_ms, filter_interval_ms);
                self.pending.arm(now, window_ms);
                self.flags.pending_total = true;
                debug!(channel = self.index, window_ms, "total pending");
                CommandOutcome::Pending { window_ms }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CB: Countby = Countby {
        decimals: 0,
        increment: 1.0,
    };

    fn chan(mode: TotalMode) -> ChannelTotalizer {
        ChannelTotalizer::new(
            0,
            ChannelConfig {
                capacity: 100.0,
                mode,
                rise_pct: 5.0,
                drop_pct: 2.0,
                min_stable_ms: 0,
                pending_ms: 1000,
                accept_lower: 20.0,
                accept_upper: 30.0,
            },
        )
    }

    fn snap(weight: f32) -> WeightSnapshot {
        WeightSnapshot {
            weight,
            active: true,
            ..WeightSnapshot::default()
        }
    }

    #[test]
    fn disabled_never_qualifies() {
        let mut ch = chan(TotalMode::Disabled);
        assert_eq!(ch.evaluate(&snap(50.0), CB, 0), TotalStatus::Disabled);
        assert!(!ch.is_ok_to_total());
        assert_eq!(
            ch.handle_command(&snap(50.0), 100, 0),
            CommandOutcome::Ignored
        );
    }

    #[test]
    fn auto_load_commits_then_suppresses_until_drop() {
        let mut ch = chan(TotalMode::AutoLoad);
        assert_eq!(
            ch.evaluate(&snap(40.0), CB, 0),
            TotalStatus::Committed(CommitOutcome::Counted(40.0))
        );
        assert_eq!(ch.evaluate(&snap(40.0), CB, 10), TotalStatus::Suppressed);
        assert_eq!(ch.evaluate(&snap(1.0), CB, 20), TotalStatus::Idle);
        assert!(!ch.flags().not_allow);
        assert!(ch.take_new_total_event());
        assert!(!ch.take_new_total_event());
    }

    #[test]
    fn veto_closes_cycle_without_counting() {
        let mut ch = chan(TotalMode::AutoLoad);
        ch.skip_next_total();
        assert_eq!(
            ch.evaluate(&snap(40.0), CB, 0),
            TotalStatus::Committed(CommitOutcome::Vetoed(40.0))
        );
        assert_eq!(ch.totals().num_total, 0);
        assert!(!ch.flags().skip_next);
        assert!(ch.flags().not_allow);
        assert!(!ch.take_new_total_event());
    }

    #[test]
    fn skip_is_kept_until_a_candidate_exists() {
        let mut ch = chan(TotalMode::AutoLoad);
        ch.skip_next_total();
        assert_eq!(ch.commit(), None);
        assert!(ch.flags().skip_next);
    }

    #[test]
    fn set_mode_rebuilds_payload_and_clears_flags() {
        let mut ch = chan(TotalMode::AutoLoad);
        ch.evaluate(&snap(40.0), CB, 0);
        assert!(ch.set_mode(TotalMode::LoadDrop));
        assert_eq!(ch.mode(), TotalMode::LoadDrop);
        assert_eq!(ch.totals().mode, TotalMode::LoadDrop);
        assert_eq!(ch.flags(), StatusFlags::default());
        assert_eq!(ch.totals().num_total, 1);
    }
}
