//! Tick and command outcomes reported to the caller.

/// Result of a commit attempt that found a candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommitOutcome {
    /// Weight folded into the totals.
    Counted(f32),
    /// Counter at its ceiling; totals unchanged but the cycle still closes.
    Saturated(f32),
    /// One-shot skip consumed; candidate dropped.
    Vetoed(f32),
}

impl CommitOutcome {
    pub const fn weight(&self) -> f32 {
        match *self {
            Self::Counted(w) | Self::Saturated(w) | Self::Vetoed(w) => w,
        }
    }

    /// Whether the totals must be handed to the store.
    pub const fn persists(&self) -> bool {
        !matches!(self, Self::Vetoed(_))
    }
}

/// What one `evaluate` tick did on a channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TotalStatus {
    /// Overloaded, inactive or unreadable: nothing changed.
    Frozen,
    Disabled,
    /// Auto mode paused by a command.
    Paused,
    /// Armed, no candidate.
    Idle,
    /// Load already totalized; waiting for it to drop.
    Suppressed,
    /// Candidate held, not yet committed.
    Qualified(f32),
    Committed(CommitOutcome),
}

/// What a "total" command did on a channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandOutcome {
    Ignored,
    AutoPaused,
    AutoResumed,
    LoadDropArmed,
    Committed(CommitOutcome),
    /// No candidate yet; the next qualifying reading within the window commits.
    Pending { window_ms: u32 },
}

impl CommandOutcome {
    pub const fn commit(&self) -> Option<CommitOutcome> {
        match *self {
            Self::Committed(c) => Some(c),
            _ => None,
        }
    }
}

impl TotalStatus {
    pub const fn commit(&self) -> Option<CommitOutcome> {
        match *self {
            Self::Committed(c) => Some(c),
            _ => None,
        }
    }
}
