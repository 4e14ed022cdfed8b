#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core totalizing logic (hardware-agnostic).
//!
//! This crate turns a stream of filtered weight snapshots into per-channel
//! running totals. All weighing-side input goes through
//! `totalizer_traits::WeightSource`; durable statistics leave through
//! [`TotalsStore`].
//!
//! ## Architecture
//!
//! - **Thresholds**: rise/drop derived from capacity (`config` module)
//! - **Timing**: wrap-safe `u32` tick timers and a motion-free settling gate
//! - **Strategies**: one per [`TotalMode`], dispatched on `ModeState`
//! - **Accumulator**: saturating count, sums, extremes (`totals` module)
//! - **Orchestration**: [`TotalizerCore`] reads, evaluates and persists
//!
//! ## Cycle
//!
//! A channel qualifies a candidate, commits it once, then refuses to commit
//! again until the weight has dropped to the drop threshold.

pub mod builder;
pub mod channel;
pub mod config;
pub mod conversions;
pub mod engine;
pub mod error;
pub mod hw_error;
pub mod mocks;
pub mod mode;
pub mod stability;
pub mod status;
pub mod store;
pub mod timer;
pub mod totals;
pub mod util;

pub use builder::{Missing, Set, Totalizer, TotalizerBuilder, build_totalizer};
pub use channel::{ChannelTotalizer, StatusFlags};
pub use config::{ChannelConfig, Thresholds, threshold_from_pct};
pub use engine::TotalizerCore;
pub use error::{BuildError, Report, Result, TotalizerError};
pub use mode::{LoadDropAcc, ModeState, Sample};
pub use status::{CommandOutcome, CommitOutcome, TotalStatus};
pub use store::{FileStore, MemoryStore, TotalsStore};
pub use totals::ChannelTotals;
pub use totalizer_config::TotalMode;
pub use util::{pending_window_ms, round_to_countby};
