//! Type-state builder for `Totalizer` and generic `build_totalizer` constructor.
//!
//! The builder enforces at compile time that a weight source and a totals store
//! are provided before `build()` is available. `try_build()` is always available
//! for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use totalizer_traits::{Clock, MonotonicClock, WeightSource};
use tracing::{info, warn};

use crate::channel::ChannelTotalizer;
use crate::config::ChannelConfig;
use crate::engine::TotalizerCore;
use crate::error::{BuildError, Result};
use crate::hw_error::map_store_error;
use crate::store::TotalsStore;

/// Dynamically dispatched totalizer, as produced by [`TotalizerBuilder`].
pub type Totalizer = TotalizerCore<Box<dyn WeightSource>, Box<dyn TotalsStore>>;

impl TotalizerCore<Box<dyn WeightSource>, Box<dyn TotalsStore>> {
    /// Start building a Totalizer.
    pub fn builder() -> TotalizerBuilder<Missing, Missing> {
        TotalizerBuilder::default()
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `Totalizer`. Channels are validated on `build()`.
pub struct TotalizerBuilder<S, P> {
    source: Option<Box<dyn WeightSource>>,
    store: Option<Box<dyn TotalsStore>>,
    channels: Vec<ChannelConfig>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    _s: PhantomData<S>,
    _p: PhantomData<P>,
}

impl Default for TotalizerBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            source: None,
            store: None,
            channels: Vec::new(),
            clock: None,
            _s: PhantomData,
            _p: PhantomData,
        }
    }
}

/// Validate channel configs, restore persisted totals and construct the core.
///
/// Shared by `TotalizerBuilder::try_build()` and `build_totalizer()`.
fn validate_and_build<W: WeightSource, P: TotalsStore>(
    source: W,
    mut store: P,
    channels: Vec<ChannelConfig>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<TotalizerCore<W, P>> {
    if channels.is_empty() {
        return Err(eyre::Report::new(BuildError::NoChannels));
    }
    for cfg in &channels {
        cfg.validate().map_err(eyre::Report::new)?;
    }

    let mut channels: Vec<ChannelTotalizer> = channels
        .into_iter()
        .enumerate()
        .map(|(i, cfg)| ChannelTotalizer::new(i, cfg))
        .collect();

    for ch in &mut channels {
        let i = ch.index();
        match store.load_totals(i) {
            Ok(Some(totals)) => {
                ch.restore(totals);
                info!(
                    channel = i,
                    count = totals.num_total,
                    mode = %ch.mode(),
                    "totals restored"
                );
            }
            Ok(None) => {}
            Err(e) => {
                let err = map_store_error(&*e);
                warn!(channel = i, error = %err, "load totals failed; starting from zero");
            }
        }
    }

    let clock: Arc<dyn Clock + Send + Sync> = match clock {
        Some(b) => Arc::from(b),
        None => Arc::new(MonotonicClock::new()),
    };
    let epoch = clock.now();

    Ok(TotalizerCore {
        source,
        store,
        channels,
        clock,
        epoch,
    })
}

impl<S, P> TotalizerBuilder<S, P> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<Totalizer> {
        let source = self
            .source
            .ok_or_else(|| eyre::Report::new(BuildError::MissingSource))?;
        let store = self
            .store
            .ok_or_else(|| eyre::Report::new(BuildError::MissingStore))?;
        validate_and_build(source, store, self.channels, self.clock)
    }
}

/// Chainable setters that do not affect type-state.
impl<S, P> TotalizerBuilder<S, P> {
    /// Append a channel; channel indices follow insertion order.
    pub fn with_channel(mut self, cfg: ChannelConfig) -> Self {
        self.channels.push(cfg);
        self
    }

    pub fn with_channels(mut self, cfgs: impl IntoIterator<Item = ChannelConfig>) -> Self {
        self.channels.extend(cfgs);
        self
    }

    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

// Setters that advance type-state
impl<P> TotalizerBuilder<Missing, P> {
    pub fn with_source(self, source: impl WeightSource + 'static) -> TotalizerBuilder<Set, P> {
        TotalizerBuilder {
            source: Some(Box::new(source)),
            store: self.store,
            channels: self.channels,
            clock: self.clock,
            _s: PhantomData,
            _p: PhantomData,
        }
    }
}

impl<S> TotalizerBuilder<S, Missing> {
    pub fn with_store(self, store: impl TotalsStore + 'static) -> TotalizerBuilder<S, Set> {
        TotalizerBuilder {
            source: self.source,
            store: Some(Box::new(store)),
            channels: self.channels,
            clock: self.clock,
            _s: PhantomData,
            _p: PhantomData,
        }
    }
}

impl TotalizerBuilder<Set, Set> {
    /// Validate and build. Only available once a source and a store are set.
    pub fn build(self) -> Result<Totalizer> {
        self.try_build()
    }
}

/// Build a statically dispatched totalizer from a concrete source and store.
pub fn build_totalizer<W, P>(
    source: W,
    store: P,
    channels: Vec<ChannelConfig>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<TotalizerCore<W, P>>
where
    W: WeightSource,
    P: TotalsStore,
{
    validate_and_build(source, store, channels, clock)
}
