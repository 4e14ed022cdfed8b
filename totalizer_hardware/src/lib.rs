//! Weight sources for hosts without a real front end.
//!
//! `SimulatedSource` implements `totalizer_traits::WeightSource` over shared
//! per-channel cells. A `SimHandle` obtained from it drives the readings, which
//! is how tests and the CLI trace replay feed the engine.
pub mod error;

pub use error::SensorError;

use std::cell::RefCell;
use std::rc::Rc;

use totalizer_traits::{BoxError, Countby, WeightSnapshot, WeightSource};

#[derive(Debug, Clone)]
struct SimChannel {
    snapshot: WeightSnapshot,
    countby: Countby,
    filter_interval_ms: u32,
    offline: bool,
}

/// Simulated multi-channel weight source
#[derive(Debug, Default)]
pub struct SimulatedSource {
    channels: Rc<RefCell<Vec<SimChannel>>>,
}

/// Shared handle used to change what a `SimulatedSource` reports.
#[derive(Debug, Clone)]
pub struct SimHandle {
    channels: Rc<RefCell<Vec<SimChannel>>>,
}

impl SimulatedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an active, empty channel and return its index.
    pub fn add_channel(&mut self, countby: Countby, filter_interval_ms: u32) -> usize {
        let mut chans = self.channels.borrow_mut();
        chans.push(SimChannel {
            snapshot: WeightSnapshot {
                active: true,
                ..WeightSnapshot::default()
            },
            countby,
            filter_interval_ms,
            offline: false,
        });
        chans.len() - 1
    }

    pub fn handle(&self) -> SimHandle {
        SimHandle {
            channels: Rc::clone(&self.channels),
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.borrow().len()
    }
}

impl SimHandle {
    fn with<F: FnOnce(&mut SimChannel)>(&self, channel: usize, f: F) {
        if let Some(c) = self.channels.borrow_mut().get_mut(channel) {
            f(c);
        }
    }

    /// Replace the whole snapshot for `channel`.
    pub fn set(&self, channel: usize, snapshot: WeightSnapshot) {
        self.with(channel, |c| c.snapshot = snapshot);
    }

    pub fn set_weight(&self, channel: usize, weight: f32) {
        self.with(channel, |c| c.snapshot.weight = weight);
    }

    pub fn set_motion(&self, channel: usize, in_motion: bool) {
        self.with(channel, |c| c.snapshot.in_motion = in_motion);
    }

    pub fn set_overload(&self, channel: usize, overloaded: bool) {
        self.with(channel, |c| c.snapshot.overloaded = overloaded);
    }

    pub fn set_active(&self, channel: usize, active: bool) {
        self.with(channel, |c| c.snapshot.active = active);
    }

    /// Make reads of `channel` fail until cleared.
    pub fn set_offline(&self, channel: usize, offline: bool) {
        self.with(channel, |c| c.offline = offline);
    }
}

impl WeightSource for SimulatedSource {
    fn snapshot(&mut self, channel: usize) -> Result<WeightSnapshot, BoxError> {
        let chans = self.channels.borrow();
        let c = chans
            .get(channel)
            .ok_or(SensorError::NoChannel(channel))?;
        if c.offline {
            tracing::debug!(channel, "simulated channel offline");
            return Err(Box::new(SensorError::Offline(channel)));
        }
        Ok(c.snapshot)
    }

    fn display_countby(&self, channel: usize) -> Countby {
        self.channels
            .borrow()
            .get(channel)
            .map(|c| c.countby)
            .unwrap_or_default()
    }

    fn filter_interval_ms(&self, channel: usize) -> u32 {
        self.channels
            .borrow()
            .get(channel)
            .map(|c| c.filter_interval_ms)
            .unwrap_or(0)
    }
}
