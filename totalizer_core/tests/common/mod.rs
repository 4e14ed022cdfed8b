//! Shared rig: simulated source, spy store and a manual clock.
#![allow(dead_code)]

use std::time::Duration;

use totalizer_core::{ChannelConfig, MemoryStore, TotalMode, Totalizer};
use totalizer_hardware::{SimHandle, SimulatedSource};
use totalizer_traits::{Countby, ManualClock};

pub const COUNTBY: Countby = Countby {
    decimals: 1,
    increment: 0.1,
};
pub const FILTER_INTERVAL_MS: u32 = 100;

pub struct Rig {
    pub t: Totalizer,
    pub sim: SimHandle,
    pub clock: ManualClock,
    pub store: MemoryStore,
}

/// Capacity 100, rise 5 % (5.0), drop 2 % (2.0), 300 ms settling.
pub fn cfg(mode: TotalMode) -> ChannelConfig {
    ChannelConfig {
        capacity: 100.0,
        mode,
        rise_pct: 5.0,
        drop_pct: 2.0,
        min_stable_ms: 300,
        pending_ms: 1000,
        accept_lower: 20.0,
        accept_upper: 30.0,
    }
}

pub fn rig_with(cfgs: Vec<ChannelConfig>, store: MemoryStore) -> Rig {
    let mut src = SimulatedSource::new();
    for _ in &cfgs {
        src.add_channel(COUNTBY, FILTER_INTERVAL_MS);
    }
    let sim = src.handle();
    let clock = ManualClock::new();
    let t = Totalizer::builder()
        .with_source(src)
        .with_store(store.clone())
        .with_channels(cfgs)
        .with_clock(Box::new(clock.clone()))
        .build()
        .expect("valid rig");
    Rig {
        t,
        sim,
        clock,
        store,
    }
}

pub fn rig(mode: TotalMode) -> Rig {
    rig_with(vec![cfg(mode)], MemoryStore::new())
}

impl Rig {
    pub fn advance(&self, ms: u64) {
        self.clock.advance(Duration::from_millis(ms));
    }

    /// Put `weight` on channel 0 with motion, then hold it still until it has
    /// settled; returns the status of the last tick.
    pub fn settle(&mut self, weight: f32) -> totalizer_core::TotalStatus {
        self.sim.set_weight(0, weight);
        self.sim.set_motion(0, true);
        self.t.evaluate(0);
        self.sim.set_motion(0, false);
        let mut last = self.t.evaluate(0).expect("channel 0");
        for _ in 0..4 {
            self.advance(100);
            last = self.t.evaluate(0).expect("channel 0");
        }
        last
    }

    /// One tick at `weight`, no motion.
    pub fn tick(&mut self, weight: f32) -> totalizer_core::TotalStatus {
        self.sim.set_weight(0, weight);
        self.sim.set_motion(0, false);
        self.advance(FILTER_INTERVAL_MS as u64);
        self.t.evaluate(0).expect("channel 0")
    }
}
