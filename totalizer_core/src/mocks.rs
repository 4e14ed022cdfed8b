//! Test and helper mocks for totalizer_core

use totalizer_traits::{BoxError, Countby, WeightSnapshot, WeightSource};

use crate::store::TotalsStore;
use crate::totals::ChannelTotals;

/// A source whose every read fails; every channel stays frozen.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSource;

impl WeightSource for NoopSource {
    fn snapshot(&mut self, _channel: usize) -> Result<WeightSnapshot, BoxError> {
        Err(Box::new(std::io::Error::other("noop source")))
    }

    fn display_countby(&self, _channel: usize) -> Countby {
        Countby::default()
    }

    fn filter_interval_ms(&self, _channel: usize) -> u32 {
        0
    }
}

/// A store that remembers nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

impl TotalsStore for NullStore {
    fn load_totals(&mut self, _channel: usize) -> Result<Option<ChannelTotals>, BoxError> {
        Ok(None)
    }

    fn persist_totals(&mut self, _channel: usize, _totals: &ChannelTotals) -> Result<(), BoxError> {
        Ok(())
    }
}
