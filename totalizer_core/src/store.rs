//! Persistence seam for per-channel totals.
//!
//! The engine calls [`TotalsStore::persist_totals`] after every operation that
//! changes a channel's totals and never retries; a failing store is logged and
//! otherwise ignored. [`TotalsStore::load_totals`] is consulted once per channel
//! when the engine is built.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use totalizer_config::{TotalsFile, load_totals_file};
use totalizer_traits::BoxError;

use crate::error::TotalizerError;
use crate::totals::ChannelTotals;

pub trait TotalsStore {
    /// Previously persisted totals for `channel`, if any.
    fn load_totals(&mut self, channel: usize) -> Result<Option<ChannelTotals>, BoxError>;

    fn persist_totals(&mut self, channel: usize, totals: &ChannelTotals) -> Result<(), BoxError>;
}

impl<T: TotalsStore + ?Sized> TotalsStore for Box<T> {
    fn load_totals(&mut self, channel: usize) -> Result<Option<ChannelTotals>, BoxError> {
        (**self).load_totals(channel)
    }

    fn persist_totals(&mut self, channel: usize, totals: &ChannelTotals) -> Result<(), BoxError> {
        (**self).persist_totals(channel, totals)
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    records: BTreeMap<usize, ChannelTotals>,
    persist_calls: Vec<usize>,
    fail_persist: bool,
    fail_load: bool,
}

/// In-memory store that records every persist call.
///
/// Clones share the same contents, so a test can keep one handle and give
/// another to the engine.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut MemoryInner) -> R) -> Option<R> {
        self.inner.lock().ok().map(|mut g| f(&mut g))
    }

    /// Seed a record, as if persisted by an earlier run.
    pub fn insert(&self, channel: usize, totals: ChannelTotals) {
        self.with(|m| m.records.insert(channel, totals));
    }

    pub fn get(&self, channel: usize) -> Option<ChannelTotals> {
        self.with(|m| m.records.get(&channel).copied()).flatten()
    }

    /// Channels passed to `persist_totals`, in call order.
    pub fn persist_calls(&self) -> Vec<usize> {
        self.with(|m| m.persist_calls.clone()).unwrap_or_default()
    }

    pub fn persist_count(&self) -> usize {
        self.with(|m| m.persist_calls.len()).unwrap_or_default()
    }

    /// Make every following persist call fail.
    pub fn set_fail_persist(&self, fail: bool) {
        self.with(|m| m.fail_persist = fail);
    }

    /// Make every following load call fail.
    pub fn set_fail_load(&self, fail: bool) {
        self.with(|m| m.fail_load = fail);
    }
}

impl TotalsStore for MemoryStore {
    fn load_totals(&mut self, channel: usize) -> Result<Option<ChannelTotals>, BoxError> {
        let g = self
            .inner
            .lock()
            .map_err(|_| TotalizerError::State("memory store poisoned".into()))?;
        if g.fail_load {
            return Err(Box::new(TotalizerError::Persistence(
                "memory store load failure".into(),
            )));
        }
        Ok(g.records.get(&channel).copied())
    }

    fn persist_totals(&mut self, channel: usize, totals: &ChannelTotals) -> Result<(), BoxError> {
        let mut g = self
            .inner
            .lock()
            .map_err(|_| TotalizerError::State("memory store poisoned".into()))?;
        g.persist_calls.push(channel);
        if g.fail_persist {
            return Err(Box::new(TotalizerError::Persistence(
                "memory store persist failure".into(),
            )));
        }
        g.records.insert(channel, *totals);
        Ok(())
    }
}

/// TOML-file store. The whole file is rewritten atomically on every persist.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    file: TotalsFile,
}

impl FileStore {
    /// Open `path`; a missing file starts an empty store.
    pub fn open(path: impl Into<PathBuf>) -> eyre::Result<Self> {
        let path = path.into();
        let file = load_totals_file(&path)?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub const fn contents(&self) -> &TotalsFile {
        &self.file
    }

    /// Rewrite the file from the in-memory records.
    pub fn flush(&self) -> Result<(), TotalizerError> {
        let text = self
            .file
            .to_toml()
            .map_err(|e| TotalizerError::Persistence(format!("serialize totals: {e}")))?;
        write_atomic(&self.path, text.as_bytes()).map_err(|e| {
            TotalizerError::Persistence(format!("write {}: {e}", self.path.display()))
        })
    }
}

impl TotalsStore for FileStore {
    fn load_totals(&mut self, channel: usize) -> Result<Option<ChannelTotals>, BoxError> {
        Ok(self.file.get(channel).map(ChannelTotals::from))
    }

    fn persist_totals(&mut self, channel: usize, totals: &ChannelTotals) -> Result<(), BoxError> {
        self.file.upsert(totals.to_persisted(channel));
        self.flush()?;
        Ok(())
    }
}

/// Write `bytes` to a sibling temp file, sync it, then rename over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use std::io::Write;

    let tmp = path.with_extension("tmp");
    {
        let mut f = std::fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    std::fs::rename(tmp, path)
}
