//! Engine shared between a polling task and its observers
//!
//! The producer applies ticks under the write lock, one tick per lock
//! acquisition; display refreshes and flushes read under the read lock.
//! A reader therefore always sees whole ticks.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Local};

use super::tracker::{DepositionEngine, TickReadout};
use crate::error::{DrmuError, Result};
use crate::export::LogExporter;
use crate::source::{SampleSet, SampleSource};

/// Cloneable handle to a lock-protected [`DepositionEngine`]
#[derive(Debug, Clone)]
pub struct SharedEngine {
    inner: Arc<RwLock<DepositionEngine>>,
}

impl SharedEngine {
    pub fn new(engine: DepositionEngine) -> Self {
        Self {
            inner: Arc::new(RwLock::new(engine)),
        }
    }

    /// Apply one tick atomically.
    pub fn ingest(&self, sample: &SampleSet) -> Result<TickReadout> {
        self.write_guard()?.ingest(sample)
    }

    /// Read from `source` outside the lock, then apply the tick under it.
    pub fn poll<S: SampleSource + ?Sized>(&self, source: &mut S) -> Result<TickReadout> {
        let sample = source.next_sample()?;
        self.ingest(&sample)
    }

    /// Run `f` against a consistent view of the engine.
    pub fn read<R>(&self, f: impl FnOnce(&DepositionEngine) -> R) -> Result<R> {
        let guard = self.read_guard()?;
        Ok(f(&guard))
    }

    /// Run a mutating command (start/stop/zero) as one unit.
    pub fn update<R>(&self, f: impl FnOnce(&mut DepositionEngine) -> Result<R>) -> Result<R> {
        let mut guard = self.write_guard()?;
        f(&mut guard)
    }

    pub fn latest(&self) -> Result<Option<TickReadout>> {
        self.read(|engine| engine.latest().cloned())
    }

    /// Render the current log under the read lock.
    pub fn export(&self, written_at: DateTime<Local>) -> Result<String> {
        let guard = self.read_guard()?;
        LogExporter::new(&guard).export(written_at)
    }

    fn read_guard(&self) -> Result<RwLockReadGuard<'_, DepositionEngine>> {
        self.inner
            .read()
            .map_err(|_| DrmuError::Internal("engine lock poisoned".to_string()))
    }

    fn write_guard(&self) -> Result<RwLockWriteGuard<'_, DepositionEngine>> {
        self.inner
            .write()
            .map_err(|_| DrmuError::Internal("engine lock poisoned".to_string()))
    }
}
