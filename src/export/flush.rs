//! Periodic durable flushing of the log
//!
//! While a log is running, rows are appended to disk every `every_ticks`
//! ticks so a crash loses at most one batch. Batches never repeat a row.
//! [`PeriodicFlusher::finish`] replaces the file with the complete export,
//! including events recorded after the header was first written.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use log::{debug, info};

use super::log_file::LogExporter;
use crate::engine::DepositionEngine;
use crate::error::{DrmuError, Result};

/// Default flush cadence: five minutes at a one-second poll.
pub const DEFAULT_FLUSH_EVERY_TICKS: usize = 300;

/// Appends the running log to a file in batches
#[derive(Debug, Clone)]
pub struct PeriodicFlusher {
    path: PathBuf,

    /// Minimum number of new rows before a batch is written.
    pub every_ticks: usize,

    /// Timestamp of the last successful flush.
    pub last_flush_time: Option<DateTime<Local>>,

    /// Start tick of the window the file currently holds
    window_start: Option<usize>,

    /// First tick not yet written
    next_tick: usize,
}

impl PeriodicFlusher {
    /// Create a flusher writing to `path` every `every_ticks` ticks.
    pub fn new(path: impl Into<PathBuf>, every_ticks: usize) -> Result<Self> {
        if every_ticks == 0 {
            return Err(DrmuError::InvalidPositive {
                field: "flush cadence",
                value: 0.0,
            });
        }
        Ok(Self::build(path.into(), every_ticks))
    }

    /// Create a flusher with the default cadence.
    pub fn with_default_cadence(path: impl Into<PathBuf>) -> Self {
        Self::build(path.into(), DEFAULT_FLUSH_EVERY_TICKS)
    }

    fn build(path: PathBuf, every_ticks: usize) -> Self {
        Self {
            path,
            every_ticks,
            last_flush_time: None,
            window_start: None,
            next_tick: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of window rows not yet on disk.
    pub fn pending(&self, engine: &DepositionEngine) -> usize {
        match engine.window_bounds() {
            None => 0,
            Some((start, end)) => {
                let next = if self.window_start == Some(start) {
                    self.next_tick
                } else {
                    start
                };
                (end + 1).saturating_sub(next)
            }
        }
    }

    /// Check if a batch is due.
    pub fn should_flush(&self, engine: &DepositionEngine) -> bool {
        self.pending(engine) >= self.every_ticks
    }

    /// Flush if a batch is due. Returns the number of rows written.
    pub fn maybe_flush(&mut self, engine: &DepositionEngine) -> Result<Option<usize>> {
        if !self.should_flush(engine) {
            return Ok(None);
        }
        self.flush(engine).map(Some)
    }

    /// Append every pending row now. Returns the number of rows written.
    ///
    /// A new log window truncates the file and writes a fresh header first.
    pub fn flush(&mut self, engine: &DepositionEngine) -> Result<usize> {
        let (start, end) = engine.window_bounds().ok_or(DrmuError::NoWindow)?;
        let exporter = LogExporter::new(engine);
        let now = Local::now();

        if self.window_start != Some(start) {
            fs::write(&self.path, exporter.header(now)).map_err(|e| self.write_error(e))?;
            self.window_start = Some(start);
            self.next_tick = start;
            info!(
                "[FLUSH] Started log file {} for window at tick {}",
                self.path.display(),
                start
            );
        }

        let count = (end + 1).saturating_sub(self.next_tick);
        if count > 0 {
            let rows = exporter.export_range(self.next_tick, end);
            let mut file = OpenOptions::new()
                .append(true)
                .open(&self.path)
                .map_err(|e| self.write_error(e))?;
            file.write_all(rows.as_bytes())
                .map_err(|e| self.write_error(e))?;
            self.next_tick = end + 1;
        }

        self.last_flush_time = Some(now);
        debug!("[FLUSH] Wrote {} rows to {}", count, self.path.display());
        Ok(count)
    }

    /// Rewrite the file with the complete log (events included).
    pub fn finish(&mut self, engine: &DepositionEngine) -> Result<()> {
        let (start, end) = engine.window_bounds().ok_or(DrmuError::NoWindow)?;
        LogExporter::new(engine).write_to(&self.path)?;
        self.window_start = Some(start);
        self.next_tick = end + 1;
        self.last_flush_time = Some(Local::now());
        Ok(())
    }

    fn write_error(&self, source: std::io::Error) -> DrmuError {
        DrmuError::FileWriteError {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::source::SampleSet;
    use tempfile::tempdir;

    fn tick(engine: &mut DepositionEngine, t: f64) {
        engine
            .ingest(&SampleSet::new(t).with_layer(1, 1.0, t))
            .unwrap();
    }

    fn data_rows(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .skip_while(|l| !l.starts_with("time(s)"))
            .skip(1)
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_zero_cadence_rejected() {
        assert!(matches!(
            PeriodicFlusher::new("log.txt", 0),
            Err(DrmuError::InvalidPositive { field: "flush cadence", .. })
        ));
    }

    #[test]
    fn test_default_cadence_matches_explicit_constructor() {
        let default = PeriodicFlusher::with_default_cadence("log.txt");
        let explicit = PeriodicFlusher::new("log.txt", DEFAULT_FLUSH_EVERY_TICKS).unwrap();
        assert_eq!(default.every_ticks, DEFAULT_FLUSH_EVERY_TICKS);
        assert_eq!(default.path(), explicit.path());
        assert!(default.last_flush_time.is_none());

        let mut engine = DepositionEngine::new(EngineConfig::default()).unwrap();
        tick(&mut engine, 0.0);
        engine.start_logging_with(false).unwrap();
        tick(&mut engine, 1.0);
        assert_eq!(default.pending(&engine), 2);
        assert_eq!(explicit.pending(&engine), 2);
    }

    #[test]
    fn test_nothing_pending_without_window() {
        let temp = tempdir().unwrap();
        let mut engine = DepositionEngine::new(EngineConfig::default()).unwrap();
        tick(&mut engine, 1.0);

        let mut flusher = PeriodicFlusher::new(temp.path().join("log.txt"), 1).unwrap();
        assert_eq!(flusher.pending(&engine), 0);
        assert_eq!(flusher.maybe_flush(&engine).unwrap(), None);
        assert!(matches!(flusher.flush(&engine), Err(DrmuError::NoWindow)));
        assert!(!flusher.path().exists());
    }

    #[test]
    fn test_batches_written_once() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("log.txt");
        let mut engine = DepositionEngine::new(EngineConfig::default()).unwrap();
        let mut flusher = PeriodicFlusher::new(&path, 3).unwrap();

        tick(&mut engine, 0.0);
        engine.start_logging_with(false).unwrap();

        let mut written = 0;
        for i in 1..10 {
            tick(&mut engine, i as f64);
            if let Some(n) = flusher.maybe_flush(&engine).unwrap() {
                written += n;
            }
        }

        // Ticks 0..=9 are in the window; batches of 3 leave one row pending.
        assert_eq!(written, 9);
        assert_eq!(flusher.pending(&engine), 1);
        assert_eq!(data_rows(&path).len(), 9);

        flusher.flush(&engine).unwrap();
        let rows = data_rows(&path);
        assert_eq!(rows.len(), 10);
        assert!(rows[0].starts_with("0.000\t"));
        assert!(rows[9].starts_with("9.000\t"));
        assert!(flusher.last_flush_time.is_some());
    }

    #[test]
    fn test_finish_rewrites_with_end_event() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("log.txt");
        let mut engine = DepositionEngine::new(EngineConfig::default()).unwrap();
        let mut flusher = PeriodicFlusher::new(&path, 2).unwrap();

        tick(&mut engine, 0.0);
        engine.start_logging_with(false).unwrap();
        tick(&mut engine, 1.0);
        flusher.maybe_flush(&engine).unwrap();
        tick(&mut engine, 2.0);
        engine.stop_logging().unwrap();
        assert_eq!(data_rows(&path).len(), 2);
        assert!(!fs::read_to_string(&path).unwrap().contains("log ended"));

        flusher.finish(&engine).unwrap();

        // The whole export replaces the file: no row is duplicated.
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("log ended at 2.000 s\n"));
        let rows = data_rows(&path);
        assert_eq!(rows.len(), 3);
        assert!(rows[0].starts_with("0.000\t"));
        assert!(rows[2].starts_with("2.000\t"));
        assert_eq!(flusher.pending(&engine), 0);

        // Finishing twice leaves the same file.
        flusher.finish(&engine).unwrap();
        assert_eq!(data_rows(&path), rows);
    }

    #[test]
    fn test_new_window_restarts_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("log.txt");
        let mut engine = DepositionEngine::new(EngineConfig::default()).unwrap();
        let mut flusher = PeriodicFlusher::new(&path, 1).unwrap();

        tick(&mut engine, 0.0);
        engine.start_logging_with(false).unwrap();
        tick(&mut engine, 1.0);
        engine.stop_logging().unwrap();
        flusher.flush(&engine).unwrap();
        assert_eq!(data_rows(&path).len(), 2);

        tick(&mut engine, 2.0);
        tick(&mut engine, 3.0);
        engine.start_logging_with(false).unwrap();
        assert_eq!(flusher.pending(&engine), 1);
        flusher.flush(&engine).unwrap();

        let rows = data_rows(&path);
        assert_eq!(rows.len(), 1);
        assert!(rows[0].starts_with("3.000\t"));
    }
}
