//! Tab-delimited log export
//!
//! Layout of a log file:
//!
//! ```text
//! #Log written by <program-name>
//! #<timestamp>
//! <event-text-lines...>
//! time(s)	rate 1(units/s)	thickness 1(units)	rate 2(units/s)	thickness 2(units)
//! <t0>	<r1_0>	<th1_0>	<r2_0>	<th2_0>
//! ```
//!
//! Exporting only reads the engine, so any range can be exported as
//! often as needed.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Local};
use log::info;

use crate::engine::{DepositionEngine, TickReadout};
use crate::error::{DrmuError, Result};

/// Timestamp format of the banner's second line.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Renders the engine's logging window as text
#[derive(Debug, Clone, Copy)]
pub struct LogExporter<'a> {
    engine: &'a DepositionEngine,
}

impl<'a> LogExporter<'a> {
    pub fn new(engine: &'a DepositionEngine) -> Self {
        Self { engine }
    }

    /// Render the full log, stamped with `written_at`.
    ///
    /// Covers the window's ticks inclusive; an open window runs through
    /// the latest tick. Fails with [`DrmuError::NoWindow`] if no log was
    /// ever started.
    pub fn export(&self, written_at: DateTime<Local>) -> Result<String> {
        let (start, end) = self.engine.window_bounds().ok_or(DrmuError::NoWindow)?;
        let mut out = self.header(written_at);
        out.push_str(&self.export_range(start, end));
        Ok(out)
    }

    /// Render the full log stamped with the current local time.
    pub fn export_now(&self) -> Result<String> {
        self.export(Local::now())
    }

    /// Banner, event lines and column header, each newline-terminated.
    pub fn header(&self, written_at: DateTime<Local>) -> String {
        let mut out = format!(
            "#Log written by {}\n#{}\n",
            self.engine.config().program_name,
            written_at.format(TIMESTAMP_FORMAT)
        );
        for event in self.engine.events() {
            out.push_str(&event.text);
            out.push('\n');
        }
        out.push_str(&self.column_header());
        out.push('\n');
        out
    }

    /// Column header row, without the trailing newline.
    pub fn column_header(&self) -> String {
        let unit = &self.engine.config().thickness_unit;
        let mut columns = vec!["time(s)".to_string()];
        for layer in &self.engine.config().layers {
            columns.push(format!("rate {}({}/s)", layer, unit));
            columns.push(format!("thickness {}({})", layer, unit));
        }
        columns.join("\t")
    }

    /// Data rows for ticks `start..=end`, each newline-terminated.
    pub fn export_range(&self, start: usize, end: usize) -> String {
        self.engine
            .readouts_in(start, end)
            .iter()
            .map(|readout| format_row(readout) + "\n")
            .collect()
    }

    /// Write the full log to `path`, stamped with the current time.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let content = self.export_now()?;
        fs::write(path, content).map_err(|e| DrmuError::FileWriteError {
            path: path.to_path_buf(),
            source: e,
        })?;
        info!("[EXPORT] Log written to {}", path.display());
        Ok(())
    }
}

/// One data row: effective time, then raw rate and corrected thickness per layer.
pub fn format_row(readout: &TickReadout) -> String {
    let mut fields = vec![format!("{:.3}", readout.effective_time)];
    for layer in &readout.layers {
        fields.push(format!("{:.3}", layer.rate));
        fields.push(format!("{:.3}", layer.thickness));
    }
    fields.join("\t")
}
