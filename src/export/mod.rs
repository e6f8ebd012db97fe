//! Log Export Module
//!
//! Tab-delimited log rendering and the periodic flush-to-disk policy.

pub mod flush;
pub mod log_file;

pub use flush::{PeriodicFlusher, DEFAULT_FLUSH_EVERY_TICKS};
pub use log_file::{format_row, LogExporter, TIMESTAMP_FORMAT};
