//! DRMU - Deposition Rate Monitor Unit
//!
//! Tracking engine for a thin-film deposition-rate monitor. Raw per-layer
//! rate/thickness samples and the instrument's wrapping elapsed-time
//! counter go in, one tick at a time; derived readouts come out:
//! - Rolling and aggregate (time-averaged) rates per layer
//! - Zero-corrected time and thickness
//! - Co-deposition alloy composition, cumulative and per depth slice
//! - A start/stop logging window with annotated events, exportable as
//!   tab-delimited text
//!
//! Talking to the instrument, plotting and the operator UI sit outside
//! this crate; they feed the engine through [`source::SampleSource`] and
//! read it back through the query methods.

pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod source;

pub use config::{EngineConfig, LayerId};
pub use engine::{DepositionEngine, SharedEngine, TickReadout};
pub use error::{DrmuError, ErrorKind, Result};
pub use export::{LogExporter, PeriodicFlusher};
pub use source::{ReplaySource, SampleSet, SampleSource};
