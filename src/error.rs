//! Error handling for DRMU
//!
//! Errors fall into four families: configuration problems caught at
//! construction, protocol failures coming from the sample source, state
//! errors from out-of-order logging commands, and I/O while writing logs.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::LayerId;

/// Result type alias for DRMU operations
pub type Result<T> = std::result::Result<T, DrmuError>;

/// Broad category of a [`DrmuError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Protocol,
    State,
    Io,
    Internal,
}

/// Main error type for DRMU operations
#[derive(Error, Debug)]
pub enum DrmuError {
    // Configuration Errors
    #[error("Invalid rate window size: {size} (must be at least 1)")]
    InvalidWindowSize { size: usize },

    #[error("Invalid layer set: {reason}")]
    InvalidLayerSet { reason: String },

    #[error("Primary layer {layer} is not a configured layer")]
    UnknownPrimaryLayer { layer: LayerId },

    #[error("Invalid depth sample interval: {interval} (must be finite and positive)")]
    InvalidSampleInterval { interval: f64 },

    #[error("Invalid {field}: {value} (must be finite and positive)")]
    InvalidPositive { field: &'static str, value: f64 },

    #[error("Layer {layer} is not configured")]
    UnknownLayer { layer: LayerId },

    // Protocol Errors
    #[error("Sample source error: {reason}")]
    Protocol { reason: String },

    #[error("Sample set is missing layer {layer}")]
    MissingLayer { layer: LayerId },

    #[error("Invalid sample: {reason}")]
    InvalidSample { reason: String },

    // State Errors
    #[error("A logging window is already open (started at tick {start_tick})")]
    WindowAlreadyOpen { start_tick: usize },

    #[error("No logging window is open")]
    WindowNotOpen,

    #[error("No logging window has ever been opened")]
    NoWindow,

    #[error("No samples have been ingested yet")]
    NoSamples,

    #[error("Operation not supported: {operation}")]
    Unsupported { operation: &'static str },

    // I/O Errors
    #[error("Failed to write file: {path}: {source}")]
    FileWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read config: {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DrmuError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            DrmuError::InvalidWindowSize { .. } => "INVALID_WINDOW_SIZE",
            DrmuError::InvalidLayerSet { .. } => "INVALID_LAYER_SET",
            DrmuError::UnknownPrimaryLayer { .. } => "UNKNOWN_PRIMARY_LAYER",
            DrmuError::InvalidSampleInterval { .. } => "INVALID_SAMPLE_INTERVAL",
            DrmuError::InvalidPositive { .. } => "INVALID_POSITIVE",
            DrmuError::UnknownLayer { .. } => "UNKNOWN_LAYER",
            DrmuError::Protocol { .. } => "PROTOCOL_ERROR",
            DrmuError::MissingLayer { .. } => "MISSING_LAYER",
            DrmuError::InvalidSample { .. } => "INVALID_SAMPLE",
            DrmuError::WindowAlreadyOpen { .. } => "WINDOW_ALREADY_OPEN",
            DrmuError::WindowNotOpen => "WINDOW_NOT_OPEN",
            DrmuError::NoWindow => "NO_WINDOW",
            DrmuError::NoSamples => "NO_SAMPLES",
            DrmuError::Unsupported { .. } => "UNSUPPORTED",
            DrmuError::FileWriteError { .. } => "FILE_WRITE_ERROR",
            DrmuError::ConfigRead { .. } => "CONFIG_READ_ERROR",
            DrmuError::Serialization(_) => "SERIALIZATION_ERROR",
            DrmuError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get the broad category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            DrmuError::InvalidWindowSize { .. }
            | DrmuError::InvalidLayerSet { .. }
            | DrmuError::UnknownPrimaryLayer { .. }
            | DrmuError::InvalidSampleInterval { .. }
            | DrmuError::InvalidPositive { .. }
            | DrmuError::UnknownLayer { .. }
            | DrmuError::Serialization(_) => ErrorKind::Configuration,
            DrmuError::Protocol { .. }
            | DrmuError::MissingLayer { .. }
            | DrmuError::InvalidSample { .. } => ErrorKind::Protocol,
            DrmuError::WindowAlreadyOpen { .. }
            | DrmuError::WindowNotOpen
            | DrmuError::NoWindow
            | DrmuError::NoSamples
            | DrmuError::Unsupported { .. } => ErrorKind::State,
            DrmuError::FileWriteError { .. } | DrmuError::ConfigRead { .. } => ErrorKind::Io,
            DrmuError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Check if this error is recoverable
    ///
    /// State errors leave the engine untouched, so the caller may simply
    /// issue the right command next. Configuration errors are fatal.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::State | ErrorKind::Protocol | ErrorKind::Io
        )
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            DrmuError::InvalidWindowSize { .. } => Some("Use a rate window of at least one sample."),
            DrmuError::UnknownPrimaryLayer { .. } => {
                Some("Pick the primary material from the configured layers.")
            }
            DrmuError::InvalidSampleInterval { .. } => {
                Some("Use a positive depth sample interval.")
            }
            DrmuError::WindowAlreadyOpen { .. } => Some("Stop the current log before starting a new one."),
            DrmuError::WindowNotOpen => Some("Start a log before stopping it."),
            DrmuError::NoWindow => Some("Start a log before exporting."),
            DrmuError::NoSamples => Some("Wait for the first reading from the monitor."),
            DrmuError::Protocol { .. } => Some("Check the serial connection to the monitor."),
            _ => None,
        }
    }
}
