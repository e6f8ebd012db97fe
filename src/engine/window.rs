//! Logging window state machine
//!
//! Bounds which ticks belong to the exportable log and keeps the
//! annotation trail (log began/ended, every zero applied).
//!
//! ```text
//! Idle --start--> Open --stop--> Closed --start--> Open ...
//! ```
//!
//! Rejected transitions leave the window untouched.

use std::fmt;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{DrmuError, Result};

/// Annotation attached to the log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub tick: usize,
    pub effective_time: f64,
    pub text: String,
}

/// Logging window states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WindowState {
    /// No window started yet
    #[default]
    Idle,
    /// Started, not stopped
    Open,
    /// Stopped; can be restarted
    Closed,
}

impl fmt::Display for WindowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowState::Idle => write!(f, "Idle"),
            WindowState::Open => write!(f, "Open"),
            WindowState::Closed => write!(f, "Closed"),
        }
    }
}

/// Start/stop bounds of the current log and its event trail
#[derive(Debug, Clone, Default)]
pub struct LoggingWindow {
    start_tick: Option<usize>,
    stop_tick: Option<usize>,
    events: Vec<LogEvent>,
}

impl LoggingWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a window at `tick`.
    ///
    /// State transition: Idle/Closed -> Open
    ///
    /// # Example
    /// ```
    /// use drmu::engine::{LoggingWindow, WindowState};
    /// let mut window = LoggingWindow::new();
    /// window.start(5, 12.0).unwrap();
    /// assert_eq!(window.state(), WindowState::Open);
    /// assert!(window.start(6, 13.0).is_err());
    /// ```
    pub fn start(&mut self, tick: usize, effective_time: f64) -> Result<()> {
        if let (WindowState::Open, Some(start_tick)) = (self.state(), self.start_tick) {
            warn!("[LOG] Start rejected: window already open since tick {}", start_tick);
            return Err(DrmuError::WindowAlreadyOpen { start_tick });
        }

        self.start_tick = Some(tick);
        self.stop_tick = None;
        self.annotate(tick, effective_time, format!("log began at {:.3} s", effective_time));
        info!("[LOG] Window opened at tick {}", tick);
        Ok(())
    }

    /// Close the open window at `tick`.
    ///
    /// State transition: Open -> Closed
    pub fn stop(&mut self, tick: usize, effective_time: f64) -> Result<()> {
        if self.state() != WindowState::Open {
            warn!("[LOG] Stop rejected: window is {}", self.state());
            return Err(DrmuError::WindowNotOpen);
        }

        self.stop_tick = Some(tick);
        self.annotate(tick, effective_time, format!("log ended at {:.3} s", effective_time));
        info!("[LOG] Window closed at tick {}", tick);
        Ok(())
    }

    /// Pausing is reserved; no pause semantics are defined yet.
    pub fn pause(&mut self) -> Result<()> {
        Err(DrmuError::Unsupported {
            operation: "pause logging",
        })
    }

    /// Append an annotation to the event trail.
    pub fn annotate(&mut self, tick: usize, effective_time: f64, text: impl Into<String>) {
        self.events.push(LogEvent {
            tick,
            effective_time,
            text: text.into(),
        });
    }

    pub fn state(&self) -> WindowState {
        match (self.start_tick, self.stop_tick) {
            (None, _) => WindowState::Idle,
            (Some(_), None) => WindowState::Open,
            (Some(_), Some(_)) => WindowState::Closed,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state() == WindowState::Open
    }

    /// Inclusive tick range covered by the window.
    ///
    /// An open window extends through `latest_tick`. `None` if no window
    /// was ever opened.
    pub fn bounds(&self, latest_tick: usize) -> Option<(usize, usize)> {
        let start = self.start_tick?;
        Some((start, self.stop_tick.unwrap_or(latest_tick)))
    }

    pub fn start_tick(&self) -> Option<usize> {
        self.start_tick
    }

    pub fn stop_tick(&self) -> Option<usize> {
        self.stop_tick
    }

    pub fn events(&self) -> &[LogEvent] {
        &self.events
    }
}
