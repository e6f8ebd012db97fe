//! Deposition Tracking Engine
//!
//! Core tracking engine including:
//! - Rolling rate averages
//! - Clock unwrap and time/thickness zeroing
//! - Aggregate rates and co-deposition composition
//! - Logging window state machine

pub mod aggregate;
pub mod averager;
pub mod composition;
pub mod offset;
pub mod shared;
pub mod tracker;
pub mod window;

pub use aggregate::AggregateCalculator;
pub use averager::RollingAverager;
pub use composition::{CompositionEstimator, CompositionPoint, CompositionUpdate};
pub use offset::{OffsetTracker, ThicknessTrack};
pub use shared::SharedEngine;
pub use tracker::{
    CompositionReadout, DepositionEngine, EngineState, LayerReadout, LayerState, TickReadout,
};
pub use window::{LogEvent, LoggingWindow, WindowState};

/// Round half away from zero to `decimals` places.
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.23456, 3), 1.235);
        assert_eq!(round_to(-2.5, 0), -3.0);
        assert_eq!(round_to(64.00000000000001, 2), 64.0);
    }
}
