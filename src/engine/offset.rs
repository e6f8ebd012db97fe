//! Time unwrap and zeroing
//!
//! The monitor reports elapsed time from a counter that wraps after a
//! fixed period. `OffsetTracker` turns that into a monotonic effective
//! time and holds the origin shifts applied by zero operations, for time
//! and for each layer's thickness.
//!
//! Only one wrap is detected between two consecutive readings. Polling
//! slower than the wrap period silently loses whole periods.

use std::collections::BTreeMap;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::LayerId;
use crate::error::{DrmuError, Result};

/// Cumulative thickness reported for a layer and the origin shift applied to it
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThicknessTrack {
    /// Thickness since instrument start, as last reported
    pub cumulative: f64,
    /// Added to `cumulative` to get the offset-corrected thickness
    pub offset: f64,
}

impl ThicknessTrack {
    pub fn corrected(&self) -> f64 {
        self.cumulative + self.offset
    }
}

/// Tracks instrument clock wraps and the time/thickness origin
#[derive(Debug, Clone)]
pub struct OffsetTracker {
    wrap_period: f64,
    time_offset: f64,
    last_raw_time: f64,
    /// Effective time of the latest reading as it was ingested
    ingested_time: f64,
    wrap_count: u32,
    thickness: BTreeMap<LayerId, ThicknessTrack>,
}

impl OffsetTracker {
    /// Create a tracker for `layers` whose clock wraps every `wrap_period` seconds.
    pub fn new(layers: &[LayerId], wrap_period: f64) -> Self {
        Self {
            wrap_period,
            time_offset: 0.0,
            last_raw_time: 0.0,
            ingested_time: 0.0,
            wrap_count: 0,
            thickness: layers
                .iter()
                .map(|&layer| (layer, ThicknessTrack::default()))
                .collect(),
        }
    }

    /// Convert a raw instrument time into effective time.
    ///
    /// A raw time below the previous one counts as exactly one wrap.
    ///
    /// # Example
    /// ```
    /// use drmu::engine::OffsetTracker;
    /// let mut tracker = OffsetTracker::new(&[1], 60.0);
    /// assert_eq!(tracker.ingest_time(59.0), 59.0);
    /// assert_eq!(tracker.ingest_time(1.0), 61.0);
    /// ```
    pub fn ingest_time(&mut self, raw_time: f64) -> f64 {
        if raw_time < self.last_raw_time {
            self.wrap_count += 1;
            warn!(
                "[OFFSET] Instrument clock wrapped ({:.3}s -> {:.3}s), wrap count {}",
                self.last_raw_time, raw_time, self.wrap_count
            );
        }
        self.last_raw_time = raw_time;
        self.ingested_time = self.effective_time(raw_time);
        self.ingested_time
    }

    /// Effective time for `raw_time` under the current wrap count and offset.
    pub fn effective_time(&self, raw_time: f64) -> f64 {
        raw_time + self.wrap_count as f64 * self.wrap_period + self.time_offset
    }

    /// Shift the time origin so `current_effective_time` maps to zero.
    ///
    /// Each call is relative to the current offset, so zeroing twice with
    /// the same argument shifts twice. Returns the shift applied.
    pub fn zero_time(&mut self, current_effective_time: f64) -> f64 {
        let shift = -current_effective_time;
        self.time_offset += shift;
        shift
    }

    /// Store the cumulative thickness reported for a layer and return it offset-corrected.
    pub fn record_thickness(&mut self, layer: LayerId, cumulative: f64) -> Result<f64> {
        let track = self.track_mut(layer)?;
        track.cumulative = cumulative;
        Ok(track.corrected())
    }

    /// Make the layer's current thickness the new origin. Returns the offset now in effect.
    pub fn zero_thickness(&mut self, layer: LayerId) -> Result<f64> {
        let track = self.track_mut(layer)?;
        track.offset = -track.cumulative;
        Ok(track.offset)
    }

    /// Offset-corrected thickness of a layer.
    pub fn corrected_thickness(&self, layer: LayerId) -> Result<f64> {
        self.track(layer).map(|track| track.corrected())
    }

    pub fn track(&self, layer: LayerId) -> Result<ThicknessTrack> {
        self.thickness
            .get(&layer)
            .copied()
            .ok_or(DrmuError::UnknownLayer { layer })
    }

    fn track_mut(&mut self, layer: LayerId) -> Result<&mut ThicknessTrack> {
        self.thickness
            .get_mut(&layer)
            .ok_or(DrmuError::UnknownLayer { layer })
    }

    pub fn time_offset(&self) -> f64 {
        self.time_offset
    }

    /// Effective time of the latest reading under the offset in force when it arrived.
    ///
    /// Zero operations leave it alone, so zeroing twice before the next
    /// reading shifts by the same amount twice.
    pub fn ingested_time(&self) -> f64 {
        self.ingested_time
    }

    pub fn wrap_count(&self) -> u32 {
        self.wrap_count
    }

    pub fn last_raw_time(&self) -> f64 {
        self.last_raw_time
    }

    pub fn wrap_period(&self) -> f64 {
        self.wrap_period
    }
}
