//! Alloy composition during co-deposition
//!
//! Two composition figures are tracked from the two layers'
//! offset-corrected thicknesses:
//! - cumulative: primary share of everything deposited since the origin
//! - instantaneous: primary share of the last depth slice, sampled every
//!   time the combined thickness grows by `depth_sample_interval`
//!
//! The instantaneous series is the depth profile; the cumulative figure
//! alone would hide drift during the run.

use serde::{Deserialize, Serialize};

use super::round_to;
use crate::config::LayerId;

const COMPOSITION_DECIMALS: i32 = 2;

/// One sample of the depth profile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompositionPoint {
    /// Combined offset-corrected thickness when the sample was taken
    pub accumulated_thickness: f64,
    /// Primary share of the slice since the previous sample, in percent
    pub composition_pct: f64,
}

/// Result of feeding one tick's thicknesses to the estimator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositionUpdate {
    /// `None` while nothing has been deposited
    pub cumulative_pct: Option<f64>,
    /// Set when this tick closed a depth slice
    pub new_point: Option<CompositionPoint>,
}

/// Running composition estimate for a two-layer session
#[derive(Debug, Clone)]
pub struct CompositionEstimator {
    primary: LayerId,
    depth_sample_interval: f64,
    points: Vec<CompositionPoint>,
    /// Totals at the last sample point
    last_total: f64,
    last_primary: f64,
    /// The next positive total opens the profile
    awaiting_first: bool,
}

impl CompositionEstimator {
    pub fn new(primary: LayerId, depth_sample_interval: f64) -> Self {
        Self {
            primary,
            depth_sample_interval,
            points: Vec::new(),
            last_total: 0.0,
            last_primary: 0.0,
            awaiting_first: true,
        }
    }

    /// Feed the offset-corrected thicknesses of the primary and the other layer.
    pub fn update(&mut self, primary_thickness: f64, other_thickness: f64) -> CompositionUpdate {
        let total = primary_thickness + other_thickness;
        let cumulative_pct = Self::cumulative_pct(primary_thickness, other_thickness);

        let total_delta = total - self.last_total;
        let due = if self.awaiting_first {
            total > 0.0
        } else {
            total_delta >= self.depth_sample_interval
        };

        let new_point = if due {
            percent(primary_thickness - self.last_primary, total_delta).map(|pct| {
                let point = CompositionPoint {
                    accumulated_thickness: total,
                    composition_pct: pct,
                };
                self.points.push(point);
                self.last_total = total;
                self.last_primary = primary_thickness;
                self.awaiting_first = false;
                point
            })
        } else {
            None
        };

        CompositionUpdate {
            cumulative_pct,
            new_point,
        }
    }

    /// Restart the depth profile from the offset-corrected thicknesses
    /// in force after a thickness zero.
    ///
    /// Recorded points are kept. The next point is due once the combined
    /// thickness has grown by a full interval from here.
    pub fn restart_profile(&mut self, primary_thickness: f64, other_thickness: f64) {
        self.last_total = primary_thickness + other_thickness;
        self.last_primary = primary_thickness;
        self.awaiting_first = false;
    }

    /// Primary share of everything deposited, `None` while nothing has been.
    pub fn cumulative_pct(primary_thickness: f64, other_thickness: f64) -> Option<f64> {
        percent(primary_thickness, primary_thickness + other_thickness)
    }

    pub fn points(&self) -> &[CompositionPoint] {
        &self.points
    }

    /// Composition of the most recent depth slice.
    pub fn instantaneous_pct(&self) -> Option<f64> {
        self.points.last().map(|p| p.composition_pct)
    }

    pub fn primary(&self) -> LayerId {
        self.primary
    }

    pub fn depth_sample_interval(&self) -> f64 {
        self.depth_sample_interval
    }
}

fn percent(part: f64, whole: f64) -> Option<f64> {
    if whole == 0.0 {
        return None;
    }
    let pct = part / whole * 100.0;
    pct.is_finite().then(|| round_to(pct, COMPOSITION_DECIMALS))
}
