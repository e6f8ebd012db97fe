//! Deposition tracking engine
//!
//! `DepositionEngine` owns every piece of tracking state and is the only
//! place it is mutated. A tick is applied by [`DepositionEngine::ingest`]
//! as one unit: the sample set is validated first, then averaging, time
//! unwrap, thickness correction, aggregate rate and composition are all
//! updated and the readout for the tick is recorded.
//!
//! The engine is synchronous and performs no I/O. Scheduling the polls
//! and flushing logs to disk belong to the caller.

use std::collections::BTreeMap;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::aggregate::AggregateCalculator;
use super::averager::RollingAverager;
use super::composition::{CompositionEstimator, CompositionPoint};
use super::offset::OffsetTracker;
use super::window::{LogEvent, LoggingWindow};
use crate::config::{EngineConfig, LayerId};
use crate::error::{DrmuError, Result};
use crate::source::{SampleSet, SampleSource};

/// Derived values for one layer at one tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerReadout {
    pub layer: LayerId,
    /// Rate as reported by the instrument
    pub rate: f64,
    /// Rolling average of recent rates
    pub average_rate: f64,
    /// Offset-corrected thickness
    pub thickness: f64,
    /// Thickness over effective time; `None` while time is zero
    pub aggregate_rate: Option<f64>,
}

/// Composition figures for a co-deposition tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompositionReadout {
    pub cumulative_pct: Option<f64>,
    /// Composition of the most recent depth slice
    pub instantaneous_pct: Option<f64>,
}

/// Everything derived from one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickReadout {
    pub tick: usize,
    pub raw_time: f64,
    pub effective_time: f64,
    /// One entry per configured layer, in configuration order
    pub layers: Vec<LayerReadout>,
    /// Present only in co-deposition sessions
    pub composition: Option<CompositionReadout>,
}

impl TickReadout {
    pub fn layer(&self, layer: LayerId) -> Option<&LayerReadout> {
        self.layers.iter().find(|l| l.layer == layer)
    }
}

/// Per-layer tracking state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerState {
    /// Recent rates, oldest first
    pub rate_window: Vec<f64>,
    pub cumulative_thickness: f64,
    pub thickness_offset: f64,
}

/// Point-in-time view of the engine's tracking state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    pub time_offset: f64,
    pub layers: BTreeMap<LayerId, LayerState>,
    pub last_raw_time: f64,
    pub wrap_count: u32,
    /// Number of ticks ingested so far
    pub tick_count: usize,
}

/// Turns raw per-layer samples into rates, thicknesses, composition and a bounded log
#[derive(Debug, Clone)]
pub struct DepositionEngine {
    config: EngineConfig,
    averager: RollingAverager,
    offsets: OffsetTracker,
    aggregate: AggregateCalculator,
    /// Present only when two layers are configured
    composition: Option<CompositionEstimator>,
    window: LoggingWindow,
    /// Indexed by tick
    readouts: Vec<TickReadout>,
}

impl DepositionEngine {
    /// Create an engine from a validated configuration.
    ///
    /// # Example
    /// ```
    /// use drmu::{DepositionEngine, EngineConfig};
    /// let engine = DepositionEngine::new(EngineConfig::co_deposition(1, 2)).unwrap();
    /// assert!(engine.latest().is_none());
    /// ```
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let averager = RollingAverager::new(&config.layers, config.rate_window_size)?;
        let offsets = OffsetTracker::new(&config.layers, config.wrap_period);
        let aggregate = AggregateCalculator::new(config.thickness_scale);
        let composition = config.is_co_deposition().then(|| {
            CompositionEstimator::new(config.primary_layer, config.depth_sample_interval)
        });

        Ok(Self {
            config,
            averager,
            offsets,
            aggregate,
            composition,
            window: LoggingWindow::new(),
            readouts: Vec::new(),
        })
    }

    // ========================================================================
    // Tick Ingestion
    // ========================================================================

    /// Apply one sample set as the next tick and return its readout.
    ///
    /// A rejected sample set leaves the engine unchanged.
    pub fn ingest(&mut self, sample: &SampleSet) -> Result<TickReadout> {
        self.validate_sample(sample)?;

        let tick = self.readouts.len();
        let effective_time = self.offsets.ingest_time(sample.raw_time);

        let mut layers = Vec::with_capacity(self.config.layers.len());
        for &layer in &self.config.layers {
            let reading = sample
                .reading(layer)
                .ok_or(DrmuError::MissingLayer { layer })?;
            let average_rate = self.averager.push(layer, reading.rate)?;
            let thickness = self.offsets.record_thickness(layer, reading.thickness)?;
            layers.push(LayerReadout {
                layer,
                rate: reading.rate,
                average_rate,
                thickness,
                aggregate_rate: self.aggregate.rate(thickness, effective_time),
            });
        }

        let composition = self.update_composition(&layers);

        let readout = TickReadout {
            tick,
            raw_time: sample.raw_time,
            effective_time,
            layers,
            composition,
        };
        debug!(
            "[TICK {}] t={:.3}s raw={:.3}s layers={:?}",
            tick, effective_time, sample.raw_time, readout.layers
        );
        self.readouts.push(readout.clone());

        Ok(readout)
    }

    /// Pull one sample set from `source` and ingest it.
    ///
    /// Source errors are returned untouched and no tick is consumed.
    pub fn poll<S: SampleSource + ?Sized>(&mut self, source: &mut S) -> Result<TickReadout> {
        let sample = source.next_sample()?;
        self.ingest(&sample)
    }

    fn validate_sample(&self, sample: &SampleSet) -> Result<()> {
        if !(sample.raw_time.is_finite() && sample.raw_time >= 0.0) {
            return Err(DrmuError::InvalidSample {
                reason: format!("raw time {} is not a valid elapsed time", sample.raw_time),
            });
        }

        if let Some(&layer) = sample
            .readings
            .keys()
            .find(|layer| !self.config.layers.contains(layer))
        {
            return Err(DrmuError::UnknownLayer { layer });
        }

        for &layer in &self.config.layers {
            let reading = sample
                .reading(layer)
                .ok_or(DrmuError::MissingLayer { layer })?;
            if !(reading.rate.is_finite() && reading.thickness.is_finite()) {
                return Err(DrmuError::InvalidSample {
                    reason: format!("layer {} reading is not finite", layer),
                });
            }
        }

        Ok(())
    }

    fn update_composition(&mut self, layers: &[LayerReadout]) -> Option<CompositionReadout> {
        let estimator = self.composition.as_mut()?;
        let (primary_thickness, other_thickness) = split_thickness(estimator.primary(), layers)?;

        let update = estimator.update(primary_thickness, other_thickness);
        if let Some(point) = update.new_point {
            debug!(
                "[COMPOSITION] {:.2}% over slice ending at {:.3}",
                point.composition_pct, point.accumulated_thickness
            );
        }

        Some(CompositionReadout {
            cumulative_pct: update.cumulative_pct,
            instantaneous_pct: estimator.instantaneous_pct(),
        })
    }

    // ========================================================================
    // Zeroing
    // ========================================================================

    /// Shift the time origin so the latest tick's instant reads 0 s.
    ///
    /// The shift is relative to the latest tick's effective time as it was
    /// ingested, so zeroing twice without a new tick shifts twice. The
    /// latest readout is re-derived from the new origin. Returns the shift.
    pub fn zero_time(&mut self) -> Result<f64> {
        let shift = self.apply_time_zero()?;
        self.rederive_latest()?;
        Ok(shift)
    }

    /// Make the layer's current thickness its new origin. Returns the offset applied.
    pub fn zero_thickness(&mut self, layer: LayerId) -> Result<f64> {
        let offset = self.apply_thickness_zero(layer)?;
        self.restart_composition()?;
        self.rederive_latest()?;
        Ok(offset)
    }

    /// Zero time and every layer's thickness at the latest tick.
    pub fn zero_all(&mut self) -> Result<()> {
        self.instant()?;
        self.apply_time_zero()?;
        for layer in self.config.layers.clone() {
            self.apply_thickness_zero(layer)?;
        }
        self.restart_composition()?;
        self.rederive_latest()
    }

    fn apply_time_zero(&mut self) -> Result<f64> {
        let (tick, _) = self.instant()?;
        let reference = self.offsets.ingested_time();
        let shift = self.offsets.zero_time(reference);
        self.window
            .annotate(tick, reference, format!("time offset by {:.3} s", shift));
        info!("[ZERO] Time offset by {:.3}s at tick {}", shift, tick);
        Ok(shift)
    }

    fn apply_thickness_zero(&mut self, layer: LayerId) -> Result<f64> {
        self.offsets.track(layer)?;
        let (tick, effective_time) = self.instant()?;

        let offset = self.offsets.zero_thickness(layer)?;
        self.window.annotate(
            tick,
            effective_time,
            format!(
                "layer {} thickness offset by {:.3} {}",
                layer, offset, self.config.thickness_unit
            ),
        );
        info!("[ZERO] Layer {} thickness offset by {:.3} at tick {}", layer, offset, tick);
        Ok(offset)
    }

    /// Restart the depth profile from the offset-corrected thicknesses.
    fn restart_composition(&mut self) -> Result<()> {
        let estimator = match self.composition.as_mut() {
            Some(estimator) => estimator,
            None => return Ok(()),
        };
        let primary = estimator.primary();
        let other = match self.config.layers.iter().copied().find(|&l| l != primary) {
            Some(other) => other,
            None => return Ok(()),
        };
        estimator.restart_profile(
            self.offsets.corrected_thickness(primary)?,
            self.offsets.corrected_thickness(other)?,
        );
        Ok(())
    }

    /// Recompute the latest readout under the current offsets, so the row
    /// at a zeroing tick reads from the new origin.
    ///
    /// Rates and composition points are unaffected by a zero.
    fn rederive_latest(&mut self) -> Result<()> {
        let latest = match self.readouts.last_mut() {
            Some(latest) => latest,
            None => return Ok(()),
        };

        let effective_time = self.offsets.effective_time(latest.raw_time);
        latest.effective_time = effective_time;
        for layer in latest.layers.iter_mut() {
            layer.thickness = self.offsets.corrected_thickness(layer.layer)?;
            layer.aggregate_rate = self.aggregate.rate(layer.thickness, effective_time);
        }

        if let (Some(estimator), Some(composition)) =
            (self.composition.as_ref(), latest.composition.as_mut())
        {
            if let Some((primary, other)) = split_thickness(estimator.primary(), &latest.layers) {
                composition.cumulative_pct = CompositionEstimator::cumulative_pct(primary, other);
            }
        }

        debug!(
            "[ZERO] Tick {} re-derived: t={:.3}s layers={:?}",
            latest.tick, latest.effective_time, latest.layers
        );
        Ok(())
    }

    // ========================================================================
    // Logging Window
    // ========================================================================

    /// Open a log at the latest tick, zeroing if the config asks for it.
    pub fn start_logging(&mut self) -> Result<()> {
        self.start_logging_with(self.config.zero_on_start)
    }

    /// Open a log at the latest tick; when `zero` is set, zero time and
    /// every layer's thickness at the same tick.
    pub fn start_logging_with(&mut self, zero: bool) -> Result<()> {
        let (tick, effective_time) = self.instant()?;
        self.window.start(tick, effective_time)?;
        if zero {
            self.zero_all()?;
        }
        Ok(())
    }

    /// Close the open log at the latest tick.
    pub fn stop_logging(&mut self) -> Result<()> {
        // No samples means no window was ever opened.
        let (tick, effective_time) = self.instant().map_err(|_| DrmuError::WindowNotOpen)?;
        self.window.stop(tick, effective_time)
    }

    /// Reserved; always rejected.
    pub fn pause_logging(&mut self) -> Result<()> {
        self.window.pause()
    }

    /// Inclusive tick range of the current (or last) log.
    pub fn window_bounds(&self) -> Option<(usize, usize)> {
        let latest = self.latest()?.tick;
        self.window.bounds(latest)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Aggregate rate of a layer at the latest tick. `None` before any
    /// tick or while effective time is zero.
    pub fn aggregate_rate(&self, layer: LayerId) -> Result<Option<f64>> {
        let thickness = self.offsets.corrected_thickness(layer)?;
        Ok(self
            .latest()
            .and_then(|latest| self.aggregate.rate(thickness, latest.effective_time)))
    }

    /// Offset-corrected thickness of a layer as of the latest tick.
    pub fn corrected_thickness(&self, layer: LayerId) -> Result<f64> {
        self.offsets.corrected_thickness(layer)
    }

    /// Rolling average rate of a layer, `None` before its first sample.
    pub fn average_rate(&self, layer: LayerId) -> Result<Option<f64>> {
        self.averager
            .window(layer)
            .ok_or(DrmuError::UnknownLayer { layer })?;
        Ok(self.averager.average(layer))
    }

    pub fn latest(&self) -> Option<&TickReadout> {
        self.readouts.last()
    }

    pub fn readouts(&self) -> &[TickReadout] {
        &self.readouts
    }

    /// Readouts for ticks `start..=end`, clamped to what has been ingested.
    pub fn readouts_in(&self, start: usize, end: usize) -> &[TickReadout] {
        let end = end.saturating_add(1).min(self.readouts.len());
        let start = start.min(end);
        &self.readouts[start..end]
    }

    pub fn events(&self) -> &[LogEvent] {
        self.window.events()
    }

    pub fn window(&self) -> &LoggingWindow {
        &self.window
    }

    pub fn composition_points(&self) -> &[CompositionPoint] {
        self.composition
            .as_ref()
            .map(CompositionEstimator::points)
            .unwrap_or_default()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Snapshot of the tracking state.
    pub fn state(&self) -> EngineState {
        let layers = self
            .config
            .layers
            .iter()
            .map(|&layer| {
                let track = self.offsets.track(layer).unwrap_or_default();
                let rate_window = self
                    .averager
                    .window(layer)
                    .map(|w| w.iter().copied().collect())
                    .unwrap_or_default();
                (
                    layer,
                    LayerState {
                        rate_window,
                        cumulative_thickness: track.cumulative,
                        thickness_offset: track.offset,
                    },
                )
            })
            .collect();

        EngineState {
            time_offset: self.offsets.time_offset(),
            layers,
            last_raw_time: self.offsets.last_raw_time(),
            wrap_count: self.offsets.wrap_count(),
            tick_count: self.readouts.len(),
        }
    }

    fn instant(&self) -> Result<(usize, f64)> {
        self.latest()
            .map(|r| (r.tick, r.effective_time))
            .ok_or(DrmuError::NoSamples)
    }
}

/// Primary and other layer thickness of a two-layer readout.
fn split_thickness(primary: LayerId, layers: &[LayerReadout]) -> Option<(f64, f64)> {
    let primary_thickness = layers.iter().find(|l| l.layer == primary)?.thickness;
    let other_thickness = layers.iter().find(|l| l.layer != primary)?.thickness;
    Some((primary_thickness, other_thickness))
}
