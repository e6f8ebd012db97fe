//! Sample sources
//!
//! The engine never talks to the instrument. A [`SampleSource`] hands it
//! one [`SampleSet`] per tick; serial polling, sub-reading averaging and
//! poll cadence all live behind that trait.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::config::LayerId;
use crate::error::{DrmuError, Result};

/// Rate and thickness reported for one layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerSample {
    /// Instantaneous rate (units/s)
    pub rate: f64,
    /// Thickness since instrument start (units)
    pub thickness: f64,
}

/// Everything read from the instrument for one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleSet {
    /// Elapsed time as reported by the instrument clock (wraps)
    pub raw_time: f64,
    pub readings: BTreeMap<LayerId, LayerSample>,
}

impl SampleSet {
    pub fn new(raw_time: f64) -> Self {
        Self {
            raw_time,
            readings: BTreeMap::new(),
        }
    }

    /// Add a layer reading (builder style).
    pub fn with_layer(mut self, layer: LayerId, rate: f64, thickness: f64) -> Self {
        self.readings.insert(layer, LayerSample { rate, thickness });
        self
    }

    pub fn reading(&self, layer: LayerId) -> Option<&LayerSample> {
        self.readings.get(&layer)
    }
}

/// Producer of one sample set per tick
pub trait SampleSource {
    /// Read the next sample set. Failures are reported as [`DrmuError::Protocol`].
    fn next_sample(&mut self) -> Result<SampleSet>;
}

/// Replays a recorded sequence of sample sets
#[derive(Debug, Clone, Default)]
pub struct ReplaySource {
    samples: VecDeque<SampleSet>,
}

impl ReplaySource {
    pub fn new(samples: impl IntoIterator<Item = SampleSet>) -> Self {
        Self {
            samples: samples.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.samples.len()
    }
}

impl SampleSource for ReplaySource {
    fn next_sample(&mut self) -> Result<SampleSet> {
        self.samples.pop_front().ok_or_else(|| DrmuError::Protocol {
            reason: "replay exhausted".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let set = SampleSet::new(12.0).with_layer(1, 2.5, 0.3).with_layer(2, 1.0, 0.1);
        assert_eq!(set.readings.len(), 2);
        assert_eq!(set.reading(1).unwrap().rate, 2.5);
        assert!(set.reading(3).is_none());
    }

    #[test]
    fn test_replay_in_order_then_exhausted() {
        let mut source = ReplaySource::new(vec![
            SampleSet::new(1.0).with_layer(1, 1.0, 1.0),
            SampleSet::new(2.0).with_layer(1, 1.0, 2.0),
        ]);

        assert_eq!(source.next_sample().unwrap().raw_time, 1.0);
        assert_eq!(source.next_sample().unwrap().raw_time, 2.0);
        assert_eq!(source.remaining(), 0);

        let err = source.next_sample().unwrap_err();
        assert_eq!(err.error_code(), "PROTOCOL_ERROR");
    }
}
