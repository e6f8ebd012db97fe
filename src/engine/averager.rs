//! Rolling rate average
//!
//! Each configured layer keeps a bounded FIFO of its most recent rate
//! samples. Pushing past capacity evicts the oldest sample; the reported
//! average is the plain arithmetic mean of what remains.

use std::collections::{BTreeMap, VecDeque};

use super::round_to;
use crate::config::LayerId;
use crate::error::{DrmuError, Result};

/// Decimal places of the reported average.
const AVERAGE_DECIMALS: i32 = 3;

/// Per-layer bounded windows of recent rate samples
#[derive(Debug, Clone)]
pub struct RollingAverager {
    /// Maximum number of samples per layer (never exceeded)
    capacity: usize,
    windows: BTreeMap<LayerId, VecDeque<f64>>,
}

impl RollingAverager {
    /// Create an averager for `layers`, each holding at most `capacity` samples.
    pub fn new(layers: &[LayerId], capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(DrmuError::InvalidWindowSize { size: capacity });
        }

        let windows = layers
            .iter()
            .map(|&layer| (layer, VecDeque::with_capacity(capacity)))
            .collect();

        Ok(Self { capacity, windows })
    }

    /// Append `rate` to the layer's window and return the rounded mean.
    ///
    /// # Example
    /// ```
    /// use drmu::engine::RollingAverager;
    /// let mut averager = RollingAverager::new(&[1], 3).unwrap();
    /// assert_eq!(averager.push(1, 1.0).unwrap(), 1.0);
    /// assert_eq!(averager.push(1, 2.0).unwrap(), 1.5);
    /// ```
    pub fn push(&mut self, layer: LayerId, rate: f64) -> Result<f64> {
        let window = self
            .windows
            .get_mut(&layer)
            .ok_or(DrmuError::UnknownLayer { layer })?;

        if window.len() >= self.capacity {
            window.pop_front();
        }
        window.push_back(rate);

        Ok(mean(window))
    }

    /// Current rounded mean for a layer, `None` before its first sample.
    pub fn average(&self, layer: LayerId) -> Option<f64> {
        self.windows
            .get(&layer)
            .filter(|window| !window.is_empty())
            .map(mean)
    }

    /// Samples currently held for a layer, oldest first.
    pub fn window(&self, layer: LayerId) -> Option<&VecDeque<f64>> {
        self.windows.get(&layer)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

fn mean(window: &VecDeque<f64>) -> f64 {
    let sum: f64 = window.iter().sum();
    round_to(sum / window.len() as f64, AVERAGE_DECIMALS)
}
