//! Engine Configuration
//!
//! Typed settings consumed once, at engine construction. Every field has
//! a default so a partial JSON file is enough to configure a session.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DrmuError, Result};

/// Identifier of a monitored layer (sensor channel), as numbered by the instrument.
pub type LayerId = u8;

/// Default number of rate samples in the rolling average.
pub const DEFAULT_RATE_WINDOW_SIZE: usize = 10;

/// Default accumulated thickness between composition samples.
pub const DEFAULT_DEPTH_SAMPLE_INTERVAL: f64 = 5.0;

/// Default instrument clock period in seconds (`mm:ss` counter, 00:00 to 99:59).
pub const DEFAULT_WRAP_PERIOD: f64 = 6000.0;

/// Default program name written into the log banner.
pub const DEFAULT_PROGRAM_NAME: &str = "DRMU";

/// Configuration for a [`DepositionEngine`](crate::engine::DepositionEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Configured layers (one, or two for co-deposition).
    pub layers: Vec<LayerId>,

    /// Number of rate samples kept per layer for the rolling average.
    pub rate_window_size: usize,

    /// Accumulated thickness between two composition points.
    pub depth_sample_interval: f64,

    /// Layer whose fraction is reported as the alloy composition.
    pub primary_layer: LayerId,

    /// Zero time and thickness whenever a log is started.
    pub zero_on_start: bool,

    /// Period after which the instrument's elapsed-time counter wraps.
    ///
    /// Only one wrap is detected between consecutive ticks, so the poll
    /// interval must be shorter than this.
    pub wrap_period: f64,

    /// Factor applied to thickness before dividing by time for the aggregate rate.
    pub thickness_scale: f64,

    /// Program name written into the log banner.
    pub program_name: String,

    /// Unit label used in the exported column headers.
    pub thickness_unit: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            layers: vec![1],
            rate_window_size: DEFAULT_RATE_WINDOW_SIZE,
            depth_sample_interval: DEFAULT_DEPTH_SAMPLE_INTERVAL,
            primary_layer: 1,
            zero_on_start: true,
            wrap_period: DEFAULT_WRAP_PERIOD,
            thickness_scale: 1.0,
            program_name: DEFAULT_PROGRAM_NAME.to_string(),
            thickness_unit: "units".to_string(),
        }
    }
}

impl EngineConfig {
    /// Single-layer configuration monitoring `layer`.
    pub fn single(layer: LayerId) -> Self {
        Self {
            layers: vec![layer],
            primary_layer: layer,
            ..Self::default()
        }
    }

    /// Co-deposition configuration with `primary` as the reported material.
    pub fn co_deposition(primary: LayerId, secondary: LayerId) -> Self {
        let mut layers = vec![primary, secondary];
        layers.sort_unstable();
        Self {
            layers,
            primary_layer: primary,
            ..Self::default()
        }
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| DrmuError::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json_str(&content)
    }

    /// True when two layers are configured.
    pub fn is_co_deposition(&self) -> bool {
        self.layers.len() == 2
    }

    /// Check every field. The engine refuses to start with an invalid config.
    pub fn validate(&self) -> Result<()> {
        match self.layers.as_slice() {
            [a, b] if a == b => {
                return Err(DrmuError::InvalidLayerSet {
                    reason: format!("layer {} listed twice", a),
                })
            }
            [_] | [_, _] => {}
            other => {
                return Err(DrmuError::InvalidLayerSet {
                    reason: format!("expected 1 or 2 layers, got {}", other.len()),
                })
            }
        }

        if self.rate_window_size == 0 {
            return Err(DrmuError::InvalidWindowSize {
                size: self.rate_window_size,
            });
        }

        if !self.layers.contains(&self.primary_layer) {
            return Err(DrmuError::UnknownPrimaryLayer {
                layer: self.primary_layer,
            });
        }

        if !(self.depth_sample_interval.is_finite() && self.depth_sample_interval > 0.0) {
            return Err(DrmuError::InvalidSampleInterval {
                interval: self.depth_sample_interval,
            });
        }

        for (field, value) in [
            ("wrap period", self.wrap_period),
            ("thickness scale", self.thickness_scale),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(DrmuError::InvalidPositive { field, value });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use test_case::test_case;

    #[test]
    fn test_default_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.rate_window_size, 10);
        assert_eq!(config.depth_sample_interval, 5.0);
        assert!(config.zero_on_start);
        assert!(!config.is_co_deposition());
    }

    #[test]
    fn test_single_layer() {
        let config = EngineConfig::single(2);
        assert_eq!(config.layers, vec![2]);
        assert_eq!(config.primary_layer, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_co_deposition_keeps_primary() {
        let config = EngineConfig::co_deposition(2, 1);
        assert_eq!(config.layers, vec![1, 2]);
        assert_eq!(config.primary_layer, 2);
        assert!(config.is_co_deposition());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_window_rejected() {
        let config = EngineConfig {
            rate_window_size: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(DrmuError::InvalidWindowSize { size: 0 })
        ));
    }

    #[test]
    fn test_unknown_primary_rejected() {
        let config = EngineConfig {
            primary_layer: 3,
            ..EngineConfig::co_deposition(1, 2)
        };
        assert!(matches!(
            config.validate(),
            Err(DrmuError::UnknownPrimaryLayer { layer: 3 })
        ));
    }

    #[test_case(0.0 ; "zero")]
    #[test_case(-5.0 ; "negative")]
    #[test_case(f64::NAN ; "nan")]
    fn test_bad_sample_interval_rejected(interval: f64) {
        let config = EngineConfig {
            depth_sample_interval: interval,
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(DrmuError::InvalidSampleInterval { .. })
        ));
    }

    #[test_case(vec![] ; "empty")]
    #[test_case(vec![1, 1] ; "duplicate")]
    #[test_case(vec![1, 2, 3] ; "three layers")]
    fn test_bad_layer_set_rejected(layers: Vec<LayerId>) {
        let config = EngineConfig {
            layers,
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(DrmuError::InvalidLayerSet { .. })
        ));
    }

    #[test]
    fn test_bad_wrap_period_rejected() {
        let config = EngineConfig {
            wrap_period: 0.0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(DrmuError::InvalidPositive { field: "wrap period", .. })
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            EngineConfig::from_json_str(r#"{"layers": [1, 2], "primary_layer": 2}"#).unwrap();
        assert_eq!(config.layers, vec![1, 2]);
        assert_eq!(config.primary_layer, 2);
        assert_eq!(config.rate_window_size, DEFAULT_RATE_WINDOW_SIZE);
        assert_eq!(config.wrap_period, DEFAULT_WRAP_PERIOD);
    }

    #[test]
    fn test_invalid_json_config_rejected() {
        let result = EngineConfig::from_json_str(r#"{"rate_window_size": 0}"#);
        assert!(matches!(result, Err(DrmuError::InvalidWindowSize { .. })));
    }

    #[test]
    fn test_load_from_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("drmu.json");
        let config = EngineConfig::co_deposition(1, 2);
        fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let result = EngineConfig::load(Path::new("/nonexistent/drmu.json"));
        assert!(matches!(result, Err(DrmuError::ConfigRead { .. })));
    }
}
