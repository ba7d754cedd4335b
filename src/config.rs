//! Chain configuration
//!
//! Start-up settings for an [`EffectChain`](crate::dsp::EffectChain). Settings
//! are read once (JSON, every field optional) and never written back.

use crate::dsp::filter::{validate_design, validate_sample_rate};
use crate::dsp::ClipMode;
use crate::error::{FxError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default fuzz boost for a new chain
pub const DEFAULT_CHAIN_GAIN: f32 = 15.0;

/// Default fuzz clip threshold for a new chain
pub const DEFAULT_CHAIN_THRESHOLD: f32 = 0.4;

/// Default low-pass cutoff in Hz
pub const DEFAULT_CUTOFF_HZ: f64 = 5000.0;

/// Highest default cutoff as a fraction of the sample rate
///
/// Only used to pull [`DEFAULT_CUTOFF_HZ`] below Nyquist at low sample rates.
pub const MAX_DEFAULT_CUTOFF_RATIO: f64 = 0.45;

/// Default cutoff for a given sample rate
pub fn default_cutoff(sample_rate: f64) -> f64 {
    DEFAULT_CUTOFF_HZ.min(sample_rate * MAX_DEFAULT_CUTOFF_RATIO)
}

/// Settings for one effect chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChainSettings {
    /// Fuzz boost before clipping
    pub gain: f32,
    /// Fuzz clip bound (> 0)
    pub threshold: f32,
    /// Waveshaping curve
    pub clip_mode: ClipMode,
    /// Low-pass cutoff in Hz, below Nyquist
    pub cutoff_hz: f64,
    pub fuzz_enabled: bool,
    pub filter_enabled: bool,
    /// Clear filter history whenever the cutoff changes
    pub reset_on_redesign: bool,
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            gain: DEFAULT_CHAIN_GAIN,
            threshold: DEFAULT_CHAIN_THRESHOLD,
            clip_mode: ClipMode::Hard,
            cutoff_hz: DEFAULT_CUTOFF_HZ,
            fuzz_enabled: true,
            filter_enabled: true,
            reset_on_redesign: false,
        }
    }
}

impl ChainSettings {
    /// Defaults with the cutoff pulled below Nyquist for `sample_rate`
    pub fn for_sample_rate(sample_rate: f64) -> Self {
        Self {
            cutoff_hz: default_cutoff(sample_rate),
            ..Self::default()
        }
    }

    /// Check every field against `sample_rate`
    pub fn validate(&self, sample_rate: f64) -> Result<()> {
        validate_sample_rate(sample_rate)?;

        if !self.gain.is_finite() {
            return Err(FxError::InvalidParameter {
                param: "gain".to_string(),
                value: self.gain.to_string(),
                expected: "finite number".to_string(),
            });
        }

        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(FxError::InvalidParameter {
                param: "threshold".to_string(),
                value: self.threshold.to_string(),
                expected: "finite number > 0".to_string(),
            });
        }

        validate_design(sample_rate, self.cutoff_hz).map(|_| ())
    }

    /// Parse settings from a JSON string; missing fields take defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        log::info!("Loading chain settings from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text).map_err(|e| FxError::InvalidConfig {
            reason: format!("{}: {}", path.display(), e),
        })
    }
}
