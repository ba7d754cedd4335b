//! Distortion Stage
//!
//! Stateless fuzz: boost, hard clip at `±threshold`, then normalize by
//! `threshold` so the output always spans `[-1, 1]`. A soft (tanh)
//! overdrive curve is available as an alternative clip mode.

use crate::dsp::effect::{param_f32, Effect};
use crate::error::{FxError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// ============================================================================
// Constants
// ============================================================================

/// Default boost applied before clipping
pub const DEFAULT_GAIN: f32 = 10.0;

/// Default clip bound
pub const DEFAULT_THRESHOLD: f32 = 0.5;

/// Smallest threshold magnitude; keeps the normalization divisor non-zero
pub const MIN_THRESHOLD: f32 = 1.0e-6;

// ============================================================================
// Clip Mode
// ============================================================================

/// Waveshaping curve used by the distortion stage
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClipMode {
    /// Truncate at `±threshold`, normalized to `[-1, 1]` (fuzz)
    #[default]
    Hard,
    /// `tanh(input * gain)`, threshold unused (overdrive)
    Soft,
}

impl ClipMode {
    /// Parse clip mode from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "hard" | "fuzz" => Some(ClipMode::Hard),
            "soft" | "overdrive" => Some(ClipMode::Soft),
            _ => None,
        }
    }

    /// Get string identifier
    pub fn to_str(&self) -> &'static str {
        match self {
            ClipMode::Hard => "hard",
            ClipMode::Soft => "soft",
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

#[inline]
fn hard_clip(x: f32, gain: f32, threshold: f32) -> f32 {
    let boosted = x * gain;
    boosted.clamp(-threshold, threshold) / threshold
}

#[inline]
fn soft_clip(x: f32, gain: f32) -> f32 {
    (x * gain).tanh()
}

/// Clamp a threshold to a usable positive magnitude
#[inline]
pub(crate) fn sanitize_threshold(threshold: f32) -> f32 {
    threshold.abs().max(MIN_THRESHOLD)
}

// ============================================================================
// Distortion Stage
// ============================================================================

/// Hard-clipping fuzz stage
///
/// # Parameters
/// - `gain`: boost applied before clipping
/// - `threshold`: clip bound and normalization divisor, never zero
/// - `mode`: [`ClipMode::Hard`] or [`ClipMode::Soft`]
///
/// The stage has no signal state, so calls are independent and
/// order-insensitive. Parameter changes apply from the next sample.
/// Deserialized values go through [`DistortionStage::with_mode`], so the
/// threshold is sanitized on that path too.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawDistortion")]
pub struct DistortionStage {
    gain: f32,
    threshold: f32,
    mode: ClipMode,
}

impl DistortionStage {
    /// Create a hard-clipping stage
    ///
    /// A non-finite `gain` or `threshold` falls back to its default; the
    /// threshold magnitude is clamped to [`MIN_THRESHOLD`].
    pub fn new(gain: f32, threshold: f32) -> Self {
        let gain = if gain.is_finite() { gain } else { DEFAULT_GAIN };
        let threshold = if threshold.is_finite() {
            sanitize_threshold(threshold)
        } else {
            DEFAULT_THRESHOLD
        };
        Self {
            gain,
            threshold,
            mode: ClipMode::Hard,
        }
    }

    /// Create a stage with an explicit clip mode
    pub fn with_mode(gain: f32, threshold: f32, mode: ClipMode) -> Self {
        let mut stage = Self::new(gain, threshold);
        stage.mode = mode;
        stage
    }

    /// Process a single sample
    #[inline]
    pub fn process(&self, input: f32) -> f32 {
        match self.mode {
            ClipMode::Hard => hard_clip(input, self.gain, self.threshold),
            ClipMode::Soft => soft_clip(input, self.gain),
        }
    }

    /// Set the boost; rejects non-finite values and keeps the old one
    pub fn set_gain(&mut self, gain: f32) -> Result<()> {
        if !gain.is_finite() {
            log::warn!("Rejected distortion gain {}", gain);
            return Err(FxError::InvalidParameter {
                param: "gain".to_string(),
                value: gain.to_string(),
                expected: "finite number".to_string(),
            });
        }
        self.gain = gain;
        Ok(())
    }

    /// Get the current boost
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Set the clip threshold
    ///
    /// Rejects non-finite values. Finite values are clamped to a magnitude
    /// of at least [`MIN_THRESHOLD`], so zero and negative inputs are
    /// accepted but never used as-is.
    pub fn set_threshold(&mut self, threshold: f32) -> Result<()> {
        if !threshold.is_finite() {
            log::warn!("Rejected distortion threshold {}", threshold);
            return Err(FxError::InvalidParameter {
                param: "threshold".to_string(),
                value: threshold.to_string(),
                expected: "finite number".to_string(),
            });
        }
        self.threshold = sanitize_threshold(threshold);
        Ok(())
    }

    /// Get the current threshold (always > 0)
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Take already-validated parameters from the audio thread, without logging
    #[inline]
    pub(crate) fn apply_validated(&mut self, gain: f32, threshold: f32) {
        self.gain = gain;
        self.threshold = sanitize_threshold(threshold);
    }

    /// Set the clip mode
    pub fn set_mode(&mut self, mode: ClipMode) {
        self.mode = mode;
    }

    /// Get the current clip mode
    pub fn mode(&self) -> ClipMode {
        self.mode
    }
}

/// Unchecked wire form of [`DistortionStage`]
#[derive(Deserialize)]
struct RawDistortion {
    gain: f32,
    threshold: f32,
    #[serde(default)]
    mode: ClipMode,
}

impl From<RawDistortion> for DistortionStage {
    fn from(raw: RawDistortion) -> Self {
        Self::with_mode(raw.gain, raw.threshold, raw.mode)
    }
}

impl Default for DistortionStage {
    fn default() -> Self {
        Self::new(DEFAULT_GAIN, DEFAULT_THRESHOLD)
    }
}

impl Effect for DistortionStage {
    fn process_sample(&mut self, input: f32) -> f32 {
        self.process(input)
    }

    fn reset(&mut self) {
        // Stateless
    }

    fn effect_type(&self) -> &'static str {
        "distortion"
    }

    fn display_name(&self) -> &'static str {
        "Fuzz"
    }

    fn get_params(&self) -> Value {
        json!({
            "gain": self.gain,
            "threshold": self.threshold,
            "mode": self.mode.to_str(),
        })
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        match name {
            "gain" => self.set_gain(param_f32(name, value)?),
            "threshold" => self.set_threshold(param_f32(name, value)?),
            "mode" => {
                let mode = value
                    .as_str()
                    .and_then(ClipMode::from_str)
                    .ok_or_else(|| FxError::InvalidParameter {
                        param: name.to_string(),
                        value: value.to_string(),
                        expected: "\"hard\" or \"soft\"".to_string(),
                    })?;
                self.set_mode(mode);
                Ok(())
            }
            _ => Err(FxError::UnknownParameter {
                name: name.to_string(),
            }),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use test_case::test_case;

    #[test]
    fn test_unity_gain_passes_small_signal() {
        let fuzz = DistortionStage::new(1.0, 1.0);
        assert_eq!(fuzz.process(0.5), 0.5);
        assert_eq!(fuzz.process(-0.25), -0.25);
    }

    #[test]
    fn test_full_saturation() {
        // 1.0 * 10 = 10, clamped to 0.5, normalized by 0.5
        let fuzz = DistortionStage::new(10.0, 0.5);
        assert_eq!(fuzz.process(1.0), 1.0);
        assert_eq!(fuzz.process(-1.0), -1.0);
    }

    #[test]
    fn test_partial_clip_is_linear_below_threshold() {
        let fuzz = DistortionStage::new(2.0, 0.5);
        // 0.1 * 2 = 0.2, below 0.5, so 0.2 / 0.5
        assert_relative_eq!(fuzz.process(0.1), 0.4, epsilon = 1e-6);
    }

    #[test_case(1.0, 1.0; "unity")]
    #[test_case(15.0, 0.4; "chain default")]
    #[test_case(100.0, 0.01; "extreme gain")]
    #[test_case(0.5, 2.0; "threshold above signal")]
    fn test_output_bounded(gain: f32, threshold: f32) {
        let fuzz = DistortionStage::new(gain, threshold);
        for i in -200..=200 {
            let x = i as f32 / 50.0;
            let y = fuzz.process(x);
            assert!((-1.0..=1.0).contains(&y), "{} -> {} out of range", x, y);
        }
    }

    #[test]
    fn test_zero_threshold_is_clamped() {
        let mut fuzz = DistortionStage::default();
        fuzz.set_threshold(0.0).unwrap();
        assert_eq!(fuzz.threshold(), MIN_THRESHOLD);

        let y = fuzz.process(0.3);
        assert!(y.is_finite());
        assert_eq!(y, 1.0);
    }

    #[test]
    fn test_negative_threshold_uses_magnitude() {
        let fuzz = DistortionStage::new(10.0, -0.5);
        assert_eq!(fuzz.threshold(), 0.5);
        assert_eq!(fuzz.process(1.0), 1.0);
    }

    #[test]
    fn test_non_finite_parameters_rejected() {
        let mut fuzz = DistortionStage::new(4.0, 0.25);
        assert!(fuzz.set_gain(f32::NAN).is_err());
        assert!(fuzz.set_threshold(f32::INFINITY).is_err());
        assert_eq!(fuzz.gain(), 4.0);
        assert_eq!(fuzz.threshold(), 0.25);

        let fallback = DistortionStage::new(f32::NAN, f32::NAN);
        assert_eq!(fallback.gain(), DEFAULT_GAIN);
        assert_eq!(fallback.threshold(), DEFAULT_THRESHOLD);
    }

    #[test]
    fn test_soft_clip_is_tanh() {
        let fuzz = DistortionStage::with_mode(5.0, 0.5, ClipMode::Soft);
        assert_relative_eq!(fuzz.process(0.1), 0.5_f32.tanh(), epsilon = 1e-6);
        assert!(fuzz.process(10.0) < 1.0 + f32::EPSILON);
    }

    #[test]
    fn test_clip_mode_from_str() {
        assert_eq!(ClipMode::from_str("HARD"), Some(ClipMode::Hard));
        assert_eq!(ClipMode::from_str("overdrive"), Some(ClipMode::Soft));
        assert_eq!(ClipMode::from_str("fold"), None);
    }

    #[test]
    fn test_set_param() {
        let mut fuzz = DistortionStage::default();
        fuzz.set_param("gain", &json!(20.0)).unwrap();
        fuzz.set_param("threshold", &json!(0.3)).unwrap();
        fuzz.set_param("mode", &json!("soft")).unwrap();

        assert_eq!(fuzz.gain(), 20.0);
        assert_relative_eq!(fuzz.threshold(), 0.3);
        assert_eq!(fuzz.mode(), ClipMode::Soft);

        assert!(fuzz.set_param("mode", &json!("fold")).is_err());
        let err = fuzz.set_param("bias", &json!(0.1)).unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_PARAMETER");
    }

    #[test_case(r#"{"gain":1.0,"threshold":0.0,"mode":"hard"}"#, MIN_THRESHOLD; "zero threshold")]
    #[test_case(r#"{"gain":1.0,"threshold":-0.5,"mode":"hard"}"#, 0.5; "negative threshold")]
    #[test_case(r#"{"gain":1.0,"threshold":0.25}"#, 0.25; "mode omitted")]
    fn test_deserialize_sanitizes_threshold(json: &str, expected: f32) {
        let fuzz: DistortionStage = serde_json::from_str(json).unwrap();
        assert_eq!(fuzz.threshold(), expected);
        assert_eq!(fuzz.mode(), ClipMode::Hard);

        for x in [0.1_f32, -0.1, 1.0, -1.0] {
            let y = fuzz.process(x);
            assert!(y.is_finite() && (-1.0..=1.0).contains(&y), "{} -> {}", x, y);
        }
    }

    #[test]
    fn test_serialize_round_trip_keeps_stage() {
        let fuzz = DistortionStage::with_mode(7.0, 0.3, ClipMode::Soft);
        let json = serde_json::to_string(&fuzz).unwrap();
        let back: DistortionStage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fuzz);
    }

    #[test]
    fn test_get_params() {
        let fuzz = DistortionStage::new(15.0, 0.4);
        let params = fuzz.get_params();
        assert_eq!(params["gain"], json!(15.0));
        assert_eq!(params["mode"], json!("hard"));
    }
}
