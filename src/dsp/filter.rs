//! Recursive Low-Pass Filter
//!
//! Two-pole, two-zero biquad in direct form I, designed with the Audio EQ
//! Cookbook low-pass at a Butterworth quality factor.

use crate::dsp::effect::{param_bool, param_f64, Effect};
use crate::error::{FxError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::f64::consts::PI;

/// Quality factor for a maximally flat (Butterworth) second-order response
pub const BUTTERWORTH_Q: f64 = 0.707;

/// Minimum distance from the stability triangle edge
const STABILITY_MARGIN: f64 = 1.0e-12;

/// Biquad filter coefficients
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
/// Already normalized by a0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoeffs {
    /// Pass-through coefficients (`b0 = 1`, everything else 0)
    pub const IDENTITY: BiquadCoeffs = BiquadCoeffs {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Calculate low-pass coefficients using Audio EQ Cookbook formulas
    /// Reference: https://www.w3.org/2011/audio/audio-eq-cookbook.html
    ///
    /// No range checking; see [`LowPassFilter::design`].
    pub fn lowpass(sample_rate: f64, cutoff: f64) -> Self {
        let w0 = 2.0 * PI * cutoff / sample_rate;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let alpha = sin_w0 / (2.0 * BUTTERWORTH_Q);

        let a0 = 1.0 + alpha;
        let b0 = ((1.0 - cos_w0) / 2.0) / a0;

        BiquadCoeffs {
            b0,
            b1: (1.0 - cos_w0) / a0,
            b2: b0,
            a1: (-2.0 * cos_w0) / a0,
            a2: (1.0 - alpha) / a0,
        }
    }

    /// Gain at zero frequency: `(b0 + b1 + b2) / (1 + a1 + a2)`
    pub fn dc_gain(&self) -> f64 {
        (self.b0 + self.b1 + self.b2) / (1.0 + self.a1 + self.a2)
    }

    /// Both poles strictly inside the unit circle
    ///
    /// Stability triangle for `z^2 + a1*z + a2`: `|a2| < 1` and `|a1| < 1 + a2`,
    /// with a small margin so poles rounded onto the circle count as unstable.
    pub fn is_stable(&self) -> bool {
        self.a1.is_finite()
            && self.a2.is_finite()
            && self.a2.abs() < 1.0
            && self.a1.abs() < 1.0 + self.a2 - STABILITY_MARGIN
    }

    /// Magnitude of the frequency response at `frequency` Hz
    pub fn magnitude_at(&self, frequency: f64, sample_rate: f64) -> f64 {
        let w = 2.0 * PI * frequency / sample_rate;
        let (c1, s1) = (w.cos(), w.sin());
        let (c2, s2) = ((2.0 * w).cos(), (2.0 * w).sin());

        // e^{-jw} = cos w - j sin w
        let num_re = self.b0 + self.b1 * c1 + self.b2 * c2;
        let num_im = -(self.b1 * s1 + self.b2 * s2);
        let den_re = 1.0 + self.a1 * c1 + self.a2 * c2;
        let den_im = -(self.a1 * s1 + self.a2 * s2);

        (num_re.hypot(num_im)) / (den_re.hypot(den_im))
    }

    fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for BiquadCoeffs {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Filter history: previous two inputs and previous two outputs
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BiquadState {
    pub x1: f64, // x[n-1]
    pub x2: f64, // x[n-2]
    pub y1: f64, // y[n-1]
    pub y2: f64, // y[n-2]
}

impl BiquadState {
    /// Direct form I step
    #[inline]
    fn process(&mut self, input: f64, coeffs: &BiquadCoeffs) -> f64 {
        let output = coeffs.b0 * input + coeffs.b1 * self.x1 + coeffs.b2 * self.x2
            - coeffs.a1 * self.y1
            - coeffs.a2 * self.y2;

        // Shift delay line; order matters
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Check that a sample rate can be used to design a filter
pub fn validate_sample_rate(sample_rate: f64) -> Result<()> {
    if sample_rate.is_finite() && sample_rate > 0.0 {
        Ok(())
    } else {
        Err(FxError::InvalidSampleRate { sample_rate })
    }
}

/// Check that `cutoff` lies strictly between 0 and Nyquist
pub fn validate_cutoff(sample_rate: f64, cutoff: f64) -> Result<()> {
    validate_sample_rate(sample_rate)?;
    let nyquist = sample_rate / 2.0;
    if cutoff.is_finite() && cutoff > 0.0 && cutoff < nyquist {
        Ok(())
    } else {
        Err(FxError::CutoffOutOfRange { cutoff, nyquist })
    }
}

/// Check that a low-pass at `cutoff` can be designed and is stable
///
/// Range check plus the stability triangle. Returns the coefficients the
/// design would use.
pub fn validate_design(sample_rate: f64, cutoff: f64) -> Result<BiquadCoeffs> {
    validate_cutoff(sample_rate, cutoff)?;

    let coeffs = BiquadCoeffs::lowpass(sample_rate, cutoff);
    if !coeffs.is_stable() {
        return Err(FxError::UnstableFilter {
            a1: coeffs.a1,
            a2: coeffs.a2,
        });
    }
    Ok(coeffs)
}

/// Second-order low-pass filter
///
/// Starts as an identity pass-through until [`design`](Self::design) is
/// called. A redesign keeps the history by default, so changing the cutoff
/// while signal flows produces a short transient while the old state
/// drains through the new coefficients. Enable
/// [`set_reset_on_redesign`](Self::set_reset_on_redesign) to clear history
/// on every successful design instead.
#[derive(Debug, Clone, Default)]
pub struct LowPassFilter {
    coeffs: BiquadCoeffs,
    state: BiquadState,
    sample_rate: Option<f64>,
    cutoff: Option<f64>,
    reset_on_redesign: bool,
}

impl LowPassFilter {
    /// Create an identity (undesigned) filter
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a filter already designed for `cutoff` Hz
    pub fn lowpass(sample_rate: f64, cutoff: f64) -> Result<Self> {
        let mut filter = Self::new();
        filter.design(sample_rate, cutoff)?;
        Ok(filter)
    }

    /// Design the low-pass response
    ///
    /// Rejects a non-positive sample rate, a cutoff outside
    /// `(0, sample_rate / 2)`, and any design whose poles would not be
    /// strictly inside the unit circle. A rejected call leaves the
    /// coefficients untouched.
    pub fn design(&mut self, sample_rate: f64, cutoff: f64) -> Result<()> {
        match self.apply_design(sample_rate, cutoff) {
            Ok(()) => {
                log::debug!(
                    "Low-pass designed at {:.1} Hz (fs {:.0} Hz): {:?}",
                    cutoff,
                    sample_rate,
                    self.coeffs
                );
                Ok(())
            }
            Err(e) => {
                log::warn!("Rejected low-pass design: {}", e);
                Err(e)
            }
        }
    }

    /// Alias of [`design`](Self::design)
    pub fn set_lowpass(&mut self, sample_rate: f64, cutoff: f64) -> Result<()> {
        self.design(sample_rate, cutoff)
    }

    /// Redesign at a new cutoff, keeping the current sample rate
    pub fn set_cutoff(&mut self, cutoff: f64) -> Result<()> {
        let sample_rate = self.sample_rate.ok_or_else(|| FxError::InvalidConfig {
            reason: "filter has no sample rate; design it first".to_string(),
        })?;
        self.design(sample_rate, cutoff)
    }

    /// Design without logging, for use on the audio thread
    pub(crate) fn apply_design(&mut self, sample_rate: f64, cutoff: f64) -> Result<()> {
        self.coeffs = validate_design(sample_rate, cutoff)?;
        self.sample_rate = Some(sample_rate);
        self.cutoff = Some(cutoff);
        if self.reset_on_redesign {
            self.state.reset();
        }
        Ok(())
    }

    /// Process a single sample
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        self.state.process(input as f64, &self.coeffs) as f32
    }

    /// Zero all history; coefficients are kept
    pub fn reset(&mut self) {
        self.state.reset();
    }

    /// Clear history on every successful redesign
    pub fn set_reset_on_redesign(&mut self, enabled: bool) {
        self.reset_on_redesign = enabled;
    }

    pub fn reset_on_redesign(&self) -> bool {
        self.reset_on_redesign
    }

    pub fn coefficients(&self) -> BiquadCoeffs {
        self.coeffs
    }

    pub fn state(&self) -> BiquadState {
        self.state
    }

    /// Cutoff of the last successful design, `None` while identity
    pub fn cutoff(&self) -> Option<f64> {
        self.cutoff
    }

    /// Sample rate of the last successful design
    pub fn sample_rate(&self) -> Option<f64> {
        self.sample_rate
    }

    /// True until the first successful design
    pub fn is_identity(&self) -> bool {
        self.coeffs.is_identity()
    }
}

impl Effect for LowPassFilter {
    fn process_sample(&mut self, input: f32) -> f32 {
        self.process(input)
    }

    fn reset(&mut self) {
        LowPassFilter::reset(self);
    }

    fn effect_type(&self) -> &'static str {
        "lowpass"
    }

    fn display_name(&self) -> &'static str {
        "Low-Pass Filter"
    }

    fn get_params(&self) -> Value {
        json!({
            "cutoff": self.cutoff,
            "sample_rate": self.sample_rate,
            "q": BUTTERWORTH_Q,
            "reset_on_redesign": self.reset_on_redesign,
            "coefficients": self.coeffs,
        })
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        match name {
            "cutoff" => self.set_cutoff(param_f64(name, value)?),
            "reset_on_redesign" => {
                self.set_reset_on_redesign(param_bool(name, value)?);
                Ok(())
            }
            _ => Err(FxError::UnknownParameter {
                name: name.to_string(),
            }),
        }
    }
}
