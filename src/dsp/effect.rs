//! Effect trait definition
//!
//! Common per-sample interface shared by the distortion stage, the
//! low-pass filter and the chain that composes them.

use crate::error::{FxError, Result};
use serde_json::Value;

/// Base trait for all per-sample effects
///
/// `process_sample` and `process_block` run on the audio thread and must
/// stay allocation-free. Everything else is control-plane.
pub trait Effect: Send {
    /// Process one sample
    fn process_sample(&mut self, input: f32) -> f32;

    /// Process a block of samples in place, in temporal order
    fn process_block(&mut self, samples: &mut [f32]) {
        for sample in samples.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }

    /// Reset effect state
    ///
    /// Clears any internal history (e.g. filter delay elements).
    fn reset(&mut self);

    /// Get the effect type identifier
    fn effect_type(&self) -> &'static str;

    /// Get human-readable display name
    fn display_name(&self) -> &'static str;

    /// Get all parameters as JSON (for the control surface)
    fn get_params(&self) -> Value;

    /// Set a single parameter by name
    fn set_param(&mut self, name: &str, value: &Value) -> Result<()>;
}

/// Read a finite number out of a JSON parameter value at full precision
pub(crate) fn param_f64(name: &str, value: &Value) -> Result<f64> {
    match value.as_f64() {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(FxError::InvalidParameter {
            param: name.to_string(),
            value: value.to_string(),
            expected: "finite number".to_string(),
        }),
    }
}

/// Read a finite number out of a JSON parameter value
pub(crate) fn param_f32(name: &str, value: &Value) -> Result<f32> {
    param_f64(name, value).map(|v| v as f32)
}

/// Read a boolean out of a JSON parameter value
pub(crate) fn param_bool(name: &str, value: &Value) -> Result<bool> {
    value.as_bool().ok_or_else(|| FxError::InvalidParameter {
        param: name.to_string(),
        value: value.to_string(),
        expected: "bool".to_string(),
    })
}
