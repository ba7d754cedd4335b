//! Signal measurement utilities
//!
//! Synthesized test signals and objective measurements, used by the CLI and
//! the tests to check the chain without listening to it.

use serde::Serialize;
use std::f64::consts::PI;

/// Convert linear amplitude to decibels
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

/// Generate a sine wave of `duration_secs` at `amplitude`
pub fn sine_wave(frequency: f64, amplitude: f32, duration_secs: f64, sample_rate: f64) -> Vec<f32> {
    let num_samples = (duration_secs * sample_rate).round().max(0.0) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f64 / sample_rate;
            amplitude * (2.0 * PI * frequency * t).sin() as f32
        })
        .collect()
}

/// Calculate RMS level (linear)
pub fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&s| (s as f64).powi(2)).sum();
    (sum_sq / samples.len() as f64).sqrt() as f32
}

/// Calculate peak level (linear)
pub fn calculate_peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0_f32, |peak, &s| peak.max(s.abs()))
}

/// Calculate DC offset (mean of all samples)
pub fn calculate_dc_offset(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| s as f64).sum();
    (sum / samples.len() as f64) as f32
}

/// Summary measurements for one signal
#[derive(Debug, Clone, Serialize)]
pub struct SignalAnalysis {
    pub rms_linear: f32,
    pub rms_db: f32,
    pub peak_linear: f32,
    pub peak_db: f32,
    pub dc_offset: f32,
    /// Count of NaN or infinite samples
    pub non_finite: usize,
    pub num_samples: usize,
}

impl SignalAnalysis {
    pub fn analyze(samples: &[f32]) -> Self {
        let rms_linear = calculate_rms(samples);
        let peak_linear = calculate_peak(samples);
        Self {
            rms_linear,
            rms_db: linear_to_db(rms_linear),
            peak_linear,
            peak_db: linear_to_db(peak_linear),
            dc_offset: calculate_dc_offset(samples),
            non_finite: samples.iter().filter(|s| !s.is_finite()).count(),
            num_samples: samples.len(),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.non_finite == 0
    }

    /// One-line human readable summary
    pub fn summary(&self) -> String {
        format!(
            "RMS {:.2} dBFS | Peak {:.2} dBFS | DC {:+.4} | {} samples{}",
            self.rms_db,
            self.peak_db,
            self.dc_offset,
            self.num_samples,
            if self.is_finite() {
                String::new()
            } else {
                format!(" | {} non-finite", self.non_finite)
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sine_wave_length_and_level() {
        let sine = sine_wave(441.0, 0.5, 1.0, 44100.0);
        assert_eq!(sine.len(), 44100);
        assert_relative_eq!(calculate_peak(&sine), 0.5, epsilon = 1e-3);
        assert_relative_eq!(calculate_rms(&sine), 0.5 / 2.0_f32.sqrt(), epsilon = 1e-3);
        assert!(calculate_dc_offset(&sine).abs() < 1e-4);
    }

    #[test]
    fn test_linear_to_db() {
        assert_eq!(linear_to_db(0.0), f32::NEG_INFINITY);
        assert_relative_eq!(linear_to_db(1.0), 0.0);
        assert_relative_eq!(linear_to_db(0.5), -6.0206, epsilon = 1e-3);
    }

    #[test]
    fn test_empty_signal() {
        let analysis = SignalAnalysis::analyze(&[]);
        assert_eq!(analysis.rms_linear, 0.0);
        assert_eq!(analysis.num_samples, 0);
        assert!(analysis.is_finite());
    }

    #[test]
    fn test_counts_non_finite() {
        let analysis = SignalAnalysis::analyze(&[0.1, f32::NAN, f32::INFINITY]);
        assert_eq!(analysis.non_finite, 2);
        assert!(analysis.summary().contains("2 non-finite"));
    }
}
