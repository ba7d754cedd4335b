//! Error handling for Fuzzbox
//!
//! Errors never cross the audio thread: every fallible call is a
//! control-plane operation that reports through `Result`.

use thiserror::Error;

/// Result type alias for Fuzzbox operations
pub type Result<T> = std::result::Result<T, FxError>;

/// Main error type for Fuzzbox operations
#[derive(Error, Debug)]
pub enum FxError {
    // Parameter Errors
    #[error("Invalid value for {param}: {value} (expected {expected})")]
    InvalidParameter {
        param: String,
        value: String,
        expected: String,
    },

    #[error("Invalid sample rate: {sample_rate} Hz (must be finite and > 0)")]
    InvalidSampleRate { sample_rate: f64 },

    #[error("Cutoff {cutoff} Hz outside (0, {nyquist}) Hz")]
    CutoffOutOfRange { cutoff: f64, nyquist: f64 },

    #[error("Filter design is unstable (a1={a1}, a2={a2})")]
    UnstableFilter { a1: f64, a2: f64 },

    #[error("Unknown parameter: {name}")]
    UnknownParameter { name: String },

    // Configuration Errors
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FxError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            FxError::InvalidParameter { .. } => "INVALID_PARAMETER",
            FxError::InvalidSampleRate { .. } => "INVALID_SAMPLE_RATE",
            FxError::CutoffOutOfRange { .. } => "CUTOFF_OUT_OF_RANGE",
            FxError::UnstableFilter { .. } => "UNSTABLE_FILTER",
            FxError::UnknownParameter { .. } => "UNKNOWN_PARAMETER",
            FxError::InvalidConfig { .. } => "INVALID_CONFIG",
            FxError::Io(_) => "IO_ERROR",
            FxError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error is recoverable
    ///
    /// A rejected parameter leaves the previous value in place, so the
    /// chain keeps running and the caller may simply retry.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FxError::InvalidParameter { .. }
                | FxError::CutoffOutOfRange { .. }
                | FxError::UnstableFilter { .. }
                | FxError::UnknownParameter { .. }
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            FxError::InvalidSampleRate { .. } => vec![
                "Use the sample rate reported by the audio device",
                "Common rates: 44100, 48000, 96000 Hz",
            ],
            FxError::CutoffOutOfRange { .. } | FxError::UnstableFilter { .. } => vec![
                "Choose a cutoff above 0 Hz and below half the sample rate",
                "The previous filter design is still active",
            ],
            FxError::InvalidParameter { .. } => vec![
                "Parameters must be finite numbers",
                "The previous value is still active",
            ],
            FxError::UnknownParameter { .. } => vec![
                "Run 'fuzzbox params' to list parameter names",
            ],
            FxError::InvalidConfig { .. } | FxError::Serialization(_) => vec![
                "Check the configuration file is valid JSON",
                "Omitted fields fall back to their defaults",
            ],
            FxError::Io(_) => vec!["Check the configuration path is correct"],
        }
    }
}
