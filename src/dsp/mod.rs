//! DSP core
//!
//! Per-sample guitar signal chain: a hard-clip fuzz followed by a biquad
//! low-pass. Everything reachable from `process` is allocation-free.

mod chain;
mod distortion;
mod effect;
pub mod filter;
mod shared;

pub use chain::EffectChain;
pub use distortion::{ClipMode, DistortionStage, DEFAULT_GAIN, DEFAULT_THRESHOLD, MIN_THRESHOLD};
pub use effect::Effect;
pub use filter::{BiquadCoeffs, BiquadState, LowPassFilter, BUTTERWORTH_Q};
pub use shared::{ChainController, ParamSnapshot, SharedParams};
