//! Fuzzbox - Real-Time Guitar Signal Chain
//!
//! A per-sample effects processor for a driving audio engine:
//! hard-clip fuzz into a Butterworth low-pass, each stage behind its own
//! enable flag.
//!
//! # Architecture
//!
//! - [`dsp`]: distortion stage, low-pass filter, the chain that composes
//!   them, and the lock-free controller used from a control thread
//! - [`config`]: start-up settings for a chain
//! - [`analysis`]: signal generators and measurements for offline checks
//!
//! Device enumeration, stream lifecycle and buffer marshalling belong to
//! the host engine.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod dsp;
pub mod error;

pub use config::ChainSettings;
pub use dsp::{ChainController, DistortionStage, EffectChain, LowPassFilter};
pub use error::{FxError, Result};
