//! Effect Chain
//!
//! Fixed two-stage processor: fuzz, then low-pass, each behind its own
//! enable flag. One chain serves one audio stream at a fixed sample rate.
//!
//! Toggling a stage takes effect on the very next sample. There is no
//! crossfade and the filter history is not flushed, so switching the filter
//! back in mid-stream can produce an audible step while stale history
//! drains. Call [`EffectChain::reset`] first if that matters.

use super::distortion::DistortionStage;
use super::effect::{param_bool, Effect};
use super::filter::{validate_sample_rate, LowPassFilter};
use super::shared::{ChainController, ParamSnapshot, SharedParams};
use crate::config::ChainSettings;
use crate::error::{FxError, Result};
use serde_json::{json, Value};
use std::sync::Arc;

/// Fuzz into low-pass processor
///
/// # Threading
/// The audio thread owns the chain and calls [`process`](Self::process) or
/// [`process_block`](Self::process_block). A control thread adjusts it
/// through a [`ChainController`] obtained from
/// [`controller`](Self::controller); published values are picked up between
/// samples by [`apply_pending`](Self::apply_pending). Once a controller
/// exists it is the source of truth: its next publish overwrites every
/// value set directly through `&mut` access, the cutoff included.
#[derive(Debug)]
pub struct EffectChain {
    distortion: DistortionStage,
    filter: LowPassFilter,
    fuzz_enabled: bool,
    filter_enabled: bool,
    sample_rate: f64,
    shared: Option<Arc<SharedParams>>,
    last_sequence: u64,
}

impl EffectChain {
    /// Create a chain with default settings
    ///
    /// Fuzz gain 15, threshold 0.4, low-pass at 5 kHz (or 45% of the
    /// sample rate if that is lower), both stages enabled.
    pub fn new(sample_rate: f64) -> Result<Self> {
        validate_sample_rate(sample_rate)?;
        Self::from_settings(sample_rate, &ChainSettings::for_sample_rate(sample_rate))
    }

    /// Create a chain from explicit settings
    pub fn from_settings(sample_rate: f64, settings: &ChainSettings) -> Result<Self> {
        settings.validate(sample_rate)?;

        let distortion =
            DistortionStage::with_mode(settings.gain, settings.threshold, settings.clip_mode);
        let mut filter = LowPassFilter::new();
        filter.set_reset_on_redesign(settings.reset_on_redesign);
        filter.design(sample_rate, settings.cutoff_hz)?;

        log::debug!(
            "Effect chain ready at {} Hz (fuzz {}, filter {})",
            sample_rate,
            settings.fuzz_enabled,
            settings.filter_enabled
        );

        Ok(Self {
            distortion,
            filter,
            fuzz_enabled: settings.fuzz_enabled,
            filter_enabled: settings.filter_enabled,
            sample_rate,
            shared: None,
            last_sequence: 0,
        })
    }

    /// Process one sample
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let mut output = input;

        if self.fuzz_enabled {
            output = self.distortion.process(output);
        }

        if self.filter_enabled {
            output = self.filter.process(output);
        }

        output
    }

    /// Process a buffer in place, applying any pending controller update first
    pub fn process_block(&mut self, samples: &mut [f32]) {
        self.apply_pending();
        for sample in samples.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    /// Pick up the latest controller snapshot, if any
    ///
    /// Wait-free and allocation-free. Returns `true` when new parameters
    /// were applied. A snapshot caught mid-write is skipped and picked up on
    /// a later call.
    pub fn apply_pending(&mut self) -> bool {
        let Some(shared) = self.shared.as_ref() else {
            return false;
        };
        let Some((sequence, snapshot)) = shared.read_if_newer(self.last_sequence) else {
            return false;
        };

        self.distortion
            .apply_validated(snapshot.gain, snapshot.threshold);
        self.fuzz_enabled = snapshot.fuzz_enabled;
        self.filter_enabled = snapshot.filter_enabled;

        // Compared against the live filter so direct edits are overwritten too
        let cutoff = snapshot.cutoff as f64;
        if self.filter.cutoff() != Some(cutoff) {
            // The controller only publishes stable designs; if one still
            // fails, the filter keeps its previous design and cutoff
            let _ = self.filter.apply_design(self.sample_rate, cutoff);
        }

        self.last_sequence = sequence;
        true
    }

    /// Get a control-plane handle, creating the shared parameter cell on first use
    pub fn controller(&mut self) -> ChainController {
        if let Some(shared) = &self.shared {
            return ChainController::new(shared.clone());
        }

        let snapshot = self.snapshot();
        let shared = Arc::new(SharedParams::new(self.sample_rate, snapshot));
        self.last_sequence = shared.sequence();
        self.shared = Some(shared.clone());

        log::debug!("Controller attached: {:?}", snapshot);
        ChainController::new(shared)
    }

    /// Current parameters as a snapshot
    pub fn snapshot(&self) -> ParamSnapshot {
        ParamSnapshot {
            gain: self.distortion.gain(),
            threshold: self.distortion.threshold(),
            cutoff: self.cutoff() as f32,
            fuzz_enabled: self.fuzz_enabled,
            filter_enabled: self.filter_enabled,
        }
    }

    /// Current parameters as settings
    pub fn settings(&self) -> ChainSettings {
        ChainSettings {
            gain: self.distortion.gain(),
            threshold: self.distortion.threshold(),
            clip_mode: self.distortion.mode(),
            cutoff_hz: self.cutoff(),
            fuzz_enabled: self.fuzz_enabled,
            filter_enabled: self.filter_enabled,
            reset_on_redesign: self.filter.reset_on_redesign(),
        }
    }

    pub fn set_fuzz_enabled(&mut self, enabled: bool) {
        self.fuzz_enabled = enabled;
    }

    pub fn set_filter_enabled(&mut self, enabled: bool) {
        self.filter_enabled = enabled;
    }

    pub fn fuzz_enabled(&self) -> bool {
        self.fuzz_enabled
    }

    pub fn filter_enabled(&self) -> bool {
        self.filter_enabled
    }

    /// Redesign the filter at the chain's sample rate
    pub fn set_cutoff(&mut self, cutoff: f64) -> Result<()> {
        self.filter.design(self.sample_rate, cutoff)
    }

    /// Current filter cutoff in Hz
    pub fn cutoff(&self) -> f64 {
        // from_settings always designs the filter, and failed designs keep the old one
        self.filter.cutoff().unwrap_or_default()
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn distortion(&self) -> &DistortionStage {
        &self.distortion
    }

    pub fn distortion_mut(&mut self) -> &mut DistortionStage {
        &mut self.distortion
    }

    pub fn filter(&self) -> &LowPassFilter {
        &self.filter
    }

    pub fn filter_mut(&mut self) -> &mut LowPassFilter {
        &mut self.filter
    }

    /// Clear filter history
    pub fn reset(&mut self) {
        self.filter.reset();
    }
}

impl Effect for EffectChain {
    fn process_sample(&mut self, input: f32) -> f32 {
        self.process(input)
    }

    fn process_block(&mut self, samples: &mut [f32]) {
        EffectChain::process_block(self, samples);
    }

    fn reset(&mut self) {
        EffectChain::reset(self);
    }

    fn effect_type(&self) -> &'static str {
        "chain"
    }

    fn display_name(&self) -> &'static str {
        "Fuzz + Low-Pass"
    }

    fn get_params(&self) -> Value {
        json!({
            "sample_rate": self.sample_rate,
            "fuzz_enabled": self.fuzz_enabled,
            "filter_enabled": self.filter_enabled,
            "distortion": self.distortion.get_params(),
            "filter": self.filter.get_params(),
        })
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        match name {
            "fuzz_enabled" => {
                self.set_fuzz_enabled(param_bool(name, value)?);
                Ok(())
            }
            "filter_enabled" => {
                self.set_filter_enabled(param_bool(name, value)?);
                Ok(())
            }
            "gain" | "threshold" | "mode" => self.distortion.set_param(name, value),
            "cutoff" | "reset_on_redesign" => self.filter.set_param(name, value),
            _ => Err(FxError::UnknownParameter {
                name: name.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_chain_defaults() {
        let chain = EffectChain::new(44100.0).unwrap();
        assert!(chain.fuzz_enabled());
        assert!(chain.filter_enabled());
        assert_eq!(chain.distortion().gain(), 15.0);
        assert_eq!(chain.distortion().threshold(), 0.4);
        assert_eq!(chain.cutoff(), 5000.0);
        assert_eq!(chain.sample_rate(), 44100.0);
    }

    #[test]
    fn test_low_sample_rate_pulls_default_cutoff_down() {
        let chain = EffectChain::new(8000.0).unwrap();
        assert!(chain.cutoff() < 4000.0);
    }

    #[test]
    fn test_invalid_sample_rate() {
        assert!(EffectChain::new(0.0).is_err());
        assert!(EffectChain::new(f64::NAN).is_err());
    }

    #[test]
    fn test_bypass_is_identity() {
        let mut chain = EffectChain::new(48000.0).unwrap();
        chain.set_fuzz_enabled(false);
        chain.set_filter_enabled(false);

        for i in -100..=100 {
            let x = i as f32 * 0.037;
            assert_eq!(chain.process(x), x);
        }
    }

    #[test]
    fn test_fuzz_only_matches_stage() {
        let mut chain = EffectChain::new(48000.0).unwrap();
        chain.set_filter_enabled(false);
        let stage = *chain.distortion();

        for x in [0.01_f32, -0.02, 0.5, -1.0] {
            assert_eq!(chain.process(x), stage.process(x));
        }
    }

    #[test]
    fn test_order_is_fuzz_then_filter() {
        let mut chain = EffectChain::new(48000.0).unwrap();
        let stage = *chain.distortion();
        let mut reference = chain.filter().clone();

        for i in 0..64 {
            let x = (i as f32 * 0.2).sin() * 0.3;
            let expected = reference.process(stage.process(x));
            assert_eq!(chain.process(x), expected);
        }
    }

    #[test]
    fn test_set_cutoff_uses_chain_sample_rate() {
        let mut chain = EffectChain::new(48000.0).unwrap();
        chain.set_cutoff(1000.0).unwrap();
        assert_eq!(chain.filter().sample_rate(), Some(48000.0));
        assert!(chain.set_cutoff(24000.0).is_err());
        assert_eq!(chain.cutoff(), 1000.0);
    }

    #[test]
    fn test_set_param_routing() {
        let mut chain = EffectChain::new(44100.0).unwrap();
        chain.set_param("fuzz_enabled", &json!(false)).unwrap();
        chain.set_param("gain", &json!(30.0)).unwrap();
        chain.set_param("cutoff", &json!(800.0)).unwrap();

        assert!(!chain.fuzz_enabled());
        assert_eq!(chain.distortion().gain(), 30.0);
        assert_eq!(chain.cutoff(), 800.0);

        let err = chain.set_param("volume", &json!(1.0)).unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_PARAMETER");

        let params = chain.get_params();
        assert_eq!(params["fuzz_enabled"], json!(false));
        assert_eq!(params["filter"]["cutoff"], json!(800.0));
    }

    #[test]
    fn test_settings_round_trip_through_chain() {
        let settings = ChainSettings {
            gain: 8.0,
            threshold: 0.25,
            cutoff_hz: 2500.0,
            filter_enabled: false,
            reset_on_redesign: true,
            ..ChainSettings::default()
        };
        let chain = EffectChain::from_settings(44100.0, &settings).unwrap();
        assert_eq!(chain.settings(), settings);
    }

    #[test]
    fn test_controller_updates_apply_between_blocks() {
        let mut chain = EffectChain::new(44100.0).unwrap();
        let controller = chain.controller();
        assert!(!chain.apply_pending());

        controller.set_fuzz_enabled(false);
        controller.set_filter_enabled(false);

        // Not applied until the audio side asks
        assert!(chain.fuzz_enabled());

        let mut block = [0.1_f32, -0.2, 0.3];
        chain.process_block(&mut block);
        assert_eq!(block, [0.1, -0.2, 0.3]);
        assert!(!chain.fuzz_enabled());
        assert!(!chain.filter_enabled());
    }

    #[test]
    fn test_controller_redesigns_filter() {
        let mut chain = EffectChain::new(48000.0).unwrap();
        let controller = chain.controller();

        controller.set_cutoff(1500.0).unwrap();
        controller.set_gain(4.0).unwrap();
        assert!(chain.apply_pending());

        assert_relative_eq!(chain.cutoff(), 1500.0);
        assert_eq!(chain.distortion().gain(), 4.0);
        assert!(controller.set_cutoff(30000.0).is_err());
        assert!(!chain.apply_pending());
        assert_relative_eq!(chain.cutoff(), 1500.0);
    }

    #[test]
    fn test_controller_rejects_unstable_cutoff() {
        let mut chain = EffectChain::new(48000.0).unwrap();
        let controller = chain.controller();

        let err = controller.set_cutoff(0.001).unwrap_err();
        assert_eq!(err.error_code(), "UNSTABLE_FILTER");
        assert!(!chain.apply_pending());

        assert_eq!(controller.snapshot().cutoff, 5000.0);
        assert_eq!(chain.cutoff(), 5000.0);
    }

    #[test]
    fn test_failed_redesign_keeps_previous_cutoff() {
        let mut chain = EffectChain::new(48000.0).unwrap();
        let controller = chain.controller();
        let before = chain.filter().coefficients();

        // Bypass controller validation to reach the audio-side fallback
        let shared = chain.shared.clone().unwrap();
        shared.store(ParamSnapshot {
            gain: 3.0,
            cutoff: 0.001,
            ..controller.snapshot()
        });

        assert!(chain.apply_pending());
        assert_eq!(chain.distortion().gain(), 3.0);
        assert_eq!(chain.cutoff(), 5000.0);
        assert_eq!(chain.filter().coefficients(), before);

        // A valid publish afterwards still lands
        controller.set_cutoff(1200.0).unwrap();
        assert!(chain.apply_pending());
        assert_eq!(chain.cutoff(), 1200.0);
    }

    #[test]
    fn test_controller_overrides_direct_cutoff() {
        let mut chain = EffectChain::new(48000.0).unwrap();
        let controller = chain.controller();

        chain.set_cutoff(2000.0).unwrap();
        controller.set_gain(6.0).unwrap();
        assert!(chain.apply_pending());

        assert_eq!(chain.cutoff(), controller.snapshot().cutoff as f64);
        assert_eq!(chain.cutoff(), 5000.0);
        assert_eq!(chain.distortion().gain(), 6.0);
    }

    #[test]
    fn test_controller_is_shared() {
        let mut chain = EffectChain::new(48000.0).unwrap();
        let first = chain.controller();
        let second = chain.controller();

        first.set_threshold(0.2).unwrap();
        assert_relative_eq!(second.snapshot().threshold, 0.2);
    }
}
