//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use anyhow::{Context, Result};
use log::{debug, info};

use super::ChainArgs;
use crate::analysis::{linear_to_db, sine_wave, SignalAnalysis};
use crate::config::ChainSettings;
use crate::dsp::{ClipMode, Effect, EffectChain, LowPassFilter};

/// Build a chain from a settings file plus command-line overrides.
pub fn build_chain(args: &ChainArgs) -> Result<EffectChain> {
    let mut settings = match &args.config {
        Some(path) => ChainSettings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => ChainSettings::for_sample_rate(args.sample_rate),
    };

    if let Some(gain) = args.gain {
        settings.gain = gain;
    }
    if let Some(threshold) = args.threshold {
        settings.threshold = threshold;
    }
    if let Some(cutoff) = args.cutoff {
        settings.cutoff_hz = cutoff;
    }
    if args.soft {
        settings.clip_mode = ClipMode::Soft;
    }
    if args.no_fuzz {
        settings.fuzz_enabled = false;
    }
    if args.no_filter {
        settings.filter_enabled = false;
    }

    debug!("Effective settings: {:?}", settings);
    EffectChain::from_settings(args.sample_rate, &settings)
        .with_context(|| format!("building chain at {} Hz", args.sample_rate))
}

/// Run a synthesized tone through the chain, one engine-sized block at a time.
pub fn render(
    args: &ChainArgs,
    frequency: f64,
    amplitude: f32,
    duration: f64,
    block_size: usize,
) -> Result<()> {
    let mut chain = build_chain(args)?;
    let block_size = block_size.max(1);

    info!(
        "Rendering {:.2}s of {:.1} Hz at {} Hz in blocks of {}",
        duration, frequency, args.sample_rate, block_size
    );

    let input = sine_wave(frequency, amplitude, duration, args.sample_rate);
    let mut output = input.clone();
    for block in output.chunks_mut(block_size) {
        chain.process_block(block);
    }

    let before = SignalAnalysis::analyze(&input);
    let after = SignalAnalysis::analyze(&output);

    println!("Chain:  {}", chain.display_name());
    println!(
        "        fuzz {} | filter {} | latency/block {:.2} ms",
        on_off(chain.fuzz_enabled()),
        on_off(chain.filter_enabled()),
        block_size as f64 * 1000.0 / args.sample_rate
    );
    println!("Input:  {}", before.summary());
    println!("Output: {}", after.summary());

    if !after.is_finite() {
        anyhow::bail!("chain produced {} non-finite samples", after.non_finite);
    }
    Ok(())
}

/// Print the designed biquad and its magnitude response.
pub fn coefficients(sample_rate: f64, cutoff: f64, at: &[f64]) -> Result<()> {
    let filter = LowPassFilter::lowpass(sample_rate, cutoff)
        .with_context(|| format!("designing low-pass at {} Hz", cutoff))?;
    let c = filter.coefficients();

    println!("Low-pass {:.1} Hz @ {:.0} Hz", cutoff, sample_rate);
    println!("{:-<40}", "");
    println!("b0 = {:+.12}", c.b0);
    println!("b1 = {:+.12}", c.b1);
    println!("b2 = {:+.12}", c.b2);
    println!("a1 = {:+.12}", c.a1);
    println!("a2 = {:+.12}", c.a2);
    println!("{:-<40}", "");
    println!("DC gain: {:.9}", c.dc_gain());
    println!("Stable:  {}", c.is_stable());

    for &freq in at {
        let magnitude = c.magnitude_at(freq, sample_rate);
        println!(
            "|H({:.1} Hz)| = {:.6} ({:+.2} dB)",
            freq,
            magnitude,
            linear_to_db(magnitude as f32)
        );
    }
    Ok(())
}

/// Print the effective settings and parameter tree as JSON.
pub fn params(args: &ChainArgs) -> Result<()> {
    let chain = build_chain(args)?;
    let out = serde_json::json!({
        "settings": chain.settings(),
        "params": chain.get_params(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> ChainArgs {
        ChainArgs {
            sample_rate: 48000.0,
            config: None,
            gain: None,
            threshold: None,
            cutoff: None,
            soft: false,
            no_fuzz: false,
            no_filter: false,
        }
    }

    #[test]
    fn test_build_chain_overrides() {
        let chain = build_chain(&ChainArgs {
            gain: Some(3.0),
            cutoff: Some(1200.0),
            soft: true,
            no_filter: true,
            ..args()
        })
        .unwrap();

        assert_eq!(chain.distortion().gain(), 3.0);
        assert_eq!(chain.distortion().mode(), ClipMode::Soft);
        assert_eq!(chain.cutoff(), 1200.0);
        assert!(!chain.filter_enabled());
        assert!(chain.fuzz_enabled());
    }

    #[test]
    fn test_build_chain_rejects_bad_cutoff() {
        let err = build_chain(&ChainArgs {
            cutoff: Some(30000.0),
            ..args()
        })
        .unwrap_err();
        assert!(format!("{:#}", err).contains("48000"));
    }

    #[test]
    fn test_render_and_coefficients_succeed() {
        render(&args(), 440.0, 0.5, 0.05, 64).unwrap();
        coefficients(44100.0, 5000.0, &[100.0, 5000.0]).unwrap();
        assert!(coefficients(44100.0, 0.0, &[]).is_err());
    }
}
