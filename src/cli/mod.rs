//! CLI Module
//!
//! Command-line interface for exercising the signal chain offline with
//! synthesized signals.

pub mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Fuzzbox - real-time fuzz and low-pass signal chain
#[derive(Parser, Debug)]
#[command(name = "fuzzbox")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Chain settings shared by several commands
#[derive(Args, Debug, Clone)]
pub struct ChainArgs {
    /// Sample rate in Hz
    #[arg(short = 'r', long, default_value_t = 44100.0)]
    pub sample_rate: f64,

    /// JSON settings file (missing fields take defaults)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Fuzz boost before clipping
    #[arg(long)]
    pub gain: Option<f32>,

    /// Fuzz clip threshold
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Low-pass cutoff in Hz
    #[arg(long)]
    pub cutoff: Option<f64>,

    /// Use the soft (tanh) overdrive curve instead of hard clipping
    #[arg(long)]
    pub soft: bool,

    /// Bypass the fuzz stage
    #[arg(long)]
    pub no_fuzz: bool,

    /// Bypass the low-pass stage
    #[arg(long)]
    pub no_filter: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a sine wave through the chain and report levels
    #[command(name = "render")]
    Render {
        #[command(flatten)]
        chain: ChainArgs,

        /// Test tone frequency in Hz
        #[arg(short, long, default_value_t = 440.0)]
        frequency: f64,

        /// Test tone peak amplitude
        #[arg(short, long, default_value_t = 0.5)]
        amplitude: f32,

        /// Duration in seconds
        #[arg(short, long, default_value_t = 1.0)]
        duration: f64,

        /// Frames per engine callback
        #[arg(short, long, default_value_t = 256)]
        block_size: usize,
    },

    /// Design a low-pass and print its coefficients and response
    #[command(name = "coefficients")]
    Coefficients {
        /// Sample rate in Hz
        #[arg(short = 'r', long, default_value_t = 44100.0)]
        sample_rate: f64,

        /// Cutoff in Hz
        #[arg(short, long, default_value_t = 5000.0)]
        cutoff: f64,

        /// Frequencies (Hz) to report the magnitude response at
        #[arg(short, long, value_delimiter = ',')]
        at: Vec<f64>,
    },

    /// Print the effective chain parameters as JSON
    #[command(name = "params")]
    Params {
        #[command(flatten)]
        chain: ChainArgs,
    },
}
