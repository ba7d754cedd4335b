//! Fuzzbox CLI
//!
//! Offline driver for the fuzz and low-pass signal chain.

use clap::Parser;
use env_logger::Env;
use log::info;

use fuzzbox::cli::{commands, Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    info!("Fuzzbox v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(cmd) => handle_command(cmd),
        None => {
            println!("Fuzzbox v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands) -> anyhow::Result<()> {
    match cmd {
        Commands::Render {
            chain,
            frequency,
            amplitude,
            duration,
            block_size,
        } => commands::render(&chain, frequency, amplitude, duration, block_size),
        Commands::Coefficients {
            sample_rate,
            cutoff,
            at,
        } => commands::coefficients(sample_rate, cutoff, &at),
        Commands::Params { chain } => commands::params(&chain),
    }
}
