//! Muspectra - real-time music spectrum analysis for visualizations.
//!
//! The analysis core turns raw audio into octave-aligned spectra and
//! ranked peak lists at interactive frame rates; the CLI runs the same
//! pipeline offline over audio files.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod stream;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::from_default_env().add_directive("muspectra=info".parse()?))
        .init();

    cli::run_command(&args)
}
