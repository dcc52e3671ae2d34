//! CLI command definitions and dispatch.
//!
//! Each subcommand is implemented in its own submodule:
//! - `analyze`: run the spectral pipeline over an audio file
//! - `geometry`: print the octave/bin geometry tables

mod analyze;
mod geometry;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub use analyze::cmd_analyze;
pub use geometry::cmd_geometry;

/// Muspectra CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable tables
    Text,
    /// Machine-readable JSON
    Json,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Analyze an audio file and report its strongest spectral peaks
    Analyze {
        /// Path to the audio file (mp3, flac, ogg, wav)
        path: PathBuf,
        /// Number of peaks to report
        #[arg(short, long)]
        peaks: Option<usize>,
        /// Peak detection threshold (0.0 - 1.0)
        #[arg(short, long)]
        threshold: Option<f32>,
        /// Number of octaves to resample into
        #[arg(long)]
        octaves: Option<usize>,
        /// Output format
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// Print the octave table and bin geometry for a configuration
    Geometry {
        /// FFT frame size in samples (power of 2)
        #[arg(long)]
        fft_size: Option<usize>,
        /// Sample rate in Hz
        #[arg(long)]
        sample_rate: Option<u32>,
        /// Number of octaves
        #[arg(long)]
        octaves: Option<usize>,
    },
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    let config = crate::config::load();

    match &cli.command {
        Commands::Analyze {
            path,
            peaks,
            threshold,
            octaves,
            format,
        } => {
            let mut analysis = config.analysis.clone();
            if let Some(threshold) = threshold {
                analysis.peak_threshold = *threshold;
            }
            if let Some(octaves) = octaves {
                analysis.octave_count = *octaves;
            }
            let format = (*format).unwrap_or(match config.output.format.as_str() {
                "json" => OutputFormat::Json,
                _ => OutputFormat::Text,
            });
            let report_peaks = (*peaks).unwrap_or(config.output.report_peaks);
            cmd_analyze(path, &analysis, report_peaks, format)
        }
        Commands::Geometry {
            fft_size,
            sample_rate,
            octaves,
        } => {
            let mut analysis = config.analysis.clone();
            if let Some(fft_size) = fft_size {
                analysis.fft_size = *fft_size;
            }
            if let Some(sample_rate) = sample_rate {
                analysis.sample_rate = *sample_rate;
            }
            if let Some(octaves) = octaves {
                analysis.octave_count = *octaves;
            }
            cmd_geometry(&analysis)
        }
    }
}
