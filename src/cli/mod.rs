//! Command-line interface for muspectra.
//!
//! This module provides CLI commands for analyzing audio files and
//! inspecting the computed octave geometry.

mod commands;

pub use commands::{Cli, Commands, OutputFormat, run_command};
