//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\muspectra\config.toml
//! - macOS: ~/Library/Application Support/muspectra/config.toml
//! - Linux: ~/.config/muspectra/config.toml
//!
//! The config file is human-readable and editable. Settings are loaded
//! at startup; every field has a default, so a missing or partial file
//! still yields a usable configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::analysis::{DEFAULT_LOWEST_LEFT_HZ, NOTES_PER_OCTAVE, OCTAVE_COUNT, PEAK_COUNT};

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Spectral analysis settings
    pub analysis: AnalysisConfig,

    /// Output/reporting settings
    pub output: OutputConfig,
}

/// Spectral analysis settings.
///
/// These are the fixed constants the geometry tables and the pipeline
/// are built from; changing them requires rebuilding the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Sample rate the analysis assumes, in Hz
    pub sample_rate: u32,

    /// FFT frame size in samples (power of 2); bin count is half this
    pub fft_size: usize,

    /// Number of octaves covered, starting at `lowest_left_freq`
    pub octave_count: usize,

    /// Notes per octave on the musical axis
    pub notes_per_octave: usize,

    /// Resampled points per note in the mu spectrum
    pub points_per_note: usize,

    /// Left edge of the lowest octave in Hz
    pub lowest_left_freq: f32,

    /// Number of peaks reported per frame
    pub peak_count: usize,

    /// Minimum magnitude for a bin to qualify as a peak
    pub peak_threshold: f32,

    /// Temporal smoothing factor (0.0 = none, toward 1.0 = heavy)
    pub smoothing: f32,

    /// Half-width of the mean-curve smoothing kernel, in points
    pub mean_half_width: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            fft_size: 16_384,
            octave_count: OCTAVE_COUNT,
            notes_per_octave: NOTES_PER_OCTAVE,
            points_per_note: crate::analysis::POINTS_PER_NOTE,
            lowest_left_freq: DEFAULT_LOWEST_LEFT_HZ,
            peak_count: PEAK_COUNT,
            peak_threshold: 0.1,
            smoothing: 0.7,
            mean_half_width: 6,
        }
    }
}

impl AnalysisConfig {
    /// Number of magnitude bins per FFT frame.
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Frequency width of one bin in Hz.
    pub fn bin_freq_width(&self) -> f32 {
        (self.sample_rate as f32 / 2.0) / self.bin_count() as f32
    }

    /// Length of the mu spectrum this configuration produces.
    pub fn mu_len(&self) -> usize {
        self.octave_count * self.notes_per_octave * self.points_per_note
    }
}

/// Output/reporting settings for the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Report format: "text" or "json"
    pub format: String,

    /// Number of peaks printed in reports
    pub report_peaks: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
            report_peaks: 8,
        }
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("muspectra"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from disk
///
/// Returns default config if file doesn't exist or can't be parsed.
/// Logs warnings but doesn't fail - we always return a usable config.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        tracing::warn!("Could not determine config directory, using defaults");
        return Config::default();
    };

    if !path.exists() {
        tracing::debug!("No config file found at {:?}, using defaults", path);
        return Config::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::info!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::error!("Failed to parse config file {:?}: {}", path, e);
                tracing::warn!("Using default configuration");
                Config::default()
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file {:?}: {}", path, e);
            Config::default()
        }
    }
}

/// Save configuration to disk
///
/// Creates the config directory if it doesn't exist.
pub fn save(config: &Config) -> Result<(), ConfigError> {
    let dir = config_dir().ok_or(ConfigError::NoConfigDir)?;
    let path = dir.join("config.toml");

    // Ensure directory exists
    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::CreateDir(dir.clone(), e))?;

    // Serialize to pretty TOML
    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    // Write atomically (write to temp, then rename)
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, &path)
        .map_err(|e| ConfigError::Rename(temp_path, path.clone(), e))?;

    tracing::info!("Saved config to {:?}", path);
    Ok(())
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[analysis]"));
        assert!(toml.contains("[output]"));
        assert!(toml.contains("fft_size"));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.analysis.fft_size = 4096;
        config.analysis.octave_count = 6;
        config.output.format = "json".to_string();

        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();

        assert_eq!(parsed.analysis.fft_size, 4096);
        assert_eq!(parsed.analysis.octave_count, 6);
        assert_eq!(parsed.output.format, "json");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        // Config with only some fields
        let toml = r#"
[analysis]
octave_count = 6
"#;
        let config: Config = toml::from_str(toml).unwrap();

        // Specified field is set
        assert_eq!(config.analysis.octave_count, 6);

        // Other fields use defaults
        assert_eq!(config.analysis.fft_size, 16_384);
        assert_eq!(config.analysis.peak_count, PEAK_COUNT);
        assert_eq!(config.output.format, "text");
    }

    #[test]
    fn test_derived_dimensions() {
        let analysis = AnalysisConfig::default();
        assert_eq!(analysis.bin_count(), 8192);
        assert_eq!(analysis.mu_len(), 1152);
        assert!((analysis.bin_freq_width() - 2.6916504).abs() < 1e-4);
    }

    #[test]
    fn test_save_writes_file() {
        // Exercise the TOML emit path against a real directory.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let contents = toml::to_string_pretty(&Config::default()).unwrap();
        std::fs::write(&path, &contents).unwrap();

        let read_back: Config = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(read_back.analysis.fft_size, 16_384);
    }
}
