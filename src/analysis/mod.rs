//! The spectral analysis pipeline.
//!
//! Per audio frame, in order:
//!
//! ```text
//! samples ──► FftAnalyzer ──► linear spectrum (temporal smoothing)
//!                 │
//!                 ├──► SpectrumResampler ──► mu spectrum
//!                 │            ├──► SpectralEnhancer ──► mean / enhanced
//!                 │            └──► DecibelMapper ──► dB mu spectrum
//!                 └──► PeakSorter ──► top-N peak list
//! ```
//!
//! Every stage below the FFT is a pure function of its input arrays; the
//! only cross-frame state is the FFT accumulation buffer and the
//! exponential smoothing of the published spectrum.

mod decibel;
mod enhance;
mod fft;
pub mod geometry;
mod peaks;
mod resample;

pub use decibel::{AMPLITUDE_FLOOR, DB_SCALE, DecibelMapper};
pub use enhance::SpectralEnhancer;
pub use fft::FftAnalyzer;
pub use geometry::{
    DEFAULT_LOWEST_LEFT_HZ, NOTES_PER_OCTAVE, OCTAVE_COUNT, OctaveBand, OctaveGeometry, note_name,
};
pub use peaks::{
    PEAK_COUNT, Peak, PeakList, PeakSorter, parabolic_refine, synthesize_waveform, zero_peaks,
};
pub use resample::{POINTS_PER_NOTE, SpectrumResampler};

use crate::config::AnalysisConfig;

/// One frame of analysis output.
///
/// All arrays are freshly computed from the frame's spectrum and
/// immutable once published. Consumers index them directly; the peak
/// list always holds exactly the configured number of entries.
#[derive(Debug, Clone)]
pub struct AnalysisFrame {
    /// Linear magnitude spectrum, one value per FFT bin, temporally
    /// smoothed.
    pub spectrum: Vec<f32>,
    /// Octave-aligned mu spectrum.
    pub mu_spectrum: Vec<f32>,
    /// Moving-average mean curve of the mu spectrum (the noise floor).
    pub mean_spectrum: Vec<f32>,
    /// Mu spectrum minus its mean curve: the harmonic lines.
    pub enhanced_spectrum: Vec<f32>,
    /// Mu spectrum on the normalized decibel scale.
    pub db_spectrum: Vec<f32>,
    /// Loudest spectral peaks, descending, zero-padded.
    pub peaks: PeakList,
    /// Largest absolute sample value in the frame's input.
    pub peak_level: f32,
    /// Root-mean-square level of the frame's input.
    pub rms_level: f32,
}

impl Default for AnalysisFrame {
    fn default() -> Self {
        Self {
            spectrum: Vec::new(),
            mu_spectrum: Vec::new(),
            mean_spectrum: Vec::new(),
            enhanced_spectrum: Vec::new(),
            db_spectrum: Vec::new(),
            peaks: zero_peaks(PEAK_COUNT),
            peak_level: 0.0,
            rms_level: 0.0,
        }
    }
}

/// The full per-frame analysis pipeline.
pub struct SpectralPipeline {
    fft: FftAnalyzer,
    geometry: OctaveGeometry,
    resampler: SpectrumResampler,
    enhancer: SpectralEnhancer,
    decibels: DecibelMapper,
    sorter: PeakSorter,
    peak_threshold: f32,
    peak_range: Option<(usize, usize)>,
    /// EMA factor: 0.0 republishes raw frames, values toward 1.0 favor
    /// history.
    smoothing: f32,
    smoothed: Vec<f32>,
}

impl SpectralPipeline {
    pub fn new(config: &AnalysisConfig) -> Self {
        let fft = FftAnalyzer::new(config.fft_size);
        let geometry = OctaveGeometry::new(
            config.sample_rate,
            fft.bin_count(),
            config.lowest_left_freq,
            config.octave_count,
        );
        let resampler = SpectrumResampler::new(
            &geometry,
            config.octave_count,
            config.notes_per_octave,
            config.points_per_note,
        );
        let sorter = PeakSorter::new(config.peak_count, geometry.bin_freq_width());
        let peak_range = geometry.peak_scan_range();
        if peak_range.is_none() {
            tracing::warn!("no octave contains FFT bins; peak lists will stay empty");
        }

        Self {
            fft,
            geometry,
            resampler,
            enhancer: SpectralEnhancer::new(config.mean_half_width),
            decibels: DecibelMapper::new(),
            sorter,
            peak_threshold: config.peak_threshold,
            peak_range,
            smoothing: config.smoothing,
            smoothed: Vec::new(),
        }
    }

    /// The geometry tables backing this pipeline, for rendering layers
    /// that map bins to note-aligned positions.
    pub fn geometry(&self) -> &OctaveGeometry {
        &self.geometry
    }

    /// Length of the mu-shaped arrays in produced frames.
    pub fn mu_len(&self) -> usize {
        self.resampler.output_len()
    }

    /// Feed mono samples; returns a frame when enough samples completed
    /// an FFT window.
    pub fn process(&mut self, samples: &[f32]) -> Option<AnalysisFrame> {
        let mut peak_level = 0.0f32;
        let mut sum_sq = 0.0f32;
        for &sample in samples {
            peak_level = peak_level.max(sample.abs());
            sum_sq += sample * sample;
        }
        let rms_level = if samples.is_empty() {
            0.0
        } else {
            (sum_sq / samples.len() as f32).sqrt()
        };

        let raw = self.fft.process(samples)?;

        // Exponential smoothing over time keeps the visuals stable
        // between frames.
        if self.smoothed.len() != raw.len() {
            self.smoothed = raw.to_vec();
        } else {
            let alpha = self.smoothing.clamp(0.0, 0.99);
            for (prev, &new) in self.smoothed.iter_mut().zip(raw) {
                *prev = *prev * alpha + new * (1.0 - alpha);
            }
        }
        let spectrum = self.smoothed.clone();

        let mu_spectrum = self.resampler.resample(&spectrum);
        let mean_spectrum = self.enhancer.find_mean(&mu_spectrum);
        let enhanced_spectrum = self.enhancer.enhance(&mu_spectrum);
        let db_spectrum = self.decibels.to_decibels(&mu_spectrum);

        let peaks = match self.peak_range {
            Some((bottom, top)) => {
                self.sorter
                    .sorted_peaks(&spectrum, bottom, top, self.peak_threshold)
            }
            None => zero_peaks(self.sorter.max_peaks()),
        };

        Some(AnalysisFrame {
            spectrum,
            mu_spectrum,
            mean_spectrum,
            enhanced_spectrum,
            db_spectrum,
            peaks,
            peak_level: peak_level.min(1.0),
            rms_level: rms_level.min(1.0),
        })
    }

    /// Set the temporal smoothing factor (clamped to [0, 0.99]).
    pub fn set_smoothing(&mut self, smoothing: f32) {
        self.smoothing = smoothing.clamp(0.0, 0.99);
    }

    /// Drop all accumulated samples and smoothing history.
    pub fn reset(&mut self) {
        self.fft.reset();
        self.smoothed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use std::f32::consts::TAU;

    fn test_config() -> AnalysisConfig {
        AnalysisConfig {
            fft_size: 4096,
            ..AnalysisConfig::default()
        }
    }

    fn sine(freq: f32, sample_rate: f32, count: usize) -> Vec<f32> {
        (0..count)
            .map(|i| (TAU * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn test_frame_shapes() {
        let config = test_config();
        let mut pipeline = SpectralPipeline::new(&config);
        let frame = pipeline.process(&vec![0.0; config.fft_size]).unwrap();

        assert_eq!(frame.spectrum.len(), config.fft_size / 2);
        assert_eq!(frame.mu_spectrum.len(), config.mu_len());
        assert_eq!(frame.mean_spectrum.len(), config.mu_len());
        assert_eq!(frame.enhanced_spectrum.len(), config.mu_len());
        assert_eq!(frame.db_spectrum.len(), config.mu_len());
        assert_eq!(frame.peaks.len(), config.peak_count);
    }

    #[test]
    fn test_sine_produces_peak_near_frequency() {
        let config = test_config();
        let mut pipeline = SpectralPipeline::new(&config);
        let samples = sine(440.0, config.sample_rate as f32, config.fft_size);
        let frame = pipeline.process(&samples).unwrap();

        let top = &frame.peaks[0];
        assert!(!top.is_padding(), "expected a detected peak");
        assert!(
            (top.frequency - 440.0).abs() < 15.0,
            "peak at {} Hz",
            top.frequency
        );
        assert!(frame.peak_level > 0.9);
        // RMS of a full-scale sine is ~0.707.
        assert!((frame.rms_level - 0.707).abs() < 0.01);
    }

    #[test]
    fn test_silence_produces_padded_peaks() {
        let config = test_config();
        let mut pipeline = SpectralPipeline::new(&config);
        let frame = pipeline.process(&vec![0.0; config.fft_size]).unwrap();
        assert!(frame.peaks.iter().all(Peak::is_padding));
        assert_eq!(frame.peak_level, 0.0);
        assert_eq!(frame.rms_level, 0.0);
    }

    #[test]
    fn test_incomplete_frame_returns_none() {
        let config = test_config();
        let mut pipeline = SpectralPipeline::new(&config);
        assert!(pipeline.process(&vec![0.0; 100]).is_none());
    }

    #[test]
    fn test_reset_forgets_history() {
        let config = test_config();
        let mut pipeline = SpectralPipeline::new(&config);
        let samples = sine(440.0, config.sample_rate as f32, config.fft_size);
        let first = pipeline.process(&samples).unwrap();

        pipeline.reset();
        let again = pipeline.process(&samples).unwrap();
        // With no smoothing history the same input reproduces the same
        // spectrum exactly.
        assert_eq!(first.spectrum, again.spectrum);
    }

    #[test]
    fn test_enhanced_is_non_negative() {
        let config = test_config();
        let mut pipeline = SpectralPipeline::new(&config);
        let samples = sine(523.25, config.sample_rate as f32, config.fft_size);
        let frame = pipeline.process(&samples).unwrap();
        assert!(frame.enhanced_spectrum.iter().all(|&v| v >= 0.0));
        assert!(frame.db_spectrum.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }
}
