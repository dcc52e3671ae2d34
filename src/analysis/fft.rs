//! Windowed FFT front end producing the linear magnitude spectrum.
//!
//! Accumulates incoming samples into an FFT-sized frame, applies a Hann
//! window, runs a real-to-complex FFT, and normalizes magnitudes so a
//! full-scale sine lands at 1.0.

use realfft::{RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex;
use std::sync::Arc;

/// FFT analyzer with an internal accumulation buffer.
pub struct FftAnalyzer {
    fft: Arc<dyn RealToComplex<f32>>,
    fft_size: usize,
    input_buffer: Vec<f32>,
    buffer_pos: usize,
    windowed: Vec<f32>,
    output_buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    window: Vec<f32>,
    /// Amplitude correction for the window's coherent gain.
    scale: f32,
    spectrum: Vec<f32>,
}

impl FftAnalyzer {
    /// Create an analyzer for the given FFT size (a power of 2, e.g.
    /// 16384). The magnitude spectrum has `fft_size / 2` bins; the
    /// Nyquist bin is dropped.
    pub fn new(fft_size: usize) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_size);

        // Hann window for reduced spectral leakage.
        let window: Vec<f32> = (0..fft_size)
            .map(|i| {
                let x = std::f32::consts::TAU * i as f32 / (fft_size - 1) as f32;
                0.5 * (1.0 - x.cos())
            })
            .collect();
        let scale = 2.0 / window.iter().sum::<f32>();

        Self {
            fft,
            fft_size,
            input_buffer: vec![0.0; fft_size],
            buffer_pos: 0,
            windowed: vec![0.0; fft_size],
            output_buffer: vec![Complex::new(0.0, 0.0); fft_size / 2 + 1],
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
            window,
            scale,
            spectrum: vec![0.0; fft_size / 2],
        }
    }

    /// The FFT frame size in samples.
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of magnitude bins produced per frame.
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Feed mono samples and return the magnitude spectrum of the most
    /// recently completed frame, if this call completed one.
    ///
    /// All samples are consumed; leftovers stay buffered toward the next
    /// frame. Magnitudes are normalized so a unit-amplitude sine peaks
    /// at 1.0.
    pub fn process(&mut self, samples: &[f32]) -> Option<&[f32]> {
        let mut completed = false;
        for &sample in samples {
            self.input_buffer[self.buffer_pos] = sample;
            self.buffer_pos += 1;
            if self.buffer_pos == self.fft_size {
                self.buffer_pos = 0;
                self.run_fft();
                completed = true;
            }
        }
        completed.then_some(self.spectrum.as_slice())
    }

    /// The most recent spectrum (all zeros before the first frame).
    pub fn spectrum(&self) -> &[f32] {
        &self.spectrum
    }

    /// Clear all buffered samples and the published spectrum.
    pub fn reset(&mut self) {
        self.buffer_pos = 0;
        self.input_buffer.fill(0.0);
        self.spectrum.fill(0.0);
    }

    fn run_fft(&mut self) {
        for ((w, s), out) in self
            .window
            .iter()
            .zip(&self.input_buffer)
            .zip(&mut self.windowed)
        {
            *out = w * s;
        }

        if let Err(e) =
            self.fft
                .process_with_scratch(&mut self.windowed, &mut self.output_buffer, &mut self.scratch)
        {
            // realfft only fails on mismatched buffer lengths, which the
            // constructor rules out.
            tracing::warn!("FFT failed: {}", e);
            return;
        }

        for (mag, c) in self.spectrum.iter_mut().zip(&self.output_buffer) {
            *mag = c.norm() * self.scale;
        }
    }
}
