//! Resampling of the linear-frequency spectrum onto the musical axis.
//!
//! The "mu" spectrum has a fixed number of points per note and notes per
//! octave, so index position directly encodes (octave, note, sub-note
//! point). Target frequencies are exponentially spaced within each
//! octave; magnitudes come from linear interpolation of the two
//! bracketing FFT bins.

use super::geometry::OctaveGeometry;

/// Points per note in the mu spectrum.
pub const POINTS_PER_NOTE: usize = 12;

/// Converts a linear magnitude spectrum into the octave-aligned mu
/// spectrum.
///
/// The bin mapping for every output point is precomputed at construction
/// from an [`OctaveGeometry`], so `resample` itself is a pure lookup and
/// interpolation pass. Two calls with the same input yield bit-identical
/// output.
#[derive(Debug, Clone)]
pub struct SpectrumResampler {
    /// Per output point: lower bin index and interpolation fraction
    /// toward the next bin. `None` for points inside an empty octave.
    points: Vec<Option<(usize, f32)>>,
    points_per_octave: usize,
}

impl SpectrumResampler {
    /// Build the point-to-bin mapping for the first `octave_count`
    /// octaves of `geometry`.
    ///
    /// `octave_count` may be smaller than the geometry's range (a
    /// 6-octave view of an 8-octave geometry is common); it is clamped
    /// to the geometry's octave count.
    pub fn new(
        geometry: &OctaveGeometry,
        octave_count: usize,
        notes_per_octave: usize,
        points_per_note: usize,
    ) -> Self {
        let octave_count = octave_count.min(geometry.octave_count());
        let points_per_octave = notes_per_octave * points_per_note;
        let bin_width = geometry.bin_freq_width();
        let max_lower = geometry.bin_count().saturating_sub(2);

        let mut points = Vec::with_capacity(octave_count * points_per_octave);
        for band in geometry.octaves().iter().take(octave_count) {
            if band.is_empty() {
                points.extend(std::iter::repeat_n(None, points_per_octave));
                continue;
            }
            for point in 0..points_per_octave {
                // Exponential placement: equal steps on the note axis,
                // doubling in frequency across the octave.
                let fraction = point as f32 / points_per_octave as f32;
                let target_freq = band.left_freq * 2.0f32.powf(fraction);
                let exact_bin = target_freq / bin_width;
                if exact_bin >= (geometry.bin_count() - 1) as f32 {
                    points.push(None);
                    continue;
                }
                let lower = (exact_bin as usize).min(max_lower);
                let frac = exact_bin - lower as f32;
                points.push(Some((lower, frac)));
            }
        }

        Self {
            points,
            points_per_octave,
        }
    }

    /// Length of the mu spectrum this resampler produces.
    pub fn output_len(&self) -> usize {
        self.points.len()
    }

    /// Points per octave (notes per octave times points per note).
    pub fn points_per_octave(&self) -> usize {
        self.points_per_octave
    }

    /// Resample a linear spectrum into a freshly allocated mu spectrum.
    ///
    /// Points whose octave is empty, or whose target frequency lies
    /// beyond the spectrum, produce 0.
    pub fn resample(&self, spectrum: &[f32]) -> Vec<f32> {
        let mut out = vec![0.0f32; self.points.len()];
        self.resample_into(spectrum, &mut out);
        out
    }

    /// Resample into a caller-provided buffer of length
    /// [`output_len`](Self::output_len).
    pub fn resample_into(&self, spectrum: &[f32], out: &mut [f32]) {
        debug_assert_eq!(out.len(), self.points.len());
        for (slot, point) in out.iter_mut().zip(&self.points) {
            *slot = match point {
                Some((lower, frac)) if lower + 1 < spectrum.len() => {
                    spectrum[*lower] * (1.0 - frac) + spectrum[lower + 1] * frac
                }
                _ => 0.0,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::geometry::{DEFAULT_LOWEST_LEFT_HZ, NOTES_PER_OCTAVE, OCTAVE_COUNT};

    fn resampler(octaves: usize) -> (OctaveGeometry, SpectrumResampler) {
        let geom = OctaveGeometry::with_defaults(8192);
        let rs = SpectrumResampler::new(&geom, octaves, NOTES_PER_OCTAVE, POINTS_PER_NOTE);
        (geom, rs)
    }

    #[test]
    fn test_output_length() {
        let (_, rs) = resampler(8);
        assert_eq!(rs.output_len(), 8 * 12 * 12);
        let (_, rs6) = resampler(6);
        assert_eq!(rs6.output_len(), 6 * 12 * 12);
    }

    #[test]
    fn test_resample_deterministic() {
        let (geom, rs) = resampler(8);
        let spectrum: Vec<f32> = (0..geom.bin_count())
            .map(|i| ((i * 7919) % 1000) as f32 / 1000.0)
            .collect();
        let a = rs.resample(&spectrum);
        let b = rs.resample(&spectrum);
        assert_eq!(a, b);
    }

    #[test]
    fn test_constant_spectrum_resamples_to_constant() {
        // Linear interpolation between equal values is the identity.
        let (geom, rs) = resampler(8);
        let spectrum = vec![0.5f32; geom.bin_count()];
        let mu = rs.resample(&spectrum);
        for (i, v) in mu.iter().enumerate() {
            assert!((v - 0.5).abs() < 1e-6, "point {}: {}", i, v);
        }
    }

    #[test]
    fn test_single_tone_lands_in_expected_cell() {
        // Put energy at the bin nearest 440 Hz and check the strongest mu
        // point sits in octave 3 (A4 lives ~3.8 octaves above ~31.8 Hz).
        let (geom, rs) = resampler(8);
        let bin = (440.0 / geom.bin_freq_width()).round() as usize;
        let mut spectrum = vec![0.0f32; geom.bin_count()];
        spectrum[bin] = 1.0;
        spectrum[bin - 1] = 0.5;
        spectrum[bin + 1] = 0.5;

        let mu = rs.resample(&spectrum);
        let (max_point, _) = mu
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .unwrap();
        let octave = max_point / rs.points_per_octave();
        assert_eq!(octave, 3, "expected A4 energy in octave 3");
    }

    #[test]
    fn test_empty_octaves_produce_zero() {
        // Force octaves above Nyquist into the range.
        let geom = OctaveGeometry::new(44_100, 8192, DEFAULT_LOWEST_LEFT_HZ, 16);
        let rs = SpectrumResampler::new(&geom, 16, NOTES_PER_OCTAVE, POINTS_PER_NOTE);
        let spectrum = vec![1.0f32; geom.bin_count()];
        let mu = rs.resample(&spectrum);
        let last_octave = &mu[15 * rs.points_per_octave()..];
        assert!(last_octave.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_octave_count_clamped_to_geometry() {
        let geom = OctaveGeometry::new(44_100, 8192, DEFAULT_LOWEST_LEFT_HZ, OCTAVE_COUNT);
        let rs = SpectrumResampler::new(&geom, 64, NOTES_PER_OCTAVE, POINTS_PER_NOTE);
        assert_eq!(rs.output_len(), OCTAVE_COUNT * 12 * 12);
    }
}
