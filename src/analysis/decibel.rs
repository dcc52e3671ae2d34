//! Linear magnitude to normalized-decibel conversion.
//!
//! A fixed affine-then-clamp transform: magnitudes are floored to avoid
//! `log(0)`, converted to dB, and remapped so the floor pins at 0.0 and
//! unity gain at 1.0. There is no adaptive gain; the same input always
//! produces the same output.

/// Magnitude floor applied before taking the logarithm.
pub const AMPLITUDE_FLOOR: f32 = 0.001;

/// Slope of the dB-to-normalized mapping (an 80 dB design window).
pub const DB_SCALE: f32 = 0.0125;

/// Converts magnitudes in [0, 1] to perceptual values in [0, 1].
#[derive(Debug, Clone, Copy)]
pub struct DecibelMapper {
    /// Normalized value the amplitude floor maps to before
    /// renormalization.
    floor_norm: f32,
}

impl DecibelMapper {
    pub fn new() -> Self {
        Self {
            floor_norm: 1.0 + DB_SCALE * 20.0 * AMPLITUDE_FLOOR.log10(),
        }
    }

    /// Map one magnitude to the normalized decibel scale.
    ///
    /// Values at or below [`AMPLITUDE_FLOOR`] map to 0.0; a magnitude of
    /// 1.0 (0 dB) maps to 1.0.
    pub fn to_decibel(&self, magnitude: f32) -> f32 {
        let db = 20.0 * magnitude.max(AMPLITUDE_FLOOR).log10();
        let normalized = 1.0 + DB_SCALE * db;
        ((normalized - self.floor_norm) / (1.0 - self.floor_norm)).clamp(0.0, 1.0)
    }

    /// Map a whole spectrum, returning a same-length array.
    pub fn to_decibels(&self, input: &[f32]) -> Vec<f32> {
        input.iter().map(|&m| self.to_decibel(m)).collect()
    }
}

impl Default for DecibelMapper {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unity_maps_to_one() {
        let mapper = DecibelMapper::new();
        let out = mapper.to_decibels(&[1.0]);
        assert!((out[0] - 1.0).abs() < 1e-6, "{}", out[0]);
    }

    #[test]
    fn test_below_floor_maps_to_zero() {
        let mapper = DecibelMapper::new();
        let out = mapper.to_decibels(&[0.0009]);
        assert_eq!(out[0], 0.0);
        assert_eq!(mapper.to_decibel(0.0), 0.0);
        assert_eq!(mapper.to_decibel(AMPLITUDE_FLOOR), 0.0);
    }

    #[test]
    fn test_monotone_increasing() {
        let mapper = DecibelMapper::new();
        let mut prev = -1.0f32;
        for i in 1..=1000 {
            let v = mapper.to_decibel(i as f32 / 1000.0);
            assert!(v >= prev, "not monotone at {}", i);
            prev = v;
        }
    }

    #[test]
    fn test_output_in_unit_range() {
        let mapper = DecibelMapper::new();
        // Out-of-range inputs still clamp into [0, 1].
        for &m in &[0.0f32, 0.0005, 0.001, 0.01, 0.5, 1.0, 2.0] {
            let v = mapper.to_decibel(m);
            assert!((0.0..=1.0).contains(&v), "magnitude {} -> {}", m, v);
        }
    }

    #[test]
    fn test_fixed_not_adaptive() {
        // The mapping of a value must not depend on its neighbors.
        let mapper = DecibelMapper::new();
        let alone = mapper.to_decibels(&[0.1]);
        let together = mapper.to_decibels(&[0.1, 1.0, 0.001]);
        assert_eq!(alone[0], together[0]);
    }

    #[test]
    fn test_same_length_output() {
        let mapper = DecibelMapper::new();
        let input = vec![0.25f32; 864];
        assert_eq!(mapper.to_decibels(&input).len(), 864);
    }
}
