//! Octave geometry: frequency boundaries, bin ranges, and bin position
//! factors for the musical octaves covered by the analysis.
//!
//! Everything here is computed once at startup from fixed constants
//! (sample rate, FFT bin count, lowest octave edge) and is immutable for
//! the process lifetime. All other analysis stages read these tables.

/// Left edge of the lowest octave in Hz.
///
/// C1 (32.7032 Hz) lowered by half a semitone, so that each note's cell
/// within an octave is centered on the note frequency rather than
/// starting at it.
pub const DEFAULT_LOWEST_LEFT_HZ: f32 = 31.772_186;

/// Number of octaves covered by the full analysis range.
pub const OCTAVE_COUNT: usize = 8;

/// Notes per octave on the equal-tempered scale.
pub const NOTES_PER_OCTAVE: usize = 12;

/// One octave of the analysis range.
///
/// `bins` is `None` when no FFT bin center falls inside
/// `[left_freq, right_freq]` (octave above Nyquist, or a degenerate
/// sample-rate/bin-count combination). Consumers must skip empty octaves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OctaveBand {
    /// Lower frequency boundary (inclusive).
    pub left_freq: f32,
    /// Upper frequency boundary (inclusive), always `2 * left_freq`.
    pub right_freq: f32,
    /// Inclusive `(bottom_bin, top_bin)` range of FFT bins whose center
    /// frequency falls inside the octave.
    pub bins: Option<(usize, usize)>,
}

impl OctaveBand {
    /// Number of bins inside this octave (0 if empty).
    pub fn bin_count(&self) -> usize {
        match self.bins {
            Some((bottom, top)) => top - bottom + 1,
            None => 0,
        }
    }

    /// Whether any bins fall inside this octave.
    pub fn is_empty(&self) -> bool {
        self.bins.is_none()
    }
}

/// Precomputed octave/bin geometry.
///
/// Maps linear FFT bins onto the exponential (semitone-linear) musical
/// axis. Constructed once, then shared read-only by the resampler, the
/// peak sorter, and any rendering layer that needs to place bins on a
/// note-aligned axis.
#[derive(Debug, Clone)]
pub struct OctaveGeometry {
    sample_rate: u32,
    bin_count: usize,
    bin_freq_width: f32,
    octaves: Vec<OctaveBand>,
    bin_position_factor: Vec<f32>,
}

impl OctaveGeometry {
    /// Compute the geometry tables for the given configuration.
    ///
    /// `bin_count` is the number of magnitude bins (FFT size / 2).
    /// `lowest_left_freq` anchors the left edge of octave 0; each octave
    /// spans exactly a factor of 2 from there.
    pub fn new(
        sample_rate: u32,
        bin_count: usize,
        lowest_left_freq: f32,
        octave_count: usize,
    ) -> Self {
        let bin_freq_width = (sample_rate as f32 / 2.0) / bin_count as f32;

        let mut octaves = Vec::with_capacity(octave_count);
        let mut bin_position_factor = vec![0.0f32; bin_count];

        for octave in 0..octave_count {
            let left_freq = lowest_left_freq * 2.0f32.powi(octave as i32);
            let right_freq = 2.0 * left_freq;

            // Scan bins in increasing frequency order for the first and
            // last bin whose center frequency falls inside the octave.
            // Rounding can leave gaps or overlaps at octave boundaries,
            // so each range is derived independently rather than assumed
            // contiguous with its neighbors.
            let mut bottom = None;
            let mut top = None;
            for bin in 0..bin_count {
                let freq = bin as f32 * bin_freq_width;
                if freq < left_freq {
                    continue;
                }
                if freq > right_freq {
                    break;
                }
                if bottom.is_none() {
                    bottom = Some(bin);
                }
                top = Some(bin);
            }

            let bins = match (bottom, top) {
                (Some(b), Some(t)) => Some((b, t)),
                _ => {
                    tracing::debug!(
                        octave,
                        left_freq,
                        right_freq,
                        "octave contains no FFT bins, marking empty"
                    );
                    None
                }
            };

            if let Some((b, t)) = bins {
                let span = right_freq - left_freq;
                for bin in b..=t {
                    let freq = bin as f32 * bin_freq_width;
                    let bin_fraction = (freq - left_freq) / span;
                    // Map the linear in-octave fraction onto the
                    // exponential note axis. 0 at the left edge; reaches
                    // 1.0 only for a bin centered exactly on the right
                    // edge.
                    bin_position_factor[bin] = 2.0 - 2.0 / 2.0f32.powf(bin_fraction);
                }
            }

            octaves.push(OctaveBand {
                left_freq,
                right_freq,
                bins,
            });
        }

        Self {
            sample_rate,
            bin_count,
            bin_freq_width,
            octaves,
            bin_position_factor,
        }
    }

    /// Geometry for the default configuration: 44.1 kHz, 8192 bins,
    /// 8 octaves anchored at [`DEFAULT_LOWEST_LEFT_HZ`].
    pub fn with_defaults(bin_count: usize) -> Self {
        Self::new(44_100, bin_count, DEFAULT_LOWEST_LEFT_HZ, OCTAVE_COUNT)
    }

    /// Sample rate the geometry was computed for.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of magnitude bins.
    pub fn bin_count(&self) -> usize {
        self.bin_count
    }

    /// Frequency width of one bin in Hz.
    pub fn bin_freq_width(&self) -> f32 {
        self.bin_freq_width
    }

    /// Center frequency of a bin in Hz.
    pub fn bin_freq(&self, bin: usize) -> f32 {
        bin as f32 * self.bin_freq_width
    }

    /// All octave bands, lowest first.
    pub fn octaves(&self) -> &[OctaveBand] {
        &self.octaves
    }

    /// One octave band.
    pub fn octave(&self, index: usize) -> &OctaveBand {
        &self.octaves[index]
    }

    /// Number of octaves in the table.
    pub fn octave_count(&self) -> usize {
        self.octaves.len()
    }

    /// Fractional position of a bin within its octave on the exponential
    /// note axis, in `[0, 1]`. Bins outside every octave report 0.
    pub fn bin_position_factor(&self, bin: usize) -> f32 {
        self.bin_position_factor[bin]
    }

    /// The full per-bin position factor table.
    pub fn bin_position_factors(&self) -> &[f32] {
        &self.bin_position_factor
    }

    /// Bin range spanning the first through last non-empty octave,
    /// clamped so both ends have in-array neighbors (as the peak sorter
    /// requires). `None` when every octave is empty.
    pub fn peak_scan_range(&self) -> Option<(usize, usize)> {
        let bottom = self
            .octaves
            .iter()
            .find_map(|o| o.bins.map(|(b, _)| b))?;
        let top = self
            .octaves
            .iter()
            .rev()
            .find_map(|o| o.bins.map(|(_, t)| t))?;
        Some((bottom.max(1), top.min(self.bin_count.saturating_sub(2))))
    }
}

/// Note names on the equal-tempered scale, starting at C.
const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Name the musical note nearest to a frequency, e.g. `"A4 +3c"`.
///
/// Returns `None` for non-positive frequencies.
pub fn note_name(freq: f32) -> Option<String> {
    if freq <= 0.0 {
        return None;
    }
    // Semitones above C0 (16.3516 Hz).
    const C0_HZ: f32 = 16.351_599;
    let semitones = 12.0 * (freq / C0_HZ).log2();
    let nearest = semitones.round();
    let cents = ((semitones - nearest) * 100.0).round() as i32;
    let nearest = nearest as i32;
    let octave = nearest.div_euclid(12);
    let note = NOTE_NAMES[nearest.rem_euclid(12) as usize];
    if cents == 0 {
        Some(format!("{}{}", note, octave))
    } else {
        Some(format!("{}{} {:+}c", note, octave, cents))
    }
}
