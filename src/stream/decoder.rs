//! Audio file decoding using symphonia, for offline analysis.
//!
//! Supported formats: MP3, FLAC, OGG Vorbis, WAV/PCM. Decoded audio is
//! downmixed to mono, since the spectral pipeline analyzes a single
//! channel.

use std::fs::File;
use std::path::Path;
use std::time::Duration;

use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{CODEC_TYPE_NULL, Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::StreamError;

/// Decodes an audio file into mono f32 samples.
pub struct AudioFileReader {
    reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    channels: usize,
    duration: Duration,
}

impl AudioFileReader {
    /// Open a file for decoding.
    pub fn open(path: &Path) -> Result<Self, StreamError> {
        let file = File::open(path)
            .map_err(|e| StreamError::FileNotFound(format!("{}: {}", path.display(), e)))?;

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension() {
            hint.with_extension(&ext.to_string_lossy());
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| StreamError::UnsupportedFormat(e.to_string()))?;

        let reader = probed.format;

        // First audio track wins.
        let track = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| StreamError::UnsupportedFormat("no audio track found".to_string()))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let sample_rate = codec_params
            .sample_rate
            .ok_or_else(|| StreamError::Decode("unknown sample rate".to_string()))?;
        let channels = codec_params
            .channels
            .map(|c| c.count())
            .unwrap_or(2)
            .max(1);

        let duration = match (codec_params.n_frames, codec_params.time_base) {
            (Some(n_frames), Some(tb)) => {
                let time = tb.calc_time(n_frames);
                Duration::from_secs_f64(time.seconds as f64 + time.frac)
            }
            (Some(n_frames), None) => {
                Duration::from_secs_f64(n_frames as f64 / sample_rate as f64)
            }
            _ => Duration::ZERO,
        };

        let decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| StreamError::Decode(e.to_string()))?;

        Ok(Self {
            reader,
            decoder,
            track_id,
            sample_rate,
            channels,
            duration,
        })
    }

    /// Source sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel count of the source (before downmix).
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Total duration, zero if the container doesn't report one.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Decode the next packet, appending mono samples to `out`.
    ///
    /// Returns the number of samples appended, or `Ok(None)` at end of
    /// stream. Corrupt packets are skipped.
    pub fn decode_next(&mut self, out: &mut Vec<f32>) -> Result<Option<usize>, StreamError> {
        loop {
            let packet = match self.reader.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(None);
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.decoder.reset();
                    continue;
                }
                Err(e) => return Err(StreamError::Decode(e.to_string())),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(d) => d,
                Err(SymphoniaError::DecodeError(e)) => {
                    tracing::debug!("skipping corrupt packet: {}", e);
                    continue;
                }
                Err(e) => return Err(StreamError::Decode(e.to_string())),
            };

            let before = out.len();
            downmix_to_mono(&decoded, out);
            return Ok(Some(out.len() - before));
        }
    }

    /// Decode the whole file into one mono buffer.
    pub fn decode_all(path: &Path) -> Result<(Vec<f32>, u32), StreamError> {
        let mut reader = Self::open(path)?;
        let sample_rate = reader.sample_rate();
        let mut samples = Vec::new();
        while reader.decode_next(&mut samples)?.is_some() {}
        tracing::info!(
            samples = samples.len(),
            sample_rate,
            "decoded {}",
            path.display()
        );
        Ok((samples, sample_rate))
    }
}

/// Average all channels of a decoded buffer into mono f32 samples.
fn downmix_to_mono(buffer: &AudioBufferRef, out: &mut Vec<f32>) {
    match buffer {
        AudioBufferRef::F32(buf) => mix_planes(buf.frames(), buf.planes().planes(), out, |s| s),
        AudioBufferRef::S16(buf) => mix_planes(buf.frames(), buf.planes().planes(), out, |s| {
            s as f32 / 32768.0
        }),
        AudioBufferRef::S24(buf) => mix_planes(buf.frames(), buf.planes().planes(), out, |s| {
            s.0 as f32 / 8_388_608.0
        }),
        AudioBufferRef::S32(buf) => mix_planes(buf.frames(), buf.planes().planes(), out, |s| {
            s as f32 / 2_147_483_648.0
        }),
        AudioBufferRef::U8(buf) => mix_planes(buf.frames(), buf.planes().planes(), out, |s| {
            (s as f32 - 128.0) / 128.0
        }),
        _ => {}
    }
}

fn mix_planes<S: Copy>(
    frames: usize,
    planes: &[&[S]],
    out: &mut Vec<f32>,
    convert: impl Fn(S) -> f32,
) {
    if planes.is_empty() {
        return;
    }
    let gain = 1.0 / planes.len() as f32;
    out.reserve(frames);
    for frame in 0..frames {
        let mixed: f32 = planes.iter().map(|plane| convert(plane[frame])).sum();
        out.push(mixed * gain);
    }
}
