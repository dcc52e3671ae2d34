//! The `analyze` command: run the spectral pipeline over an audio file
//! and report the strongest peaks found.

use std::path::Path;

use serde::Serialize;

use super::OutputFormat;
use crate::analysis::{Peak, SpectralPipeline, note_name};
use crate::config::AnalysisConfig;
use crate::error::Error;
use crate::stream::AudioFileReader;

/// JSON shape of the analysis report.
#[derive(Debug, Serialize)]
struct AnalysisReport {
    file: String,
    sample_rate: u32,
    frames: usize,
    peaks: Vec<ReportedPeak>,
}

#[derive(Debug, Serialize)]
struct ReportedPeak {
    bin: usize,
    frequency: f32,
    note: Option<String>,
    amplitude: f32,
}

/// Decode `path`, feed it through the pipeline frame by frame, and
/// report the strongest peaks seen across the whole file.
pub fn cmd_analyze(
    path: &Path,
    analysis: &AnalysisConfig,
    report_peaks: usize,
    format: OutputFormat,
) -> anyhow::Result<()> {
    if !path.exists() {
        return Err(Error::not_found(path).into());
    }
    let (samples, sample_rate) = AudioFileReader::decode_all(path).map_err(Error::from)?;
    if samples.is_empty() {
        anyhow::bail!("no audio samples decoded from {}", path.display());
    }

    // Analyze at the file's native rate so bin frequencies are true.
    let mut analysis = analysis.clone();
    analysis.sample_rate = sample_rate;
    let mut pipeline = SpectralPipeline::new(&analysis);

    let mut frames = 0usize;
    let mut strongest: Vec<Peak> = Vec::new();
    for chunk in samples.chunks(analysis.fft_size) {
        let Some(frame) = pipeline.process(chunk) else {
            continue;
        };
        frames += 1;
        merge_strongest(&mut strongest, &frame.peaks, report_peaks);
    }

    if frames == 0 {
        anyhow::bail!(
            "file shorter than one FFT frame ({} samples)",
            analysis.fft_size
        );
    }
    tracing::info!(frames, peaks = strongest.len(), "analysis complete");

    let report = AnalysisReport {
        file: path.display().to_string(),
        sample_rate,
        frames,
        peaks: strongest
            .iter()
            .map(|p| ReportedPeak {
                bin: p.bin,
                frequency: p.frequency,
                note: note_name(p.frequency),
                amplitude: p.amplitude,
            })
            .collect(),
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_text_report(&report),
    }
    Ok(())
}

/// Keep the loudest amplitude seen for each bin, bounded to `limit`
/// entries sorted descending.
fn merge_strongest(strongest: &mut Vec<Peak>, frame_peaks: &[Peak], limit: usize) {
    for peak in frame_peaks.iter().filter(|p| !p.is_padding()) {
        match strongest.iter_mut().find(|p| p.bin == peak.bin) {
            Some(existing) => {
                if peak.amplitude > existing.amplitude {
                    *existing = *peak;
                }
            }
            None => strongest.push(*peak),
        }
    }
    strongest.sort_unstable_by(|a, b| {
        b.amplitude
            .total_cmp(&a.amplitude)
            .then_with(|| a.bin.cmp(&b.bin))
    });
    strongest.truncate(limit);
}

fn print_text_report(report: &AnalysisReport) {
    println!("{}", report.file);
    println!(
        "  {} Hz, {} analysis frame{}",
        report.sample_rate,
        report.frames,
        if report.frames == 1 { "" } else { "s" }
    );
    println!();
    if report.peaks.is_empty() {
        println!("  no peaks above threshold");
        return;
    }
    println!("  {:>4}  {:>6}  {:>10}  {:<10}  amplitude", "rank", "bin", "freq (Hz)", "note");
    for (rank, peak) in report.peaks.iter().enumerate() {
        println!(
            "  {:>4}  {:>6}  {:>10.1}  {:<10}  {:.3}",
            rank + 1,
            peak.bin,
            peak.frequency,
            peak.note.as_deref().unwrap_or("-"),
            peak.amplitude,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peak(bin: usize, amplitude: f32) -> Peak {
        Peak {
            bin,
            amplitude,
            frequency: bin as f32 * 2.69,
        }
    }

    #[test]
    fn test_merge_keeps_loudest_per_bin() {
        let mut strongest = Vec::new();
        merge_strongest(&mut strongest, &[peak(10, 0.5), peak(20, 0.3)], 8);
        merge_strongest(&mut strongest, &[peak(10, 0.9), peak(30, 0.1)], 8);

        assert_eq!(strongest.len(), 3);
        assert_eq!(strongest[0].bin, 10);
        assert_eq!(strongest[0].amplitude, 0.9);
    }

    #[test]
    fn test_merge_respects_limit() {
        let mut strongest = Vec::new();
        let frame: Vec<Peak> = (1..=10).map(|i| peak(i, i as f32 / 10.0)).collect();
        merge_strongest(&mut strongest, &frame, 4);

        assert_eq!(strongest.len(), 4);
        assert_eq!(strongest[0].bin, 10);
        assert_eq!(strongest[3].bin, 7);
    }

    #[test]
    fn test_merge_ignores_padding() {
        let mut strongest = Vec::new();
        merge_strongest(&mut strongest, &[Peak::default(), peak(5, 0.2)], 8);
        assert_eq!(strongest.len(), 1);
        assert_eq!(strongest[0].bin, 5);
    }
}
