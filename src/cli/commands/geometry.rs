//! The `geometry` command: print the octave table and bin geometry for
//! a configuration, as a rendering layer would consume it.

use crate::analysis::OctaveGeometry;
use crate::config::AnalysisConfig;

pub fn cmd_geometry(analysis: &AnalysisConfig) -> anyhow::Result<()> {
    let geometry = OctaveGeometry::new(
        analysis.sample_rate,
        analysis.bin_count(),
        analysis.lowest_left_freq,
        analysis.octave_count,
    );

    println!(
        "{} Hz sample rate, {} bins, {:.4} Hz per bin",
        geometry.sample_rate(),
        geometry.bin_count(),
        geometry.bin_freq_width(),
    );
    println!();
    println!(
        "  {:>6}  {:>10}  {:>10}  {:>8}  {:>8}  {:>6}",
        "octave", "left (Hz)", "right (Hz)", "bottom", "top", "bins"
    );
    for (index, band) in geometry.octaves().iter().enumerate() {
        match band.bins {
            Some((bottom, top)) => println!(
                "  {:>6}  {:>10.2}  {:>10.2}  {:>8}  {:>8}  {:>6}",
                index,
                band.left_freq,
                band.right_freq,
                bottom,
                top,
                band.bin_count(),
            ),
            None => println!(
                "  {:>6}  {:>10.2}  {:>10.2}  {:>8}  {:>8}  {:>6}",
                index, band.left_freq, band.right_freq, "-", "-", 0,
            ),
        }
    }

    if let Some((bottom, top)) = geometry.peak_scan_range() {
        println!();
        println!("  peak scan range: bins {} - {}", bottom, top);
    }
    Ok(())
}
