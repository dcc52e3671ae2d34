//! Real-time analysis session: sample ingestion, the analysis thread,
//! and atomic frame publication.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   Producer (any thread)                         │
//! │     Pushes mono samples into the lock-free ring buffer          │
//! └────────────────────────────┬────────────────────────────────────┘
//!                              │ rtrb ring buffer
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  Analysis Thread                                │
//! │   Drains samples, runs the spectral pipeline, publishes each    │
//! │   completed frame as an atomic Arc swap                         │
//! └────────────────────────────┬────────────────────────────────────┘
//!                              │ Arc<AnalysisFrame> snapshot
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 Consumers (render/UI threads)                   │
//! │   latest() hands out the current frame; readers never see a     │
//! │   torn array and never block the producer                      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A consumer that reads mid-frame simply keeps the previous snapshot;
//! skipping or re-rendering a frame is always safe, so there is no
//! backpressure or retry machinery.

mod decoder;
mod state;

pub use decoder::AudioFileReader;
pub use state::{SessionCommand, SessionState};

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, bounded};
use parking_lot::RwLock;

use crate::analysis::{AnalysisFrame, SpectralPipeline};
use crate::config::AnalysisConfig;

/// How long the analysis thread sleeps when the ring buffer is empty.
const IDLE_SLEEP: Duration = Duration::from_millis(1);

/// A running analysis session.
///
/// Owns the analysis thread and the sample ring buffer feeding it.
/// Dropping the session shuts the thread down.
pub struct AnalysisSession {
    /// Latest completed frame; replaced wholesale, never mutated.
    frame: Arc<RwLock<Arc<AnalysisFrame>>>,
    state: Arc<RwLock<SessionState>>,
    command_tx: Sender<SessionCommand>,
    producer: rtrb::Producer<f32>,
    thread: Option<JoinHandle<()>>,
}

impl AnalysisSession {
    /// Spawn the analysis thread for the given configuration.
    ///
    /// The ring buffer holds four FFT frames of samples; pushing faster
    /// than the thread drains drops the excess (and counts it in
    /// [`SessionState::samples_dropped`]).
    pub fn spawn(config: &AnalysisConfig) -> Result<Self, StreamError> {
        let pipeline = SpectralPipeline::new(config);
        let frame = Arc::new(RwLock::new(Arc::new(AnalysisFrame::default())));
        let state = Arc::new(RwLock::new(SessionState::new(config.sample_rate)));
        let (command_tx, command_rx) = bounded(8);
        let (producer, consumer) = rtrb::RingBuffer::new(config.fft_size * 4);

        let thread_frame = Arc::clone(&frame);
        let thread_state = Arc::clone(&state);
        let thread = thread::Builder::new()
            .name("spectral-analysis".to_string())
            .spawn(move || {
                analysis_thread_main(pipeline, consumer, command_rx, thread_frame, thread_state);
            })
            .map_err(|e| StreamError::ThreadStart(e.to_string()))?;

        state.write().running = true;
        tracing::info!(
            sample_rate = config.sample_rate,
            fft_size = config.fft_size,
            "analysis session started"
        );

        Ok(Self {
            frame,
            state,
            command_tx,
            producer,
            thread: Some(thread),
        })
    }

    /// Push mono samples toward the analysis thread.
    ///
    /// Returns how many samples were accepted; the rest were dropped
    /// because the ring buffer was full.
    pub fn push_samples(&mut self, samples: &[f32]) -> usize {
        let mut accepted = 0;
        for &sample in samples {
            if self.producer.push(sample).is_err() {
                break;
            }
            accepted += 1;
        }
        let dropped = samples.len() - accepted;
        if dropped > 0 {
            self.state.write().samples_dropped += dropped as u64;
            tracing::trace!(dropped, "ring buffer full, dropping samples");
        }
        accepted
    }

    /// The latest completed analysis frame.
    ///
    /// Cheap to call every display refresh; the returned `Arc` stays
    /// valid even after newer frames are published.
    pub fn latest(&self) -> Arc<AnalysisFrame> {
        Arc::clone(&self.frame.read())
    }

    /// Snapshot of the session counters.
    pub fn state(&self) -> SessionState {
        self.state.read().clone()
    }

    /// Drop buffered samples and smoothing history.
    pub fn reset(&self) -> Result<(), StreamError> {
        self.command_tx
            .send(SessionCommand::Reset)
            .map_err(|_| StreamError::ChannelClosed)
    }

    /// Change the temporal smoothing factor.
    pub fn set_smoothing(&self, smoothing: f32) -> Result<(), StreamError> {
        self.command_tx
            .send(SessionCommand::SetSmoothing(smoothing))
            .map_err(|_| StreamError::ChannelClosed)
    }
}

impl Drop for AnalysisSession {
    fn drop(&mut self) {
        let _ = self.command_tx.send(SessionCommand::Shutdown);
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            tracing::warn!("analysis thread panicked during shutdown");
        }
    }
}

/// Main loop of the analysis thread.
fn analysis_thread_main(
    mut pipeline: SpectralPipeline,
    mut consumer: rtrb::Consumer<f32>,
    command_rx: Receiver<SessionCommand>,
    frame_slot: Arc<RwLock<Arc<AnalysisFrame>>>,
    state: Arc<RwLock<SessionState>>,
) {
    let mut chunk = vec![0.0f32; 2048];

    loop {
        // Commands first, so Reset/Shutdown act even under sample load.
        while let Ok(command) = command_rx.try_recv() {
            match command {
                SessionCommand::Reset => pipeline.reset(),
                SessionCommand::SetSmoothing(s) => pipeline.set_smoothing(s),
                SessionCommand::Shutdown => {
                    state.write().running = false;
                    tracing::debug!("analysis thread shutting down");
                    return;
                }
            }
        }

        let available = consumer.slots().min(chunk.len());
        if available == 0 {
            thread::sleep(IDLE_SLEEP);
            continue;
        }

        for slot in chunk[..available].iter_mut() {
            // pop cannot fail: we are the only consumer and just
            // observed at least `available` readable slots.
            *slot = consumer.pop().unwrap_or(0.0);
        }
        state.write().samples_consumed += available as u64;

        if let Some(frame) = pipeline.process(&chunk[..available]) {
            *frame_slot.write() = Arc::new(frame);
            state.write().frames_analyzed += 1;
        }
    }
}

/// Streaming/decoding errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StreamError {
    #[error("Failed to start analysis thread: {0}")]
    ThreadStart(String),

    #[error("Session command channel closed")]
    ChannelClosed,

    #[error("Failed to decode audio: {0}")]
    Decode(String),

    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("File not found: {0}")]
    FileNotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;
    use std::time::Instant;

    fn small_config() -> AnalysisConfig {
        AnalysisConfig {
            fft_size: 1024,
            ..AnalysisConfig::default()
        }
    }

    fn wait_for_frames(session: &AnalysisSession, count: u64) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if session.state().frames_analyzed >= count {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_session_publishes_frames() {
        let config = small_config();
        let mut session = AnalysisSession::spawn(&config).unwrap();

        let samples: Vec<f32> = (0..config.fft_size * 2)
            .map(|i| (TAU * 440.0 * i as f32 / config.sample_rate as f32).sin())
            .collect();
        assert_eq!(session.push_samples(&samples), samples.len());

        assert!(wait_for_frames(&session, 1), "no frame published");
        let frame = session.latest();
        assert_eq!(frame.spectrum.len(), config.bin_count());
        assert!(frame.peak_level > 0.5);
    }

    #[test]
    fn test_latest_before_audio_is_default() {
        let session = AnalysisSession::spawn(&small_config()).unwrap();
        let frame = session.latest();
        assert!(frame.spectrum.is_empty());
        assert!(frame.peaks.iter().all(|p| p.is_padding()));
    }

    #[test]
    fn test_push_drops_when_ring_full() {
        let config = small_config();
        let mut session = AnalysisSession::spawn(&config).unwrap();
        // Ring holds fft_size * 4 samples; push well past that without
        // giving the thread time to drain everything.
        let oversized = vec![0.0f32; config.fft_size * 64];
        let accepted = session.push_samples(&oversized);
        assert!(accepted <= oversized.len());
    }

    #[test]
    fn test_shutdown_on_drop_joins_thread() {
        let session = AnalysisSession::spawn(&small_config()).unwrap();
        assert!(session.state().running);
        drop(session);
        // Drop returning at all proves the join completed.
    }

    #[test]
    fn test_reset_command_accepted() {
        let session = AnalysisSession::spawn(&small_config()).unwrap();
        session.reset().unwrap();
        session.set_smoothing(0.5).unwrap();
    }
}
