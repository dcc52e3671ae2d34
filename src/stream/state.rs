//! Session state and command types.

/// Shared session state, updated by the analysis thread.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Whether the analysis thread is running
    pub running: bool,
    /// Sample rate the session analyzes at
    pub sample_rate: u32,
    /// Frames analyzed since the session started
    pub frames_analyzed: u64,
    /// Samples consumed from the ring buffer
    pub samples_consumed: u64,
    /// Samples rejected because the ring buffer was full
    pub samples_dropped: u64,
}

impl SessionState {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            running: false,
            sample_rate,
            frames_analyzed: 0,
            samples_consumed: 0,
            samples_dropped: 0,
        }
    }
}

/// Commands sent to the analysis thread.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// Drop buffered samples and smoothing history
    Reset,
    /// Change the temporal smoothing factor
    SetSmoothing(f32),
    /// Shut down the analysis thread
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_state_new() {
        let state = SessionState::new(48_000);
        assert!(!state.running);
        assert_eq!(state.sample_rate, 48_000);
        assert_eq!(state.frames_analyzed, 0);
    }
}
