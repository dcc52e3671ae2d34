//! Application-wide error types.
//!
//! Library modules use specific error types via `thiserror` (see
//! [`crate::stream::StreamError`] and [`crate::config::ConfigError`]);
//! the CLI/main layer uses `anyhow` for convenient propagation.

use std::path::PathBuf;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level application error.
///
/// Aggregates errors from all subsystems for unified handling.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Audio decoding/streaming error
    #[error("Stream error: {0}")]
    Stream(#[from] crate::stream::StreamError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// File not found
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a not found error.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound(path.into())
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Io(e).context(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::not_found("/music/track.flac");
        assert!(err.to_string().contains("/music/track.flac"));
    }

    #[test]
    fn test_error_with_context() {
        let err = Error::config("bad fft_size").context("while building pipeline");
        let msg = err.to_string();
        assert!(msg.contains("while building pipeline"));
    }

    #[test]
    fn test_result_ext() {
        let result: Result<()> = Err(Error::config("test"));
        let with_ctx = result.with_context("additional context");
        assert!(
            with_ctx
                .unwrap_err()
                .to_string()
                .contains("additional context")
        );
    }
}
