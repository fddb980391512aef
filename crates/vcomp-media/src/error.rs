//! Error types for the media core.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while scoring, selecting or planning.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("No usable moments: {0}")]
    NoMoments(String),

    #[error("Invalid clip window: start {start}s, end {end}s")]
    InvalidWindow { start: f64, end: f64 },

    #[error("Subtitle track could not be parsed: {0}")]
    SubtitleParse(String),

    #[error("Focus estimation unavailable: {0}")]
    FocusUnavailable(String),

    #[error("Probe failed: {0}")]
    ProbeFailed(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    pub fn no_moments(message: impl Into<String>) -> Self {
        Self::NoMoments(message.into())
    }

    pub fn focus_unavailable(message: impl Into<String>) -> Self {
        Self::FocusUnavailable(message.into())
    }

    pub fn probe_failed(message: impl Into<String>) -> Self {
        Self::ProbeFailed(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Non-fatal errors are recovered locally (probe fallback, center focus,
    /// captionless clips) instead of failing the session.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MediaError::SubtitleParse(_)
                | MediaError::FocusUnavailable(_)
                | MediaError::ProbeFailed(_)
        )
    }
}
