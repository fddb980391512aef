//! Engine error types.

use thiserror::Error;

use vcomp_media::MediaError;
use vcomp_models::{SessionId, Stage, StageTransitionError};

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Fetch failed for {url}: {message}")]
    FetchFailed { url: String, message: String },

    #[error("All {0} sources failed to fetch")]
    AllSourcesFailed(usize),

    #[error("Render failed: {message}")]
    Render { message: String, recoverable: bool },

    #[error("No sources submitted")]
    NoSources,

    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("Session {id} is not ready for compilation (stage: {stage})")]
    SessionNotReady { id: SessionId, stage: Stage },

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error(transparent)]
    Transition(#[from] StageTransitionError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn fetch_failed(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FetchFailed {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Render failure worth one retry with a reduced plan.
    pub fn render_unsupported(message: impl Into<String>) -> Self {
        Self::Render {
            message: message.into(),
            recoverable: true,
        }
    }

    pub fn render_fatal(message: impl Into<String>) -> Self {
        Self::Render {
            message: message.into(),
            recoverable: false,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout(message.into())
    }

    /// Whether this is a render failure that a reduced plan may survive.
    pub fn is_recoverable_render(&self) -> bool {
        matches!(
            self,
            EngineError::Render {
                recoverable: true,
                ..
            }
        )
    }

    /// Caller errors surface to the API layer instead of failing a session.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            EngineError::NoSources
                | EngineError::SessionNotFound(_)
                | EngineError::SessionNotReady { .. }
        )
    }
}
