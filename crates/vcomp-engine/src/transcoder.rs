//! Transcoding contract.

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

use vcomp_models::RenderPlan;

/// Failure modes of a transcoder run.
#[derive(Debug, Error)]
pub enum TranscodeError {
    /// The tool rejected a filter stage. Worth one retry with a reduced
    /// plan when the failed plan carried optional overlays.
    #[error("Unsupported filter stage: {0}")]
    UnsupportedFilter(String),

    #[error("Transcode failed: {0}")]
    Failed(String),
}

/// External capability that executes a render plan and produces the final
/// compilation file.
///
/// Implementations own the concat strategy internally (stream-copy first,
/// re-encode on failure); the plan only supplies the concat directive.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Execute every directive plus the final concat; returns the output
    /// file path.
    async fn execute(&self, plan: &RenderPlan) -> Result<PathBuf, TranscodeError>;
}
