//! Media fetching contract.

use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::EngineResult;
use crate::progress::SourceProgressHandle;
use vcomp_models::SourceReference;

/// What the fetcher hands back for one source. The pipeline probes the
/// media afterwards; `duration_hint` only backs up a failed probe.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// Local path to the downloaded media.
    pub media_path: PathBuf,

    /// Local path to the downloaded subtitle track, when requested and found.
    pub subtitle_path: Option<PathBuf>,

    /// Duration reported by the fetch tool, in seconds.
    pub duration_hint: Option<f64>,
}

impl FetchOutcome {
    pub fn new(media_path: impl Into<PathBuf>) -> Self {
        Self {
            media_path: media_path.into(),
            subtitle_path: None,
            duration_hint: None,
        }
    }

    pub fn with_subtitles(mut self, path: impl Into<PathBuf>) -> Self {
        self.subtitle_path = Some(path.into());
        self
    }

    pub fn with_duration_hint(mut self, seconds: f64) -> Self {
        self.duration_hint = Some(seconds);
        self
    }
}

/// External capability that downloads one source to local disk.
///
/// Implementations report byte progress through `progress` as data arrives.
/// A failure with `want_subtitles` set is retried once without subtitles
/// before the source counts as failed.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(
        &self,
        source: &SourceReference,
        want_subtitles: bool,
        progress: SourceProgressHandle,
    ) -> EngineResult<FetchOutcome>;
}
