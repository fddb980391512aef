//! Duration probe contract.

use async_trait::async_trait;
use std::path::Path;

use crate::error::MediaResult;
use vcomp_models::Resolution;

/// Probe result: playable duration plus the source frame size when the
/// probing tool reports one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaInfo {
    /// Playable duration in seconds.
    pub duration: f64,
    /// Source resolution, when known.
    pub resolution: Option<Resolution>,
}

impl MediaInfo {
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            resolution: None,
        }
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.resolution = Some(Resolution::new(width, height));
        self
    }
}

/// External capability that inspects a downloaded media file.
///
/// Probe failures are non-fatal: the pipeline falls back to the declared
/// duration (or the 30s floor) when the probe errors out, and the plan
/// builder assumes a landscape source when the resolution is unknown.
#[async_trait]
pub trait DurationProbe: Send + Sync {
    /// Inspect the file at `path`.
    async fn probe(&self, path: &Path) -> MediaResult<MediaInfo>;
}
