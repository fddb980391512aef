//! Engagement-signal extraction contract.

use async_trait::async_trait;
use std::path::Path;

use crate::error::MediaResult;

/// Raw engagement signals for one source, both timestamp sets ascending.
#[derive(Debug, Clone, Default)]
pub struct MomentSignals {
    /// Scene-cut timestamps in seconds.
    pub scene_cuts: Vec<f64>,
    /// Audio-energy peak timestamps in seconds.
    pub energy_peaks: Vec<f64>,
}

impl MomentSignals {
    pub fn new(scene_cuts: Vec<f64>, energy_peaks: Vec<f64>) -> Self {
        Self {
            scene_cuts,
            energy_peaks,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.scene_cuts.is_empty() && self.energy_peaks.is_empty()
    }
}

/// External capability that extracts scoring signals from a media file.
///
/// Extraction failures are non-fatal: the pipeline falls back to the evenly
/// distributed moments for that source.
#[async_trait]
pub trait SignalExtractor: Send + Sync {
    /// Extract scene cuts and energy peaks from the file at `path`.
    async fn extract(&self, path: &Path, duration: f64) -> MediaResult<MomentSignals>;
}
