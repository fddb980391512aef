//! Source references and fetched media.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::settings::Resolution;

/// One requested input video. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SourceReference {
    /// Opaque locator for the media fetcher (typically a URL).
    pub url: String,

    /// Duration declared by the caller, in seconds. Untrusted; the duration
    /// probe overrides it once the media is on disk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared_duration: Option<f64>,

    /// Display title shown in the moment preview.
    pub title: String,
}

impl SourceReference {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            declared_duration: None,
            title: title.into(),
        }
    }

    pub fn with_declared_duration(mut self, seconds: f64) -> Self {
        self.declared_duration = Some(seconds);
        self
    }
}

/// Duration floor applied when probing fails and no duration was declared.
pub const MIN_FALLBACK_DURATION_SECS: f64 = 30.0;

/// Media produced by the fetcher for one source.
///
/// Owned by the session; the backing files are deleted when the session is
/// evicted or explicitly deleted.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchedMedia {
    /// Index of the originating source in the session's input list. Kept
    /// explicit because failed fetches leave gaps in the fetched set.
    #[serde(default)]
    pub source_index: usize,

    /// Local path to the downloaded media.
    pub media_path: PathBuf,

    /// Local path to the downloaded subtitle track, when one was fetched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle_path: Option<PathBuf>,

    /// Authoritative playable duration in seconds (probe result, falling
    /// back to the declared duration, then to the 30s floor).
    pub duration: f64,

    /// Source frame size, when the probe reported one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
}

impl FetchedMedia {
    pub fn new(media_path: impl Into<PathBuf>, duration: f64) -> Self {
        Self {
            source_index: 0,
            media_path: media_path.into(),
            subtitle_path: None,
            duration,
            resolution: None,
        }
    }

    pub fn with_source_index(mut self, index: usize) -> Self {
        self.source_index = index;
        self
    }

    pub fn with_subtitles(mut self, path: impl Into<PathBuf>) -> Self {
        self.subtitle_path = Some(path.into());
        self
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = Some(resolution);
        self
    }

    /// Resolve the authoritative duration from a probe result and the
    /// declared duration, applying the 30s floor when both are missing.
    pub fn resolve_duration(probed: Option<f64>, declared: Option<f64>) -> f64 {
        match (probed, declared) {
            (Some(p), _) if p > 0.0 => p,
            (_, Some(d)) if d > 0.0 => d,
            _ => MIN_FALLBACK_DURATION_SECS,
        }
    }

    /// All files owned by this media, for cleanup on eviction.
    pub fn owned_files(&self) -> Vec<PathBuf> {
        let mut files = vec![self.media_path.clone()];
        if let Some(subs) = &self.subtitle_path {
            files.push(subs.clone());
        }
        files
    }
}
