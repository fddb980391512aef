//! Subtitle track entries.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One subtitle cue with timing in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubtitleEntry {
    /// Cue start in seconds.
    pub start: f64,
    /// Cue end in seconds.
    pub end: f64,
    /// Cue text (joined lines).
    pub text: String,
}

impl SubtitleEntry {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    /// Whether this cue overlaps the window `[clip_start, clip_end)`.
    pub fn overlaps(&self, clip_start: f64, clip_end: f64) -> bool {
        self.end > clip_start && self.start < clip_end
    }
}
