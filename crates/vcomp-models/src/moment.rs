//! Scored candidate moments.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::timestamp::format_display;

/// Engagement tier attached to a selected moment.
///
/// Tiers alternate High/Medium by selection order rather than being derived
/// from the score; they drive presentation, not ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum EngagementTier {
    High,
    #[default]
    Medium,
}

impl EngagementTier {
    /// Tier for a moment by its selection order index (High, Medium, High, ...).
    pub fn for_index(index: usize) -> Self {
        if index % 2 == 0 {
            EngagementTier::High
        } else {
            EngagementTier::Medium
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EngagementTier::High => "high",
            EngagementTier::Medium => "medium",
        }
    }
}

/// A scored candidate clip within one source video.
///
/// Invariants: `end > start`, both within `[0, source duration]`. Once a
/// moment is selected it belongs to exactly one render slot.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Moment {
    /// Index of the source this moment was cut from.
    pub source_index: usize,

    /// Clip start in seconds, relative to the source.
    pub start: f64,

    /// Clip end in seconds, relative to the source.
    pub end: f64,

    /// Heuristic score in [0, 1].
    pub score: f64,

    /// Short descriptive label ("Peak engagement", "Good moment", ...).
    pub label: String,

    /// Alternating engagement tier by selection order.
    #[serde(default)]
    pub engagement_tier: EngagementTier,
}

impl Moment {
    /// Create a moment, clamping the score into [0, 1].
    pub fn new(source_index: usize, start: f64, end: f64, score: f64, label: impl Into<String>) -> Self {
        Self {
            source_index,
            start,
            end,
            score: score.clamp(0.0, 1.0),
            label: label.into(),
            engagement_tier: EngagementTier::default(),
        }
    }

    pub fn with_tier(mut self, tier: EngagementTier) -> Self {
        self.engagement_tier = tier;
        self
    }

    /// Clip length in seconds.
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// Display timestamp of the clip start (`M:SS`).
    pub fn display_timestamp(&self) -> String {
        format_display(self.start)
    }

    /// Trim the clip end so the moment lasts exactly `len` seconds.
    pub fn trimmed_to(mut self, len: f64) -> Self {
        self.end = self.start + len.max(0.0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_cycling() {
        assert_eq!(EngagementTier::for_index(0), EngagementTier::High);
        assert_eq!(EngagementTier::for_index(1), EngagementTier::Medium);
        assert_eq!(EngagementTier::for_index(2), EngagementTier::High);
        assert_eq!(EngagementTier::for_index(3), EngagementTier::Medium);
    }

    #[test]
    fn test_moment_duration_and_trim() {
        let m = Moment::new(0, 10.0, 16.0, 0.8, "Key highlight");
        assert!((m.duration() - 6.0).abs() < f64::EPSILON);

        let trimmed = m.trimmed_to(2.5);
        assert!((trimmed.duration() - 2.5).abs() < f64::EPSILON);
        assert!((trimmed.end - 12.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_score_clamped() {
        let m = Moment::new(0, 0.0, 3.0, 1.4, "x");
        assert!((m.score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_display_timestamp() {
        let m = Moment::new(0, 95.7, 99.0, 0.5, "x");
        assert_eq!(m.display_timestamp(), "1:35");
    }
}
