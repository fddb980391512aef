//! Compilation settings: quality tiers and reframe modes.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Output resolution in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Aspect ratio as a decimal (width / height).
    pub fn aspect(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Output quality tier for the vertical (9:16) compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    /// 480x854
    Low,
    /// 720x1280
    #[default]
    Standard,
    /// 1080x1920
    High,
}

impl Quality {
    /// Vertical output resolution for this tier.
    pub fn resolution(&self) -> Resolution {
        match self {
            Quality::Low => Resolution::new(480, 854),
            Quality::Standard => Resolution::new(720, 1280),
            Quality::High => Resolution::new(1080, 1920),
        }
    }

    /// Target video bitrate in kbit/s for this tier.
    pub fn video_bitrate_kbps(&self) -> u32 {
        match self {
            Quality::Low => 1500,
            Quality::Standard => 2500,
            Quality::High => 5000,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Low => "480p",
            Quality::Standard => "720p",
            Quality::High => "1080p",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Quality {
    type Err = QualityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "480p" | "low" => Ok(Quality::Low),
            "720p" | "standard" => Ok(Quality::Standard),
            "1080p" | "high" => Ok(Quality::High),
            _ => Err(QualityParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown quality tier: {0}")]
pub struct QualityParseError(String);

/// Strategy for converting the source aspect ratio to the vertical target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReframeMode {
    /// Scale to cover the target height, then crop around a static focus point.
    #[default]
    FixedCrop,
    /// Like FixedCrop, but the focus point follows the primary subject.
    SmartCrop,
    /// Keep the full frame: blurred, darkened background with the source fit on top.
    FitBlur,
}

impl ReframeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReframeMode::FixedCrop => "fixed_crop",
            ReframeMode::SmartCrop => "smart_crop",
            ReframeMode::FitBlur => "fit_blur",
        }
    }
}

impl fmt::Display for ReframeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ReframeMode {
    type Err = ReframeModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fixed_crop" | "fixed" => Ok(ReframeMode::FixedCrop),
            "smart_crop" | "smart" => Ok(ReframeMode::SmartCrop),
            "fit_blur" | "fit" => Ok(ReframeMode::FitBlur),
            _ => Err(ReframeModeParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown reframe mode: {0}")]
pub struct ReframeModeParseError(String);

/// Settings for one compilation job.
///
/// This replaces the loosely-typed settings payload of earlier iterations
/// with an explicit enumeration of recognized options.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CompilationSettings {
    /// Desired total output duration in seconds.
    pub target_duration_seconds: u32,

    /// Output quality tier.
    #[serde(default)]
    pub quality: Quality,

    /// Auto-detect moments via scene/audio scoring. When false the evenly
    /// distributed fallback is used directly.
    #[serde(default = "default_true")]
    pub auto_detect_moments: bool,

    /// Burn subtitles into each clip when a subtitle track is available.
    #[serde(default)]
    pub include_subtitles: bool,

    /// Reframing strategy for the vertical conversion.
    #[serde(default)]
    pub reframe_mode: ReframeMode,

    /// Optional header text rendered above the video area.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout_header_text: Option<String>,
}

fn default_true() -> bool {
    true
}

impl CompilationSettings {
    /// Create settings with the given target duration and defaults elsewhere.
    pub fn new(target_duration_seconds: u32) -> Self {
        Self {
            target_duration_seconds,
            quality: Quality::default(),
            auto_detect_moments: true,
            include_subtitles: false,
            reframe_mode: ReframeMode::default(),
            layout_header_text: None,
        }
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_reframe_mode(mut self, mode: ReframeMode) -> Self {
        self.reframe_mode = mode;
        self
    }

    pub fn with_subtitles(mut self, include: bool) -> Self {
        self.include_subtitles = include;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_resolutions() {
        assert_eq!(Quality::Low.resolution(), Resolution::new(480, 854));
        assert_eq!(Quality::Standard.resolution(), Resolution::new(720, 1280));
        assert_eq!(Quality::High.resolution(), Resolution::new(1080, 1920));
    }

    #[test]
    fn test_quality_bitrates_scale_with_tier() {
        assert_eq!(Quality::Low.video_bitrate_kbps(), 1500);
        assert_eq!(Quality::Standard.video_bitrate_kbps(), 2500);
        assert_eq!(Quality::High.video_bitrate_kbps(), 5000);
    }

    #[test]
    fn test_quality_parse() {
        assert_eq!("720p".parse::<Quality>().unwrap(), Quality::Standard);
        assert_eq!("1080p".parse::<Quality>().unwrap(), Quality::High);
        assert!("4k".parse::<Quality>().is_err());
    }

    #[test]
    fn test_reframe_mode_parse() {
        assert_eq!(
            "smart_crop".parse::<ReframeMode>().unwrap(),
            ReframeMode::SmartCrop
        );
        assert_eq!("fit_blur".parse::<ReframeMode>().unwrap(), ReframeMode::FitBlur);
        assert!("zoom".parse::<ReframeMode>().is_err());
    }

    #[test]
    fn test_settings_defaults() {
        let json = r#"{"target_duration_seconds": 30}"#;
        let settings: CompilationSettings = serde_json::from_str(json).unwrap();
        assert!(settings.auto_detect_moments);
        assert!(!settings.include_subtitles);
        assert_eq!(settings.quality, Quality::Standard);
        assert_eq!(settings.reframe_mode, ReframeMode::FixedCrop);
    }
}
