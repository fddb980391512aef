//! Render directives and the typed filter-graph IR.
//!
//! The pipeline core never emits tool-specific filter syntax. Each clip's
//! transform is described by a [`RenderDirective`] holding an ordered
//! [`FilterChain`]; the transcoder adapter serializes the chain to whatever
//! its native tool requires. This keeps the plan testable via assertions on
//! the IR and bounded in size (no per-frame animation).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::settings::{Quality, ReframeMode, Resolution};

/// How a scale stage treats the source aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScaleMode {
    /// Scale so the frame covers the target box (excess is cropped later).
    Cover,
    /// Scale so the frame fits inside the target box (padded later).
    Fit,
}

/// Fixed styling for burned-in subtitles, independent of reframe mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubtitleStyle {
    pub font: String,
    pub font_size: u32,
    pub outline_width: u32,
    pub margin_vertical: u32,
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self {
            font: "Arial".to_string(),
            font_size: 14,
            outline_width: 2,
            margin_vertical: 40,
        }
    }
}

/// One stage of a clip's declarative transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum FilterStage {
    /// Scale towards the target box.
    Scale {
        width: u32,
        height: u32,
        mode: ScaleMode,
    },

    /// Crop a window of the given size, horizontally centered on
    /// `focus_fraction` of the scaled width (0.0 = left edge, 1.0 = right).
    CropFocus {
        width: u32,
        height: u32,
        focus_fraction: f64,
    },

    /// Pad to the target box, centering the frame.
    Pad { width: u32, height: u32 },

    /// Full-bleed blurred and darkened background with the untouched frame
    /// scaled to fit and composited centered on top.
    BlurFill {
        width: u32,
        height: u32,
        blur_radius: u32,
        darken: f64,
    },

    /// Burn in subtitles from a clip-relative track. Optional overlay: a
    /// reduced plan drops this stage.
    Subtitles {
        path: PathBuf,
        style: SubtitleStyle,
    },

    /// Static header text above the video area. Optional overlay.
    HeaderText { text: String },
}

impl FilterStage {
    /// Whether this stage is an optional overlay that a reduced plan omits.
    pub fn is_optional_overlay(&self) -> bool {
        matches!(self, FilterStage::Subtitles { .. } | FilterStage::HeaderText { .. })
    }
}

/// Ordered list of filter stages for one clip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FilterChain {
    pub stages: Vec<FilterStage>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    pub fn push(&mut self, stage: FilterStage) {
        self.stages.push(stage);
    }

    /// Copy of this chain without optional overlay stages.
    pub fn without_overlays(&self) -> Self {
        Self {
            stages: self
                .stages
                .iter()
                .filter(|s| !s.is_optional_overlay())
                .cloned()
                .collect(),
        }
    }

    pub fn has_optional_overlays(&self) -> bool {
        self.stages.iter().any(|s| s.is_optional_overlay())
    }
}

/// One clip's transformation recipe. Immutable once handed to the transcoder.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RenderDirective {
    /// Source media on local disk.
    pub source_path: PathBuf,

    /// Clip start within the source, in seconds.
    pub start: f64,

    /// Clip end within the source, in seconds.
    pub end: f64,

    /// Reframing strategy this directive was built for.
    pub reframe_mode: ReframeMode,

    /// Horizontal focus fraction used by crop stages, when one was estimated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus_fraction: Option<f64>,

    /// Clip-relative subtitle track burned in by a Subtitles stage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle_path: Option<PathBuf>,

    /// Ordered transform stages.
    pub chain: FilterChain,

    /// Where the rendered clip is written.
    pub output_target: PathBuf,
}

impl RenderDirective {
    /// Clip length in seconds.
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// Copy of this directive with optional overlay stages removed.
    pub fn reduced(&self) -> Self {
        Self {
            subtitle_path: None,
            chain: self.chain.without_overlays(),
            ..self.clone()
        }
    }
}

/// Final concatenation of rendered clips, in playback order.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ConcatDirective {
    /// Rendered clip files, in order.
    pub inputs: Vec<PathBuf>,

    /// Final compilation output.
    pub output: PathBuf,
}

/// The full render plan for one session: per-clip directives plus the
/// terminal concatenation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RenderPlan {
    pub quality: Quality,
    pub directives: Vec<RenderDirective>,
    pub concat: ConcatDirective,
}

impl RenderPlan {
    /// Output resolution of every directive in this plan.
    pub fn resolution(&self) -> Resolution {
        self.quality.resolution()
    }

    /// Whether any directive carries optional overlay stages.
    pub fn has_optional_overlays(&self) -> bool {
        self.directives.iter().any(|d| d.chain.has_optional_overlays())
    }

    /// Reduced plan for the unsupported-filter retry: same cuts and
    /// reframing, no optional overlays.
    pub fn reduced(&self) -> Self {
        Self {
            quality: self.quality,
            directives: self.directives.iter().map(RenderDirective::reduced).collect(),
            concat: self.concat.clone(),
        }
    }

    /// Total playable duration of the plan in seconds.
    pub fn total_duration(&self) -> f64 {
        self.directives.iter().map(RenderDirective::duration).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directive_with(stages: Vec<FilterStage>) -> RenderDirective {
        RenderDirective {
            source_path: PathBuf::from("/tmp/in.mp4"),
            start: 10.0,
            end: 14.0,
            reframe_mode: ReframeMode::FixedCrop,
            focus_fraction: Some(0.5),
            subtitle_path: None,
            chain: FilterChain { stages },
            output_target: PathBuf::from("/tmp/out.mp4"),
        }
    }

    #[test]
    fn test_reduced_strips_overlays() {
        let directive = directive_with(vec![
            FilterStage::Scale {
                width: 720,
                height: 1280,
                mode: ScaleMode::Cover,
            },
            FilterStage::Subtitles {
                path: PathBuf::from("/tmp/clip.srt"),
                style: SubtitleStyle::default(),
            },
        ]);

        assert!(directive.chain.has_optional_overlays());
        let reduced = directive.reduced();
        assert_eq!(reduced.chain.stages.len(), 1);
        assert!(!reduced.chain.has_optional_overlays());
    }

    #[test]
    fn test_plan_total_duration() {
        let plan = RenderPlan {
            quality: Quality::Standard,
            directives: vec![directive_with(vec![]), directive_with(vec![])],
            concat: ConcatDirective {
                inputs: vec![],
                output: PathBuf::from("/tmp/final.mp4"),
            },
        };
        assert!((plan.total_duration() - 8.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_stage_serde_roundtrip() {
        let stage = FilterStage::CropFocus {
            width: 720,
            height: 1280,
            focus_fraction: 0.35,
        };
        let json = serde_json::to_string(&stage).unwrap();
        assert!(json.contains("crop_focus"));
        let back: FilterStage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stage);
    }
}
