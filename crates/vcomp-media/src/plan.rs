//! Render plan assembly.
//!
//! Turns the selected moments into per-clip [`RenderDirective`]s plus the
//! final concatenation. Reframing math happens here; the transcoder only
//! ever sees the typed filter-graph IR.

use std::path::PathBuf;
use tracing::{debug, warn};

use vcomp_models::{
    CompilationSettings, ConcatDirective, FetchedMedia, FilterChain, FilterStage, Moment,
    ReframeMode, RenderDirective, RenderPlan, Resolution, ScaleMode, SubtitleStyle,
};

use crate::error::{MediaError, MediaResult};
use crate::focus::{saliency_focus, subject_focus, FrameAnalyzer};
use crate::subtitles::{parse_srt, retime_track, to_srt};

/// Frames sampled per clip for the saliency estimate.
const SALIENCY_SAMPLES: usize = 5;

/// Subject-tracking window length in seconds.
const SUBJECT_INTERVAL_SECS: f64 = 0.5;

/// Blur radius and darkening factor for the fit-blur background.
const FITBLUR_RADIUS: u32 = 20;
const FITBLUR_DARKEN: f64 = 0.35;

/// Focus used whenever estimation is unavailable or fails.
const CENTER_FOCUS: f64 = 0.5;

/// Aspect ratios closer than this are treated as matching (scale + pad
/// instead of crop).
const ASPECT_EPSILON: f64 = 0.01;

/// Assumed source frame size when the probe did not report one.
const DEFAULT_SOURCE_RESOLUTION: Resolution = Resolution::new(1920, 1080);

/// Builds the declarative render plan for one session.
pub struct RenderPlanBuilder<'a> {
    settings: &'a CompilationSettings,
    work_dir: PathBuf,
}

impl<'a> RenderPlanBuilder<'a> {
    /// Create a builder writing clip artifacts (re-timed subtitle tracks,
    /// rendered clips, the final output) under `work_dir`.
    pub fn new(settings: &'a CompilationSettings, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            settings,
            work_dir: work_dir.into(),
        }
    }

    /// Assemble the full plan: one directive per moment, in order, plus the
    /// concatenation into `output_name`.
    pub async fn build(
        &self,
        moments: &[Moment],
        media: &[FetchedMedia],
        analyzer: &dyn FrameAnalyzer,
        output_name: &str,
    ) -> MediaResult<RenderPlan> {
        if moments.is_empty() {
            return Err(MediaError::no_moments("render plan requires moments"));
        }

        let mut directives = Vec::with_capacity(moments.len());
        for (idx, moment) in moments.iter().enumerate() {
            let source = media
                .iter()
                .find(|m| m.source_index == moment.source_index)
                .ok_or_else(|| {
                    MediaError::internal(format!(
                        "moment references unfetched source {}",
                        moment.source_index
                    ))
                })?;
            directives.push(self.build_directive(idx, moment, source, analyzer).await?);
        }

        let concat = ConcatDirective {
            inputs: directives.iter().map(|d| d.output_target.clone()).collect(),
            output: self.work_dir.join(output_name),
        };

        debug!(
            clips = directives.len(),
            quality = %self.settings.quality,
            "Assembled render plan"
        );

        Ok(RenderPlan {
            quality: self.settings.quality,
            directives,
            concat,
        })
    }

    async fn build_directive(
        &self,
        idx: usize,
        moment: &Moment,
        source: &FetchedMedia,
        analyzer: &dyn FrameAnalyzer,
    ) -> MediaResult<RenderDirective> {
        if moment.end <= moment.start {
            return Err(MediaError::InvalidWindow {
                start: moment.start,
                end: moment.end,
            });
        }

        let target = self.settings.quality.resolution();
        let mode = self.settings.reframe_mode;

        let focus = match mode {
            ReframeMode::FitBlur => None,
            ReframeMode::FixedCrop | ReframeMode::SmartCrop => {
                Some(self.estimate_focus(mode, moment, source, analyzer).await)
            }
        };

        let mut chain = reframe_chain(
            mode,
            source.resolution.unwrap_or(DEFAULT_SOURCE_RESOLUTION),
            target,
            focus.unwrap_or(CENTER_FOCUS),
        );

        if let Some(text) = &self.settings.layout_header_text {
            chain.push(FilterStage::HeaderText { text: text.clone() });
        }

        // Subtitle burn-in stays the terminal stage so captions render on
        // top of every other overlay.
        let subtitle_path = if self.settings.include_subtitles {
            self.prepare_clip_subtitles(idx, moment, source).await
        } else {
            None
        };
        if let Some(path) = &subtitle_path {
            chain.push(FilterStage::Subtitles {
                path: path.clone(),
                style: SubtitleStyle::default(),
            });
        }

        Ok(RenderDirective {
            source_path: source.media_path.clone(),
            start: moment.start,
            end: moment.end,
            reframe_mode: mode,
            focus_fraction: focus,
            subtitle_path,
            chain,
            output_target: self.work_dir.join(format!("clip_{:02}.mp4", idx)),
        })
    }

    /// Estimate the horizontal focus for a crop mode. Never fails: any
    /// estimation problem degrades to a pure center crop.
    async fn estimate_focus(
        &self,
        mode: ReframeMode,
        moment: &Moment,
        source: &FetchedMedia,
        analyzer: &dyn FrameAnalyzer,
    ) -> f64 {
        let path = source.media_path.as_path();
        let estimate = match mode {
            ReframeMode::FixedCrop => analyzer
                .saliency_samples(path, moment.start, moment.end, SALIENCY_SAMPLES)
                .await
                .map(|samples| saliency_focus(&samples)),
            ReframeMode::SmartCrop => analyzer
                .subject_windows(path, moment.start, moment.end, SUBJECT_INTERVAL_SECS)
                .await
                .map(|windows| subject_focus(&windows)),
            ReframeMode::FitBlur => Ok(None),
        };

        match estimate {
            Ok(Some(focus)) => focus,
            Ok(None) => CENTER_FOCUS,
            Err(e) => {
                warn!(error = %e, "Focus estimation failed, using center crop");
                CENTER_FOCUS
            }
        }
    }

    /// Slice and re-time the source subtitle track to this clip, writing a
    /// clip-relative SRT next to the clip output. Non-fatal on any failure.
    async fn prepare_clip_subtitles(
        &self,
        idx: usize,
        moment: &Moment,
        source: &FetchedMedia,
    ) -> Option<PathBuf> {
        let track_path = source.subtitle_path.as_deref()?;

        let content = match tokio::fs::read_to_string(track_path).await {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %track_path.display(), error = %e, "Could not read subtitle track");
                return None;
            }
        };

        let entries = match parse_srt(&content) {
            Ok(e) => e,
            Err(e) => {
                warn!(path = %track_path.display(), error = %e, "Could not parse subtitle track");
                return None;
            }
        };

        let retimed = retime_track(&entries, moment.start, moment.end)?;
        let clip_track = self.work_dir.join(format!("clip_{:02}.srt", idx));
        if let Err(e) = tokio::fs::write(&clip_track, to_srt(&retimed)).await {
            warn!(path = %clip_track.display(), error = %e, "Could not write clip subtitles");
            return None;
        }

        Some(clip_track)
    }
}

/// Filter stages for one reframe mode.
///
/// - Matching aspect: scale to fit and pad, preserving the full frame.
/// - Crop modes: scale to cover the target height, then crop a window
///   centered on the focus fraction.
/// - Fit-blur: a single composite stage (blurred, darkened background with
///   the fit-scaled frame on top).
pub fn reframe_chain(
    mode: ReframeMode,
    source: Resolution,
    target: Resolution,
    focus: f64,
) -> FilterChain {
    let mut chain = FilterChain::new();

    match mode {
        ReframeMode::FitBlur => {
            chain.push(FilterStage::BlurFill {
                width: target.width,
                height: target.height,
                blur_radius: FITBLUR_RADIUS,
                darken: FITBLUR_DARKEN,
            });
        }
        ReframeMode::FixedCrop | ReframeMode::SmartCrop => {
            if (source.aspect() - target.aspect()).abs() < ASPECT_EPSILON {
                chain.push(FilterStage::Scale {
                    width: target.width,
                    height: target.height,
                    mode: ScaleMode::Fit,
                });
                chain.push(FilterStage::Pad {
                    width: target.width,
                    height: target.height,
                });
            } else {
                chain.push(FilterStage::Scale {
                    width: target.width,
                    height: target.height,
                    mode: ScaleMode::Cover,
                });
                chain.push(FilterStage::CropFocus {
                    width: target.width,
                    height: target.height,
                    focus_fraction: focus,
                });
            }
        }
    }

    chain
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::Path;
    use vcomp_models::Quality;

    /// Analyzer stub with canned saliency and subject responses.
    struct StubAnalyzer {
        saliency: MediaResult<Vec<Vec<f64>>>,
        subjects: MediaResult<Vec<Vec<crate::focus::SubjectBox>>>,
    }

    impl StubAnalyzer {
        fn empty() -> Self {
            Self {
                saliency: Ok(Vec::new()),
                subjects: Ok(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                saliency: Err(MediaError::focus_unavailable("no decoder")),
                subjects: Err(MediaError::focus_unavailable("no decoder")),
            }
        }
    }

    #[async_trait]
    impl FrameAnalyzer for StubAnalyzer {
        async fn saliency_samples(
            &self,
            _path: &Path,
            _start: f64,
            _end: f64,
            _samples: usize,
        ) -> MediaResult<Vec<Vec<f64>>> {
            match &self.saliency {
                Ok(v) => Ok(v.clone()),
                Err(e) => Err(MediaError::focus_unavailable(e.to_string())),
            }
        }

        async fn subject_windows(
            &self,
            _path: &Path,
            _start: f64,
            _end: f64,
            _interval: f64,
        ) -> MediaResult<Vec<Vec<crate::focus::SubjectBox>>> {
            match &self.subjects {
                Ok(v) => Ok(v.clone()),
                Err(e) => Err(MediaError::focus_unavailable(e.to_string())),
            }
        }
    }

    fn media(duration: f64) -> FetchedMedia {
        FetchedMedia::new("/tmp/source.mp4", duration)
            .with_resolution(Resolution::new(1920, 1080))
    }

    #[test]
    fn test_reframe_chain_landscape_crops() {
        let chain = reframe_chain(
            ReframeMode::FixedCrop,
            Resolution::new(1920, 1080),
            Quality::Standard.resolution(),
            0.3,
        );
        assert_eq!(chain.stages.len(), 2);
        assert!(matches!(
            chain.stages[0],
            FilterStage::Scale {
                mode: ScaleMode::Cover,
                ..
            }
        ));
        assert!(matches!(
            chain.stages[1],
            FilterStage::CropFocus { focus_fraction, .. } if (focus_fraction - 0.3).abs() < 1e-9
        ));
    }

    #[test]
    fn test_reframe_chain_matching_aspect_pads() {
        let chain = reframe_chain(
            ReframeMode::FixedCrop,
            Resolution::new(720, 1280),
            Quality::Standard.resolution(),
            0.5,
        );
        assert!(matches!(
            chain.stages[0],
            FilterStage::Scale {
                mode: ScaleMode::Fit,
                ..
            }
        ));
        assert!(matches!(chain.stages[1], FilterStage::Pad { .. }));
    }

    #[test]
    fn test_reframe_chain_fit_blur() {
        let chain = reframe_chain(
            ReframeMode::FitBlur,
            Resolution::new(1920, 1080),
            Quality::High.resolution(),
            0.5,
        );
        assert_eq!(chain.stages.len(), 1);
        assert!(matches!(chain.stages[0], FilterStage::BlurFill { .. }));
    }

    #[tokio::test]
    async fn test_build_plan_basic() {
        let dir = tempfile::tempdir().unwrap();
        let settings = CompilationSettings::new(30).with_quality(Quality::High);
        let builder = RenderPlanBuilder::new(&settings, dir.path());

        let moments = vec![
            Moment::new(0, 10.0, 14.0, 0.9, "a"),
            Moment::new(0, 40.0, 45.0, 0.8, "b"),
        ];
        let plan = builder
            .build(&moments, &[media(120.0)], &StubAnalyzer::empty(), "final.mp4")
            .await
            .unwrap();

        assert_eq!(plan.quality, Quality::High);
        assert_eq!(plan.directives.len(), 2);
        assert_eq!(plan.concat.inputs.len(), 2);
        assert_eq!(plan.concat.inputs[0], plan.directives[0].output_target);
        assert!(plan.concat.output.ends_with("final.mp4"));
        // no saliency data: focus degrades to center
        assert_eq!(plan.directives[0].focus_fraction, Some(0.5));
    }

    #[tokio::test]
    async fn test_focus_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let settings = CompilationSettings::new(30).with_reframe_mode(ReframeMode::SmartCrop);
        let builder = RenderPlanBuilder::new(&settings, dir.path());

        let moments = vec![Moment::new(0, 10.0, 14.0, 0.9, "a")];
        let plan = builder
            .build(&moments, &[media(120.0)], &StubAnalyzer::failing(), "final.mp4")
            .await
            .unwrap();

        assert_eq!(plan.directives[0].focus_fraction, Some(0.5));
    }

    #[tokio::test]
    async fn test_subtitles_sliced_per_clip() {
        let dir = tempfile::tempdir().unwrap();
        let track = dir.path().join("track.srt");
        tokio::fs::write(
            &track,
            "1\n00:00:00,000 --> 00:00:05,000\nhello\n\n2\n00:00:50,000 --> 00:00:55,000\nworld\n",
        )
        .await
        .unwrap();

        let settings = CompilationSettings::new(30).with_subtitles(true);
        let builder = RenderPlanBuilder::new(&settings, dir.path());
        let source = media(120.0).with_subtitles(&track);

        // window [3,8] overlaps only the first cue
        let moments = vec![Moment::new(0, 3.0, 8.0, 0.9, "a")];
        let plan = builder
            .build(&moments, &[source], &StubAnalyzer::empty(), "final.mp4")
            .await
            .unwrap();

        let directive = &plan.directives[0];
        let sub_path = directive.subtitle_path.as_ref().expect("clip subtitles");
        let written = tokio::fs::read_to_string(sub_path).await.unwrap();
        assert!(written.contains("00:00:00,000 --> 00:00:02,000"));
        assert!(written.contains("hello"));
        assert!(!written.contains("world"));
        assert!(directive.chain.has_optional_overlays());
    }

    #[tokio::test]
    async fn test_subtitles_render_above_header_text() {
        let dir = tempfile::tempdir().unwrap();
        let track = dir.path().join("track.srt");
        tokio::fs::write(&track, "1\n00:00:00,000 --> 00:00:05,000\nhello\n")
            .await
            .unwrap();

        let mut settings = CompilationSettings::new(30).with_subtitles(true);
        settings.layout_header_text = Some("Top Moments".into());
        let builder = RenderPlanBuilder::new(&settings, dir.path());
        let source = media(120.0).with_subtitles(&track);

        let moments = vec![Moment::new(0, 3.0, 8.0, 0.9, "a")];
        let plan = builder
            .build(&moments, &[source], &StubAnalyzer::empty(), "final.mp4")
            .await
            .unwrap();

        let stages = &plan.directives[0].chain.stages;
        assert!(matches!(
            stages[stages.len() - 2],
            FilterStage::HeaderText { .. }
        ));
        assert!(matches!(
            stages[stages.len() - 1],
            FilterStage::Subtitles { .. }
        ));
    }

    #[tokio::test]
    async fn test_missing_track_renders_captionless() {
        let dir = tempfile::tempdir().unwrap();
        let settings = CompilationSettings::new(30).with_subtitles(true);
        let builder = RenderPlanBuilder::new(&settings, dir.path());

        // subtitles requested but the source has no track
        let moments = vec![Moment::new(0, 10.0, 14.0, 0.9, "a")];
        let plan = builder
            .build(&moments, &[media(120.0)], &StubAnalyzer::empty(), "final.mp4")
            .await
            .unwrap();

        assert!(plan.directives[0].subtitle_path.is_none());
        assert!(!plan.directives[0].chain.has_optional_overlays());
    }

    #[tokio::test]
    async fn test_moment_for_unknown_source_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let settings = CompilationSettings::new(30);
        let builder = RenderPlanBuilder::new(&settings, dir.path());

        let moments = vec![Moment::new(3, 10.0, 14.0, 0.9, "a")];
        let result = builder
            .build(&moments, &[media(120.0)], &StubAnalyzer::empty(), "final.mp4")
            .await;
        assert!(result.is_err());
    }
}
