//! Moment selection and render-plan core.
//!
//! This crate owns the heuristic heart of the compiler: fusing scene-cut
//! and audio-energy signals into scored moments, enforcing the output
//! duration budget, re-timing subtitles to clip windows, and assembling the
//! declarative render plan that the transcoder executes.
//!
//! Everything here is deterministic given a pinned [`jitter::Jitter`]
//! source; the production jitter adds small random perturbations for
//! variety between runs.

pub mod distribute;
pub mod error;
pub mod focus;
pub mod jitter;
pub mod plan;
pub mod probe;
pub mod score;
pub mod select;
pub mod signal;
pub mod subtitles;

pub use distribute::distribute_moments;
pub use error::{MediaError, MediaResult};
pub use focus::{saliency_focus, subject_focus, FrameAnalyzer, SubjectBox};
pub use jitter::{FixedJitter, Jitter, ThreadJitter};
pub use plan::RenderPlanBuilder;
pub use probe::{DurationProbe, MediaInfo};
pub use score::{score_moments, ScoreInputs};
pub use select::{select_moments, SelectionInput};
pub use signal::{MomentSignals, SignalExtractor};
pub use subtitles::{parse_srt, retime_track, to_srt};

/// Average clip length used to size the candidate pool (seconds).
pub const AVG_CLIP_SECS: f64 = 4.5;

/// Minimum and maximum length of an individual clip (seconds).
pub const MIN_CLIP_SECS: f64 = 3.0;
pub const MAX_CLIP_SECS: f64 = 6.0;

/// Source regions this close to either boundary are skipped; intros and
/// outros make unreliable hooks.
pub const EDGE_MARGIN_SECS: f64 = 5.0;
