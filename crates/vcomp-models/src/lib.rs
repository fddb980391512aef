//! Shared data models for the vertical highlights compiler.
//!
//! This crate provides Serde-serializable types for:
//! - Sessions, pipeline stages and per-stage task status
//! - Scored moments and their engagement tiers
//! - Source references and fetched media
//! - Render directives and the typed filter-graph IR
//! - Compilation settings (quality tiers, reframe modes)

pub mod moment;
pub mod plan;
pub mod session;
pub mod settings;
pub mod source;
pub mod subtitle;
pub mod task;
pub mod timestamp;

// Re-export common types
pub use moment::{EngagementTier, Moment};
pub use plan::{
    ConcatDirective, FilterChain, FilterStage, RenderDirective, RenderPlan, ScaleMode,
    SubtitleStyle,
};
pub use session::{
    MomentPreview, Session, SessionId, SessionSnapshot, Stage, StageTransitionError,
};
pub use settings::{CompilationSettings, Quality, ReframeMode, Resolution};
pub use source::{FetchedMedia, SourceReference};
pub use subtitle::SubtitleEntry;
pub use task::{StageId, TaskState, TaskStatus};
pub use timestamp::{format_display, format_seconds};
