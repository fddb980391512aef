//! Per-stage task bookkeeping.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three pipeline stages tracked in a session's task list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    Download,
    Analyze,
    Compile,
}

impl StageId {
    /// Stages in pipeline order.
    pub const ALL: &'static [StageId] = &[StageId::Download, StageId::Analyze, StageId::Compile];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageId::Download => "download",
            StageId::Analyze => "analyze",
            StageId::Compile => "compile",
        }
    }

    /// Human-readable label for progress displays.
    pub fn label(&self) -> &'static str {
        match self {
            StageId::Download => "Downloading source videos",
            StageId::Analyze => "Detecting best moments",
            StageId::Compile => "Compiling vertical output",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle state of one stage task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    #[default]
    Pending,
    InProgress,
    Done,
    Failed,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::InProgress => "in_progress",
            TaskState::Done => "done",
            TaskState::Failed => "failed",
        }
    }
}

/// Progress bookkeeping for one pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TaskStatus {
    /// Which stage this task tracks.
    pub stage: StageId,

    /// Current lifecycle state.
    #[serde(default)]
    pub status: TaskState,

    /// Progress percentage, clamped to [0, 100].
    #[serde(default)]
    pub progress_percent: f64,

    /// Free-form detail line ("12.5 MB / 40.0 MB", "2/3 videos analyzed").
    #[serde(default)]
    pub detail: String,

    /// Estimated seconds remaining, when derivable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_seconds: Option<u64>,

    /// When this stage went in-progress; anchors the ETA extrapolation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

impl TaskStatus {
    pub fn pending(stage: StageId) -> Self {
        Self {
            stage,
            status: TaskState::Pending,
            progress_percent: 0.0,
            detail: String::new(),
            eta_seconds: None,
            started_at: None,
        }
    }

    /// Apply a progress update, clamping the percentage and re-deriving the
    /// stage ETA from the time spent so far.
    pub fn update(&mut self, percent: f64, detail: impl Into<String>) {
        self.progress_percent = percent.clamp(0.0, 100.0);
        self.detail = detail.into();
        if let Some(started) = self.started_at {
            self.eta_seconds = calc_eta(started, self.progress_percent);
        }
    }

    /// Transition to in-progress at 0%.
    pub fn start(&mut self, detail: impl Into<String>) {
        self.status = TaskState::InProgress;
        self.progress_percent = 0.0;
        self.detail = detail.into();
        self.eta_seconds = None;
        self.started_at = Some(Utc::now());
    }

    /// Transition to done at 100%.
    pub fn finish(&mut self, detail: impl Into<String>) {
        self.status = TaskState::Done;
        self.progress_percent = 100.0;
        self.detail = detail.into();
        self.eta_seconds = Some(0);
    }

    /// Transition to failed, resetting progress.
    pub fn fail(&mut self, detail: impl Into<String>) {
        self.status = TaskState::Failed;
        self.progress_percent = 0.0;
        self.detail = detail.into();
        self.eta_seconds = None;
    }
}

/// Linear ETA estimate: `elapsed * (100 - percent) / percent`.
///
/// Returns `None` when the percentage is 0 (nothing to extrapolate from)
/// or at/past 100 (nothing remaining).
pub fn calc_eta(started_at: DateTime<Utc>, percent: f64) -> Option<u64> {
    if percent <= 0.0 || percent >= 100.0 {
        return None;
    }
    let elapsed = (Utc::now() - started_at).num_milliseconds() as f64 / 1000.0;
    if elapsed <= 0.0 {
        return None;
    }
    let remaining = elapsed * (100.0 - percent) / percent;
    Some(remaining.max(1.0) as u64)
}
