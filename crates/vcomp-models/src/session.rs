//! Session aggregate and the pipeline stage machine.

use chrono::{DateTime, Duration, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

use crate::moment::Moment;
use crate::settings::CompilationSettings;
use crate::source::{FetchedMedia, SourceReference};
use crate::task::{calc_eta, StageId, TaskStatus};

/// Unique identifier for a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a new random session ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pipeline stage of a session.
///
/// Ordered `Downloading -> Analyzing -> AwaitingEdit -> Compiling -> Ready`,
/// with `Error` reachable from every non-terminal stage. No stage is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Downloading,
    Analyzing,
    AwaitingEdit,
    Compiling,
    Ready,
    Error,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Downloading => "downloading",
            Stage::Analyzing => "analyzing",
            Stage::AwaitingEdit => "awaiting_edit",
            Stage::Compiling => "compiling",
            Stage::Ready => "ready",
            Stage::Error => "error",
        }
    }

    /// Human-readable label for progress displays.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Downloading => "Downloading source videos",
            Stage::Analyzing => "Analyzing moments",
            Stage::AwaitingEdit => "Ready for compilation",
            Stage::Compiling => "Compiling",
            Stage::Ready => "Compilation complete",
            Stage::Error => "Error",
        }
    }

    /// The stage that directly follows this one in the pipeline.
    pub fn successor(&self) -> Option<Stage> {
        match self {
            Stage::Downloading => Some(Stage::Analyzing),
            Stage::Analyzing => Some(Stage::AwaitingEdit),
            Stage::AwaitingEdit => Some(Stage::Compiling),
            Stage::Compiling => Some(Stage::Ready),
            Stage::Ready | Stage::Error => None,
        }
    }

    /// Terminal stages accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Ready | Stage::Error)
    }

    /// Whether a direct transition to `next` is legal.
    pub fn can_transition_to(&self, next: Stage) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == Stage::Error {
            return true;
        }
        self.successor() == Some(next)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Illegal stage transition.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Illegal stage transition: {from} -> {to}")]
pub struct StageTransitionError {
    pub from: Stage,
    pub to: Stage,
}

/// The job aggregate for one compilation.
///
/// Mutated only by the pipeline orchestrator and its workers, always through
/// the session store's lock. Garbage-collected after the retention window or
/// on explicit deletion, releasing all owned files.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Session {
    /// Unique session ID.
    pub id: SessionId,

    /// Requested inputs, in submission order.
    pub inputs: Vec<SourceReference>,

    /// Job settings.
    pub settings: CompilationSettings,

    /// Current pipeline stage.
    #[serde(default)]
    pub stage: Stage,

    /// Per-stage progress bookkeeping, in pipeline order.
    pub tasks: Vec<TaskStatus>,

    /// Selected moments, in playback order (populated after analysis).
    #[serde(default)]
    pub moments: Vec<Moment>,

    /// Fetched media per source, indexed like `inputs`.
    #[serde(default)]
    pub fetched_media: Vec<FetchedMedia>,

    /// Final compilation output, once compiled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,

    /// Creation timestamp (drives TTL eviction).
    pub created_at: DateTime<Utc>,

    /// When pipeline work began (drives ETA estimates).
    pub started_at: DateTime<Utc>,

    /// Terminal error message, when the session failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Session {
    /// Create a new session in the `Downloading` stage with pending tasks.
    pub fn new(inputs: Vec<SourceReference>, settings: CompilationSettings) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            inputs,
            settings,
            stage: Stage::Downloading,
            tasks: StageId::ALL.iter().map(|s| TaskStatus::pending(*s)).collect(),
            moments: Vec::new(),
            fetched_media: Vec::new(),
            output_path: None,
            created_at: now,
            started_at: now,
            error: None,
        }
    }

    /// Mutable access to the task tracking `stage`.
    pub fn task_mut(&mut self, stage: StageId) -> Option<&mut TaskStatus> {
        self.tasks.iter_mut().find(|t| t.stage == stage)
    }

    /// Advance to the next stage, validating the transition.
    pub fn advance_to(&mut self, next: Stage) -> Result<(), StageTransitionError> {
        if !self.stage.can_transition_to(next) {
            return Err(StageTransitionError {
                from: self.stage,
                to: next,
            });
        }
        self.stage = next;
        Ok(())
    }

    /// Move to the terminal error stage, capturing the message. The failing
    /// stage task is marked failed and overall progress reads as 0.
    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        if let Some(task) = self
            .tasks
            .iter_mut()
            .find(|t| t.status == crate::task::TaskState::InProgress)
        {
            task.fail(message.clone());
        }
        self.error = Some(message);
        self.stage = Stage::Error;
    }

    /// Overall progress: mean of stage progresses, or 0 after an error.
    pub fn overall_progress(&self) -> f64 {
        if self.stage == Stage::Error {
            return 0.0;
        }
        if self.tasks.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.tasks.iter().map(|t| t.progress_percent).sum();
        (sum / self.tasks.len() as f64).round()
    }

    /// Session-wide ETA derived from overall progress.
    pub fn eta_seconds(&self) -> Option<u64> {
        calc_eta(self.started_at, self.overall_progress())
    }

    /// All temp files owned by this session, for cleanup.
    pub fn owned_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self
            .fetched_media
            .iter()
            .flat_map(FetchedMedia::owned_files)
            .collect();
        if let Some(out) = &self.output_path {
            files.push(out.clone());
        }
        files
    }

    /// Whether this session is older than the retention window.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        Utc::now() - self.created_at > ttl
    }

    /// Snapshot for progress polling.
    pub fn snapshot(&self) -> SessionSnapshot {
        let moments = self
            .moments
            .iter()
            .enumerate()
            .map(|(idx, m)| MomentPreview {
                order: idx + 1,
                timestamp: m.display_timestamp(),
                duration: format!("{}s", m.duration().round() as u64),
                label: m.label.clone(),
                score: m.score,
                engagement_tier: m.engagement_tier,
                source_title: self
                    .inputs
                    .get(m.source_index)
                    .map(|s| s.title.clone())
                    .unwrap_or_default(),
            })
            .collect();

        SessionSnapshot {
            id: self.id.clone(),
            stage: self.stage,
            stage_label: self.stage.label().to_string(),
            progress: self.overall_progress(),
            eta_seconds: self.eta_seconds(),
            tasks: self.tasks.clone(),
            moments,
            video_count: self.inputs.len(),
            clip_count: self.moments.len(),
            total_duration: self.settings.target_duration_seconds,
            error: self.error.clone(),
        }
    }
}

/// A read-only moment summary for the polling surface.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MomentPreview {
    pub order: usize,
    /// Clip start as `M:SS`.
    pub timestamp: String,
    /// Clip length as `Ns`.
    pub duration: String,
    pub label: String,
    pub score: f64,
    pub engagement_tier: crate::moment::EngagementTier,
    pub source_title: String,
}

/// Point-in-time view of a session returned to polling clients.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub stage: Stage,
    pub stage_label: String,
    pub progress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_seconds: Option<u64>,
    pub tasks: Vec<TaskStatus>,
    pub moments: Vec<MomentPreview>,
    pub video_count: usize,
    pub clip_count: usize,
    pub total_duration: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
