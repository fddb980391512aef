//! Engine facade: submit, poll, compile, delete.

use std::sync::Arc;
use tracing::info;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::fetcher::MediaFetcher;
use crate::pipeline::{run_compilation, run_preparation, PipelineDeps};
use crate::progress::{progress_channel, spawn_updater};
use crate::store::SessionStore;
use crate::transcoder::Transcoder;

use vcomp_media::{DurationProbe, FrameAnalyzer, SignalExtractor};
use vcomp_models::{
    CompilationSettings, Session, SessionId, SessionSnapshot, Stage, StageId, SourceReference,
};

/// The compilation engine.
///
/// Owns the session store and the progress updater; pipeline work runs on
/// spawned workers so every public call returns promptly. External
/// capabilities (fetching, probing, signal extraction, frame analysis,
/// transcoding) are injected as trait objects.
pub struct Engine {
    store: Arc<SessionStore>,
    deps: PipelineDeps,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        fetcher: Arc<dyn MediaFetcher>,
        probe: Arc<dyn DurationProbe>,
        signals: Arc<dyn SignalExtractor>,
        analyzer: Arc<dyn FrameAnalyzer>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        let store = Arc::new(SessionStore::new(config.ttl()));
        let (events, rx) = progress_channel();
        spawn_updater(Arc::clone(&store), rx);

        let deps = PipelineDeps {
            store: Arc::clone(&store),
            fetcher,
            probe,
            signals,
            analyzer,
            transcoder,
            events,
            config,
        };

        Self { store, deps }
    }

    /// Submit a new compilation job. Returns the session ID immediately;
    /// download and analysis run in the background.
    pub async fn submit(
        &self,
        inputs: Vec<SourceReference>,
        settings: CompilationSettings,
    ) -> EngineResult<SessionId> {
        if inputs.is_empty() {
            return Err(EngineError::NoSources);
        }

        self.store.sweep_expired().await;

        let session = Session::new(inputs, settings);
        let id = self.store.insert(session).await;
        info!(session_id = %id, "Session submitted");

        let deps = self.deps.clone();
        let worker_id = id.clone();
        tokio::spawn(async move {
            run_preparation(deps, worker_id).await;
        });

        Ok(id)
    }

    /// Point-in-time snapshot for progress polling.
    pub async fn progress(&self, id: &SessionId) -> EngineResult<SessionSnapshot> {
        self.store.with_session(id, |s| s.snapshot()).await
    }

    /// Start compiling a session that finished analysis. Rejected with
    /// `SessionNotReady` unless the session is awaiting edit.
    pub async fn compile(&self, id: &SessionId) -> EngineResult<()> {
        self.store.sweep_expired().await;

        let accepted = self
            .store
            .with_session(id, |s| {
                if s.stage != Stage::AwaitingEdit {
                    return Err(EngineError::SessionNotReady {
                        id: s.id.clone(),
                        stage: s.stage,
                    });
                }
                s.advance_to(Stage::Compiling)?;
                if let Some(task) = s.task_mut(StageId::Compile) {
                    task.start("Compiling");
                }
                Ok(())
            })
            .await?;
        accepted?;

        let deps = self.deps.clone();
        let worker_id = id.clone();
        tokio::spawn(async move {
            run_compilation(deps, worker_id).await;
        });

        Ok(())
    }

    /// Delete a session and its temp files.
    pub async fn delete(&self, id: &SessionId) -> EngineResult<()> {
        self.store.remove(id).await
    }

    /// Sessions currently held in the store.
    pub async fn session_count(&self) -> usize {
        self.store.len().await
    }
}
