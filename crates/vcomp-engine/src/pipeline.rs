//! Pipeline orchestration: one background worker per session.
//!
//! Preparation covers the download and analysis stages and parks the
//! session at `AwaitingEdit`; compilation runs on explicit request. Any
//! unrecovered error lands the session in the terminal `Error` stage with
//! the message captured. In-flight external calls are never aborted
//! mid-await except by their own timeouts.

use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::fetcher::{FetchOutcome, MediaFetcher};
use crate::logging::SessionLogger;
use crate::progress::{DownloadTracker, ProgressEvent, ProgressSender};
use crate::store::SessionStore;
use crate::transcoder::{TranscodeError, Transcoder};

use vcomp_media::{
    distribute_moments, score_moments, select_moments, DurationProbe, FrameAnalyzer,
    RenderPlanBuilder, ScoreInputs, SelectionInput, SignalExtractor, ThreadJitter,
};
use vcomp_models::{
    CompilationSettings, EngagementTier, FetchedMedia, Moment, RenderPlan, SessionId,
    SourceReference, Stage, StageId,
};

/// Name of the final compilation file inside the session work dir.
const OUTPUT_FILE_NAME: &str = "compilation.mp4";

/// Everything a pipeline worker needs, cloned into each spawned task.
#[derive(Clone)]
pub struct PipelineDeps {
    pub store: Arc<SessionStore>,
    pub fetcher: Arc<dyn MediaFetcher>,
    pub probe: Arc<dyn DurationProbe>,
    pub signals: Arc<dyn SignalExtractor>,
    pub analyzer: Arc<dyn FrameAnalyzer>,
    pub transcoder: Arc<dyn Transcoder>,
    pub events: ProgressSender,
    pub config: EngineConfig,
}

/// Download and analyze, parking the session at `AwaitingEdit`.
pub async fn run_preparation(deps: PipelineDeps, id: SessionId) {
    let logger = SessionLogger::new(&id, "preparation");
    logger.log_start("download and analysis");

    if let Err(e) = prepare(&deps, &id, &logger).await {
        logger.log_error(&e.to_string());
        let _ = deps
            .store
            .with_session(&id, |s| s.fail(e.to_string()))
            .await;
        return;
    }
    logger.log_completion("awaiting edit");
}

/// Build the plan and transcode, parking the session at `Ready`.
///
/// The session must already be in the `Compiling` stage (the engine facade
/// validates and advances before spawning this worker).
pub async fn run_compilation(deps: PipelineDeps, id: SessionId) {
    let logger = SessionLogger::new(&id, "compilation");
    logger.log_start("render and concat");

    if let Err(e) = compile(&deps, &id, &logger).await {
        logger.log_error(&e.to_string());
        let _ = deps
            .store
            .with_session(&id, |s| s.fail(e.to_string()))
            .await;
        return;
    }
    logger.log_completion("compilation ready");
}

async fn prepare(deps: &PipelineDeps, id: &SessionId, logger: &SessionLogger) -> EngineResult<()> {
    let (inputs, settings) = deps
        .store
        .with_session(id, |s| (s.inputs.clone(), s.settings.clone()))
        .await?;

    deps.store
        .with_session(id, |s| {
            if let Some(task) = s.task_mut(StageId::Download) {
                task.start("Downloading source videos");
            }
        })
        .await?;

    let fetched = download_sources(deps, id, &inputs, &settings, logger).await?;
    logger.log_progress(&format!(
        "{} of {} sources fetched",
        fetched.len(),
        inputs.len()
    ));

    let transition = deps
        .store
        .with_session(id, |s| {
            s.fetched_media = fetched.clone();
            if let Some(task) = s.task_mut(StageId::Download) {
                task.finish("Sources downloaded");
            }
            let t = s.advance_to(Stage::Analyzing);
            if t.is_ok() {
                if let Some(task) = s.task_mut(StageId::Analyze) {
                    task.start("Analyzing moments");
                }
            }
            t
        })
        .await?;
    transition?;

    let moments = detect_and_select(deps, id, &settings, &fetched, inputs.len()).await?;
    logger.log_progress(&format!("{} moments selected", moments.len()));

    let transition = deps
        .store
        .with_session(id, |s| {
            s.moments = moments;
            if let Some(task) = s.task_mut(StageId::Analyze) {
                task.finish("Moments ready for review");
            }
            s.advance_to(Stage::AwaitingEdit)
        })
        .await?;
    transition?;

    Ok(())
}

/// Fetch every source, tolerating per-source failures. Fatal only when
/// nothing at all was fetched.
async fn download_sources(
    deps: &PipelineDeps,
    id: &SessionId,
    inputs: &[SourceReference],
    settings: &CompilationSettings,
    logger: &SessionLogger,
) -> EngineResult<Vec<FetchedMedia>> {
    let tracker = DownloadTracker::new(inputs.len());
    let mut fetched = Vec::with_capacity(inputs.len());

    for (index, source) in inputs.iter().enumerate() {
        let handle = tracker.handle(index, id.clone(), deps.events.clone());
        match fetch_one(deps, source, settings.include_subtitles, handle).await {
            Ok(outcome) => {
                fetched.push(probe_media(deps, index, source, outcome).await);
            }
            Err(e) => {
                logger.log_warning(&format!(
                    "fetch of {} failed, continuing without it: {}",
                    source.url, e
                ));
            }
        }
        tracker.complete(index, id, &deps.events);
    }

    if fetched.is_empty() {
        return Err(EngineError::AllSourcesFailed(inputs.len()));
    }
    Ok(fetched)
}

/// One fetch attempt, retried once without subtitles when a subtitle fetch
/// was part of the failure.
async fn fetch_one(
    deps: &PipelineDeps,
    source: &SourceReference,
    want_subtitles: bool,
    handle: crate::progress::SourceProgressHandle,
) -> EngineResult<FetchOutcome> {
    let first = timeout(
        deps.config.fetch_timeout,
        deps.fetcher.fetch(source, want_subtitles, handle.clone()),
    )
    .await;

    match first {
        Ok(Ok(outcome)) => Ok(outcome),
        Ok(Err(e)) if want_subtitles => {
            warn!(
                url = %source.url,
                error = %e,
                "Fetch with subtitles failed, retrying without"
            );
            match timeout(
                deps.config.fetch_timeout,
                deps.fetcher.fetch(source, false, handle),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(EngineError::timeout(format!("fetching {}", source.url))),
            }
        }
        Ok(Err(e)) => Err(e),
        Err(_) => Err(EngineError::timeout(format!("fetching {}", source.url))),
    }
}

/// Probe the fetched file; the probe result wins over declared durations,
/// and probe failure is non-fatal.
async fn probe_media(
    deps: &PipelineDeps,
    index: usize,
    source: &SourceReference,
    outcome: FetchOutcome,
) -> FetchedMedia {
    let declared = source.declared_duration.or(outcome.duration_hint);

    let (duration, resolution) = match deps.probe.probe(&outcome.media_path).await {
        Ok(info) => (
            FetchedMedia::resolve_duration(Some(info.duration), declared),
            info.resolution,
        ),
        Err(e) => {
            warn!(
                url = %source.url,
                error = %e,
                "Probe failed, falling back to declared duration"
            );
            (FetchedMedia::resolve_duration(None, declared), None)
        }
    };

    let mut media = FetchedMedia::new(outcome.media_path, duration).with_source_index(index);
    if let Some(subs) = outcome.subtitle_path {
        media = media.with_subtitles(subs);
    }
    if let Some(res) = resolution {
        media = media.with_resolution(res);
    }
    media
}

/// Score (or distribute) candidates per source, then clamp to the duration
/// budget. Engagement tiers are re-cycled over the final playback order.
async fn detect_and_select(
    deps: &PipelineDeps,
    id: &SessionId,
    settings: &CompilationSettings,
    fetched: &[FetchedMedia],
    input_count: usize,
) -> EngineResult<Vec<Moment>> {
    let target = f64::from(settings.target_duration_seconds);
    let mut jitter = ThreadJitter;
    let mut candidates = Vec::new();

    for media in fetched {
        let moments = if settings.auto_detect_moments {
            match deps.signals.extract(&media.media_path, media.duration).await {
                Ok(signals) => {
                    let scored = score_moments(
                        &ScoreInputs {
                            source_index: media.source_index,
                            scene_cuts: &signals.scene_cuts,
                            energy_peaks: &signals.energy_peaks,
                            duration: media.duration,
                            target_duration: target,
                        },
                        &mut jitter,
                    );
                    if scored.is_empty() {
                        distribute_moments(media.source_index, media.duration, target, &mut jitter)
                    } else {
                        scored
                    }
                }
                Err(e) => {
                    warn!(
                        session_id = %id,
                        source_index = media.source_index,
                        error = %e,
                        "Signal extraction failed, distributing moments evenly"
                    );
                    distribute_moments(media.source_index, media.duration, target, &mut jitter)
                }
            }
        } else {
            distribute_moments(media.source_index, media.duration, target, &mut jitter)
        };
        candidates.extend(moments);
    }

    deps.events.send(ProgressEvent::new(
        id.clone(),
        StageId::Analyze,
        60.0,
        "Selecting best moments",
    ));

    // Durations indexed by input position; failed sources stay at zero and
    // never receive a synthesized fallback clip.
    let mut source_durations = vec![0.0; input_count];
    for media in fetched {
        if let Some(slot) = source_durations.get_mut(media.source_index) {
            *slot = media.duration;
        }
    }

    let selected = select_moments(SelectionInput {
        candidates,
        source_durations,
        target_duration: target,
    })?;

    info!(
        session_id = %id,
        clips = selected.len(),
        "Moment selection complete"
    );

    Ok(selected
        .into_iter()
        .enumerate()
        .map(|(idx, m)| m.with_tier(EngagementTier::for_index(idx)))
        .collect())
}

async fn compile(deps: &PipelineDeps, id: &SessionId, logger: &SessionLogger) -> EngineResult<()> {
    let (settings, moments, media) = deps
        .store
        .with_session(id, |s| {
            (s.settings.clone(), s.moments.clone(), s.fetched_media.clone())
        })
        .await?;

    let work_dir = deps.config.work_dir.join(id.as_str());
    tokio::fs::create_dir_all(&work_dir).await?;

    let builder = RenderPlanBuilder::new(&settings, &work_dir);
    let plan = builder
        .build(&moments, &media, deps.analyzer.as_ref(), OUTPUT_FILE_NAME)
        .await?;

    debug!(
        session_id = %id,
        quality = %settings.quality,
        bitrate_kbps = settings.quality.video_bitrate_kbps(),
        clips = plan.directives.len(),
        "Render plan built"
    );
    logger.log_progress(&format!("render plan built with {} clips", plan.directives.len()));

    deps.events.send(ProgressEvent::new(
        id.clone(),
        StageId::Compile,
        30.0,
        "Rendering clips",
    ));

    let output = execute_plan(deps, id, plan).await?;

    let transition = deps
        .store
        .with_session(id, |s| {
            s.output_path = Some(output.clone());
            if let Some(task) = s.task_mut(StageId::Compile) {
                task.finish("Compilation complete");
            }
            s.advance_to(Stage::Ready)
        })
        .await?;
    transition?;

    Ok(())
}

/// Run the plan through the transcoder; an unsupported-filter failure gets
/// exactly one retry with the reduced plan when overlays were present.
async fn execute_plan(
    deps: &PipelineDeps,
    id: &SessionId,
    plan: RenderPlan,
) -> EngineResult<std::path::PathBuf> {
    match transcode(deps, &plan).await {
        Ok(output) => Ok(output),
        Err(e) if e.is_recoverable_render() && plan.has_optional_overlays() => {
            warn!(
                session_id = %id,
                error = %e,
                "Transcode rejected an overlay filter, retrying with reduced plan"
            );
            deps.events.send(ProgressEvent::new(
                id.clone(),
                StageId::Compile,
                50.0,
                "Retrying without overlays",
            ));
            transcode(deps, &plan.reduced()).await
        }
        Err(e) => Err(e),
    }
}

async fn transcode(deps: &PipelineDeps, plan: &RenderPlan) -> EngineResult<std::path::PathBuf> {
    match timeout(deps.config.transcode_timeout, deps.transcoder.execute(plan)).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(TranscodeError::UnsupportedFilter(msg))) => Err(EngineError::render_unsupported(msg)),
        Ok(Err(TranscodeError::Failed(msg))) => Err(EngineError::render_fatal(msg)),
        Err(_) => Err(EngineError::timeout("transcoding render plan")),
    }
}
