//! Full-pipeline integration tests with stubbed external capabilities.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tempfile::TempDir;

use vcomp_engine::{
    Engine, EngineConfig, EngineError, FetchOutcome, MediaFetcher, SourceProgressHandle,
    TranscodeError, Transcoder,
};
use vcomp_media::{
    DurationProbe, FrameAnalyzer, MediaError, MediaInfo, MediaResult, MomentSignals,
    SignalExtractor, SubjectBox,
};
use vcomp_models::{
    CompilationSettings, RenderPlan, SessionId, SourceReference, Stage,
};

struct StubFetcher {
    dir: PathBuf,
    fail_urls: Vec<String>,
    /// Fail any fetch that asks for subtitles, to exercise the retry.
    subtitle_fetches_fail: bool,
    provide_subtitles: bool,
    delay: Duration,
    calls: AtomicUsize,
}

impl StubFetcher {
    fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            fail_urls: Vec::new(),
            subtitle_fetches_fail: false,
            provide_subtitles: false,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaFetcher for StubFetcher {
    async fn fetch(
        &self,
        source: &SourceReference,
        want_subtitles: bool,
        progress: SourceProgressHandle,
    ) -> Result<FetchOutcome, EngineError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail_urls.contains(&source.url) {
            return Err(EngineError::fetch_failed(source.url.as_str(), "video unavailable"));
        }
        if want_subtitles && self.subtitle_fetches_fail {
            return Err(EngineError::fetch_failed(source.url.as_str(), "no subtitle track"));
        }

        progress.report(512, Some(1024));
        let media_path = self.dir.join(format!("media_{call}.mp4"));
        tokio::fs::write(&media_path, b"stub media").await?;
        progress.report(1024, Some(1024));

        let mut outcome = FetchOutcome::new(&media_path).with_duration_hint(115.0);
        if want_subtitles && self.provide_subtitles {
            let subs_path = self.dir.join(format!("media_{call}.srt"));
            tokio::fs::write(
                &subs_path,
                "1\n00:00:00,000 --> 00:01:50,000\nhello everyone\n",
            )
            .await?;
            outcome = outcome.with_subtitles(&subs_path);
        }
        Ok(outcome)
    }
}

struct StubProbe {
    duration: f64,
    fail: bool,
}

#[async_trait]
impl DurationProbe for StubProbe {
    async fn probe(&self, _path: &Path) -> MediaResult<MediaInfo> {
        if self.fail {
            return Err(MediaError::probe_failed("stream info missing"));
        }
        Ok(MediaInfo::new(self.duration).with_resolution(1920, 1080))
    }
}

struct StubSignals;

#[async_trait]
impl SignalExtractor for StubSignals {
    async fn extract(&self, _path: &Path, _duration: f64) -> MediaResult<MomentSignals> {
        Ok(MomentSignals::new(
            vec![10.0, 40.0, 70.0, 100.0],
            vec![12.0, 72.0],
        ))
    }
}

struct StubAnalyzer;

#[async_trait]
impl FrameAnalyzer for StubAnalyzer {
    async fn saliency_samples(
        &self,
        _path: &Path,
        _start: f64,
        _end: f64,
        _samples: usize,
    ) -> MediaResult<Vec<Vec<f64>>> {
        Ok(Vec::new())
    }

    async fn subject_windows(
        &self,
        _path: &Path,
        _start: f64,
        _end: f64,
        _interval: f64,
    ) -> MediaResult<Vec<Vec<SubjectBox>>> {
        Ok(Vec::new())
    }
}

struct StubTranscoder {
    unsupported_remaining: AtomicUsize,
    calls: AtomicUsize,
}

impl StubTranscoder {
    fn new() -> Self {
        Self {
            unsupported_remaining: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    fn rejecting_overlays_once() -> Self {
        Self {
            unsupported_remaining: AtomicUsize::new(1),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcoder for StubTranscoder {
    async fn execute(&self, plan: &RenderPlan) -> Result<PathBuf, TranscodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self
            .unsupported_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(TranscodeError::UnsupportedFilter(
                "subtitles filter not compiled in".to_string(),
            ));
        }
        tokio::fs::write(&plan.concat.output, b"stub compilation")
            .await
            .map_err(|e| TranscodeError::Failed(e.to_string()))?;
        Ok(plan.concat.output.clone())
    }
}

struct Harness {
    engine: Engine,
    fetcher: Arc<StubFetcher>,
    transcoder: Arc<StubTranscoder>,
    work_dir: PathBuf,
    _tmp: TempDir,
}

fn harness(fetcher: StubFetcher, transcoder: StubTranscoder) -> Harness {
    harness_with_probe(fetcher, transcoder, StubProbe {
        duration: 120.0,
        fail: false,
    })
}

fn harness_with_probe(
    fetcher: StubFetcher,
    transcoder: StubTranscoder,
    probe: StubProbe,
) -> Harness {
    let tmp = TempDir::new().expect("tempdir");
    let work_dir = tmp.path().join("work");
    let config = EngineConfig {
        work_dir: work_dir.clone(),
        ..EngineConfig::default()
    };

    let fetcher = Arc::new(fetcher);
    let transcoder = Arc::new(transcoder);
    let engine = Engine::new(
        config,
        Arc::clone(&fetcher) as Arc<dyn MediaFetcher>,
        Arc::new(probe),
        Arc::new(StubSignals),
        Arc::new(StubAnalyzer),
        Arc::clone(&transcoder) as Arc<dyn Transcoder>,
    );

    Harness {
        engine,
        fetcher,
        transcoder,
        work_dir,
        _tmp: tmp,
    }
}

fn source(url: &str, title: &str) -> SourceReference {
    SourceReference::new(url, title)
}

async fn wait_for_stage(
    engine: &Engine,
    id: &SessionId,
    stage: Stage,
) -> vcomp_models::SessionSnapshot {
    for _ in 0..250 {
        let snapshot = engine.progress(id).await.expect("session exists");
        if snapshot.stage == stage {
            return snapshot;
        }
        if snapshot.stage == Stage::Error && stage != Stage::Error {
            panic!(
                "session failed while waiting for {stage}: {:?}",
                snapshot.error
            );
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("timed out waiting for stage {stage}");
}

#[tokio::test]
async fn test_happy_path_to_ready() -> Result<()> {
    let tmp = TempDir::new()?;
    let h = harness(StubFetcher::new(tmp.path()), StubTranscoder::new());

    let id = h
        .engine
        .submit(
            vec![source("https://example.com/v1", "First video")],
            CompilationSettings::new(30),
        )
        .await?;

    let snapshot = wait_for_stage(&h.engine, &id, Stage::AwaitingEdit).await;
    assert!(snapshot.clip_count >= 1);
    assert_eq!(snapshot.video_count, 1);
    assert!(snapshot.moments.iter().all(|m| m.score <= 0.99));
    assert_eq!(snapshot.moments[0].source_title, "First video");

    h.engine.compile(&id).await?;
    let snapshot = wait_for_stage(&h.engine, &id, Stage::Ready).await;
    assert!((snapshot.progress - 100.0).abs() < f64::EPSILON);
    assert_eq!(h.transcoder.calls(), 1);
    assert!(h.work_dir.join(id.as_str()).join("compilation.mp4").exists());
    Ok(())
}

#[tokio::test]
async fn test_all_sources_failing_is_terminal() -> Result<()> {
    let tmp = TempDir::new()?;
    let mut fetcher = StubFetcher::new(tmp.path());
    fetcher.fail_urls = vec!["https://example.com/bad".to_string()];
    let h = harness(fetcher, StubTranscoder::new());

    let id = h
        .engine
        .submit(
            vec![source("https://example.com/bad", "Broken")],
            CompilationSettings::new(30),
        )
        .await?;

    let snapshot = wait_for_stage(&h.engine, &id, Stage::Error).await;
    assert!(snapshot.error.as_deref().unwrap_or("").contains("sources failed"));
    assert!(snapshot.progress.abs() < f64::EPSILON);
    Ok(())
}

#[tokio::test]
async fn test_partial_fetch_failure_tolerated() -> Result<()> {
    let tmp = TempDir::new()?;
    let mut fetcher = StubFetcher::new(tmp.path());
    fetcher.fail_urls = vec!["https://example.com/bad".to_string()];
    let h = harness(fetcher, StubTranscoder::new());

    let id = h
        .engine
        .submit(
            vec![
                source("https://example.com/bad", "Broken"),
                source("https://example.com/good", "Working"),
            ],
            CompilationSettings::new(30),
        )
        .await?;

    let snapshot = wait_for_stage(&h.engine, &id, Stage::AwaitingEdit).await;
    assert!(snapshot.clip_count >= 1);
    // every selected moment must come from the surviving source
    for moment in &snapshot.moments {
        assert_eq!(moment.source_title, "Working");
    }
    Ok(())
}

#[tokio::test]
async fn test_compile_before_awaiting_edit_rejected() -> Result<()> {
    let tmp = TempDir::new()?;
    let mut fetcher = StubFetcher::new(tmp.path());
    fetcher.delay = Duration::from_millis(500);
    let h = harness(fetcher, StubTranscoder::new());

    let id = h
        .engine
        .submit(
            vec![source("https://example.com/v1", "Slow")],
            CompilationSettings::new(30),
        )
        .await?;

    // still downloading
    let result = h.engine.compile(&id).await;
    assert!(matches!(
        result,
        Err(EngineError::SessionNotReady { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let tmp = TempDir::new().unwrap();
    let h = harness(StubFetcher::new(tmp.path()), StubTranscoder::new());

    let missing = SessionId::new();
    assert!(matches!(
        h.engine.progress(&missing).await,
        Err(EngineError::SessionNotFound(_))
    ));
    assert!(matches!(
        h.engine.compile(&missing).await,
        Err(EngineError::SessionNotFound(_))
    ));
}

#[tokio::test]
async fn test_unsupported_filter_retried_with_reduced_plan() -> Result<()> {
    let tmp = TempDir::new()?;
    let fetcher = StubFetcher::new(tmp.path());
    let h = harness(fetcher, StubTranscoder::rejecting_overlays_once());

    let mut settings = CompilationSettings::new(30);
    settings.layout_header_text = Some("Top Moments".to_string());

    let id = h
        .engine
        .submit(vec![source("https://example.com/v1", "First")], settings)
        .await?;

    wait_for_stage(&h.engine, &id, Stage::AwaitingEdit).await;
    h.engine.compile(&id).await?;
    wait_for_stage(&h.engine, &id, Stage::Ready).await;

    // first attempt rejected the overlay, second ran the reduced plan
    assert_eq!(h.transcoder.calls(), 2);
    Ok(())
}

#[tokio::test]
async fn test_subtitle_fetch_failure_retried_without_subtitles() -> Result<()> {
    let tmp = TempDir::new()?;
    let mut fetcher = StubFetcher::new(tmp.path());
    fetcher.subtitle_fetches_fail = true;
    let h = harness(fetcher, StubTranscoder::new());

    let id = h
        .engine
        .submit(
            vec![source("https://example.com/v1", "First")],
            CompilationSettings::new(30).with_subtitles(true),
        )
        .await?;

    wait_for_stage(&h.engine, &id, Stage::AwaitingEdit).await;
    // one failed attempt with subtitles, one successful without
    assert_eq!(h.fetcher.calls(), 2);
    Ok(())
}

#[tokio::test]
async fn test_manual_mode_distributes_moments() -> Result<()> {
    let tmp = TempDir::new()?;
    let h = harness(StubFetcher::new(tmp.path()), StubTranscoder::new());

    let mut settings = CompilationSettings::new(30);
    settings.auto_detect_moments = false;

    let id = h
        .engine
        .submit(vec![source("https://example.com/v1", "First")], settings)
        .await?;

    let snapshot = wait_for_stage(&h.engine, &id, Stage::AwaitingEdit).await;
    assert!(snapshot.clip_count >= 1);
    Ok(())
}

#[tokio::test]
async fn test_probe_failure_falls_back_to_declared_duration() -> Result<()> {
    let tmp = TempDir::new()?;
    let h = harness_with_probe(
        StubFetcher::new(tmp.path()),
        StubTranscoder::new(),
        StubProbe {
            duration: 0.0,
            fail: true,
        },
    );

    let id = h
        .engine
        .submit(
            vec![source("https://example.com/v1", "First").with_declared_duration(90.0)],
            CompilationSettings::new(30),
        )
        .await?;

    // the pipeline still produces moments from the declared 90s duration
    let snapshot = wait_for_stage(&h.engine, &id, Stage::AwaitingEdit).await;
    assert!(snapshot.clip_count >= 1);
    Ok(())
}

#[tokio::test]
async fn test_delete_evicts_session_and_files() -> Result<()> {
    let tmp = TempDir::new()?;
    let h = harness(StubFetcher::new(tmp.path()), StubTranscoder::new());

    let id = h
        .engine
        .submit(
            vec![source("https://example.com/v1", "First")],
            CompilationSettings::new(30),
        )
        .await?;

    wait_for_stage(&h.engine, &id, Stage::AwaitingEdit).await;
    h.engine.compile(&id).await?;
    wait_for_stage(&h.engine, &id, Stage::Ready).await;

    let output = h.work_dir.join(id.as_str()).join("compilation.mp4");
    assert!(output.exists());

    h.engine.delete(&id).await?;
    assert!(!output.exists());
    assert!(matches!(
        h.engine.progress(&id).await,
        Err(EngineError::SessionNotFound(_))
    ));
    assert_eq!(h.engine.session_count().await, 0);
    Ok(())
}
