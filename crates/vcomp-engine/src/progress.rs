//! Progress events and the single updater task.
//!
//! Pipeline workers never write progress into the session store directly;
//! they emit [`ProgressEvent`]s onto a channel drained by one updater task,
//! so progress writes are serialized per process. Download progress is
//! aggregated from per-source byte counters snapshotted under one lock.

use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::store::SessionStore;
use vcomp_models::{SessionId, StageId, TaskState};

/// One progress update for a session's stage task.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub session_id: SessionId,
    pub stage: StageId,
    /// Percent complete in [0, 100].
    pub percent: f64,
    pub detail: String,
}

impl ProgressEvent {
    pub fn new(
        session_id: SessionId,
        stage: StageId,
        percent: f64,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            session_id,
            stage,
            percent,
            detail: detail.into(),
        }
    }
}

/// Cloneable sending half of the progress channel. Sending never blocks and
/// never fails the caller; events after shutdown are dropped.
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ProgressSender {
    pub fn send(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

/// Create the progress channel.
pub fn progress_channel() -> (ProgressSender, mpsc::UnboundedReceiver<ProgressEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ProgressSender { tx }, rx)
}

/// Spawn the single task that applies progress events to the store.
///
/// Exits when every sender is dropped. Events for evicted sessions are
/// ignored, as are stale events for tasks that already reached a final
/// state: a worker may queue an update just before it finishes the task.
pub fn spawn_updater(
    store: Arc<SessionStore>,
    mut rx: mpsc::UnboundedReceiver<ProgressEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let result = store
                .with_session(&event.session_id, |session| {
                    if let Some(task) = session.task_mut(event.stage) {
                        if !matches!(task.status, TaskState::Done | TaskState::Failed) {
                            task.update(event.percent, event.detail.clone());
                        }
                    }
                })
                .await;
            if result.is_err() {
                debug!(
                    session_id = %event.session_id,
                    "Dropping progress event for evicted session"
                );
            }
        }
    })
}

#[derive(Debug, Default, Clone, Copy)]
struct ByteCounter {
    downloaded: u64,
    total: Option<u64>,
    complete: bool,
}

impl ByteCounter {
    fn percent(&self) -> f64 {
        if self.complete {
            return 100.0;
        }
        match self.total {
            Some(total) if total > 0 => {
                ((self.downloaded as f64 / total as f64) * 100.0).min(100.0)
            }
            _ => 0.0,
        }
    }
}

/// Per-source byte counters for one session's download stage.
///
/// All counters live behind a single lock so the aggregate percent is
/// always computed from one consistent snapshot.
#[derive(Debug)]
pub struct DownloadTracker {
    counters: StdMutex<Vec<ByteCounter>>,
}

impl DownloadTracker {
    pub fn new(sources: usize) -> Arc<Self> {
        Arc::new(Self {
            counters: StdMutex::new(vec![ByteCounter::default(); sources]),
        })
    }

    /// Handle through which the fetcher reports one source's bytes.
    pub fn handle(
        self: &Arc<Self>,
        index: usize,
        session_id: SessionId,
        events: ProgressSender,
    ) -> SourceProgressHandle {
        SourceProgressHandle {
            tracker: Arc::clone(self),
            index,
            session_id,
            events,
        }
    }

    /// Mark one source finished (success or tolerated failure) and emit the
    /// new aggregate.
    pub fn complete(&self, index: usize, session_id: &SessionId, events: &ProgressSender) {
        let percent = {
            let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(counter) = counters.get_mut(index) {
                counter.complete = true;
            }
            mean_percent(&counters)
        };
        events.send(ProgressEvent::new(
            session_id.clone(),
            StageId::Download,
            percent,
            "Downloading source videos",
        ));
    }

    /// Aggregate percent from one consistent snapshot of all counters.
    pub fn overall_percent(&self) -> f64 {
        let counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        mean_percent(&counters)
    }

    fn record(&self, index: usize, downloaded: u64, total: Option<u64>) -> f64 {
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(counter) = counters.get_mut(index) {
            counter.downloaded = downloaded;
            if total.is_some() {
                counter.total = total;
            }
        }
        mean_percent(&counters)
    }
}

fn mean_percent(counters: &[ByteCounter]) -> f64 {
    if counters.is_empty() {
        return 0.0;
    }
    counters.iter().map(ByteCounter::percent).sum::<f64>() / counters.len() as f64
}

/// Byte-progress callback handed to the fetcher for one source.
#[derive(Debug, Clone)]
pub struct SourceProgressHandle {
    tracker: Arc<DownloadTracker>,
    index: usize,
    session_id: SessionId,
    events: ProgressSender,
}

impl SourceProgressHandle {
    /// Report this source's downloaded bytes (and total size once known).
    pub fn report(&self, downloaded: u64, total: Option<u64>) {
        let percent = self.tracker.record(self.index, downloaded, total);
        self.events.send(ProgressEvent::new(
            self.session_id.clone(),
            StageId::Download,
            percent,
            "Downloading source videos",
        ));
    }
}
