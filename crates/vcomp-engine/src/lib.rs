//! Compilation engine.
//!
//! This crate provides:
//! - The `Engine` facade (submit, poll, compile, delete)
//! - Lock-guarded session store with TTL eviction
//! - Pipeline orchestration, one background worker per session
//! - Progress-event channel with a single updater task
//! - External contracts for fetching and transcoding
//!
//! The concrete tool adapters (downloader, probe, transcoder) live outside
//! this workspace; everything here is driven through trait objects.

pub mod config;
pub mod engine;
pub mod error;
pub mod fetcher;
pub mod logging;
pub mod pipeline;
pub mod progress;
pub mod store;
pub mod transcoder;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use fetcher::{FetchOutcome, MediaFetcher};
pub use logging::SessionLogger;
pub use progress::{DownloadTracker, ProgressEvent, ProgressSender, SourceProgressHandle};
pub use store::SessionStore;
pub use transcoder::{TranscodeError, Transcoder};
