//! Tracing setup and per-worker log helpers.

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vcomp_models::SessionId;

/// Initialize tracing for an embedding binary or test harness.
///
/// Honors `RUST_LOG`, defaulting to `vcomp=info`. Safe to call more than
/// once; later calls are no-ops.
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vcomp=info"));

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_ansi(true)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .with(env_filter)
        .try_init();
}

/// Attaches the session id and worker operation to every lifecycle log line
/// so concurrent workers can be told apart in aggregated output.
#[derive(Debug, Clone)]
pub struct SessionLogger {
    session_id: String,
    operation: &'static str,
}

impl SessionLogger {
    /// `operation` names the worker ("preparation", "compilation").
    pub fn new(session_id: &SessionId, operation: &'static str) -> Self {
        Self {
            session_id: session_id.to_string(),
            operation,
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            session_id = %self.session_id,
            operation = self.operation,
            "Worker started: {}", message
        );
    }

    /// A milestone inside a running worker.
    pub fn log_progress(&self, message: &str) {
        info!(
            session_id = %self.session_id,
            operation = self.operation,
            "Worker progress: {}", message
        );
    }

    /// A tolerated failure the worker continued past.
    pub fn log_warning(&self, message: &str) {
        warn!(
            session_id = %self.session_id,
            operation = self.operation,
            "Worker warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            session_id = %self.session_id,
            operation = self.operation,
            "Worker failed: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            session_id = %self.session_id,
            operation = self.operation,
            "Worker finished: {}", message
        );
    }
}
