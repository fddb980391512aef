//! Engine configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Work directory for per-session temp files
    pub work_dir: PathBuf,
    /// Retention window before an idle session is evicted
    pub session_ttl: Duration,
    /// Timeout for fetching one source
    pub fetch_timeout: Duration,
    /// Timeout for executing one render plan
    pub transcode_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("/tmp/vcomp"),
            session_ttl: Duration::from_secs(3600), // 1 hour
            fetch_timeout: Duration::from_secs(600),
            transcode_timeout: Duration::from_secs(900),
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            work_dir: std::env::var("VCOMP_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/tmp/vcomp")),
            session_ttl: Duration::from_secs(
                std::env::var("VCOMP_SESSION_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            ),
            fetch_timeout: Duration::from_secs(
                std::env::var("VCOMP_FETCH_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
            transcode_timeout: Duration::from_secs(
                std::env::var("VCOMP_TRANSCODE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(900),
            ),
        }
    }

    /// Session TTL as a chrono duration, for age checks against timestamps.
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.session_ttl.as_secs() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.session_ttl, Duration::from_secs(3600));
        assert_eq!(config.ttl(), chrono::Duration::hours(1));
    }
}
