//! Timestamp formatting helpers.
//!
//! The pipeline works in fractional seconds internally; these helpers
//! produce the display formats surfaced to clients and written into
//! subtitle files.

/// Format seconds as a short `M:SS` display timestamp (e.g. `1:05`).
///
/// Used for the moment preview shown while a session is polled.
pub fn format_display(total_secs: f64) -> String {
    let total = total_secs.max(0.0);
    let minutes = (total / 60.0).floor() as u64;
    let seconds = (total % 60.0).floor() as u64;
    format!("{}:{:02}", minutes, seconds)
}

/// Format seconds as `HH:MM:SS,mmm` for SRT timing lines.
pub fn format_seconds(total_secs: f64) -> String {
    let total = total_secs.max(0.0);
    let hours = (total / 3600.0).floor() as u64;
    let mins = ((total % 3600.0) / 60.0).floor() as u64;
    let secs = (total % 60.0).floor() as u64;
    let millis = ((total - total.floor()) * 1000.0).round() as u64;
    format!("{:02}:{:02}:{:02},{:03}", hours, mins, secs, millis.min(999))
}
