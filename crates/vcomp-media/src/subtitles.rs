//! SRT parsing and subtitle re-timing.
//!
//! A full-video track is sliced to a clip's time window and shifted to
//! clip-relative zero so the transcoder can burn it in directly. Subtitle
//! problems are never fatal; a clip simply renders without captions.

use tracing::warn;
use vcomp_models::{format_seconds, SubtitleEntry};

use crate::error::{MediaError, MediaResult};

/// Parse SRT content into timed entries.
///
/// Tolerant of malformed blocks: each block needs an index line, a timing
/// line (`HH:MM:SS,mmm --> HH:MM:SS,mmm`) and at least one text line;
/// anything else is skipped. Returns an error only when non-empty content
/// yields no entries at all.
pub fn parse_srt(content: &str) -> MediaResult<Vec<SubtitleEntry>> {
    let mut entries = Vec::new();

    for block in content.replace("\r\n", "\n").split("\n\n") {
        let lines: Vec<&str> = block.lines().filter(|l| !l.trim().is_empty()).collect();
        if lines.len() < 3 {
            continue;
        }

        // lines[0] is the cue index, lines[1] the timing, the rest is text.
        let Some((start_str, end_str)) = lines[1].split_once("-->") else {
            continue;
        };
        let (Some(start), Some(end)) = (parse_srt_time(start_str), parse_srt_time(end_str)) else {
            continue;
        };
        if end <= start {
            continue;
        }

        entries.push(SubtitleEntry::new(start, end, lines[2..].join(" ")));
    }

    if entries.is_empty() && !content.trim().is_empty() {
        return Err(MediaError::SubtitleParse(
            "no valid cues found in track".to_string(),
        ));
    }

    entries.sort_by(|a, b| a.start.total_cmp(&b.start));
    Ok(entries)
}

/// Parse `HH:MM:SS,mmm` (or `.` separated milliseconds) to seconds.
fn parse_srt_time(s: &str) -> Option<f64> {
    let s = s.trim().replace(',', ".");
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 3 {
        return None;
    }
    let hours: f64 = parts[0].parse().ok()?;
    let minutes: f64 = parts[1].parse().ok()?;
    let seconds: f64 = parts[2].parse().ok()?;
    if hours < 0.0 || minutes < 0.0 || seconds < 0.0 {
        return None;
    }
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Slice a track to the clip window `[clip_start, clip_end]` and shift it to
/// clip-relative zero.
///
/// An entry is kept iff it overlaps the window; kept bounds are clamped to
/// `[0, clip_end - clip_start]`. Returns `None` when nothing survives.
pub fn retime_track(
    entries: &[SubtitleEntry],
    clip_start: f64,
    clip_end: f64,
) -> Option<Vec<SubtitleEntry>> {
    if clip_end <= clip_start {
        warn!(clip_start, clip_end, "Degenerate clip window for subtitles");
        return None;
    }
    let clip_len = clip_end - clip_start;

    let retimed: Vec<SubtitleEntry> = entries
        .iter()
        .filter(|e| e.overlaps(clip_start, clip_end))
        .map(|e| {
            SubtitleEntry::new(
                (e.start - clip_start).clamp(0.0, clip_len),
                (e.end - clip_start).clamp(0.0, clip_len),
                e.text.clone(),
            )
        })
        .collect();

    if retimed.is_empty() {
        None
    } else {
        Some(retimed)
    }
}

/// Serialize entries back to SRT for burn-in.
pub fn to_srt(entries: &[SubtitleEntry]) -> String {
    let mut out = String::new();
    for (idx, entry) in entries.iter().enumerate() {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            idx + 1,
            format_seconds(entry.start),
            format_seconds(entry.end),
            entry.text
        ));
    }
    out
}
