//! Moment scoring: fuses scene cuts and audio-energy peaks into ranked
//! candidate moments.

use tracing::debug;
use vcomp_models::{EngagementTier, Moment};

use crate::jitter::Jitter;
use crate::{AVG_CLIP_SECS, EDGE_MARGIN_SECS, MAX_CLIP_SECS, MIN_CLIP_SECS};

/// Label phrases by raw-score tier.
const PEAK_LABELS: &[&str] = &["Peak engagement", "Viral moment", "Key highlight", "Top reaction"];
const HIGH_LABELS: &[&str] = &["High engagement", "Strong moment", "Audience hook", "Great scene"];
const GOOD_LABELS: &[&str] = &["Good moment", "Engaging scene", "Nice clip", "Solid content"];

/// Raw-score thresholds for the label tiers.
const PEAK_THRESHOLD: f64 = 0.85;
const HIGH_THRESHOLD: f64 = 0.75;

/// Maximum jitter added to a raw score, for tie-breaking variety only.
pub const SCORE_JITTER_MAX: f64 = 0.1;

/// Inputs for one source's moment scoring pass.
#[derive(Debug, Clone)]
pub struct ScoreInputs<'a> {
    /// Index of the source within the session.
    pub source_index: usize,
    /// Scene-cut timestamps in seconds, ascending.
    pub scene_cuts: &'a [f64],
    /// High-energy timestamps in seconds, ascending.
    pub energy_peaks: &'a [f64],
    /// Authoritative source duration in seconds.
    pub duration: f64,
    /// Desired total output duration for this source, in seconds.
    pub target_duration: f64,
}

/// Score and rank candidate moments for one source.
///
/// Merges the two timestamp sets, discards unreliable boundary regions,
/// scores each survivor by proximity to both signals (plus a small jitter),
/// keeps the top `max(1, floor(target / 4.5))` and returns them re-sorted
/// by start time for sequential playback.
///
/// Returns an empty list when no timestamp survives filtering; the caller
/// falls back to [`crate::distribute_moments`].
pub fn score_moments(inputs: &ScoreInputs<'_>, rng: &mut dyn Jitter) -> Vec<Moment> {
    let mut timestamps: Vec<f64> = inputs
        .scene_cuts
        .iter()
        .chain(inputs.energy_peaks.iter())
        .copied()
        .collect();
    timestamps.sort_by(|a, b| a.total_cmp(b));
    timestamps.dedup_by(|a, b| (*a - *b).abs() < 1e-9);

    let mut scored: Vec<(f64, f64)> = Vec::new();
    for &t in &timestamps {
        if t < EDGE_MARGIN_SECS || t > inputs.duration - EDGE_MARGIN_SECS {
            continue;
        }

        let scene_prox = min_distance(t, inputs.scene_cuts);
        let energy_prox = min_distance(t, inputs.energy_peaks);
        let raw = 1.0 / (1.0 + scene_prox + energy_prox) + rng.uniform(0.0, SCORE_JITTER_MAX);
        scored.push((t, raw));
    }

    if scored.is_empty() {
        debug!(
            source_index = inputs.source_index,
            "No timestamps survived boundary filtering"
        );
        return Vec::new();
    }

    // Rank by raw score, earlier start breaking ties.
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.total_cmp(&b.0)));

    let count = target_candidate_count(inputs.target_duration);
    scored.truncate(count);

    // Back to playback order.
    scored.sort_by(|a, b| a.0.total_cmp(&b.0));

    let moments: Vec<Moment> = scored
        .iter()
        .enumerate()
        .map(|(idx, &(start, raw))| {
            let clip_len = rng.uniform(MIN_CLIP_SECS, MAX_CLIP_SECS);
            let end = (start + clip_len).min(inputs.duration);
            Moment::new(
                inputs.source_index,
                start,
                end,
                publish_score(raw),
                label_for(raw, rng),
            )
            .with_tier(EngagementTier::for_index(idx))
        })
        .collect();

    debug!(
        source_index = inputs.source_index,
        candidates = timestamps.len(),
        selected = moments.len(),
        "Scored moments"
    );

    moments
}

/// Candidate pool size for a target duration: `max(1, floor(target / 4.5))`.
pub fn target_candidate_count(target_duration: f64) -> usize {
    ((target_duration / AVG_CLIP_SECS).floor() as usize).max(1)
}

/// Map a raw proximity score onto the published [0.70, 0.99] band.
fn publish_score(raw: f64) -> f64 {
    (0.70 + raw * 0.30).min(0.99)
}

/// Minimum distance from `t` to any timestamp in `set`; 1.0 when empty.
fn min_distance(t: f64, set: &[f64]) -> f64 {
    if set.is_empty() {
        return 1.0;
    }
    set.iter()
        .map(|&s| (t - s).abs())
        .fold(f64::INFINITY, f64::min)
}

/// Pick a tier-appropriate label for a raw score.
fn label_for(raw: f64, rng: &mut dyn Jitter) -> &'static str {
    let set = if raw > PEAK_THRESHOLD {
        PEAK_LABELS
    } else if raw > HIGH_THRESHOLD {
        HIGH_LABELS
    } else {
        GOOD_LABELS
    };
    rng.pick(set)
}
