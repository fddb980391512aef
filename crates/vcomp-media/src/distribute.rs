//! Fallback moment distribution.
//!
//! Used when scoring yields nothing usable (or auto-detection is off):
//! spreads clips evenly across the source with a little positional jitter.

use tracing::debug;
use vcomp_models::{EngagementTier, Moment};

use crate::jitter::Jitter;
use crate::score::target_candidate_count;
use crate::{EDGE_MARGIN_SECS, MAX_CLIP_SECS, MIN_CLIP_SECS};

/// Fallback label phrases, matching the "good"/"high" scoring tiers.
const HIGH_LABELS: &[&str] = &["High engagement", "Strong moment", "Audience hook", "Great scene"];
const GOOD_LABELS: &[&str] = &["Good moment", "Engaging scene", "Nice clip", "Solid content"];

/// Distribute moments evenly across the source with ±10%-of-duration jitter.
///
/// Positions are `(i + 1) / (n + 1)` of the duration, nudged by up to a
/// tenth of the duration either way and clamped to stay at least 5s from
/// either edge (when the source is long enough to allow it). The margin
/// binds start positions only: a clip starting near the tail may run into
/// the final 5s, capped at the source end. Scores are drawn uniformly
/// from [0.75, 0.95].
///
/// Guarantees at least one moment whenever `duration > 0`.
pub fn distribute_moments(
    source_index: usize,
    duration: f64,
    target_duration: f64,
    rng: &mut dyn Jitter,
) -> Vec<Moment> {
    if duration <= 0.0 {
        return Vec::new();
    }

    let count = target_candidate_count(target_duration);
    let margin = if duration > 2.0 * EDGE_MARGIN_SECS {
        EDGE_MARGIN_SECS
    } else {
        0.0
    };

    let mut moments = Vec::with_capacity(count);
    for i in 0..count {
        let position = (i as f64 + 1.0) / (count as f64 + 1.0);
        let base = duration * position;
        let variance = (rng.uniform(0.0, 1.0) - 0.5) * duration * 0.1;

        let mut start = (base + variance).clamp(margin, (duration - margin).max(margin));
        if start >= duration {
            start = (duration - MIN_CLIP_SECS).max(0.0);
        }

        let clip_len = rng.uniform(MIN_CLIP_SECS, MAX_CLIP_SECS);
        let end = (start + clip_len).min(duration);
        if end <= start {
            continue;
        }

        let score = rng.uniform(0.75, 0.95);
        let labels = if score > 0.85 { HIGH_LABELS } else { GOOD_LABELS };
        moments.push(
            Moment::new(source_index, start, end, score, rng.pick(labels))
                .with_tier(EngagementTier::for_index(i)),
        );
    }

    // A positive-duration source always yields at least one moment.
    if moments.is_empty() {
        let end = duration.min(MIN_CLIP_SECS);
        moments.push(
            Moment::new(source_index, 0.0, end, 0.75, GOOD_LABELS[0])
                .with_tier(EngagementTier::High),
        );
    }

    debug!(
        source_index,
        count = moments.len(),
        duration,
        "Distributed fallback moments"
    );

    moments
}
