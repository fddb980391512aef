//! Moment selection and duration-budget enforcement.

use tracing::{debug, warn};
use vcomp_models::{EngagementTier, Moment};

use crate::error::{MediaError, MediaResult};
use crate::score::target_candidate_count;

/// Minimum surviving length for a budget-trimmed boundary clip (seconds).
const MIN_TRIMMED_CLIP_SECS: f64 = 0.5;

/// Shortest synthesized fallback clip (seconds).
const MIN_SYNTH_CLIP_SECS: f64 = 6.0;

/// Candidates plus the context needed for fallback synthesis.
#[derive(Debug, Clone)]
pub struct SelectionInput {
    /// All candidate moments across all sources.
    pub candidates: Vec<Moment>,
    /// Authoritative duration per fetched source, indexed by source.
    pub source_durations: Vec<f64>,
    /// Target total output duration in seconds.
    pub target_duration: f64,
}

/// Hard limit on total output length: `T + max(4, 0.12 * T)`.
pub fn hard_limit(target_duration: f64) -> f64 {
    target_duration + (0.12 * target_duration).max(4.0)
}

/// Pick the ordered subset of moments that fills the duration budget.
///
/// Candidates are ranked by score (earlier start breaking ties), the top
/// `floor(T / 4.5)` survive, and the survivors are re-ordered by
/// `(source_index, start)` for playback. Clips accumulate until the budget
/// is spent; the boundary clip is trimmed to consume exactly what remains
/// (dropped when that leaves less than half a second).
///
/// An empty selection is recovered by synthesizing one moment per fetched
/// source; only a selection that stays empty after that is fatal.
pub fn select_moments(input: SelectionInput) -> MediaResult<Vec<Moment>> {
    let target = input.target_duration;
    let limit = hard_limit(target);

    let mut ranked = input.candidates;
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.start.total_cmp(&b.start)));
    ranked.truncate(target_candidate_count(target));

    // Cross-source playback order.
    ranked.sort_by(|a, b| {
        a.source_index
            .cmp(&b.source_index)
            .then(a.start.total_cmp(&b.start))
    });

    let mut selected: Vec<Moment> = Vec::new();
    let mut total = 0.0;

    for moment in ranked {
        if total >= target {
            break;
        }

        let clip_len = moment.duration();
        if total + clip_len <= limit {
            total += clip_len;
            selected.push(moment);
            continue;
        }

        // Boundary clip: trim to exactly the remaining budget.
        let remaining = target - total;
        if remaining >= MIN_TRIMMED_CLIP_SECS {
            selected.push(moment.trimmed_to(remaining));
            total += remaining;
        }
        break;
    }

    if selected.is_empty() {
        selected = synthesize_fallback(&input.source_durations, target);
        if !selected.is_empty() {
            warn!(
                sources = input.source_durations.len(),
                "Selection was empty; synthesized one fallback moment per source"
            );
        }
    }

    if selected.is_empty() {
        return Err(MediaError::no_moments(
            "no candidates and no fetched sources to fall back on",
        ));
    }

    debug!(
        clips = selected.len(),
        total_secs = selected.iter().map(Moment::duration).sum::<f64>(),
        target_secs = target,
        "Selected moments"
    );

    Ok(selected)
}

/// One synthesized moment per fetched source: `[0, min(duration, max(6, T/n))]`.
fn synthesize_fallback(source_durations: &[f64], target: f64) -> Vec<Moment> {
    let usable: Vec<(usize, f64)> = source_durations
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, d)| *d > 0.0)
        .collect();
    if usable.is_empty() {
        return Vec::new();
    }

    let per_source = (target / usable.len() as f64).max(MIN_SYNTH_CLIP_SECS);
    usable
        .into_iter()
        .enumerate()
        .map(|(order, (source_index, duration))| {
            let end = duration.min(per_source);
            Moment::new(source_index, 0.0, end, 0.75, "Full segment")
                .with_tier(EngagementTier::for_index(order))
        })
        .collect()
}
