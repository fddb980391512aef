//! Injectable randomness for the scoring heuristics.
//!
//! Scoring deliberately adds a small random perturbation so repeated runs
//! over the same source produce slightly different compilations. Tests pin
//! the source with [`FixedJitter`] to get deterministic rankings.

use rand::Rng;

/// Source of the heuristic randomness used by the scorer and distributor.
pub trait Jitter: Send {
    /// Uniform sample in `[lo, hi)`.
    fn uniform(&mut self, lo: f64, hi: f64) -> f64;

    /// Pick one of `options` (non-empty).
    fn pick<'a>(&mut self, options: &'a [&'a str]) -> &'a str {
        let idx = self.uniform(0.0, options.len() as f64) as usize;
        options[idx.min(options.len() - 1)]
    }
}

/// Production jitter backed by the thread-local RNG.
#[derive(Debug, Default)]
pub struct ThreadJitter;

impl Jitter for ThreadJitter {
    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        if hi <= lo {
            return lo;
        }
        rand::rng().random_range(lo..hi)
    }
}

/// Deterministic jitter for tests: every uniform sample lands at a fixed
/// fraction of its range. `FixedJitter::zero()` pins jitter to the low end,
/// which makes the scorer's ranking reproducible.
#[derive(Debug, Clone, Copy)]
pub struct FixedJitter {
    fraction: f64,
}

impl FixedJitter {
    pub fn new(fraction: f64) -> Self {
        Self {
            fraction: fraction.clamp(0.0, 1.0),
        }
    }

    /// Jitter pinned to the low end of every range (zero perturbation).
    pub fn zero() -> Self {
        Self::new(0.0)
    }
}

impl Jitter for FixedJitter {
    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.fraction
    }
}
