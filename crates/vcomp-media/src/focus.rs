//! Horizontal focus estimation for reframing.
//!
//! The actual frame decoding lives behind [`FrameAnalyzer`] (an external
//! capability); this module owns the aggregation math that turns raw
//! samples into a single focus fraction per clip. Estimation failures are
//! absorbed by the plan builder, which falls back to a centered crop.

use async_trait::async_trait;
use std::path::Path;

use crate::error::MediaResult;

/// Focus fractions are clamped into this band so the crop window never
/// pins itself to a frame edge.
pub const FOCUS_MIN: f64 = 0.1;
pub const FOCUS_MAX: f64 = 0.9;

/// Moving-average half-window used to smooth subject trajectories.
const SMOOTHING_WINDOW: usize = 3;

/// A detected subject bounding box, dimensions as fractions of the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubjectBox {
    /// Horizontal center as a fraction of frame width.
    pub center_x: f64,
    /// Box width as a fraction of frame width.
    pub width: f64,
    /// Box height as a fraction of frame height.
    pub height: f64,
}

impl SubjectBox {
    pub fn new(center_x: f64, width: f64, height: f64) -> Self {
        Self {
            center_x,
            width,
            height,
        }
    }

    /// Relative box area, used to pick the primary subject.
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// External frame-sampling capability backing the focus estimates.
#[async_trait]
pub trait FrameAnalyzer: Send + Sync {
    /// High-frequency energy per column, for each of `samples` frames taken
    /// evenly across the clip window.
    async fn saliency_samples(
        &self,
        path: &Path,
        start: f64,
        end: f64,
        samples: usize,
    ) -> MediaResult<Vec<Vec<f64>>>;

    /// Subject boxes detected in each time window of length `interval`
    /// across the clip.
    async fn subject_windows(
        &self,
        path: &Path,
        start: f64,
        end: f64,
        interval: f64,
    ) -> MediaResult<Vec<Vec<SubjectBox>>>;
}

/// Fixed-crop focus: per-sample energy center of mass, median-aggregated.
///
/// Returns `None` when no sample carries usable energy.
pub fn saliency_focus(samples: &[Vec<f64>]) -> Option<f64> {
    let mut centers: Vec<f64> = samples
        .iter()
        .filter_map(|columns| center_of_mass(columns))
        .collect();
    if centers.is_empty() {
        return None;
    }

    centers.sort_by(|a, b| a.total_cmp(b));
    let median = if centers.len() % 2 == 1 {
        centers[centers.len() / 2]
    } else {
        let hi = centers.len() / 2;
        (centers[hi - 1] + centers[hi]) / 2.0
    };

    Some(median.clamp(FOCUS_MIN, FOCUS_MAX))
}

/// Smart-crop focus: primary subject center per window (largest area wins),
/// moving-average smoothed, then averaged over the clip.
///
/// Returns `None` when no window contains a subject.
pub fn subject_focus(windows: &[Vec<SubjectBox>]) -> Option<f64> {
    let trajectory: Vec<f64> = windows
        .iter()
        .filter_map(|boxes| {
            boxes
                .iter()
                .max_by(|a, b| a.area().total_cmp(&b.area()))
                .map(|primary| primary.center_x.clamp(0.0, 1.0))
        })
        .collect();
    if trajectory.is_empty() {
        return None;
    }

    let smoothed = moving_average(&trajectory, SMOOTHING_WINDOW);
    let mean = smoothed.iter().sum::<f64>() / smoothed.len() as f64;
    Some(mean.clamp(FOCUS_MIN, FOCUS_MAX))
}

/// Center of mass of a column-energy vector, as a fraction of width.
fn center_of_mass(columns: &[f64]) -> Option<f64> {
    if columns.is_empty() {
        return None;
    }
    let total: f64 = columns.iter().map(|e| e.max(0.0)).sum();
    if total <= 0.0 {
        return None;
    }
    let weighted: f64 = columns
        .iter()
        .enumerate()
        .map(|(i, e)| i as f64 * e.max(0.0))
        .sum();
    Some(weighted / total / (columns.len() - 1).max(1) as f64)
}

/// Symmetric moving average with the given half-window.
fn moving_average(values: &[f64], half_window: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            let lo = i.saturating_sub(half_window);
            let hi = (i + half_window + 1).min(values.len());
            values[lo..hi].iter().sum::<f64>() / (hi - lo) as f64
        })
        .collect()
}
