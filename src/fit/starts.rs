//! Starting points for the fit.
//!
//! The primary start is `m = 0`, `c0 = mean(c)`: a flat profile at the mean
//! concentration. When Levenberg–Marquardt fails from there, the fitter
//! retries from a fixed grid of slopes scaled to the sampled extent.

use crate::domain::{DiffusionParams, ProfileSeries};

/// Slope multipliers (times `1 / x_span`) for the fallback grid, in grid-index order.
pub const FALLBACK_SLOPES: [f64; 5] = [0.1, 0.3, 1.0, 3.0, 10.0];

/// `m = 0`, `c0 = mean(c)`.
pub fn primary_start(series: &ProfileSeries) -> Option<DiffusionParams> {
    let c0 = series.mean_c()?;
    Some(DiffusionParams { slope: 0.0, c0 })
}

/// Fallback grid: `m ∈ {0.1, 0.3, 1, 3, 10} / x_span`, `c0 = max(c)`.
///
/// `x_span` is the largest `|x|` in the series (the model is anchored at
/// `x = 0`), or 1 when all positions are zero.
pub fn fallback_starts(series: &ProfileSeries) -> Vec<DiffusionParams> {
    let c_max = series.c.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !c_max.is_finite() {
        return Vec::new();
    }

    let x_span = series.x.iter().map(|x| x.abs()).fold(0.0, f64::max);
    let x_span = if x_span > 0.0 && x_span.is_finite() { x_span } else { 1.0 };

    FALLBACK_SLOPES
        .iter()
        .map(|k| DiffusionParams {
            slope: k / x_span,
            c0: c_max,
        })
        .collect()
}
