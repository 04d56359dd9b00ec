//! Synthetic diffusion profiles for smoke-testing the pipeline.
//!
//! Every (experiment, oxide) pair gets the same true profile
//! `c0 * erfc(m * x)` sampled on an even grid, plus Gaussian noise. Positions
//! extend a quarter past the validity window so the range filter has
//! something to cut.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

use crate::domain::{DiffusionParams, ProfileRow, RangeRecord};
use crate::error::AppError;
use crate::models::predict;

/// Fraction of the window width sampled beyond `max x`.
const OVERSHOOT: f64 = 0.25;

#[derive(Debug, Clone)]
pub struct SampleSpec {
    pub experiments: Vec<String>,
    pub oxides: Vec<String>,
    pub expt_prefix: String,
    pub params: DiffusionParams,
    pub x_min: f64,
    pub x_max: f64,
    /// Points per experiment (over the extended grid).
    pub points: usize,
    /// Absolute standard deviation of the additive noise.
    pub noise: f64,
    pub seed: u64,
}

#[derive(Debug, Clone)]
pub struct SampleData {
    pub oxides: Vec<String>,
    pub rows: Vec<ProfileRow>,
    pub ranges: Vec<RangeRecord>,
}

pub fn generate_sample(spec: &SampleSpec) -> Result<SampleData, AppError> {
    if spec.points < 2 {
        return Err(AppError::input("Sample point count must be >= 2."));
    }
    if !(spec.x_min.is_finite() && spec.x_max.is_finite() && spec.x_max > spec.x_min) {
        return Err(AppError::input(format!(
            "Invalid sample window [{}, {}].",
            spec.x_min, spec.x_max
        )));
    }
    if !(spec.noise.is_finite() && spec.noise >= 0.0) {
        return Err(AppError::input("Noise level must be finite and >= 0."));
    }
    if !(spec.params.slope.is_finite() && spec.params.c0.is_finite()) {
        return Err(AppError::input("Sample parameters must be finite."));
    }

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let normal = Normal::new(0.0, spec.noise)
        .map_err(|e| AppError::input(format!("Noise distribution error: {e}")))?;

    let x_end = spec.x_max + OVERSHOOT * (spec.x_max - spec.x_min);
    let step = (x_end - spec.x_min) / (spec.points as f64 - 1.0);

    let mut rows = Vec::with_capacity(spec.experiments.len() * spec.points);
    let mut ranges = Vec::with_capacity(spec.experiments.len());

    for expt in &spec.experiments {
        let expt_id = format!("{}{}", spec.expt_prefix, expt);
        for i in 0..spec.points {
            let x = spec.x_min + step * i as f64;
            let clean = predict(x, &spec.params);
            let values = spec
                .oxides
                .iter()
                .map(|_| {
                    let noisy = if spec.noise > 0.0 { clean + normal.sample(&mut rng) } else { clean };
                    // Concentrations are non-negative.
                    Some(noisy.max(0.0))
                })
                .collect();

            rows.push(ProfileRow {
                line: rows.len() + 2,
                expt: expt_id.clone(),
                x,
                values,
            });
        }

        ranges.push(RangeRecord {
            expt: expt.clone(),
            min_x: spec.x_min,
            max_x: spec.x_max,
        });
    }

    Ok(SampleData {
        oxides: spec.oxides.clone(),
        rows,
        ranges,
    })
}
