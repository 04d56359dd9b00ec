//! Fit `c0 * erfc(m * x)` to a single profile.
//!
//! Given:
//! - positions `x_i`
//! - observed concentrations `c_i`
//!
//! we run Levenberg–Marquardt (MINPACK `lmder`, via `levenberg-marquardt`)
//! from the primary start and, if that fails, from each fallback start in
//! parallel, keeping the lowest-SSE solution. Standard errors and quality
//! diagnostics are computed at the solution.

use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt};
use nalgebra::storage::Owned;
use nalgebra::{DMatrix, DVector, Dyn, OMatrix, U2, Vector2};
use rayon::prelude::*;
use thiserror::Error;

use crate::domain::{DiffusionParams, FitQuality, ProfileFit, ProfileSeries, StartKind};
use crate::fit::starts::{fallback_starts, primary_start};
use crate::math::covariance;
use crate::models::{PARAM_COUNT, fill_jacobian_row, predict};

/// Minimum number of points for a determined fit.
pub const MIN_POINTS: usize = PARAM_COUNT;

/// MINPACK's default budget is `200 * (n_params + 1)` evaluations.
const DEFAULT_PATIENCE: usize = 200;

/// Solver tolerances and evaluation budget (MINPACK defaults).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LmOptions {
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
    /// Residual evaluations per start; `None` means `200 * (n_params + 1)`.
    pub max_evaluations: Option<usize>,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            ftol: 1.49012e-8,
            xtol: 1.49012e-8,
            gtol: 0.0,
            max_evaluations: None,
        }
    }
}

impl LmOptions {
    fn solver(&self) -> LevenbergMarquardt<f64> {
        // The solver counts its budget in blocks of `n_params + 1` evaluations.
        let patience = self
            .max_evaluations
            .map_or(DEFAULT_PATIENCE, |max| max.div_ceil(PARAM_COUNT + 1))
            .max(1);
        LevenbergMarquardt::new()
            .with_ftol(self.ftol)
            .with_xtol(self.xtol)
            .with_gtol(self.gtol)
            .with_patience(patience)
    }
}

/// Fitting options that affect how each profile is calibrated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOptions {
    /// Retry from the fallback grid when the primary start fails.
    pub fallback: bool,
    pub lm: LmOptions,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            fallback: true,
            lm: LmOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitFailure {
    #[error("{n} usable point(s), at least {required} required")]
    TooFewPoints { n: usize, required: usize },

    #[error("{0}")]
    NotConverged(String),
}

/// Least-squares view of one profile. Residuals are `c(x_i) - c_i`.
struct ErfcProblem<'a> {
    x: &'a [f64],
    c: &'a [f64],
    params: Vector2<f64>,
}

impl<'a> ErfcProblem<'a> {
    fn new(series: &'a ProfileSeries, start: &DiffusionParams) -> Self {
        Self {
            x: &series.x,
            c: &series.c,
            params: Vector2::new(start.slope, start.c0),
        }
    }

    fn diffusion_params(&self) -> DiffusionParams {
        DiffusionParams {
            slope: self.params[0],
            c0: self.params[1],
        }
    }
}

impl LeastSquaresProblem<f64, Dyn, U2> for ErfcProblem<'_> {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, U2>;
    type ParameterStorage = Owned<f64, U2>;

    fn set_params(&mut self, p: &Vector2<f64>) {
        self.params.copy_from(p);
    }

    fn params(&self) -> Vector2<f64> {
        self.params
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        let params = self.diffusion_params();
        Some(DVector::from_iterator(
            self.x.len(),
            self.x.iter().zip(self.c).map(|(&x, &c)| predict(x, &params) - c),
        ))
    }

    fn jacobian(&self) -> Option<OMatrix<f64, Dyn, U2>> {
        let params = self.diffusion_params();
        let mut jac = OMatrix::<f64, Dyn, U2>::zeros(self.x.len());
        let mut row = [0.0; PARAM_COUNT];
        for (i, &x) in self.x.iter().enumerate() {
            fill_jacobian_row(x, &params, &mut row);
            jac[(i, 0)] = row[0];
            jac[(i, 1)] = row[1];
        }
        Some(jac)
    }
}

/// A converged solver run.
#[derive(Debug, Clone)]
struct Solution {
    params: DiffusionParams,
    sse: f64,
    jacobian: DMatrix<f64>,
    evaluations: usize,
}

fn solve(series: &ProfileSeries, start: &DiffusionParams, opts: &LmOptions) -> Result<Solution, String> {
    let (problem, report) = opts.solver().minimize(ErfcProblem::new(series, start));
    if !report.termination.was_successful() {
        return Err(format!(
            "{:?} after {} evaluation(s)",
            report.termination, report.number_of_evaluations
        ));
    }

    let params = problem.diffusion_params();
    let residuals = problem.residuals().ok_or("residuals unavailable at solution")?;
    let jac = problem.jacobian().ok_or("jacobian unavailable at solution")?;
    let sse = residuals.norm_squared();
    if !(sse.is_finite() && params.slope.is_finite() && params.c0.is_finite()) {
        return Err("solution is not finite".to_string());
    }

    Ok(Solution {
        params,
        sse,
        jacobian: DMatrix::from_column_slice(jac.nrows(), PARAM_COUNT, jac.as_slice()),
        evaluations: report.number_of_evaluations,
    })
}

/// Fit a single profile.
///
/// The series must contain finite values only; the pipeline drops missing
/// concentrations before calling this.
pub fn fit_profile(series: &ProfileSeries, opts: &FitOptions) -> Result<ProfileFit, FitFailure> {
    let n = series.len();
    let too_few = FitFailure::TooFewPoints {
        n,
        required: MIN_POINTS,
    };
    if n < MIN_POINTS {
        return Err(too_few);
    }
    let start = primary_start(series).ok_or(too_few)?;

    let primary_err = match solve(series, &start, &opts.lm) {
        Ok(solution) => return Ok(finish(series, solution, StartKind::Primary)),
        Err(e) => e,
    };
    log::debug!("primary start failed: {primary_err}");

    if !opts.fallback {
        return Err(FitFailure::NotConverged(primary_err));
    }

    let starts = fallback_starts(series);
    let candidates: Vec<(usize, Solution)> = starts
        .par_iter()
        .enumerate()
        .filter_map(|(idx, s)| solve(series, s, &opts.lm).ok().map(|sol| (idx, sol)))
        .collect();
    log::debug!(
        "fallback: {} of {} start(s) converged",
        candidates.len(),
        starts.len()
    );

    match best_candidate(candidates) {
        Some((idx, solution)) => Ok(finish(series, solution, StartKind::Fallback(idx))),
        None if starts.is_empty() => Err(FitFailure::NotConverged(primary_err)),
        None => Err(FitFailure::NotConverged(format!(
            "{primary_err}; {} fallback start(s) also failed",
            starts.len()
        ))),
    }
}

/// Minimum SSE, ties broken by grid index.
fn best_candidate(candidates: Vec<(usize, Solution)>) -> Option<(usize, Solution)> {
    candidates.into_iter().min_by(|(ia, a), (ib, b)| {
        a.sse
            .partial_cmp(&b.sse)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(ia.cmp(ib))
    })
}

fn finish(series: &ProfileSeries, solution: Solution, start: StartKind) -> ProfileFit {
    let std_errors = covariance(&solution.jacobian, solution.sse)
        .map(|cov| (cov[(0, 0)], cov[(1, 1)]))
        .filter(|(a, b)| *a >= 0.0 && *b >= 0.0);

    ProfileFit {
        params: solution.params,
        slope_err: std_errors.map(|(a, _)| a.sqrt()),
        c0_err: std_errors.map(|(_, b)| b.sqrt()),
        quality: quality(series, solution.sse),
        evaluations: solution.evaluations,
        start,
    }
}

fn quality(series: &ProfileSeries, sse: f64) -> FitQuality {
    let n = series.len();
    let mean = series.mean_c().unwrap_or(0.0);
    let sst: f64 = series.c.iter().map(|c| (c - mean) * (c - mean)).sum();
    FitQuality {
        n,
        sse,
        rmse: (sse / n as f64).sqrt(),
        r_squared: if sst > 0.0 { Some(1.0 - sse / sst) } else { None },
    }
}
