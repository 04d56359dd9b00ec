//! Shared fit pipeline used by the `fit` and `plot` front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load tables -> per experiment: range lookup -> row filter -> per oxide: fit
//!
//! Pair-level failures never abort the batch; they land in the result table.

use log::{info, warn};

use crate::data::{extract_series, filter_rows, lookup_range};
use crate::domain::{PairResult, ProfileFit, ProfileSeries, ResultTable, ResultTableBuilder, RunConfig};
use crate::error::{AppError, PairError};
use crate::fit::{FitFailure, FitOptions, fit_profile};
use crate::io::ingest::{ProfileTable, RangeTable, load_profiles, load_ranges};

/// All computed outputs of a single `dfit fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub profiles: ProfileTable,
    pub ranges: RangeTable,
    pub table: ResultTable,
}

/// Load both tables and fit every configured pair.
pub fn run_fit(config: &RunConfig) -> Result<RunOutput, AppError> {
    let profiles = load_profiles(&config.profiles_path, &config.oxides)?;
    let ranges = load_ranges(&config.ranges_path)?;
    let table = fit_all(&profiles, &ranges, config);
    Ok(RunOutput {
        profiles,
        ranges,
        table,
    })
}

/// Fit every (experiment, oxide) pair, experiments outer, oxides inner.
pub fn fit_all(profiles: &ProfileTable, ranges: &RangeTable, config: &RunConfig) -> ResultTable {
    let opts = fit_options(config);
    let mut builder = ResultTableBuilder::with_capacity(config.experiments.len() * config.oxides.len());

    for label in &config.experiments {
        let window = match lookup_range(&ranges.records, label) {
            Ok(w) => w,
            Err(err) => {
                warn!("experiment {label}: {err}; skipping its oxides");
                for oxide in &config.oxides {
                    builder.push(PairResult {
                        expt: label.clone(),
                        oxide: oxide.clone(),
                        outcome: Err(err.clone().with_oxide(oxide)),
                    });
                }
                continue;
            }
        };

        let expt_id = config.experiment_id(label);
        let rows = filter_rows(&profiles.rows, &expt_id, &window);
        info!(
            "experiment {label}: {} row(s) in [{}, {}]",
            rows.len(),
            window.min,
            window.max
        );

        for oxide in &config.oxides {
            let outcome = match profiles.oxide_index(oxide) {
                Some(idx) => fit_series(label, oxide, &extract_series(&rows, idx), &opts),
                // Ingest rejects missing oxide columns; this only guards hand-built tables.
                None => Err(PairError::InsufficientData {
                    expt: label.clone(),
                    oxide: oxide.clone(),
                    n: 0,
                    required: crate::fit::MIN_POINTS,
                }),
            };
            builder.push(PairResult {
                expt: label.clone(),
                oxide: oxide.clone(),
                outcome,
            });
        }
    }

    let table = builder.build();
    info!("fitted {} pair(s), {} failed", table.len(), table.failed());
    table
}

/// Fit one series, logging and tagging the outcome with its pair.
pub fn fit_series(
    label: &str,
    oxide: &str,
    series: &ProfileSeries,
    opts: &FitOptions,
) -> Result<ProfileFit, PairError> {
    match fit_profile(series, opts) {
        Ok(fit) => {
            info!(
                "experiment {label}, {oxide}: slope={:.6} c0={:.4} (n={}, rmse={:.4})",
                fit.params.slope, fit.params.c0, fit.quality.n, fit.quality.rmse
            );
            Ok(fit)
        }
        Err(failure) => {
            let err = pair_error(label, oxide, failure);
            warn!("{err}");
            Err(err)
        }
    }
}

/// Data and outcome for a single pair, as shown by `dfit plot`.
#[derive(Debug, Clone)]
pub struct PairView {
    pub series: ProfileSeries,
    pub result: PairResult,
}

/// Load both tables and fit a single pair.
pub fn run_pair(config: &RunConfig, label: &str, oxide: &str) -> Result<PairView, AppError> {
    let profiles = load_profiles(&config.profiles_path, &[oxide.to_string()])?;
    let ranges = load_ranges(&config.ranges_path)?;

    let window = lookup_range(&ranges.records, label).map_err(|e| AppError::input(e.with_oxide(oxide).to_string()))?;
    let rows = filter_rows(&profiles.rows, &config.experiment_id(label), &window);
    let series = extract_series(&rows, 0);
    let outcome = fit_series(label, oxide, &series, &fit_options(config));

    Ok(PairView {
        series,
        result: PairResult {
            expt: label.to_string(),
            oxide: oxide.to_string(),
            outcome,
        },
    })
}

fn fit_options(config: &RunConfig) -> FitOptions {
    FitOptions {
        fallback: config.fallback,
        lm: config.lm,
    }
}

fn pair_error(label: &str, oxide: &str, failure: FitFailure) -> PairError {
    match failure {
        FitFailure::TooFewPoints { n, required } => PairError::InsufficientData {
            expt: label.to_string(),
            oxide: oxide.to_string(),
            n,
            required,
        },
        FitFailure::NotConverged(reason) => PairError::FitDidNotConverge {
            expt: label.to_string(),
            oxide: oxide.to_string(),
            reason,
        },
    }
}
