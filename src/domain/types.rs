//! Shared domain types.
//!
//! Inputs (`ProfileRow`, `RangeRecord`) are loaded once and never mutated.
//! Outputs (`PairResult`) are collected by a [`ResultTableBuilder`] and frozen
//! into a [`ResultTable`] before anything is written.

use std::path::PathBuf;

use serde::Serialize;

use crate::error::PairError;
use crate::fit::LmOptions;

/// One measured point of a diffusion profile.
///
/// `values[i]` is the concentration of the i-th oxide of the owning
/// [`ProfileTable`]; `None` when the cell was empty or not a number.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRow {
    /// 1-based line number in the source file (header is line 1).
    pub line: usize,
    pub expt: String,
    pub x: f64,
    pub values: Vec<Option<f64>>,
}

/// Validity window for one experiment as read from the range table.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeRecord {
    pub expt: String,
    pub min_x: f64,
    pub max_x: f64,
}

/// Inclusive `[min, max]` window on `x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeWindow {
    pub min: f64,
    pub max: f64,
}

impl RangeWindow {
    pub fn contains(&self, x: f64) -> bool {
        x >= self.min && x <= self.max
    }
}

/// Paired position/concentration samples for a single (experiment, oxide).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileSeries {
    pub x: Vec<f64>,
    pub c: Vec<f64>,
}

impl ProfileSeries {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            x: Vec::with_capacity(n),
            c: Vec::with_capacity(n),
        }
    }

    pub fn push(&mut self, x: f64, c: f64) {
        self.x.push(x);
        self.c.push(c);
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn mean_c(&self) -> Option<f64> {
        if self.c.is_empty() {
            return None;
        }
        Some(self.c.iter().sum::<f64>() / self.c.len() as f64)
    }
}

/// Parameters of `c(x) = c0 * erfc(slope * x)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiffusionParams {
    pub slope: f64,
    pub c0: f64,
}

/// Goodness-of-fit diagnostics. Reported, never used to reject a fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitQuality {
    pub n: usize,
    pub sse: f64,
    pub rmse: f64,
    /// `None` when the observations have zero variance.
    pub r_squared: Option<f64>,
}

/// Which starting point produced the accepted solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartKind {
    /// `m = 0`, `c0 = mean(c)`.
    Primary,
    /// Index into the fallback start grid.
    Fallback(usize),
}

/// Converged fit of one profile.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileFit {
    pub params: DiffusionParams,
    pub slope_err: Option<f64>,
    pub c0_err: Option<f64>,
    pub quality: FitQuality,
    pub evaluations: usize,
    pub start: StartKind,
}

/// Outcome for one (experiment, oxide) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct PairResult {
    /// Experiment label as configured (e.g. `3`), not the profile-table ID.
    pub expt: String,
    pub oxide: String,
    pub outcome: Result<ProfileFit, PairError>,
}

impl PairResult {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Flatten into the exported row shape.
    pub fn to_record(&self) -> FitRecord {
        match &self.outcome {
            Ok(fit) => FitRecord {
                expt: self.expt.clone(),
                oxide: self.oxide.clone(),
                slope: Some(fit.params.slope),
                c0: Some(fit.params.c0),
                slope_err: fit.slope_err,
                c0_err: fit.c0_err,
                n: Some(fit.quality.n),
                rmse: Some(fit.quality.rmse),
                r_squared: fit.quality.r_squared,
                status: "ok".to_string(),
            },
            Err(err) => FitRecord {
                expt: self.expt.clone(),
                oxide: self.oxide.clone(),
                slope: None,
                c0: None,
                slope_err: None,
                c0_err: None,
                n: match err {
                    PairError::InsufficientData { n, .. } => Some(*n),
                    _ => None,
                },
                rmse: None,
                r_squared: None,
                status: err.kind().to_string(),
            },
        }
    }
}

/// One row of the results table as written to CSV / JSON.
///
/// Failed pairs keep their identity and status; numeric fields are empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitRecord {
    #[serde(rename = "Expt")]
    pub expt: String,
    #[serde(rename = "Oxide")]
    pub oxide: String,
    #[serde(rename = "Slope")]
    pub slope: Option<f64>,
    #[serde(rename = "c0")]
    pub c0: Option<f64>,
    #[serde(rename = "Slope_err")]
    pub slope_err: Option<f64>,
    #[serde(rename = "c0_err")]
    pub c0_err: Option<f64>,
    #[serde(rename = "N")]
    pub n: Option<usize>,
    #[serde(rename = "RMSE")]
    pub rmse: Option<f64>,
    #[serde(rename = "R2")]
    pub r_squared: Option<f64>,
    #[serde(rename = "Status")]
    pub status: String,
}

/// Collects pair results in iteration order.
#[derive(Debug, Default)]
pub struct ResultTableBuilder {
    rows: Vec<PairResult>,
}

impl ResultTableBuilder {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            rows: Vec::with_capacity(n),
        }
    }

    pub fn push(&mut self, row: PairResult) {
        self.rows.push(row);
    }

    pub fn build(self) -> ResultTable {
        ResultTable { rows: self.rows }
    }
}

/// Immutable, ordered result table (experiments × oxides).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    rows: Vec<PairResult>,
}

impl ResultTable {
    pub fn rows(&self) -> &[PairResult] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn failed(&self) -> usize {
        self.rows.iter().filter(|r| !r.is_ok()).count()
    }

    pub fn records(&self) -> Vec<FitRecord> {
        self.rows.iter().map(PairResult::to_record).collect()
    }

    pub fn find(&self, expt: &str, oxide: &str) -> Option<&PairResult> {
        self.rows.iter().find(|r| r.expt == expt && r.oxide == oxide)
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus environment and defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub profiles_path: PathBuf,
    pub ranges_path: PathBuf,
    pub output_path: PathBuf,
    pub export_json: Option<PathBuf>,

    /// Experiment labels, already normalized (`3`, not `3.0`).
    pub experiments: Vec<String>,
    pub oxides: Vec<String>,
    /// Prefix joining a label to the profile table's experiment ID (`SpDis` + `3`).
    pub expt_prefix: String,

    /// Retry failed fits from the fallback start grid.
    pub fallback: bool,
    /// Exit non-zero when any pair failed.
    pub strict: bool,
    pub lm: LmOptions,
}

impl RunConfig {
    /// Profile-table experiment ID for a configured label.
    pub fn experiment_id(&self, label: &str) -> String {
        format!("{}{}", self.expt_prefix, label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fit() -> ProfileFit {
        ProfileFit {
            params: DiffusionParams { slope: 0.5, c0: 2.0 },
            slope_err: Some(0.01),
            c0_err: None,
            quality: FitQuality {
                n: 5,
                sse: 0.0,
                rmse: 0.0,
                r_squared: Some(1.0),
            },
            evaluations: 7,
            start: StartKind::Primary,
        }
    }

    #[test]
    fn window_is_inclusive() {
        let w = RangeWindow { min: 0.0, max: 4.0 };
        assert!(w.contains(0.0));
        assert!(w.contains(4.0));
        assert!(!w.contains(4.000_001));
        assert!(!w.contains(-0.1));
    }

    #[test]
    fn failed_pair_record_keeps_identity() {
        let row = PairResult {
            expt: "10".to_string(),
            oxide: "K2O".to_string(),
            outcome: Err(PairError::InsufficientData {
                expt: "10".to_string(),
                oxide: "K2O".to_string(),
                n: 1,
                required: 2,
            }),
        };
        let rec = row.to_record();
        assert_eq!(rec.expt, "10");
        assert_eq!(rec.oxide, "K2O");
        assert_eq!(rec.slope, None);
        assert_eq!(rec.n, Some(1));
        assert_eq!(rec.status, "insufficient_data");
    }

    #[test]
    fn builder_preserves_push_order() {
        let mut builder = ResultTableBuilder::with_capacity(2);
        for oxide in ["SiO2", "TiO2"] {
            builder.push(PairResult {
                expt: "3".to_string(),
                oxide: oxide.to_string(),
                outcome: Ok(sample_fit()),
            });
        }
        let table = builder.build();
        let oxides: Vec<&str> = table.rows().iter().map(|r| r.oxide.as_str()).collect();
        assert_eq!(oxides, ["SiO2", "TiO2"]);
        assert_eq!(table.failed(), 0);
        assert_eq!(table.records()[1].slope, Some(0.5));
    }
}
