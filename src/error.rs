//! Error types.
//!
//! Two tiers:
//!
//! - [`AppError`]: structural problems that abort the run (unreadable inputs,
//!   missing columns, bad configuration). Carries the process exit code.
//! - [`PairError`]: a single (experiment, oxide) pair could not be fitted. The
//!   batch records the failure and moves on to the next pair.

use thiserror::Error;

/// Exit code for bad inputs or configuration.
pub const EXIT_INPUT: u8 = 2;
/// Exit code when no usable data remains after ingest.
pub const EXIT_NO_DATA: u8 = 3;
/// Exit code for `--strict` runs in which at least one pair failed.
pub const EXIT_PAIR_FAILED: u8 = 4;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    /// Shorthand for an input/configuration error (exit code 2).
    pub fn input(message: impl Into<String>) -> Self {
        Self::new(EXIT_INPUT, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Why a single (experiment, oxide) pair produced no fit.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PairError {
    #[error("no range record for experiment {expt} (oxide {oxide})")]
    MissingRangeRecord { expt: String, oxide: String },

    #[error("{count} range records match experiment {expt} (oxide {oxide})")]
    AmbiguousRangeRecord {
        expt: String,
        oxide: String,
        count: usize,
    },

    #[error("invalid range [{min}, {max}] for experiment {expt} (oxide {oxide})")]
    InvalidRange {
        expt: String,
        oxide: String,
        min: f64,
        max: f64,
    },

    #[error("experiment {expt}, oxide {oxide}: {n} usable point(s), at least {required} required")]
    InsufficientData {
        expt: String,
        oxide: String,
        n: usize,
        required: usize,
    },

    #[error("experiment {expt}, oxide {oxide}: fit did not converge ({reason})")]
    FitDidNotConverge {
        expt: String,
        oxide: String,
        reason: String,
    },
}

impl PairError {
    /// Short machine-readable tag used in the `Status` column.
    pub fn kind(&self) -> &'static str {
        match self {
            PairError::MissingRangeRecord { .. } => "missing_range",
            PairError::AmbiguousRangeRecord { .. } => "ambiguous_range",
            PairError::InvalidRange { .. } => "invalid_range",
            PairError::InsufficientData { .. } => "insufficient_data",
            PairError::FitDidNotConverge { .. } => "not_converged",
        }
    }

    /// Re-target an experiment-level error at a specific oxide.
    pub fn with_oxide(self, oxide: &str) -> Self {
        let oxide = oxide.to_string();
        match self {
            PairError::MissingRangeRecord { expt, .. } => PairError::MissingRangeRecord { expt, oxide },
            PairError::AmbiguousRangeRecord { expt, count, .. } => {
                PairError::AmbiguousRangeRecord { expt, oxide, count }
            }
            PairError::InvalidRange { expt, min, max, .. } => PairError::InvalidRange { expt, oxide, min, max },
            PairError::InsufficientData { expt, n, required, .. } => {
                PairError::InsufficientData { expt, oxide, n, required }
            }
            PairError::FitDidNotConverge { expt, reason, .. } => PairError::FitDidNotConverge { expt, oxide, reason },
        }
    }
}
