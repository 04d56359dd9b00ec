//! Profile fitting.
//!
//! Responsibilities:
//!
//! - choose starting points (primary guess + fallback grid)
//! - run Levenberg–Marquardt per start (fallbacks in parallel)
//! - derive standard errors and fit quality at the solution

pub mod fitter;
pub mod starts;

pub use fitter::*;
pub use starts::*;
