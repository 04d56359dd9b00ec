//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - loaded inputs (`ProfileRow`, `RangeRecord`)
//! - per-pair fit data and outputs (`ProfileSeries`, `ProfileFit`, `PairResult`)
//! - the result table builder and the run configuration (`RunConfig`)

pub mod types;

pub use types::*;
