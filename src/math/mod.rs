//! Linear-algebra helpers shared by the fitter.

pub mod ols;

pub use ols::*;
