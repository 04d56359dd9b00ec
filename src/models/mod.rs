//! Diffusion profile model.
//!
//! The model is a pair of small, pure functions so the fitter and the plotting
//! code can share it without carrying state.

pub mod model;

pub use model::*;
