//! `diffusion-fit` library crate.
//!
//! The binary (`dfit`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the fitter can be driven from other tools (batch scripts, notebooks)

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
