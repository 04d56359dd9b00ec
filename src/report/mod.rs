//! Reporting utilities: run summaries and result tables for the terminal.

pub mod format;

pub use format::*;
