//! In-memory data handling: range windows, row selection, synthetic samples.

pub mod sample;
pub mod window;

pub use sample::*;
pub use window::*;
