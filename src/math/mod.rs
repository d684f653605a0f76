//! Numeric helpers shared by training and inference.

pub mod stats;

pub use stats::*;
