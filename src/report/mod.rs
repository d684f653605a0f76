//! Reporting utilities: formatted tables for training, prediction and the
//! model registry.

pub mod format;

pub use format::*;
