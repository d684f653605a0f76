//! Model training.
//!
//! Responsibilities:
//!
//! - stratified train/test split (`split`)
//! - held-out evaluation metrics (`metrics`)
//! - per-specialization training and persistence (`trainer`)

pub mod metrics;
pub mod split;
pub mod trainer;

pub use metrics::*;
pub use split::*;
pub use trainer::*;
