//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - trait-table rows and derived job profiles (`TraitRecord`, `JobTraitProfile`)
//! - the synthetic training population (`Population`, `SyntheticApplicant`)
//! - inference inputs/outputs (`StudentProfile`, `CompatibilityRow`)
//! - run configuration (`TrainConfig`, `PredictConfig`, ...)

pub mod types;

pub use types::*;
