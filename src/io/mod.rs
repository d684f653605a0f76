//! Input/output helpers.
//!
//! - trait-table CSV ingest + validation (`ingest`)
//! - result, population and summary CSV exports (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
