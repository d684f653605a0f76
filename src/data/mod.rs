//! Training data preparation.
//!
//! - trait weight normalization (`weights`)
//! - synthetic applicant population (`sample`)
//! - student profile sources for inference (`profile`)

pub mod profile;
pub mod sample;
pub mod weights;

pub use profile::*;
pub use sample::*;
pub use weights::*;
