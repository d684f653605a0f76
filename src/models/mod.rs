//! Trainable model components.
//!
//! A specialization model is a triple of scaler, label encoder and classifier.
//! Each piece is a plain serde-serializable struct so it can be persisted as
//! JSON and reloaded for inference.

pub mod centroid;
pub mod classifier;
pub mod encoder;
pub mod forest;
pub mod scaler;

pub use centroid::NearestCentroid;
pub use classifier::{Classifier, ClassifierModel};
pub use encoder::LabelEncoder;
pub use forest::RandomForest;
pub use scaler::{ScaleError, StandardScaler};
