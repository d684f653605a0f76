//! Classifier capability interface.
//!
//! Not every classifier can produce calibrated probabilities. The trait
//! therefore splits prediction into optional capabilities that the predictor
//! tries from richest to poorest:
//!
//! 1. `predict_class_probabilities`
//! 2. `predict_class_scores` (turned into probabilities with a softmax)
//! 3. `predict_hard_label` (turned into a one-hot vector)

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::domain::{ClassifierKind, ForestConfig};
use crate::error::AppError;
use crate::models::centroid::NearestCentroid;
use crate::models::forest::RandomForest;

pub trait Classifier {
    /// Train on the rows of `x` with labels `y` in `0..n_classes`.
    fn fit(&mut self, x: &DMatrix<f64>, y: &[usize], n_classes: usize) -> Result<(), AppError>;

    /// Number of classes the fitted model distinguishes.
    fn n_classes(&self) -> usize;

    fn predict_class_probabilities(&self, _x: &[f64]) -> Option<Vec<f64>> {
        None
    }

    fn predict_class_scores(&self, _x: &[f64]) -> Option<Vec<f64>> {
        None
    }

    fn predict_hard_label(&self, x: &[f64]) -> usize;
}

/// Every classifier that can be persisted in an artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ClassifierModel {
    Forest(RandomForest),
    Centroid(NearestCentroid),
}

impl ClassifierModel {
    /// An untrained classifier of the requested kind.
    pub fn new(kind: ClassifierKind, forest: &ForestConfig, seed: u64) -> Self {
        match kind {
            ClassifierKind::Forest => ClassifierModel::Forest(RandomForest::new(forest.clone(), seed)),
            ClassifierKind::Centroid => ClassifierModel::Centroid(NearestCentroid::new()),
        }
    }

    pub fn kind(&self) -> ClassifierKind {
        match self {
            ClassifierModel::Forest(_) => ClassifierKind::Forest,
            ClassifierModel::Centroid(_) => ClassifierKind::Centroid,
        }
    }

    /// Reject deserialized models that would panic or never finish when scoring.
    pub fn check_structure(&self) -> Result<(), String> {
        match self {
            ClassifierModel::Forest(m) => m.check_structure(),
            ClassifierModel::Centroid(_) => Ok(()),
        }
    }

    fn inner(&self) -> &dyn Classifier {
        match self {
            ClassifierModel::Forest(m) => m as &dyn Classifier,
            ClassifierModel::Centroid(m) => m as &dyn Classifier,
        }
    }
}

impl Classifier for ClassifierModel {
    fn fit(&mut self, x: &DMatrix<f64>, y: &[usize], n_classes: usize) -> Result<(), AppError> {
        match self {
            ClassifierModel::Forest(m) => m.fit(x, y, n_classes),
            ClassifierModel::Centroid(m) => m.fit(x, y, n_classes),
        }
    }

    fn n_classes(&self) -> usize {
        self.inner().n_classes()
    }

    fn predict_class_probabilities(&self, x: &[f64]) -> Option<Vec<f64>> {
        self.inner().predict_class_probabilities(x)
    }

    fn predict_class_scores(&self, x: &[f64]) -> Option<Vec<f64>> {
        self.inner().predict_class_scores(x)
    }

    fn predict_hard_label(&self, x: &[f64]) -> usize {
        self.inner().predict_hard_label(x)
    }
}
