//! Nearest-centroid classifier.
//!
//! Much cheaper than a forest and useful as a baseline. It only exposes
//! decision scores (negative squared distance to each class centroid), so the
//! predictor turns its output into probabilities with a softmax.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::math::argmax;
use crate::models::classifier::Classifier;
use crate::models::forest::validate_training_set;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NearestCentroid {
    centroids: Vec<Vec<f64>>,
}

impl NearestCentroid {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Classifier for NearestCentroid {
    fn fit(&mut self, x: &DMatrix<f64>, y: &[usize], n_classes: usize) -> Result<(), AppError> {
        validate_training_set(x, y, n_classes)?;

        let mut sums = vec![vec![0.0; x.ncols()]; n_classes];
        let mut counts = vec![0usize; n_classes];
        for (i, &class) in y.iter().enumerate() {
            counts[class] += 1;
            for (j, s) in sums[class].iter_mut().enumerate() {
                *s += x[(i, j)];
            }
        }

        if let Some(empty) = counts.iter().position(|&c| c == 0) {
            return Err(AppError::new(4, format!("Class {empty} has no training rows.")));
        }

        self.centroids = sums
            .into_iter()
            .zip(counts)
            .map(|(sum, count)| sum.into_iter().map(|s| s / count as f64).collect())
            .collect();
        Ok(())
    }

    fn n_classes(&self) -> usize {
        self.centroids.len()
    }

    fn predict_class_scores(&self, x: &[f64]) -> Option<Vec<f64>> {
        if self.centroids.is_empty() {
            return None;
        }
        Some(
            self.centroids
                .iter()
                .map(|c| {
                    -c.iter()
                        .enumerate()
                        .map(|(j, m)| {
                            let d = x.get(j).copied().unwrap_or(0.0) - m;
                            d * d
                        })
                        .sum::<f64>()
                })
                .collect(),
        )
    }

    fn predict_hard_label(&self, x: &[f64]) -> usize {
        self.predict_class_scores(x)
            .and_then(|s| argmax(&s))
            .unwrap_or(0)
    }
}
