//! Per-feature standardization (zero mean, unit variance).

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Why a vector could not be scaled.
#[derive(Debug, Clone, PartialEq)]
pub enum ScaleError {
    ShapeMismatch { expected: usize, actual: usize },
}

impl std::fmt::Display for ScaleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScaleError::ShapeMismatch { expected, actual } => {
                write!(f, "scaler expects {expected} features, got {actual}")
            }
        }
    }
}

impl std::error::Error for ScaleError {}

/// Fitted standard scaler.
///
/// Uses the population standard deviation; constant columns get a scale of
/// `1.0` so they map to zero instead of dividing by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit on the rows of `x`.
    pub fn fit(x: &DMatrix<f64>) -> Result<Self, AppError> {
        let n = x.nrows();
        if n == 0 {
            return Err(AppError::new(4, "Cannot fit a scaler on zero rows."));
        }

        let mut mean = Vec::with_capacity(x.ncols());
        let mut scale = Vec::with_capacity(x.ncols());
        for col in x.column_iter() {
            let m = col.iter().sum::<f64>() / n as f64;
            let var = col.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / n as f64;
            let sd = var.sqrt();
            mean.push(m);
            scale.push(if sd.is_finite() && sd > 1e-12 { sd } else { 1.0 });
        }

        Ok(Self { mean, scale })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Scale a single feature vector.
    pub fn transform(&self, x: &[f64]) -> Result<Vec<f64>, ScaleError> {
        if x.len() != self.mean.len() {
            return Err(ScaleError::ShapeMismatch {
                expected: self.mean.len(),
                actual: x.len(),
            });
        }
        Ok(x.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(v, (m, s))| (v - m) / s)
            .collect())
    }

    /// Scale every row of a matrix.
    pub fn transform_matrix(&self, x: &DMatrix<f64>) -> Result<DMatrix<f64>, ScaleError> {
        if x.ncols() != self.mean.len() {
            return Err(ScaleError::ShapeMismatch {
                expected: self.mean.len(),
                actual: x.ncols(),
            });
        }
        Ok(DMatrix::from_fn(x.nrows(), x.ncols(), |i, j| {
            (x[(i, j)] - self.mean[j]) / self.scale[j]
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standardizes_columns() {
        let x = DMatrix::from_row_slice(4, 2, &[1.0, 5.0, 2.0, 5.0, 3.0, 5.0, 4.0, 5.0]);
        let scaler = StandardScaler::fit(&x).unwrap();
        let z = scaler.transform_matrix(&x).unwrap();

        let col0: Vec<f64> = z.column(0).iter().copied().collect();
        let mean0 = col0.iter().sum::<f64>() / 4.0;
        let var0 = col0.iter().map(|v| v * v).sum::<f64>() / 4.0;
        assert!(mean0.abs() < 1e-12);
        assert!((var0 - 1.0).abs() < 1e-12);

        // Constant column maps to zero.
        assert!(z.column(1).iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn shape_mismatch_is_reported() {
        let x = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 1.0, 0.0]);
        let scaler = StandardScaler::fit(&x).unwrap();
        assert_eq!(
            scaler.transform(&[0.5]),
            Err(ScaleError::ShapeMismatch { expected: 2, actual: 1 })
        );
        assert_eq!(scaler.transform(&[0.5, 0.5]).unwrap(), vec![0.0, 0.0]);
    }
}
