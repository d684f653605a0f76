//! Seeded, stratified train/test split.

use rand::prelude::*;
use rand::rngs::StdRng;

use crate::error::AppError;

/// Row indices of the two halves of a split, each in ascending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Split rows so every class keeps its proportion in both halves.
///
/// Each class contributes `round(count * test_fraction)` test rows, capped at
/// `count - 1` so the class still has a training row.
pub fn stratified_split(y: &[usize], n_classes: usize, test_fraction: f64, seed: u64) -> Result<SplitIndices, AppError> {
    if !(test_fraction.is_finite() && (0.0..1.0).contains(&test_fraction)) {
        return Err(AppError::new(
            2,
            format!("Test fraction must be in [0, 1), got {test_fraction}."),
        ));
    }

    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
    for (row, &class) in y.iter().enumerate() {
        let bucket = by_class
            .get_mut(class)
            .ok_or_else(|| AppError::new(4, format!("Class index {class} out of range.")))?;
        bucket.push(row);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(y.len());
    let mut test = Vec::new();

    for mut rows in by_class {
        if rows.is_empty() {
            continue;
        }
        rows.shuffle(&mut rng);
        let n_test = ((rows.len() as f64 * test_fraction).round() as usize).min(rows.len() - 1);
        test.extend_from_slice(&rows[..n_test]);
        train.extend_from_slice(&rows[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    Ok(SplitIndices { train, test })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_class_proportions() {
        let y: Vec<usize> = (0..100).map(|i| if i < 80 { 0 } else { 1 }).collect();
        let split = stratified_split(&y, 2, 0.2, 7).unwrap();

        assert_eq!(split.test.len(), 20);
        assert_eq!(split.train.len(), 80);
        assert_eq!(split.test.iter().filter(|&&i| y[i] == 1).count(), 4);
    }

    #[test]
    fn every_class_keeps_a_training_row() {
        let y = vec![0, 1, 1];
        let split = stratified_split(&y, 2, 0.9, 1).unwrap();
        assert!(split.train.iter().any(|&i| y[i] == 0));
        assert!(split.train.iter().any(|&i| y[i] == 1));
    }

    #[test]
    fn zero_fraction_gives_empty_test_set() {
        let split = stratified_split(&[0, 0, 1, 1], 2, 0.0, 3).unwrap();
        assert!(split.test.is_empty());
        assert_eq!(split.train, vec![0, 1, 2, 3]);
    }

    #[test]
    fn seeded_and_disjoint() {
        let y: Vec<usize> = (0..40).map(|i| i % 3).collect();
        let a = stratified_split(&y, 3, 0.25, 9).unwrap();
        let b = stratified_split(&y, 3, 0.25, 9).unwrap();
        assert_eq!(a, b);
        assert!(a.test.iter().all(|i| !a.train.contains(i)));
        assert!(stratified_split(&y, 3, 1.0, 9).is_err());
    }
}
