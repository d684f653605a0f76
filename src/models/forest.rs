//! Class-balanced random forest of CART trees.
//!
//! Each tree is grown on a bootstrap sample, considering a random subset of
//! `sqrt(n_features)` features at every split and choosing the threshold
//! that minimizes weighted Gini impurity. Samples are weighted by
//! `n / (k * count_c)` so rare jobs count as much as common ones.
//!
//! Trees are independent and are built in parallel; every tree draws from
//! its own RNG seeded from `(seed, tree index)`, so the forest is identical
//! regardless of thread scheduling.

use nalgebra::DMatrix;
use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::ForestConfig;
use crate::error::AppError;
use crate::math::argmax;
use crate::models::classifier::Classifier;

/// Minimum impurity decrease for a split to be kept.
const MIN_GAIN: f64 = 1e-12;

/// A fitted (or not yet fitted) random forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    config: ForestConfig,
    seed: u64,
    n_classes: usize,
    n_features: usize,
    trees: Vec<DecisionTree>,
}

/// A single CART tree stored as a flat node list (root at index 0).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Node {
    /// Normalized (weighted) class distribution of the training rows that reached the leaf.
    Leaf { distribution: Vec<f64> },
    /// `x[feature] <= threshold` goes left.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

impl RandomForest {
    pub fn new(config: ForestConfig, seed: u64) -> Self {
        Self {
            config,
            seed,
            n_classes: 0,
            n_features: 0,
            trees: Vec::new(),
        }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Check that every tree can be walked for any input.
    ///
    /// Trees are non-empty, children point forward (strictly past their
    /// parent) and in range, and leaves hold `n_classes` values.
    pub fn check_structure(&self) -> Result<(), String> {
        for (t, tree) in self.trees.iter().enumerate() {
            tree.check_structure(self.n_classes)
                .map_err(|reason| format!("tree {t}: {reason}"))?;
        }
        Ok(())
    }
}

impl Classifier for RandomForest {
    fn fit(&mut self, x: &DMatrix<f64>, y: &[usize], n_classes: usize) -> Result<(), AppError> {
        validate_training_set(x, y, n_classes)?;
        if self.config.n_trees == 0 {
            return Err(AppError::new(2, "A random forest needs at least one tree."));
        }

        let n_features = x.ncols();
        let class_weights = balanced_class_weights(y, n_classes);
        let builder = TreeBuilder {
            x,
            y,
            class_weights: &class_weights,
            n_classes,
            max_features: ((n_features as f64).sqrt() as usize).clamp(1, n_features.max(1)),
            max_depth: self.config.max_depth,
            min_samples_split: self.config.min_samples_split.max(2),
        };

        let n = x.nrows();
        let seed = self.seed;
        let trees: Vec<DecisionTree> = (0..self.config.n_trees)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(tree_seed(seed, t));
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                builder.build(bootstrap, &mut rng)
            })
            .collect();

        self.trees = trees;
        self.n_classes = n_classes;
        self.n_features = n_features;
        Ok(())
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn predict_class_probabilities(&self, x: &[f64]) -> Option<Vec<f64>> {
        if self.trees.is_empty() || self.n_classes == 0 {
            return None;
        }
        let mut probs = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (p, d) in probs.iter_mut().zip(tree.leaf_distribution(x)) {
                *p += d;
            }
        }
        let n_trees = self.trees.len() as f64;
        probs.iter_mut().for_each(|p| *p /= n_trees);
        Some(probs)
    }

    fn predict_hard_label(&self, x: &[f64]) -> usize {
        self.predict_class_probabilities(x)
            .and_then(|p| argmax(&p))
            .unwrap_or(0)
    }
}

impl DecisionTree {
    /// Walk the tree for `x`. Missing feature positions read as `0.0`.
    fn leaf_distribution(&self, x: &[f64]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { distribution } => return distribution,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let v = x.get(*feature).copied().unwrap_or(0.0);
                    idx = if v <= *threshold { *left } else { *right };
                }
            }
        }
    }

    fn check_structure(&self, n_classes: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("no nodes".to_string());
        }
        let n_nodes = self.nodes.len();
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Leaf { distribution } if distribution.len() != n_classes => {
                    return Err(format!(
                        "leaf {idx} has {} values, expected {n_classes}",
                        distribution.len()
                    ));
                }
                Node::Leaf { .. } => {}
                Node::Split { left, right, .. } => {
                    for child in [*left, *right] {
                        if child <= idx || child >= n_nodes {
                            return Err(format!("node {idx} points to invalid child {child}"));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

/// `n / (k * count_c)` per class; absent classes get weight 0.
pub fn balanced_class_weights(y: &[usize], n_classes: usize) -> Vec<f64> {
    let mut counts = vec![0usize; n_classes];
    for &c in y {
        counts[c] += 1;
    }
    let n = y.len() as f64;
    counts
        .iter()
        .map(|&c| if c == 0 { 0.0 } else { n / (n_classes as f64 * c as f64) })
        .collect()
}

pub(crate) fn validate_training_set(x: &DMatrix<f64>, y: &[usize], n_classes: usize) -> Result<(), AppError> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(AppError::new(4, "Cannot train on an empty feature matrix."));
    }
    if x.nrows() != y.len() {
        return Err(AppError::new(
            4,
            format!("Feature rows ({}) != labels ({}).", x.nrows(), y.len()),
        ));
    }
    if n_classes == 0 || y.iter().any(|&c| c >= n_classes) {
        return Err(AppError::new(4, "Class labels out of range."));
    }
    Ok(())
}

fn tree_seed(seed: u64, tree: usize) -> u64 {
    seed ^ (tree as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

fn gini(counts: &[f64], total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    1.0 - counts.iter().map(|c| (c / total) * (c / total)).sum::<f64>()
}

struct TreeBuilder<'a> {
    x: &'a DMatrix<f64>,
    y: &'a [usize],
    class_weights: &'a [f64],
    n_classes: usize,
    max_features: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
}

struct Pending {
    node: usize,
    samples: Vec<usize>,
    depth: usize,
}

struct SplitChoice {
    feature: usize,
    threshold: f64,
}

impl TreeBuilder<'_> {
    fn build(&self, samples: Vec<usize>, rng: &mut StdRng) -> DecisionTree {
        let mut nodes = vec![Node::Leaf {
            distribution: Vec::new(),
        }];
        let mut stack = vec![Pending {
            node: 0,
            samples,
            depth: 0,
        }];

        while let Some(Pending { node, samples, depth }) = stack.pop() {
            let counts = self.weighted_counts(&samples);

            let split = if self.should_stop(&samples, &counts, depth) {
                None
            } else {
                self.find_split(&samples, &counts, rng)
            };

            let Some(SplitChoice { feature, threshold }) = split else {
                nodes[node] = Node::Leaf {
                    distribution: normalized(&counts),
                };
                continue;
            };

            let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = samples
                .into_iter()
                .partition(|&i| self.x[(i, feature)] <= threshold);

            let left = nodes.len();
            let right = left + 1;
            nodes.push(Node::Leaf { distribution: Vec::new() });
            nodes.push(Node::Leaf { distribution: Vec::new() });
            nodes[node] = Node::Split {
                feature,
                threshold,
                left,
                right,
            };

            stack.push(Pending {
                node: right,
                samples: right_samples,
                depth: depth + 1,
            });
            stack.push(Pending {
                node: left,
                samples: left_samples,
                depth: depth + 1,
            });
        }

        DecisionTree { nodes }
    }

    fn weighted_counts(&self, samples: &[usize]) -> Vec<f64> {
        let mut counts = vec![0.0; self.n_classes];
        for &i in samples {
            let c = self.y[i];
            counts[c] += self.class_weights[c];
        }
        counts
    }

    fn should_stop(&self, samples: &[usize], counts: &[f64], depth: usize) -> bool {
        let non_empty = counts.iter().filter(|c| **c > 0.0).count();
        non_empty <= 1
            || samples.len() < self.min_samples_split
            || self.max_depth.is_some_and(|d| depth >= d)
    }

    fn find_split(&self, samples: &[usize], counts: &[f64], rng: &mut StdRng) -> Option<SplitChoice> {
        let total: f64 = counts.iter().sum();
        let parent = gini(counts, total);
        let candidates = rand::seq::index::sample(rng, self.x.ncols(), self.max_features);

        let mut best: Option<(SplitChoice, f64)> = None;
        let mut column: Vec<(f64, usize)> = Vec::with_capacity(samples.len());
        let mut left = vec![0.0; self.n_classes];
        let mut right = vec![0.0; self.n_classes];

        for feature in candidates.iter() {
            column.clear();
            column.extend(samples.iter().map(|&i| (self.x[(i, feature)], self.y[i])));
            column.sort_by(|a, b| a.0.total_cmp(&b.0));

            left.iter_mut().for_each(|c| *c = 0.0);
            let mut left_total = 0.0;

            for pos in 0..column.len().saturating_sub(1) {
                let (value, class) = column[pos];
                let w = self.class_weights[class];
                left[class] += w;
                left_total += w;

                let next = column[pos + 1].0;
                if next <= value {
                    continue;
                }

                let right_total = total - left_total;
                for c in 0..self.n_classes {
                    right[c] = counts[c] - left[c];
                }
                let impurity = (left_total * gini(&left, left_total) + right_total * gini(&right, right_total)) / total;

                if impurity < parent - MIN_GAIN && best.as_ref().is_none_or(|(_, b)| impurity < *b) {
                    let mid = value + (next - value) / 2.0;
                    let threshold = if mid < next { mid } else { value };
                    best = Some((SplitChoice { feature, threshold }, impurity));
                }
            }
        }

        best.map(|(choice, _)| choice)
    }
}

fn normalized(counts: &[f64]) -> Vec<f64> {
    let total: f64 = counts.iter().sum();
    if total <= 0.0 {
        let k = counts.len().max(1) as f64;
        return vec![1.0 / k; counts.len()];
    }
    counts.iter().map(|c| c / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two well-separated clusters on feature 0, noise on feature 1.
    fn toy_data() -> (DMatrix<f64>, Vec<usize>) {
        let mut rows = Vec::new();
        let mut y = Vec::new();
        for i in 0..30 {
            let jitter = (i as f64) / 300.0;
            rows.extend_from_slice(&[0.1 + jitter, 0.5 - jitter]);
            y.push(0);
            rows.extend_from_slice(&[0.9 - jitter, 0.5 + jitter]);
            y.push(1);
        }
        (DMatrix::from_row_slice(60, 2, &rows), y)
    }

    fn small_forest(seed: u64) -> RandomForest {
        RandomForest::new(
            ForestConfig {
                n_trees: 15,
                max_depth: None,
                min_samples_split: 2,
            },
            seed,
        )
    }

    #[test]
    fn separates_clusters_with_valid_probabilities() {
        let (x, y) = toy_data();
        let mut forest = small_forest(3);
        forest.fit(&x, &y, 2).unwrap();
        assert_eq!(forest.n_trees(), 15);

        let low = forest.predict_class_probabilities(&[0.12, 0.5]).unwrap();
        let high = forest.predict_class_probabilities(&[0.88, 0.5]).unwrap();
        assert!((low.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(low[0] > 0.5);
        assert!(high[1] > 0.5);
        assert_eq!(forest.predict_hard_label(&[0.88, 0.5]), 1);
    }

    #[test]
    fn same_seed_same_forest() {
        let (x, y) = toy_data();
        let mut a = small_forest(11);
        let mut b = small_forest(11);
        a.fit(&x, &y, 2).unwrap();
        b.fit(&x, &y, 2).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn max_depth_is_respected() {
        let (x, y) = toy_data();
        let mut forest = RandomForest::new(
            ForestConfig {
                n_trees: 5,
                max_depth: Some(1),
                min_samples_split: 2,
            },
            0,
        );
        forest.fit(&x, &y, 2).unwrap();
        assert!(forest.trees.iter().all(|t| t.depth() <= 1));
    }

    #[test]
    fn short_input_vectors_do_not_panic() {
        let (x, y) = toy_data();
        let mut forest = small_forest(5);
        forest.fit(&x, &y, 2).unwrap();
        let probs = forest.predict_class_probabilities(&[]).unwrap();
        assert_eq!(probs.len(), 2);
    }

    #[test]
    fn balanced_weights_upweight_rare_classes() {
        let w = balanced_class_weights(&[0, 0, 0, 1], 2);
        assert!((w[0] - 4.0 / 6.0).abs() < 1e-12);
        assert!((w[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn fitted_forest_passes_structure_check() {
        let (x, y) = toy_data();
        let mut forest = small_forest(2);
        forest.fit(&x, &y, 2).unwrap();
        assert_eq!(forest.check_structure(), Ok(()));
    }

    #[test]
    fn structure_check_rejects_unwalkable_trees() {
        let leaf = |n: usize| Node::Leaf {
            distribution: vec![1.0 / n as f64; n],
        };
        let split = |left, right| Node::Split {
            feature: 0,
            threshold: 0.5,
            left,
            right,
        };
        let forest_with = |nodes: Vec<Node>| RandomForest {
            config: ForestConfig::default(),
            seed: 0,
            n_classes: 2,
            n_features: 1,
            trees: vec![DecisionTree { nodes }],
        };

        assert!(forest_with(vec![split(1, 2), leaf(2), leaf(2)]).check_structure().is_ok());
        // Out of range.
        assert!(forest_with(vec![split(7, 8)]).check_structure().is_err());
        // Cycle back to the root.
        assert!(forest_with(vec![split(1, 2), split(0, 2), leaf(2)]).check_structure().is_err());
        assert!(forest_with(vec![]).check_structure().is_err());
        // Leaf width differs from the class count.
        assert!(forest_with(vec![split(1, 2), leaf(3), leaf(2)]).check_structure().is_err());
    }

    #[test]
    fn rejects_mismatched_labels() {
        let (x, _) = toy_data();
        let mut forest = small_forest(0);
        assert!(forest.fit(&x, &[0, 1], 2).is_err());
    }
}
