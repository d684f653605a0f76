//! Compatibility scoring of a student profile against every loaded model.
//!
//! For each specialization:
//!
//! 1. build the input vector in that model's own feature order (absent traits are `0.0`)
//! 2. scale it, falling back to the raw vector when the scaler rejects it
//! 3. obtain class probabilities from the richest capability the classifier offers
//! 4. emit one row per job, as a percentage
//!
//! Rows from all specializations are merged and stably sorted by descending
//! compatibility, so equal scores keep registry order.

use std::fmt;

use log::warn;
use rayon::prelude::*;

use crate::domain::{CompatibilityRow, SpecializationSummary, StudentProfile};
use crate::error::AppError;
use crate::math::{is_probability_vector, mean, round_to, softmax};
use crate::models::{Classifier, StandardScaler};
use crate::registry::{ModelRegistry, SpecializationModelArtifact};

/// Outcome of scaling one input vector.
#[derive(Debug, Clone, PartialEq)]
pub enum ScaledVector {
    Scaled(Vec<f64>),
    /// The scaler refused the vector; the raw values are used instead.
    Unscaled { values: Vec<f64>, reason: String },
}

impl ScaledVector {
    pub fn values(&self) -> &[f64] {
        match self {
            ScaledVector::Scaled(v) => v,
            ScaledVector::Unscaled { values, .. } => values,
        }
    }
}

/// Which classifier capability produced the probabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbabilitySource {
    Native,
    Softmax,
    OneHot,
}

impl fmt::Display for ProbabilitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProbabilitySource::Native => "native",
            ProbabilitySource::Softmax => "softmax",
            ProbabilitySource::OneHot => "one-hot",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScoreStatus {
    Ok,
    Degraded(String),
}

/// How scoring went for one specialization.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecializationDiagnostic {
    pub specialization: String,
    pub status: ScoreStatus,
    pub probability_source: ProbabilitySource,
}

/// Ranked rows plus one diagnostic per specialization (registry order).
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub rows: Vec<CompatibilityRow>,
    pub diagnostics: Vec<SpecializationDiagnostic>,
}

/// Scores profiles against a borrowed registry.
pub struct CompatibilityPredictor<'a> {
    registry: &'a ModelRegistry,
}

impl<'a> CompatibilityPredictor<'a> {
    pub fn new(registry: &'a ModelRegistry) -> Self {
        Self { registry }
    }

    /// Score `profile` against every loaded specialization.
    ///
    /// An empty registry is an error (exit code 3).
    pub fn predict(&self, profile: &StudentProfile) -> Result<Prediction, AppError> {
        if self.registry.is_empty() {
            return Err(AppError::new(
                3,
                "No trained models were found. Run `compat train` first.",
            ));
        }

        let scored: Vec<(Vec<CompatibilityRow>, SpecializationDiagnostic)> = self
            .registry
            .artifacts()
            .par_iter()
            .map(|artifact| score_specialization(artifact, profile))
            .collect();

        let mut rows = Vec::with_capacity(self.registry.total_classes());
        let mut diagnostics = Vec::with_capacity(scored.len());
        for (r, d) in scored {
            rows.extend(r);
            diagnostics.push(d);
        }
        rows.sort_by(|a, b| b.compatibility_percent.total_cmp(&a.compatibility_percent));

        Ok(Prediction { rows, diagnostics })
    }
}

/// Score one specialization.
pub fn score_specialization(
    artifact: &SpecializationModelArtifact,
    profile: &StudentProfile,
) -> (Vec<CompatibilityRow>, SpecializationDiagnostic) {
    let raw = feature_vector(profile, &artifact.feature_order);
    let scaled = scale_vector(&artifact.scaler, raw);
    let status = match &scaled {
        ScaledVector::Scaled(_) => ScoreStatus::Ok,
        ScaledVector::Unscaled { reason, .. } => {
            warn!(
                "Scaling failed for '{}' ({reason}); scoring the unscaled vector.",
                artifact.specialization
            );
            ScoreStatus::Degraded(reason.clone())
        }
    };

    let n_classes = artifact.label_encoder.len();
    let (probs, probability_source) = class_probabilities(&artifact.classifier, scaled.values(), n_classes);

    let rows = artifact
        .label_encoder
        .classes()
        .iter()
        .zip(&probs)
        .map(|(job, p)| CompatibilityRow {
            specialization: artifact.specialization.clone(),
            job: job.clone(),
            compatibility_percent: to_percent(*p),
        })
        .collect();

    (
        rows,
        SpecializationDiagnostic {
            specialization: artifact.specialization.clone(),
            status,
            probability_source,
        },
    )
}

/// Input vector in `feature_order`; traits absent from the profile are `0.0`.
pub fn feature_vector(profile: &StudentProfile, feature_order: &[String]) -> Vec<f64> {
    feature_order
        .iter()
        .map(|f| profile.get(f).copied().unwrap_or(0.0))
        .collect()
}

pub fn scale_vector(scaler: &StandardScaler, raw: Vec<f64>) -> ScaledVector {
    match scaler.transform(&raw) {
        Ok(v) => ScaledVector::Scaled(v),
        Err(e) => ScaledVector::Unscaled {
            values: raw,
            reason: e.to_string(),
        },
    }
}

/// Class probabilities via native probabilities, then softmax of decision
/// scores, then a one-hot vector on the hard label.
///
/// A tier whose output is malformed for `n_classes` is treated as absent. A
/// hard label outside `0..n_classes` yields all zeros.
pub fn class_probabilities<C: Classifier + ?Sized>(
    classifier: &C,
    x: &[f64],
    n_classes: usize,
) -> (Vec<f64>, ProbabilitySource) {
    if let Some(p) = classifier
        .predict_class_probabilities(x)
        .filter(|p| is_probability_vector(p, n_classes))
    {
        return (p, ProbabilitySource::Native);
    }

    if let Some(p) = classifier
        .predict_class_scores(x)
        .filter(|s| s.len() == n_classes)
        .and_then(|s| softmax(&s))
    {
        return (p, ProbabilitySource::Softmax);
    }

    let label = classifier.predict_hard_label(x);
    let mut one_hot = vec![0.0; n_classes];
    if let Some(slot) = one_hot.get_mut(label) {
        *slot = 1.0;
    }
    (one_hot, ProbabilitySource::OneHot)
}

/// Probability to a percentage with three decimals, clamped to `[0, 100]`.
pub fn to_percent(p: f64) -> f64 {
    if !p.is_finite() {
        return 0.0;
    }
    round_to(p * 100.0, 3).clamp(0.0, 100.0)
}

/// Mean compatibility per specialization.
///
/// Groups appear in first-appearance order of `rows`, then are stably sorted
/// by descending mean.
pub fn summarize_by_specialization(rows: &[CompatibilityRow]) -> Vec<SpecializationSummary> {
    let mut groups: Vec<(&str, Vec<f64>)> = Vec::new();
    for row in rows {
        match groups.iter_mut().find(|(s, _)| *s == row.specialization) {
            Some((_, values)) => values.push(row.compatibility_percent),
            None => groups.push((row.specialization.as_str(), vec![row.compatibility_percent])),
        }
    }

    let mut summary: Vec<SpecializationSummary> = groups
        .into_iter()
        .map(|(specialization, values)| SpecializationSummary {
            specialization: specialization.to_string(),
            mean_compatibility_percent: round_to(mean(&values).unwrap_or(0.0), 3),
        })
        .collect();
    summary.sort_by(|a, b| {
        b.mean_compatibility_percent
            .total_cmp(&a.mean_compatibility_percent)
    });
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClassifierKind, ForestConfig};
    use crate::models::{ClassifierModel, LabelEncoder};
    use nalgebra::DMatrix;

    /// Train a small model over `features` with one cluster per job.
    fn artifact(kind: ClassifierKind, spec: &str, jobs: &[&str], features: &[&str]) -> SpecializationModelArtifact {
        let n_features = features.len();
        let mut data = Vec::new();
        let mut y = Vec::new();
        for (class, _) in jobs.iter().enumerate() {
            for k in 0..10 {
                for j in 0..n_features {
                    let hot = j % jobs.len() == class;
                    data.push(if hot { 0.9 } else { 0.1 } + k as f64 * 0.001);
                }
                y.push(class);
            }
        }
        let x = DMatrix::from_row_slice(y.len(), n_features, &data);
        let scaler = StandardScaler::fit(&x).unwrap();
        let forest = ForestConfig {
            n_trees: 10,
            ..ForestConfig::default()
        };
        let mut classifier = ClassifierModel::new(kind, &forest, 1);
        classifier
            .fit(&scaler.transform_matrix(&x).unwrap(), &y, jobs.len())
            .unwrap();
        SpecializationModelArtifact {
            specialization: spec.to_string(),
            classifier,
            scaler,
            label_encoder: LabelEncoder::fit(jobs.iter().copied()),
            feature_order: features.iter().map(|f| f.to_string()).collect(),
        }
    }

    fn two_specializations() -> ModelRegistry {
        ModelRegistry::from_artifacts([
            artifact(ClassifierKind::Forest, "Software", &["Backend", "Frontend"], &["CPE 101", "Design"]),
            artifact(ClassifierKind::Forest, "Networks", &["Admin"], &["CPE 101"]),
        ])
    }

    fn profile(pairs: &[(&str, f64)]) -> StudentProfile {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn small_example_has_one_row_per_job() {
        let registry = two_specializations();
        let prediction = CompatibilityPredictor::new(&registry)
            .predict(&profile(&[("CPE 101", 0.9), ("Design", 0.1)]))
            .unwrap();

        assert_eq!(prediction.rows.len(), 3);
        for spec in ["Software", "Networks"] {
            let total: f64 = prediction
                .rows
                .iter()
                .filter(|r| r.specialization == spec)
                .map(|r| r.compatibility_percent)
                .sum();
            assert!((total - 100.0).abs() < 0.01, "{spec}: {total}");
        }
        assert!(prediction
            .rows
            .iter()
            .all(|r| (0.0..=100.0).contains(&r.compatibility_percent)));
        assert!(prediction
            .diagnostics
            .iter()
            .all(|d| d.status == ScoreStatus::Ok && d.probability_source == ProbabilitySource::Native));
    }

    #[test]
    fn rows_sorted_descending_and_stable() {
        let registry = two_specializations();
        let rows = CompatibilityPredictor::new(&registry)
            .predict(&profile(&[("CPE 101", 0.5)]))
            .unwrap()
            .rows;
        assert!(rows
            .windows(2)
            .all(|w| w[0].compatibility_percent >= w[1].compatibility_percent));

        // Identical models under two names tie on every job; registry order wins.
        let registry = ModelRegistry::from_artifacts([
            artifact(ClassifierKind::Centroid, "Zeta", &["Job"], &["a"]),
            artifact(ClassifierKind::Centroid, "Alpha", &["Job"], &["a"]),
        ]);
        let rows = CompatibilityPredictor::new(&registry)
            .predict(&profile(&[("a", 0.3)]))
            .unwrap()
            .rows;
        let order: Vec<&str> = rows.iter().map(|r| r.specialization.as_str()).collect();
        assert_eq!(order, vec!["Zeta", "Alpha"]);
    }

    #[test]
    fn missing_traits_read_as_zero() {
        let order = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(feature_vector(&profile(&[("b", 0.4), ("z", 1.0)]), &order), vec![0.0, 0.4, 0.0]);

        let registry = two_specializations();
        let prediction = CompatibilityPredictor::new(&registry)
            .predict(&StudentProfile::new())
            .unwrap();
        assert_eq!(prediction.rows.len(), 3);
    }

    #[test]
    fn scaler_mismatch_degrades_but_still_scores() {
        let mut broken = artifact(ClassifierKind::Forest, "Security", &["Analyst", "Auditor"], &["a", "b"]);
        broken.feature_order.push("c".to_string());
        let registry = ModelRegistry::from_artifacts([broken]);

        let prediction = CompatibilityPredictor::new(&registry)
            .predict(&profile(&[("a", 1.0)]))
            .unwrap();
        assert_eq!(prediction.rows.len(), 2);
        assert!(matches!(prediction.diagnostics[0].status, ScoreStatus::Degraded(_)));
    }

    #[test]
    fn centroid_models_use_softmax() {
        let registry = ModelRegistry::from_artifacts([artifact(
            ClassifierKind::Centroid,
            "Data",
            &["Analyst", "Scientist"],
            &["x", "y"],
        )]);
        let prediction = CompatibilityPredictor::new(&registry)
            .predict(&profile(&[("x", 0.9), ("y", 0.1)]))
            .unwrap();
        assert_eq!(prediction.diagnostics[0].probability_source, ProbabilitySource::Softmax);
        assert_eq!(prediction.rows[0].job, "Analyst");
    }

    struct LabelOnly {
        label: usize,
        scores: Option<Vec<f64>>,
    }

    impl Classifier for LabelOnly {
        fn fit(&mut self, _x: &DMatrix<f64>, _y: &[usize], _n: usize) -> Result<(), AppError> {
            Ok(())
        }

        fn n_classes(&self) -> usize {
            3
        }

        fn predict_class_scores(&self, _x: &[f64]) -> Option<Vec<f64>> {
            self.scores.clone()
        }

        fn predict_hard_label(&self, _x: &[f64]) -> usize {
            self.label
        }
    }

    #[test]
    fn falls_back_to_one_hot() {
        let model = LabelOnly { label: 2, scores: None };
        let (p, source) = class_probabilities(&model, &[0.0], 3);
        assert_eq!(source, ProbabilitySource::OneHot);
        assert_eq!(p, vec![0.0, 0.0, 1.0]);

        // Wrong-length scores count as absent.
        let model = LabelOnly {
            label: 0,
            scores: Some(vec![1.0, 2.0]),
        };
        assert_eq!(class_probabilities(&model, &[0.0], 3).1, ProbabilitySource::OneHot);

        let model = LabelOnly {
            label: 0,
            scores: Some(vec![1.0, 2.0, f64::NAN]),
        };
        assert_eq!(class_probabilities(&model, &[0.0], 3).1, ProbabilitySource::OneHot);
    }

    #[test]
    fn empty_registry_is_an_error() {
        let registry = ModelRegistry::default();
        let err = CompatibilityPredictor::new(&registry)
            .predict(&StudentProfile::new())
            .unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn summary_groups_in_first_appearance_order() {
        let rows: Vec<CompatibilityRow> = [("A", 40.0), ("B", 30.0), ("A", 20.0), ("C", 30.0)]
            .iter()
            .map(|(s, p)| CompatibilityRow {
                specialization: s.to_string(),
                job: "j".to_string(),
                compatibility_percent: *p,
            })
            .collect();
        let summary = summarize_by_specialization(&rows);
        let names: Vec<&str> = summary.iter().map(|s| s.specialization.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(summary[0].mean_compatibility_percent, 30.0);
    }

    #[test]
    fn percent_is_rounded_and_clamped() {
        assert_eq!(to_percent(0.123456), 12.346);
        assert_eq!(to_percent(1.2), 100.0);
        assert_eq!(to_percent(-0.1), 0.0);
        assert_eq!(to_percent(f64::NAN), 0.0);
    }
}
