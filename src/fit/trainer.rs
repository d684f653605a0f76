//! Per-specialization model training.
//!
//! For each specialization of the population:
//! encode job labels -> standardize -> stratified split -> fit classifier ->
//! evaluate on the held-out rows -> persist the artifact.
//!
//! Specializations are independent and are trained in parallel. The output
//! lists stay sorted by specialization name.

use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{info, warn};
use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::Serialize;

use crate::domain::{ClassifierKind, Population, TrainConfig};
use crate::error::AppError;
use crate::fit::metrics::{ClassificationReport, classification_report};
use crate::fit::split::stratified_split;
use crate::models::{Classifier, ClassifierModel, LabelEncoder, StandardScaler};
use crate::registry::{ArtifactManifest, SpecializationModelArtifact, save_artifact};

pub const SUMMARY_FILE: &str = "summary.json";

/// A trained specialization before it is written to disk.
#[derive(Debug, Clone)]
pub struct FittedSpecialization {
    pub artifact: SpecializationModelArtifact,
    pub n_samples: usize,
    pub n_train: usize,
    pub evaluation: ClassificationReport,
}

/// A persisted specialization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingOutcome {
    pub specialization: String,
    pub n_samples: usize,
    pub n_classes: usize,
    pub test_accuracy: Option<f64>,
    pub model_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedSpecialization {
    pub specialization: String,
    pub n_samples: usize,
    pub reason: String,
}

/// Result of a full training run; both lists are sorted by specialization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingRun {
    pub classifier_kind: ClassifierKind,
    pub seed: u64,
    pub trained_at: DateTime<Utc>,
    pub trained: Vec<TrainingOutcome>,
    pub skipped: Vec<SkippedSpecialization>,
}

enum Step {
    Trained(TrainingOutcome),
    Skipped(SkippedSpecialization),
}

/// Train and persist one model per specialization, then write `summary.json`.
pub fn train_all(population: &Population, config: &TrainConfig) -> Result<TrainingRun, AppError> {
    if population.feature_names.is_empty() {
        return Err(AppError::new(3, "The population has no features to train on."));
    }

    let specializations: BTreeSet<&str> = population
        .applicants
        .iter()
        .map(|a| a.specialization.as_str())
        .collect();

    let steps: Vec<Step> = specializations
        .into_iter()
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|spec| train_one(population, spec, config))
        .collect::<Result<Vec<Step>, AppError>>()?;

    let mut trained = Vec::new();
    let mut skipped = Vec::new();
    for step in steps {
        match step {
            Step::Trained(t) => trained.push(t),
            Step::Skipped(s) => skipped.push(s),
        }
    }

    let run = TrainingRun {
        classifier_kind: config.classifier,
        seed: config.seed,
        trained_at: Utc::now(),
        trained,
        skipped,
    };
    write_summary(&config.models_dir, &run)?;

    if run.trained.is_empty() {
        return Err(AppError::new(
            3,
            format!(
                "No specialization had at least {} samples; nothing was trained.",
                config.min_samples
            ),
        ));
    }
    Ok(run)
}

fn train_one(population: &Population, specialization: &str, config: &TrainConfig) -> Result<Step, AppError> {
    let n_samples = population.for_specialization(specialization).count();
    if n_samples < config.min_samples {
        let reason = format!("only {n_samples} sample(s), need {}", config.min_samples);
        warn!("Skipping specialization '{specialization}': {reason}.");
        return Ok(Step::Skipped(SkippedSpecialization {
            specialization: specialization.to_string(),
            n_samples,
            reason,
        }));
    }

    let fitted = fit_specialization(population, specialization, config)?;
    let accuracy = fitted.evaluation.accuracy;
    let manifest = ArtifactManifest::new(specialization, config.classifier, n_samples, accuracy);
    let report = render_report(&fitted, config.classifier);
    let model_dir = save_artifact(&config.models_dir, &fitted.artifact, &manifest, &report)?;

    info!(
        "Trained '{specialization}': {} jobs, {n_samples} rows, accuracy {}.",
        fitted.artifact.label_encoder.len(),
        accuracy.map(|a| format!("{a:.3}")).unwrap_or_else(|| "n/a".to_string())
    );

    Ok(Step::Trained(TrainingOutcome {
        specialization: specialization.to_string(),
        n_samples,
        n_classes: fitted.artifact.label_encoder.len(),
        test_accuracy: accuracy,
        model_dir,
    }))
}

/// Fit scaler, encoder and classifier for one specialization in memory.
pub fn fit_specialization(
    population: &Population,
    specialization: &str,
    config: &TrainConfig,
) -> Result<FittedSpecialization, AppError> {
    let rows: Vec<_> = population.for_specialization(specialization).collect();
    let n_features = population.feature_names.len();
    if rows.is_empty() {
        return Err(AppError::new(3, format!("No rows for specialization '{specialization}'.")));
    }

    let encoder = LabelEncoder::fit(rows.iter().map(|a| a.job.as_str()));
    let y = encoder.transform(rows.iter().map(|a| a.job.as_str()))?;

    let x = DMatrix::from_fn(rows.len(), n_features, |i, j| {
        rows[i].traits.get(j).copied().unwrap_or(0.0)
    });
    let scaler = StandardScaler::fit(&x)?;
    let x_scaled = scaler
        .transform_matrix(&x)
        .map_err(|e| AppError::new(4, format!("Scaling '{specialization}' failed: {e}")))?;

    let split = stratified_split(&y, encoder.len(), config.test_fraction, config.seed)?;
    let x_train = x_scaled.select_rows(&split.train);
    let y_train: Vec<usize> = split.train.iter().map(|&i| y[i]).collect();

    let mut classifier = ClassifierModel::new(config.classifier, &config.forest, config.seed);
    classifier.fit(&x_train, &y_train, encoder.len())?;

    let y_test: Vec<usize> = split.test.iter().map(|&i| y[i]).collect();
    let y_pred: Vec<usize> = split
        .test
        .iter()
        .map(|&i| {
            let row: Vec<f64> = x_scaled.row(i).iter().copied().collect();
            classifier.predict_hard_label(&row)
        })
        .collect();
    let evaluation = classification_report(&y_test, &y_pred, encoder.classes());

    Ok(FittedSpecialization {
        artifact: SpecializationModelArtifact {
            specialization: specialization.to_string(),
            classifier,
            scaler,
            label_encoder: encoder,
            feature_order: population.feature_names.clone(),
        },
        n_samples: rows.len(),
        n_train: split.train.len(),
        evaluation,
    })
}

fn render_report(fitted: &FittedSpecialization, kind: ClassifierKind) -> String {
    let accuracy = fitted
        .evaluation
        .accuracy
        .map(|a| format!("{a:.4}"))
        .unwrap_or_else(|| "n/a".to_string());
    format!(
        "Specialization: {}\nClassifier: {}\nSamples: {} (train {}, test {})\nAccuracy: {accuracy}\n\n{}\n",
        fitted.artifact.specialization,
        kind.display_name(),
        fitted.n_samples,
        fitted.n_train,
        fitted.n_samples - fitted.n_train,
        fitted.evaluation,
    )
}

fn write_summary(models_dir: &Path, run: &TrainingRun) -> Result<(), AppError> {
    std::fs::create_dir_all(models_dir).map_err(|e| {
        AppError::new(
            4,
            format!("Failed to create models directory '{}': {e}", models_dir.display()),
        )
    })?;
    let path = models_dir.join(SUMMARY_FILE);
    let file = File::create(&path)
        .map_err(|e| AppError::new(4, format!("Failed to create '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, run)
        .map_err(|e| AppError::new(4, format!("Failed to write training summary: {e}")))
}
