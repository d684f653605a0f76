//! Shared pipeline logic used by every subcommand.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! ingest -> weight map -> population -> train -> persist, and
//! registry -> profile -> score -> export.
//!
//! The `app` module then only has to deal with presentation.

use std::path::Path;

use log::info;

use crate::cli::prompt::prompt_profile_stdin;
use crate::data::{WeightMap, build_job_trait_map, generate_population, read_profile_csv, synthetic_profile};
use crate::domain::{GeneratorConfig, Population, PredictConfig, ProfileSource, SpecializationSummary, StudentProfile, TrainConfig};
use crate::error::AppError;
use crate::fit::{TrainingRun, train_all};
use crate::io::export::{write_population_csv, write_results_csv, write_summary_csv};
use crate::io::ingest::{IngestStats, load_trait_tables};
use crate::predict::{CompatibilityPredictor, Prediction, summarize_by_specialization};
use crate::registry::ModelRegistry;

/// Ingested tables turned into a training population.
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub stats: IngestStats,
    pub weights: WeightMap,
    pub population: Population,
}

/// All computed outputs of a `compat train` run.
#[derive(Debug, Clone)]
pub struct TrainingOutput {
    pub data: PreparedData,
    pub run: TrainingRun,
}

/// All computed outputs of a `compat predict` run.
#[derive(Debug, Clone)]
pub struct PredictionOutput {
    pub prediction: Prediction,
    pub summary: Vec<SpecializationSummary>,
}

/// Ingest the trait tables and generate the synthetic population.
pub fn prepare_population(datasets: &Path, generator: &GeneratorConfig, seed: u64) -> Result<PreparedData, AppError> {
    let tables = load_trait_tables(datasets)?;
    let weights = build_job_trait_map(&tables.records);
    if weights.profiles.is_empty() {
        return Err(AppError::new(3, "No (specialization, job) groups found in the trait tables."));
    }
    info!(
        "Mapped {} job(s) across {} specialization(s) over {} trait(s).",
        weights.job_count(),
        weights.specializations.len(),
        weights.all_traits.len()
    );

    let population = generate_population(&weights, generator, seed)?;
    Ok(PreparedData {
        stats: tables.stats,
        weights,
        population,
    })
}

/// Generate the population and write it to `out`.
pub fn run_generate(datasets: &Path, generator: &GeneratorConfig, seed: u64, out: &Path) -> Result<PreparedData, AppError> {
    let data = prepare_population(datasets, generator, seed)?;
    write_population_csv(out, &data.population)?;
    Ok(data)
}

/// Execute the full training pipeline.
pub fn run_training(config: &TrainConfig) -> Result<TrainingOutput, AppError> {
    let data = prepare_population(&config.datasets, &config.generator, config.seed)?;
    if let Some(path) = &config.population_out {
        write_population_csv(path, &data.population)?;
    }
    let run = train_all(&data.population, config)?;
    Ok(TrainingOutput { data, run })
}

/// Load the registry, obtain a profile and score it.
pub fn run_prediction(config: &PredictConfig) -> Result<PredictionOutput, AppError> {
    let registry = ModelRegistry::load(&config.models_dir)?;
    if registry.is_empty() {
        return Err(AppError::new(
            3,
            format!(
                "No usable models in '{}'. Run `compat train` first.",
                config.models_dir.display()
            ),
        ));
    }
    let profile = load_profile(config, &registry)?;
    predict_and_export(&registry, &profile, config)
}

/// Obtain the student profile for the configured source.
pub fn load_profile(config: &PredictConfig, registry: &ModelRegistry) -> Result<StudentProfile, AppError> {
    let features = registry.feature_union();
    match config.source {
        ProfileSource::Synthetic => synthetic_profile(&features, config.profile_seed),
        ProfileSource::Interactive => prompt_profile_stdin(&features),
        ProfileSource::File => {
            let path = config
                .profile_path
                .as_deref()
                .ok_or_else(|| AppError::new(2, "`--mode file` needs `--profile <file.csv>`."))?;
            read_profile_csv(path)
        }
    }
}

/// Score `profile` and write the configured exports.
pub fn predict_and_export(
    registry: &ModelRegistry,
    profile: &StudentProfile,
    config: &PredictConfig,
) -> Result<PredictionOutput, AppError> {
    let prediction = CompatibilityPredictor::new(registry).predict(profile)?;
    let summary = summarize_by_specialization(&prediction.rows);

    if let Some(path) = &config.export_results {
        write_results_csv(path, &prediction.rows)?;
    }
    if let Some(path) = &config.export_summary {
        write_summary_csv(path, &summary)?;
    }

    Ok(PredictionOutput { prediction, summary })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClassifierKind, ForestConfig};
    use std::fs;
    use tempfile::TempDir;

    const TABLE: &str = "\
specialization,job,type,code_or_trait,weight
Software Engineering,Backend Developer,course,CPE 101,5
Software Engineering,Backend Developer,trait,Problem Solving,4
Software Engineering,Frontend Developer,trait,Creativity,5
Software Engineering,Frontend Developer,course,CPE 101,1
Networks,Network Administrator,course,ECE 210,3
Networks,Network Administrator,trait,Problem Solving,2
";

    fn train_config(root: &Path, kind: ClassifierKind) -> TrainConfig {
        TrainConfig {
            datasets: root.join("datasets"),
            models_dir: root.join("model"),
            population_out: Some(root.join("data/population.csv")),
            seed: 42,
            generator: GeneratorConfig {
                samples_per_job: 60,
                ..GeneratorConfig::default()
            },
            classifier: kind,
            forest: ForestConfig {
                n_trees: 25,
                ..ForestConfig::default()
            },
            min_samples: 5,
            test_fraction: 0.2,
        }
    }

    fn predict_config(root: &Path, source: ProfileSource) -> PredictConfig {
        PredictConfig {
            models_dir: root.join("model"),
            source,
            profile_path: None,
            profile_seed: 7,
            top_n: 15,
            export_results: Some(root.join("results/predicted_compatibilities.csv")),
            export_summary: Some(root.join("results/summary.csv")),
        }
    }

    fn write_table(root: &Path) {
        fs::create_dir_all(root.join("datasets")).unwrap();
        fs::write(root.join("datasets/jobs.csv"), TABLE).unwrap();
    }

    #[test]
    fn train_then_predict_end_to_end() {
        let tmp = TempDir::new().unwrap();
        write_table(tmp.path());

        let trained = run_training(&train_config(tmp.path(), ClassifierKind::Forest)).unwrap();
        assert_eq!(trained.run.trained.len(), 2);
        assert_eq!(trained.data.population.applicants.len(), 180);
        assert!(tmp.path().join("data/population.csv").is_file());
        assert!(tmp.path().join("model/Software_Engineering_model/features.txt").is_file());

        let config = predict_config(tmp.path(), ProfileSource::Synthetic);
        let output = run_prediction(&config).unwrap();
        let rows = &output.prediction.rows;

        // Three jobs in total; each specialization's percentages sum to ~100.
        assert_eq!(rows.len(), 3);
        for spec in ["Software Engineering", "Networks"] {
            let total: f64 = rows
                .iter()
                .filter(|r| r.specialization == spec)
                .map(|r| r.compatibility_percent)
                .sum();
            assert!((total - 100.0).abs() < 0.01, "{spec}: {total}");
        }
        assert_eq!(output.summary.len(), 2);
        assert_eq!(output.summary[0].specialization, "Networks");

        let csv = fs::read_to_string(tmp.path().join("results/predicted_compatibilities.csv")).unwrap();
        assert_eq!(csv.lines().count(), 4);
        assert!(tmp.path().join("results/summary.csv").is_file());
    }

    #[test]
    fn file_profile_prefers_matching_job() {
        let tmp = TempDir::new().unwrap();
        write_table(tmp.path());
        run_training(&train_config(tmp.path(), ClassifierKind::Centroid)).unwrap();

        let profile_path = tmp.path().join("me.csv");
        fs::write(
            &profile_path,
            "code_or_trait,score\nCPE 101,95\nProblem Solving,0.9\nCreativity,0.1\n",
        )
        .unwrap();
        let mut config = predict_config(tmp.path(), ProfileSource::File);
        config.profile_path = Some(profile_path);

        let output = run_prediction(&config).unwrap();
        let backend = output
            .prediction
            .rows
            .iter()
            .find(|r| r.job == "Backend Developer")
            .unwrap();
        let frontend = output
            .prediction
            .rows
            .iter()
            .find(|r| r.job == "Frontend Developer")
            .unwrap();
        assert!(backend.compatibility_percent > frontend.compatibility_percent);
    }

    #[test]
    fn same_seed_same_population_bytes() {
        let tmp = TempDir::new().unwrap();
        write_table(tmp.path());
        let generator = GeneratorConfig {
            samples_per_job: 20,
            ..GeneratorConfig::default()
        };
        let datasets = tmp.path().join("datasets");
        run_generate(&datasets, &generator, 9, &tmp.path().join("a.csv")).unwrap();
        run_generate(&datasets, &generator, 9, &tmp.path().join("b.csv")).unwrap();
        assert_eq!(
            fs::read(tmp.path().join("a.csv")).unwrap(),
            fs::read(tmp.path().join("b.csv")).unwrap()
        );
    }

    #[test]
    fn missing_models_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let err = run_prediction(&predict_config(tmp.path(), ProfileSource::Synthetic)).unwrap_err();
        assert_eq!(err.exit_code(), 3);

        write_table(tmp.path());
        run_training(&train_config(tmp.path(), ClassifierKind::Centroid)).unwrap();
        let err = run_prediction(&predict_config(tmp.path(), ProfileSource::File)).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
