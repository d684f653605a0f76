//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and initializes logging
//! - parses CLI arguments
//! - converts them into explicit config structs
//! - runs the pipeline and prints reports

use clap::Parser;
use log::info;

use crate::cli::{Cli, Command, DataArgs, ModelsArgs, PredictArgs, TrainArgs};
use crate::domain::{ForestConfig, GeneratorConfig, PredictConfig, TrainConfig};
use crate::error::AppError;
use crate::registry::ModelRegistry;

pub mod pipeline;

/// Entry point for the `compat` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();

    let cli = Cli::parse();
    match cli.command {
        Command::Train(args) => handle_train(args),
        Command::Generate(args) => handle_generate(args.data, &args.out),
        Command::Predict(args) => handle_predict(args),
        Command::Models(args) => handle_models(args),
    }
}

fn handle_train(args: TrainArgs) -> Result<(), AppError> {
    let config = train_config_from_args(&args);
    let output = pipeline::run_training(&config)?;

    println!(
        "{}",
        crate::report::format_dataset_summary(&output.data.stats, &output.data.weights, &output.data.population)
    );
    println!("{}", crate::report::format_training_summary(&output.run));
    info!("Models written to '{}'.", config.models_dir.display());
    Ok(())
}

fn handle_generate(data: DataArgs, out: &std::path::Path) -> Result<(), AppError> {
    let generator = generator_config_from_args(&data);
    let prepared = pipeline::run_generate(&data.datasets, &generator, data.seed, out)?;

    println!(
        "{}",
        crate::report::format_dataset_summary(&prepared.stats, &prepared.weights, &prepared.population)
    );
    Ok(())
}

fn handle_predict(args: PredictArgs) -> Result<(), AppError> {
    let config = predict_config_from_args(&args);
    let output = pipeline::run_prediction(&config)?;

    println!("{}", crate::report::format_top_matches(&output.prediction.rows, config.top_n));
    println!("{}", crate::report::format_specialization_summary(&output.summary));

    let diagnostics = crate::report::format_diagnostics(&output.prediction.diagnostics);
    if !diagnostics.is_empty() {
        println!("Scoring warnings:\n{diagnostics}");
    }
    Ok(())
}

fn handle_models(args: ModelsArgs) -> Result<(), AppError> {
    let registry = ModelRegistry::load(&args.models)?;
    println!("{}", crate::report::format_registry(&registry));
    Ok(())
}

pub fn generator_config_from_args(args: &DataArgs) -> GeneratorConfig {
    GeneratorConfig {
        samples_per_job: args.samples_per_job,
        baseline: args.baseline,
        ceiling: args.ceiling,
        noise_scale: args.noise_scale,
        dampening: args.dampening,
        jitter: args.jitter,
    }
}

pub fn train_config_from_args(args: &TrainArgs) -> TrainConfig {
    TrainConfig {
        datasets: args.data.datasets.clone(),
        models_dir: args.models.clone(),
        population_out: args.population_out.clone(),
        seed: args.data.seed,
        generator: generator_config_from_args(&args.data),
        classifier: args.classifier,
        forest: ForestConfig {
            n_trees: args.trees,
            max_depth: args.max_depth,
            ..ForestConfig::default()
        },
        min_samples: args.min_samples,
        test_fraction: args.test_fraction,
    }
}

pub fn predict_config_from_args(args: &PredictArgs) -> PredictConfig {
    PredictConfig {
        models_dir: args.models.clone(),
        source: args.mode,
        profile_path: args.profile.clone(),
        profile_seed: args.profile_seed,
        top_n: args.top,
        export_results: Some(args.out.clone()),
        export_summary: args.summary_out.clone(),
    }
}
