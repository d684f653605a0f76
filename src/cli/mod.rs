//! Command-line parsing for the career compatibility pipeline.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling code. Every flag can also be set through a
//! `COMPAT_*` environment variable (a `.env` file is honored).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{ClassifierKind, ProfileSource};

pub mod prompt;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "compat", version, about = "Student-to-career compatibility scoring")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ingest trait tables, generate a population and train one model per specialization.
    Train(TrainArgs),
    /// Ingest trait tables and export the synthetic population only.
    Generate(GenerateArgs),
    /// Score a student profile against the trained models.
    Predict(PredictArgs),
    /// List the trained models found in the models directory.
    Models(ModelsArgs),
}

/// Input tables and population generation knobs.
#[derive(Debug, Args, Clone)]
pub struct DataArgs {
    /// Trait-weight CSV file, or a directory of them.
    #[arg(long, env = "COMPAT_DATASETS", default_value = "sources/datasets")]
    pub datasets: PathBuf,

    /// Synthetic applicants per (specialization, job).
    #[arg(long, env = "COMPAT_SAMPLES_PER_JOB", default_value_t = 1500)]
    pub samples_per_job: usize,

    /// Random seed for population generation, splitting and training.
    #[arg(long, env = "COMPAT_SEED", default_value_t = 42)]
    pub seed: u64,

    /// Expected trait value when the job does not weight the trait.
    #[arg(long, env = "COMPAT_BASELINE", default_value_t = 0.1)]
    pub baseline: f64,

    /// Expected trait value at full weight.
    #[arg(long, env = "COMPAT_CEILING", default_value_t = 0.95)]
    pub ceiling: f64,

    /// Standard deviation of a trait the job does not weight.
    #[arg(long, env = "COMPAT_NOISE_SCALE", default_value_t = 0.08)]
    pub noise_scale: f64,

    /// Fraction of the noise removed at full weight.
    #[arg(long, env = "COMPAT_DAMPENING", default_value_t = 0.6)]
    pub dampening: f64,

    /// Half-width of the uniform jitter added to every trait.
    #[arg(long, env = "COMPAT_JITTER", default_value_t = 0.03)]
    pub jitter: f64,
}

#[derive(Debug, Args, Clone)]
pub struct TrainArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Directory the specialization models are written to.
    #[arg(long, env = "COMPAT_MODELS", default_value = "sources/model")]
    pub models: PathBuf,

    /// Also export the generated population to this CSV.
    #[arg(long, env = "COMPAT_POPULATION_OUT")]
    pub population_out: Option<PathBuf>,

    /// Classifier family.
    #[arg(long, value_enum, env = "COMPAT_CLASSIFIER", default_value_t = ClassifierKind::Forest)]
    pub classifier: ClassifierKind,

    /// Number of trees in the random forest.
    #[arg(long, env = "COMPAT_TREES", default_value_t = 300)]
    pub trees: usize,

    /// Maximum tree depth (unlimited when omitted).
    #[arg(long, env = "COMPAT_MAX_DEPTH")]
    pub max_depth: Option<usize>,

    /// Specializations with fewer rows are skipped.
    #[arg(long, env = "COMPAT_MIN_SAMPLES", default_value_t = 5)]
    pub min_samples: usize,

    /// Fraction of each job held out for evaluation.
    #[arg(long, env = "COMPAT_TEST_FRACTION", default_value_t = 0.2)]
    pub test_fraction: f64,
}

#[derive(Debug, Args, Clone)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Population CSV to write.
    #[arg(long, env = "COMPAT_POPULATION_OUT", default_value = "sources/data/generated_training_data.csv")]
    pub out: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct PredictArgs {
    /// Directory holding `*_model` folders.
    #[arg(long, env = "COMPAT_MODELS", default_value = "sources/model")]
    pub models: PathBuf,

    /// Where the student profile comes from.
    #[arg(long, value_enum, env = "COMPAT_MODE", default_value_t = ProfileSource::Synthetic)]
    pub mode: ProfileSource,

    /// Profile CSV (`code_or_trait,score`) for `--mode file`.
    #[arg(long, env = "COMPAT_PROFILE")]
    pub profile: Option<PathBuf>,

    /// Seed for `--mode synthetic`.
    #[arg(long, env = "COMPAT_PROFILE_SEED", default_value_t = 7)]
    pub profile_seed: u64,

    /// Number of ranked rows to print.
    #[arg(long, env = "COMPAT_TOP", default_value_t = 15)]
    pub top: usize,

    /// Ranked results CSV.
    #[arg(long, env = "COMPAT_OUT", default_value = "sources/results/predicted_compatibilities.csv")]
    pub out: PathBuf,

    /// Also write the specialization summary CSV.
    #[arg(long, env = "COMPAT_SUMMARY_OUT")]
    pub summary_out: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct ModelsArgs {
    /// Directory holding `*_model` folders.
    #[arg(long, env = "COMPAT_MODELS", default_value = "sources/model")]
    pub models: PathBuf,
}
