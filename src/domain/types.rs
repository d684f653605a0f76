//! Shared domain types.
//!
//! These types are intentionally kept lightweight so they can be:
//!
//! - passed between pipeline stages without conversion
//! - exported to CSV/JSON
//! - reloaded later for inference

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// What a trait-table row describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraitKind {
    /// A course identifier (e.g. `CPE 101`).
    Course,
    /// A skill or personality descriptor.
    Trait,
}

impl TraitKind {
    /// Parse the `type` column. Only `course` is special; everything else is a trait.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("course") {
            TraitKind::Course
        } else {
            TraitKind::Trait
        }
    }
}

/// One row of a trait-weight table.
#[derive(Debug, Clone, PartialEq)]
pub struct TraitRecord {
    pub specialization: String,
    pub job: String,
    pub kind: TraitKind,
    pub code_or_trait: String,
    /// Non-negative weight (invalid input has already been coerced to `0.0`).
    pub weight: f64,
}

/// `(specialization, job)` pair. Ordering is lexicographic on both fields.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JobKey {
    pub specialization: String,
    pub job: String,
}

impl JobKey {
    pub fn new(specialization: impl Into<String>, job: impl Into<String>) -> Self {
        Self {
            specialization: specialization.into(),
            job: job.into(),
        }
    }
}

/// Normalized trait weights for one job.
///
/// The largest weight is `1.0` unless every weight is zero.
#[derive(Debug, Clone, PartialEq)]
pub struct JobTraitProfile {
    pub key: JobKey,
    pub weights: BTreeMap<String, f64>,
}

impl JobTraitProfile {
    /// Weight for a trait code, `0.0` when the job does not mention it.
    pub fn weight(&self, code: &str) -> f64 {
        self.weights.get(code).copied().unwrap_or(0.0)
    }
}

/// A generated, labeled training example.
///
/// `traits[i]` is the value for `Population::feature_names[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticApplicant {
    pub id: u64,
    pub specialization: String,
    pub job: String,
    pub traits: Vec<f64>,
}

/// A full synthetic training population over a shared feature space.
#[derive(Debug, Clone, PartialEq)]
pub struct Population {
    pub feature_names: Vec<String>,
    pub applicants: Vec<SyntheticApplicant>,
}

impl Population {
    /// Applicants belonging to one specialization, in population order.
    pub fn for_specialization<'a>(&'a self, specialization: &'a str) -> impl Iterator<Item = &'a SyntheticApplicant> + 'a {
        self.applicants
            .iter()
            .filter(move |a| a.specialization == specialization)
    }
}

/// Caller-supplied trait scores in `[0, 1]`, keyed by trait code.
pub type StudentProfile = BTreeMap<String, f64>;

/// One ranked output row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityRow {
    pub specialization: String,
    pub job: String,
    pub compatibility_percent: f64,
}

/// Mean compatibility of the jobs in one specialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecializationSummary {
    pub specialization: String,
    pub mean_compatibility_percent: f64,
}

/// Which classifier family to train.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    /// Bagged, class-balanced random forest (native probabilities).
    Forest,
    /// Nearest centroid (decision scores only).
    Centroid,
}

impl ClassifierKind {
    pub fn display_name(self) -> &'static str {
        match self {
            ClassifierKind::Forest => "random forest",
            ClassifierKind::Centroid => "nearest centroid",
        }
    }
}

/// Where the student profile for `predict` comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProfileSource {
    /// Seeded synthetic profile.
    Synthetic,
    /// Prompt for every trait on the terminal.
    Interactive,
    /// Read `code_or_trait,score` rows from a CSV file.
    File,
}

/// Synthetic population knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    pub samples_per_job: usize,
    /// Expected value of a trait the job does not weight.
    pub baseline: f64,
    /// Expected value of a trait with normalized weight `1.0`.
    pub ceiling: f64,
    pub noise_scale: f64,
    /// How much a high weight shrinks the noise (`0` = not at all).
    pub dampening: f64,
    /// Half-width of the uniform jitter added on top of the gaussian draw.
    pub jitter: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            samples_per_job: 1500,
            baseline: 0.1,
            ceiling: 0.95,
            noise_scale: 0.08,
            dampening: 0.6,
            jitter: 0.03,
        }
    }
}

/// Random forest hyper-parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_trees: usize,
    /// `None` grows trees until leaves are pure.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 300,
            max_depth: None,
            min_samples_split: 2,
        }
    }
}

/// Configuration of a training run.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub datasets: PathBuf,
    pub models_dir: PathBuf,
    pub population_out: Option<PathBuf>,
    pub seed: u64,
    pub generator: GeneratorConfig,
    pub classifier: ClassifierKind,
    pub forest: ForestConfig,
    /// Specializations with fewer rows are skipped.
    pub min_samples: usize,
    pub test_fraction: f64,
}

/// Configuration of a prediction request.
#[derive(Debug, Clone)]
pub struct PredictConfig {
    pub models_dir: PathBuf,
    pub source: ProfileSource,
    pub profile_path: Option<PathBuf>,
    pub profile_seed: u64,
    pub top_n: usize,
    pub export_results: Option<PathBuf>,
    pub export_summary: Option<PathBuf>,
}
