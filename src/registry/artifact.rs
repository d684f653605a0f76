//! On-disk layout of one trained specialization.
//!
//! ```text
//! <models>/<safe_name>_model/
//!     model.json           classifier
//!     scaler.json          standard scaler
//!     label_encoder.json   job label <-> class index
//!     features.txt         feature order, one trait code per line
//!     report.txt           held-out evaluation
//!     manifest.json        version stamp and training metadata
//! ```

use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::domain::ClassifierKind;
use crate::error::AppError;
use crate::models::{Classifier, ClassifierModel, LabelEncoder, StandardScaler};

pub const FORMAT_VERSION: u32 = 1;
pub const TOOL_NAME: &str = "career-compat";

pub const MODEL_DIR_SUFFIX: &str = "_model";
pub const MODEL_FILE: &str = "model.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const ENCODER_FILE: &str = "label_encoder.json";
pub const FEATURES_FILE: &str = "features.txt";
pub const REPORT_FILE: &str = "report.txt";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Version stamp written next to every artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub tool: String,
    pub format_version: u32,
    pub specialization: String,
    pub classifier_kind: ClassifierKind,
    pub trained_at: DateTime<Utc>,
    pub n_samples: usize,
    pub test_accuracy: Option<f64>,
}

impl ArtifactManifest {
    pub fn new(specialization: &str, classifier_kind: ClassifierKind, n_samples: usize, test_accuracy: Option<f64>) -> Self {
        Self {
            tool: TOOL_NAME.to_string(),
            format_version: FORMAT_VERSION,
            specialization: specialization.to_string(),
            classifier_kind,
            trained_at: Utc::now(),
            n_samples,
            test_accuracy,
        }
    }
}

/// Everything needed to score one specialization.
#[derive(Debug, Clone)]
pub struct SpecializationModelArtifact {
    pub specialization: String,
    pub classifier: ClassifierModel,
    pub scaler: StandardScaler,
    pub label_encoder: LabelEncoder,
    /// Trait codes in the column order the classifier was trained on.
    pub feature_order: Vec<String>,
}

/// Why an artifact directory could not be loaded.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadError {
    MissingFile(&'static str),
    Unreadable { file: &'static str, reason: String },
    UnknownVersion(u32),
    ClassCountMismatch { classifier: usize, encoder: usize },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::MissingFile(file) => write!(f, "missing {file}"),
            LoadError::Unreadable { file, reason } => write!(f, "cannot read {file}: {reason}"),
            LoadError::UnknownVersion(v) => {
                write!(f, "unsupported format_version {v} (expected {FORMAT_VERSION})")
            }
            LoadError::ClassCountMismatch { classifier, encoder } => write!(
                f,
                "classifier has {classifier} classes but the label encoder has {encoder}"
            ),
        }
    }
}

impl std::error::Error for LoadError {}

/// Filesystem-safe version of a specialization name.
///
/// Whitespace and the characters `/ \ : * ? " < > |` become `_`.
pub fn safe_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c.is_whitespace() || matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// Directory an artifact for `specialization` lives in.
pub fn artifact_dir(models_root: &Path, specialization: &str) -> PathBuf {
    models_root.join(format!("{}{MODEL_DIR_SUFFIX}", safe_name(specialization)))
}

/// Name to use when a directory has no manifest.
pub fn name_from_dir(dir_name: &str) -> String {
    dir_name
        .strip_suffix(MODEL_DIR_SUFFIX)
        .unwrap_or(dir_name)
        .replace('_', " ")
}

/// Persist an artifact and return its directory.
pub fn save_artifact(
    models_root: &Path,
    artifact: &SpecializationModelArtifact,
    manifest: &ArtifactManifest,
    report: &str,
) -> Result<PathBuf, AppError> {
    let dir = artifact_dir(models_root, &artifact.specialization);
    fs::create_dir_all(&dir)
        .map_err(|e| AppError::new(4, format!("Failed to create model directory '{}': {e}", dir.display())))?;

    write_json(&dir.join(MODEL_FILE), &artifact.classifier)?;
    write_json(&dir.join(SCALER_FILE), &artifact.scaler)?;
    write_json(&dir.join(ENCODER_FILE), &artifact.label_encoder)?;
    write_json(&dir.join(MANIFEST_FILE), manifest)?;

    let mut features = artifact.feature_order.join("\n");
    features.push('\n');
    write_text(&dir.join(FEATURES_FILE), &features)?;
    write_text(&dir.join(REPORT_FILE), report)?;

    Ok(dir)
}

/// Load one artifact directory.
///
/// Returns the manifest separately because older directories may not have one.
pub fn load_artifact(dir: &Path) -> Result<(SpecializationModelArtifact, Option<ArtifactManifest>), LoadError> {
    let features_path = dir.join(FEATURES_FILE);
    if !features_path.is_file() {
        return Err(LoadError::MissingFile(FEATURES_FILE));
    }
    let feature_order = read_features(&features_path)?;

    let manifest = if dir.join(MANIFEST_FILE).is_file() {
        let m: ArtifactManifest = read_json(&dir.join(MANIFEST_FILE), MANIFEST_FILE)?;
        if m.format_version != FORMAT_VERSION {
            return Err(LoadError::UnknownVersion(m.format_version));
        }
        Some(m)
    } else {
        None
    };

    let classifier: ClassifierModel = read_json(&dir.join(MODEL_FILE), MODEL_FILE)?;
    classifier
        .check_structure()
        .map_err(|reason| LoadError::Unreadable { file: MODEL_FILE, reason })?;
    let scaler: StandardScaler = read_json(&dir.join(SCALER_FILE), SCALER_FILE)?;
    let label_encoder: LabelEncoder = read_json(&dir.join(ENCODER_FILE), ENCODER_FILE)?;

    if classifier.n_classes() != label_encoder.len() {
        return Err(LoadError::ClassCountMismatch {
            classifier: classifier.n_classes(),
            encoder: label_encoder.len(),
        });
    }

    let specialization = match &manifest {
        Some(m) => m.specialization.clone(),
        None => name_from_dir(&dir.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()),
    };

    Ok((
        SpecializationModelArtifact {
            specialization,
            classifier,
            scaler,
            label_encoder,
            feature_order,
        },
        manifest,
    ))
}

fn read_features(path: &Path) -> Result<Vec<String>, LoadError> {
    let text = fs::read_to_string(path).map_err(|e| LoadError::Unreadable {
        file: FEATURES_FILE,
        reason: e.to_string(),
    })?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

fn read_json<T: DeserializeOwned>(path: &Path, file: &'static str) -> Result<T, LoadError> {
    let handle = File::open(path).map_err(|_| LoadError::MissingFile(file))?;
    serde_json::from_reader(std::io::BufReader::new(handle)).map_err(|e| LoadError::Unreadable {
        file,
        reason: e.to_string(),
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create '{}': {e}", path.display())))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .map_err(|e| AppError::new(4, format!("Failed to write '{}': {e}", path.display())))?;
    writer
        .flush()
        .map_err(|e| AppError::new(4, format!("Failed to write '{}': {e}", path.display())))
}

fn write_text(path: &Path, text: &str) -> Result<(), AppError> {
    fs::write(path, text).map_err(|e| AppError::new(4, format!("Failed to write '{}': {e}", path.display())))
}
