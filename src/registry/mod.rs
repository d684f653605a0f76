//! Discovery and loading of persisted specialization models.
//!
//! A broken artifact never aborts loading: it is logged and skipped so the
//! remaining specializations can still be scored.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::error::AppError;

pub mod artifact;

pub use artifact::{
    ArtifactManifest, LoadError, SpecializationModelArtifact, artifact_dir, load_artifact, safe_name, save_artifact,
};

/// A directory that was found but not loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedArtifact {
    pub dir: PathBuf,
    pub reason: String,
}

/// Loaded specialization models in discovery order.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    artifacts: Vec<SpecializationModelArtifact>,
    manifests: Vec<Option<ArtifactManifest>>,
    skipped: Vec<SkippedArtifact>,
}

impl ModelRegistry {
    /// Scan `models_root` for `*_model` directories (sorted by name) and load them.
    ///
    /// A missing root yields an empty registry; only an unreadable root is an error.
    pub fn load(models_root: &Path) -> Result<Self, AppError> {
        let mut registry = Self::default();
        if !models_root.is_dir() {
            warn!("Models directory '{}' does not exist.", models_root.display());
            return Ok(registry);
        }

        let entries = fs::read_dir(models_root).map_err(|e| {
            AppError::new(
                2,
                format!("Failed to read models directory '{}': {e}", models_root.display()),
            )
        })?;

        let mut dirs: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| {
                p.is_dir()
                    && p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.ends_with(artifact::MODEL_DIR_SUFFIX))
            })
            .collect();
        dirs.sort();

        for dir in dirs {
            match load_artifact(&dir) {
                Ok((artifact, manifest)) => registry.insert(dir, artifact, manifest),
                Err(err) => registry.skip(dir, err.to_string()),
            }
        }

        info!(
            "Loaded {} specialization model(s) from '{}' ({} skipped).",
            registry.len(),
            models_root.display(),
            registry.skipped.len()
        );
        Ok(registry)
    }

    /// Build a registry from in-memory artifacts. Duplicate names keep the first.
    pub fn from_artifacts(artifacts: impl IntoIterator<Item = SpecializationModelArtifact>) -> Self {
        let mut registry = Self::default();
        for artifact in artifacts {
            let dir = artifact_dir(Path::new(""), &artifact.specialization);
            registry.insert(dir, artifact, None);
        }
        registry
    }

    fn insert(&mut self, dir: PathBuf, artifact: SpecializationModelArtifact, manifest: Option<ArtifactManifest>) {
        if self.get(&artifact.specialization).is_some() {
            let reason = format!("duplicate specialization '{}'", artifact.specialization);
            self.skip(dir, reason);
            return;
        }
        self.artifacts.push(artifact);
        self.manifests.push(manifest);
    }

    fn skip(&mut self, dir: PathBuf, reason: String) {
        warn!("Skipping model directory '{}': {reason}.", dir.display());
        self.skipped.push(SkippedArtifact { dir, reason });
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn artifacts(&self) -> &[SpecializationModelArtifact] {
        &self.artifacts
    }

    /// Loaded artifacts paired with their manifests (when present).
    pub fn entries(&self) -> impl Iterator<Item = (&SpecializationModelArtifact, Option<&ArtifactManifest>)> {
        self.artifacts
            .iter()
            .zip(self.manifests.iter().map(Option::as_ref))
    }

    pub fn skipped(&self) -> &[SkippedArtifact] {
        &self.skipped
    }

    pub fn specializations(&self) -> Vec<&str> {
        self.artifacts
            .iter()
            .map(|a| a.specialization.as_str())
            .collect()
    }

    pub fn get(&self, specialization: &str) -> Option<&SpecializationModelArtifact> {
        self.artifacts
            .iter()
            .find(|a| a.specialization == specialization)
    }

    /// Sorted union of every loaded feature order. Only used to order prompts.
    pub fn feature_union(&self) -> Vec<String> {
        let union: BTreeSet<&str> = self
            .artifacts
            .iter()
            .flat_map(|a| a.feature_order.iter().map(String::as_str))
            .collect();
        union.into_iter().map(str::to_string).collect()
    }

    /// Number of distinct jobs across all loaded specializations.
    pub fn total_classes(&self) -> usize {
        self.artifacts.iter().map(|a| a.label_encoder.len()).sum()
    }
}
