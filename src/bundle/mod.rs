//! Persisted model artifacts.
//!
//! A bundle is a directory holding three bincode artifacts (model, scaler,
//! encoders) plus a JSON metadata file. It is written atomically through a
//! sibling temp directory and loaded all-or-nothing: a missing or
//! undecodable artifact fails the whole load.

use crate::error::{AppError, Result};
use crate::ml::{EvaluationMetrics, FeatureCodec, ForestConfig, RandomForest, StandardScaler};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const MODEL_FILE: &str = "model.bin";
pub const SCALER_FILE: &str = "scaler.bin";
pub const ENCODERS_FILE: &str = "encoders.bin";
pub const METADATA_FILE: &str = "metadata.json";

/// Descriptive metadata persisted alongside the artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleMetadata {
    pub trained_at: DateTime<Utc>,
    pub n_samples: usize,
    pub n_train: usize,
    pub n_test: usize,
    pub metrics: EvaluationMetrics,
    pub forest: ForestConfig,
}

/// The trained `(model, scaler, encoders)` triple plus metadata.
///
/// Immutable once written; retraining replaces the whole bundle.
#[derive(Debug, Clone)]
pub struct ArtifactBundle {
    pub forest: RandomForest,
    pub scaler: StandardScaler,
    pub codec: FeatureCodec,
    pub metadata: BundleMetadata,
}

impl ArtifactBundle {
    /// Load a bundle from a directory, all-or-nothing.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(AppError::BundleNotFound {
                path: dir.to_path_buf(),
            });
        }

        let forest: RandomForest = read_artifact(dir, MODEL_FILE)?;
        let scaler: StandardScaler = read_artifact(dir, SCALER_FILE)?;
        let codec: FeatureCodec = read_artifact(dir, ENCODERS_FILE)?;
        let metadata = read_metadata(dir)?;

        Ok(Self {
            forest,
            scaler,
            codec,
            metadata,
        })
    }

    /// Persist the bundle atomically.
    ///
    /// Artifacts are written into a `<dir>.tmp` sibling which is then
    /// renamed into place; any previous bundle is moved aside first and
    /// removed afterwards, so a concurrent load never observes a partially
    /// written directory.
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        let tmp_dir = sibling(dir, "tmp")?;
        let old_dir = sibling(dir, "old")?;

        if tmp_dir.exists() {
            fs::remove_dir_all(&tmp_dir)?;
        }
        fs::create_dir_all(&tmp_dir)?;

        write_artifact(&tmp_dir, MODEL_FILE, &self.forest)?;
        write_artifact(&tmp_dir, SCALER_FILE, &self.scaler)?;
        write_artifact(&tmp_dir, ENCODERS_FILE, &self.codec)?;
        write_metadata(&tmp_dir, &self.metadata)?;

        if old_dir.exists() {
            fs::remove_dir_all(&old_dir)?;
        }
        if dir.exists() {
            fs::rename(dir, &old_dir)?;
        }
        fs::rename(&tmp_dir, dir)?;
        if old_dir.exists() {
            fs::remove_dir_all(&old_dir)?;
        }

        tracing::info!(path = %dir.display(), "Persisted artifact bundle");
        Ok(())
    }
}

fn sibling(dir: &Path, suffix: &str) -> Result<PathBuf> {
    let name = dir
        .file_name()
        .ok_or_else(|| AppError::Internal(format!("invalid bundle path {dir:?}")))?;
    let mut name = name.to_os_string();
    name.push(".");
    name.push(suffix);
    Ok(dir.with_file_name(name))
}

fn read_artifact<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<T> {
    let path = dir.join(file);
    let bytes = fs::read(&path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => AppError::BundleNotFound {
            path: path.clone(),
        },
        _ => AppError::CorruptBundle {
            path: path.clone(),
            reason: e.to_string(),
        },
    })?;

    bincode::deserialize(&bytes).map_err(|e| AppError::CorruptBundle {
        path,
        reason: e.to_string(),
    })
}

fn write_artifact<T: Serialize>(dir: &Path, file: &str, value: &T) -> Result<()> {
    let bytes =
        bincode::serialize(value).map_err(|e| AppError::Serialization(e.to_string()))?;
    fs::write(dir.join(file), bytes)?;
    Ok(())
}

fn read_metadata(dir: &Path) -> Result<BundleMetadata> {
    let path = dir.join(METADATA_FILE);
    let bytes = fs::read(&path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => AppError::BundleNotFound {
            path: path.clone(),
        },
        _ => AppError::CorruptBundle {
            path: path.clone(),
            reason: e.to_string(),
        },
    })?;

    serde_json::from_slice(&bytes).map_err(|e| AppError::CorruptBundle {
        path,
        reason: e.to_string(),
    })
}

fn write_metadata(dir: &Path, metadata: &BundleMetadata) -> Result<()> {
    let json = serde_json::to_vec_pretty(metadata)?;
    fs::write(dir.join(METADATA_FILE), json)?;
    Ok(())
}
