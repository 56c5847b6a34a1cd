//! Training pipeline: load → encode → scale → split → fit → evaluate →
//! persist, with progress events published at each phase transition.

pub mod progress;

pub use progress::{ProgressChannel, TrainingEvent};

use crate::bundle::{ArtifactBundle, BundleMetadata};
use crate::dataset;
use crate::error::Result;
use crate::ml::{
    stratified_split, EvaluationMetrics, FeatureCodec, ForestConfig, RandomForest, StandardScaler,
};
use crate::models::{Label, NUM_FEATURES};
use chrono::{DateTime, Utc};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;
use strum_macros::Display;
use tracing::{error, info};

/// Pipeline phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TrainingPhase {
    Idle,
    Loading,
    Encoding,
    Scaling,
    Splitting,
    Fitting,
    Evaluating,
    Persisting,
    Failed,
}

/// Everything a training run needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Source dataset (CSV with feature columns plus `label`).
    pub data_path: PathBuf,

    /// Directory the artifact bundle is written to.
    pub bundle_dir: PathBuf,

    /// Held-out fraction for evaluation.
    pub test_fraction: f64,

    /// Seed for the stratified split and the forest.
    pub seed: u64,

    /// Forest hyperparameters.
    pub forest: ForestConfig,
}

impl TrainingConfig {
    pub fn new(data_path: PathBuf, bundle_dir: PathBuf) -> Self {
        Self {
            data_path,
            bundle_dir,
            test_fraction: 0.2,
            seed: 42,
            forest: ForestConfig::default(),
        }
    }
}

/// Outcome of a completed training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub metrics: EvaluationMetrics,
    pub n_samples: usize,
    pub n_train: usize,
    pub n_test: usize,
    pub trained_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// Orchestrates one full training run.
pub struct TrainingPipeline {
    config: TrainingConfig,
    progress: ProgressChannel,
}

impl TrainingPipeline {
    pub fn new(config: TrainingConfig, progress: ProgressChannel) -> Self {
        Self { config, progress }
    }

    /// Run the pipeline to completion.
    ///
    /// CPU-bound and blocking; callers on an async runtime should wrap this
    /// in `spawn_blocking`. Publishes a terminal `Completed` or `Failed`
    /// event in addition to returning the result.
    pub fn run(&self) -> Result<TrainingReport> {
        let started = Instant::now();
        let result = self.run_phases(started);

        match &result {
            Ok(report) => {
                self.progress.publish(TrainingEvent::Completed {
                    metrics: report.metrics.clone(),
                });
                info!(
                    accuracy = report.metrics.accuracy,
                    f1 = report.metrics.f1_score,
                    n_train = report.n_train,
                    n_test = report.n_test,
                    duration_ms = report.duration_ms,
                    "Training run completed"
                );
            }
            Err(e) => {
                self.progress.publish(TrainingEvent::Failed {
                    error: e.to_string(),
                });
                error!(error = %e, "Training run failed");
            }
        }

        result
    }

    fn phase(&self, phase: TrainingPhase) {
        info!(phase = %phase, "Training phase");
        self.progress.publish(TrainingEvent::PhaseChanged { phase });
    }

    fn run_phases(&self, started: Instant) -> Result<TrainingReport> {
        self.phase(TrainingPhase::Loading);
        let labeled = dataset::load_training_csv(&self.config.data_path)?;
        let n_samples = labeled.len();
        let records: Vec<_> = labeled.iter().map(|l| l.record.clone()).collect();
        let labels: Vec<Label> = labeled.iter().map(|l| l.label).collect();

        // The codec and scaler are fit on the full dataset before the
        // train/test split; category vocabulary and feature scale are
        // therefore shared across the split boundary, and the evaluation
        // numbers depend on that.
        self.phase(TrainingPhase::Encoding);
        let codec = FeatureCodec::fit(&records)?;
        let mut matrix = Array2::zeros((n_samples, NUM_FEATURES));
        for (i, record) in records.iter().enumerate() {
            let features = codec.encode(record)?;
            for (j, value) in features.into_iter().enumerate() {
                matrix[[i, j]] = value;
            }
        }

        self.phase(TrainingPhase::Scaling);
        let scaler = StandardScaler::fit(&matrix)?;
        let scaled = scaler.transform(&matrix)?;

        self.phase(TrainingPhase::Splitting);
        let split = stratified_split(&labels, self.config.test_fraction, self.config.seed)?;
        let train_matrix = scaled.select(Axis(0), &split.train);
        let test_matrix = scaled.select(Axis(0), &split.test);
        let train_labels: Vec<Label> = split.train.iter().map(|&i| labels[i]).collect();
        let test_labels: Vec<Label> = split.test.iter().map(|&i| labels[i]).collect();

        self.phase(TrainingPhase::Fitting);
        let mut forest_config = self.config.forest.clone();
        forest_config.seed = self.config.seed;
        let forest = RandomForest::fit(&train_matrix, &train_labels, forest_config)?;

        self.phase(TrainingPhase::Evaluating);
        let predictions = forest.predict_batch(&test_matrix)?;
        let metrics = EvaluationMetrics::from_predictions(&test_labels, &predictions)?;

        self.phase(TrainingPhase::Persisting);
        let trained_at = Utc::now();
        let bundle = ArtifactBundle {
            metadata: BundleMetadata {
                trained_at,
                n_samples,
                n_train: split.train.len(),
                n_test: split.test.len(),
                metrics: metrics.clone(),
                forest: forest.config().clone(),
            },
            forest,
            scaler,
            codec,
        };
        bundle.save(&self.config.bundle_dir)?;

        Ok(TrainingReport {
            metrics,
            n_samples,
            n_train: split.train.len(),
            n_test: split.test.len(),
            trained_at,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_display_is_snake_case() {
        assert_eq!(TrainingPhase::Loading.to_string(), "loading");
        assert_eq!(TrainingPhase::Persisting.to_string(), "persisting");
    }

    #[test]
    fn test_training_config_defaults() {
        let config = TrainingConfig::new("data.csv".into(), "models".into());
        assert_eq!(config.test_fraction, 0.2);
        assert_eq!(config.seed, 42);
        assert_eq!(config.forest.n_trees, 100);
    }

    #[test]
    fn test_missing_dataset_fails_pipeline() {
        let tmp = tempfile::tempdir().unwrap();
        let config = TrainingConfig::new(
            tmp.path().join("absent.csv"),
            tmp.path().join("models"),
        );
        let pipeline = TrainingPipeline::new(config, ProgressChannel::default());

        assert!(pipeline.run().is_err());
        assert!(!tmp.path().join("models").exists());
    }
}
