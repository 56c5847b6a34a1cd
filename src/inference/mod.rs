//! Inference service: holds the current artifact bundle behind an
//! immutable-swap reference, answers single and batch predictions, and
//! gates retraining to at most one run in flight.

use crate::bundle::{ArtifactBundle, BundleMetadata};
use crate::error::{AppError, Result};
use crate::models::ConflictRecord;
use crate::pipeline::{ProgressChannel, TrainingConfig, TrainingPipeline, TrainingReport};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// A single prediction: class label and the predicted class's own
/// probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: u8,
    pub confidence: f64,
}

/// One successfully predicted batch row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowPrediction {
    /// Position in the submitted batch.
    pub index: usize,
    pub label: u8,
    pub confidence: f64,
}

/// A batch row that could not be predicted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedRow {
    pub index: usize,
    pub reason: String,
}

/// Batch prediction results plus summary counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchPrediction {
    pub predictions: Vec<RowPrediction>,
    pub rejected: Vec<RejectedRow>,
    pub total: usize,
    pub count_label1: usize,
    pub count_label0: usize,
}

/// Serves predictions from the current artifact bundle.
pub struct InferenceService {
    training: TrainingConfig,
    bundle: RwLock<Option<Arc<ArtifactBundle>>>,
    training_active: AtomicBool,
    progress: ProgressChannel,
}

/// Clears the training gate when a run finishes, however it finishes.
struct TrainingGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for TrainingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

impl InferenceService {
    pub fn new(training: TrainingConfig) -> Self {
        Self {
            training,
            bundle: RwLock::new(None),
            training_active: AtomicBool::new(false),
            progress: ProgressChannel::default(),
        }
    }

    /// Load the bundle from the configured directory and swap it in.
    pub fn load_bundle(&self) -> Result<()> {
        let bundle = ArtifactBundle::load(&self.training.bundle_dir)?;
        info!(
            path = %self.training.bundle_dir.display(),
            trained_at = %bundle.metadata.trained_at,
            n_samples = bundle.metadata.n_samples,
            "Loaded artifact bundle"
        );
        *self.bundle.write() = Some(Arc::new(bundle));
        Ok(())
    }

    /// Snapshot of the current bundle; stable for the caller's lifetime
    /// even if a retrain swaps in a replacement concurrently.
    pub fn current_bundle(&self) -> Result<Arc<ArtifactBundle>> {
        self.bundle
            .read()
            .clone()
            .ok_or_else(|| AppError::BundleNotFound {
                path: self.training.bundle_dir.clone(),
            })
    }

    /// Whether a bundle is loaded and the service can predict.
    pub fn is_ready(&self) -> bool {
        self.bundle.read().is_some()
    }

    /// Metadata of the currently served bundle.
    pub fn bundle_metadata(&self) -> Result<BundleMetadata> {
        Ok(self.current_bundle()?.metadata.clone())
    }

    /// Subscribe to training progress events.
    pub fn subscribe_progress(&self) -> tokio::sync::broadcast::Receiver<crate::pipeline::TrainingEvent> {
        self.progress.subscribe()
    }

    /// Predict a single record: encode → scale → classify.
    ///
    /// An unknown category fails the whole request.
    pub fn predict_one(&self, record: &ConflictRecord) -> Result<Prediction> {
        let bundle = self.current_bundle()?;
        predict_with(&bundle, record)
    }

    /// Predict a batch of records.
    ///
    /// Rows with unknown categories are excluded from the predictions and
    /// reported in the rejection list; they are never silently defaulted.
    pub fn predict_batch(&self, records: &[ConflictRecord]) -> Result<BatchPrediction> {
        let bundle = self.current_bundle()?;

        let mut predictions = Vec::new();
        let mut rejected = Vec::new();
        for (index, encoded) in bundle.codec.encode_batch(records).into_iter().enumerate() {
            match encoded.and_then(|features| classify(&bundle, &features)) {
                Ok(prediction) => predictions.push(RowPrediction {
                    index,
                    label: prediction.label,
                    confidence: prediction.confidence,
                }),
                Err(e) => rejected.push(RejectedRow {
                    index,
                    reason: e.to_string(),
                }),
            }
        }

        let count_label1 = predictions.iter().filter(|p| p.label == 1).count();
        let count_label0 = predictions.len() - count_label1;

        Ok(BatchPrediction {
            total: records.len(),
            count_label1,
            count_label0,
            predictions,
            rejected,
        })
    }

    /// Run a full training pipeline and swap in the freshly persisted
    /// bundle.
    ///
    /// At most one run may be in flight; a second request observes
    /// `TrainingInProgress` instead of queueing. The CPU-bound fit runs on
    /// the blocking pool so inference requests are not starved.
    pub async fn retrain(self: &Arc<Self>) -> Result<TrainingReport> {
        if self
            .training_active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Retrain requested while a training run is in progress");
            return Err(AppError::TrainingInProgress);
        }

        let service = self.clone();
        let report = tokio::task::spawn_blocking(move || {
            let _guard = TrainingGuard {
                flag: &service.training_active,
            };
            let pipeline =
                TrainingPipeline::new(service.training.clone(), service.progress.clone());
            pipeline.run()
        })
        .await
        .map_err(|e| AppError::Internal(format!("training task panicked: {e}")))??;

        // Reload from disk rather than handing the in-memory bundle across:
        // a bundle that cannot round-trip must fail here, not at the next
        // process start.
        self.load_bundle()?;

        Ok(report)
    }

    /// Whether a training run is currently in flight.
    pub fn is_training(&self) -> bool {
        self.training_active.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub(crate) fn hold_training_gate(&self) -> bool {
        self.training_active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    #[cfg(test)]
    pub(crate) fn release_training_gate(&self) {
        self.training_active.store(false, Ordering::SeqCst);
    }
}

fn predict_with(bundle: &ArtifactBundle, record: &ConflictRecord) -> Result<Prediction> {
    let features = bundle.codec.encode(record)?;
    classify(bundle, &features)
}

fn classify(bundle: &ArtifactBundle, features: &[f64]) -> Result<Prediction> {
    let scaled = bundle.scaler.transform_row(features)?;
    let [p0, p1] = bundle.forest.predict_proba(&scaled)?;
    let label = bundle.forest.predict_label(&scaled)?;
    let confidence = if label == 1 { p1 } else { p0 };
    Ok(Prediction { label, confidence })
}
