//! Publish/subscribe channel for training progress.
//!
//! The pipeline publishes phase transitions and terminal events; whether
//! anyone is listening never affects pipeline correctness.

use super::TrainingPhase;
use crate::ml::EvaluationMetrics;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

/// Events emitted while a training run progresses.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrainingEvent {
    PhaseChanged { phase: TrainingPhase },
    Completed { metrics: EvaluationMetrics },
    Failed { error: String },
}

/// Broadcast fan-out for training events.
#[derive(Debug, Clone)]
pub struct ProgressChannel {
    tx: broadcast::Sender<TrainingEvent>,
}

impl ProgressChannel {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: TrainingEvent) {
        debug!(event = ?event, "Publishing training event");
        // A send error only means there are no subscribers right now.
        let _ = self.tx.send(event);
    }

    /// Subscribe to future training events.
    pub fn subscribe(&self) -> broadcast::Receiver<TrainingEvent> {
        self.tx.subscribe()
    }
}

impl Default for ProgressChannel {
    fn default() -> Self {
        Self::new(64)
    }
}
