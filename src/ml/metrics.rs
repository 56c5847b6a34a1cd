use crate::error::{AppError, Result};
use crate::models::Label;
use serde::{Deserialize, Serialize};

/// Binary classification metrics, positive class = label 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub true_negatives: usize,
}

impl EvaluationMetrics {
    /// Compute metrics from aligned truth/prediction slices.
    pub fn from_predictions(y_true: &[Label], y_pred: &[Label]) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(AppError::Internal(format!(
                "evaluation inputs differ in length: {} vs {}",
                y_true.len(),
                y_pred.len()
            )));
        }
        if y_true.is_empty() {
            return Err(AppError::Internal(
                "cannot evaluate on an empty test set".to_string(),
            ));
        }

        let mut tp = 0;
        let mut fp = 0;
        let mut fn_count = 0;
        let mut tn = 0;
        for (&truth, &pred) in y_true.iter().zip(y_pred.iter()) {
            match (truth, pred) {
                (1, 1) => tp += 1,
                (0, 1) => fp += 1,
                (1, 0) => fn_count += 1,
                _ => tn += 1,
            }
        }

        Ok(Self::from_confusion(tp, fp, fn_count, tn))
    }

    /// Compute metrics from confusion-matrix counts.
    pub fn from_confusion(tp: usize, fp: usize, fn_count: usize, tn: usize) -> Self {
        let total = tp + fp + fn_count + tn;
        let accuracy = if total > 0 {
            (tp + tn) as f64 / total as f64
        } else {
            0.0
        };
        let precision = if tp + fp > 0 {
            tp as f64 / (tp + fp) as f64
        } else {
            0.0
        };
        let recall = if tp + fn_count > 0 {
            tp as f64 / (tp + fn_count) as f64
        } else {
            0.0
        };
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            accuracy,
            precision,
            recall,
            f1_score,
            true_positives: tp,
            false_positives: fp,
            false_negatives: fn_count,
            true_negatives: tn,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round2(x: f64) -> f64 {
        (x * 100.0).round() / 100.0
    }

    #[test]
    fn test_closed_form_confusion_matrix() {
        let metrics = EvaluationMetrics::from_confusion(8, 2, 1, 9);

        assert_eq!(round2(metrics.accuracy), 0.85);
        assert_eq!(round2(metrics.precision), 0.80);
        assert_eq!(round2(metrics.recall), 0.89);
        assert_eq!(round2(metrics.f1_score), 0.84);
    }

    #[test]
    fn test_from_predictions_counts() {
        let y_true = vec![1, 1, 0, 0, 1, 0];
        let y_pred = vec![1, 0, 0, 1, 1, 0];

        let metrics = EvaluationMetrics::from_predictions(&y_true, &y_pred).unwrap();
        assert_eq!(metrics.true_positives, 2);
        assert_eq!(metrics.false_negatives, 1);
        assert_eq!(metrics.false_positives, 1);
        assert_eq!(metrics.true_negatives, 2);
        assert!((metrics.accuracy - 4.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_perfect_predictions() {
        let y = vec![1, 0, 1, 0];
        let metrics = EvaluationMetrics::from_predictions(&y, &y).unwrap();

        assert_eq!(metrics.accuracy, 1.0);
        assert_eq!(metrics.precision, 1.0);
        assert_eq!(metrics.recall, 1.0);
        assert_eq!(metrics.f1_score, 1.0);
    }

    #[test]
    fn test_no_positive_predictions_yields_zero_precision() {
        let y_true = vec![1, 1, 0];
        let y_pred = vec![0, 0, 0];
        let metrics = EvaluationMetrics::from_predictions(&y_true, &y_pred).unwrap();

        assert_eq!(metrics.precision, 0.0);
        assert_eq!(metrics.recall, 0.0);
        assert_eq!(metrics.f1_score, 0.0);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        assert!(EvaluationMetrics::from_predictions(&[1, 0], &[1]).is_err());
    }
}
