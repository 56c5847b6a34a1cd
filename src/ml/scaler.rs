use crate::error::{AppError, Result};
use crate::models::FEATURE_COLUMNS;
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

/// Per-feature standardization fitted once on the training matrix and
/// reapplied verbatim at inference.
///
/// Uses population variance (ddof = 0). A zero-variance column is rejected
/// at fit time rather than patched with an epsilon: it indicates malformed
/// input data and would make the transform degenerate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    std: Vec<f64>,
}

impl StandardScaler {
    /// Compute per-column mean and standard deviation.
    pub fn fit(matrix: &Array2<f64>) -> Result<Self> {
        let n_rows = matrix.nrows();
        if n_rows == 0 {
            return Err(AppError::Dataset(
                "cannot fit scaler on an empty feature matrix".to_string(),
            ));
        }

        let mean = matrix
            .mean_axis(Axis(0))
            .ok_or_else(|| AppError::Internal("failed to compute column means".to_string()))?;
        let std = matrix.std_axis(Axis(0), 0.0);

        for (i, &sd) in std.iter().enumerate() {
            if sd == 0.0 || !sd.is_finite() {
                let column = FEATURE_COLUMNS
                    .get(i)
                    .copied()
                    .unwrap_or("<unnamed>")
                    .to_string();
                return Err(AppError::DegenerateFeature { column });
            }
        }

        Ok(Self {
            mean: mean.to_vec(),
            std: std.to_vec(),
        })
    }

    /// Scale a single feature vector: `(x - mean) / std` per column.
    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.mean.len() {
            return Err(AppError::Internal(format!(
                "feature vector has {} columns, scaler was fitted on {}",
                row.len(),
                self.mean.len()
            )));
        }

        Ok(row
            .iter()
            .zip(self.mean.iter().zip(self.std.iter()))
            .map(|(&x, (&m, &s))| (x - m) / s)
            .collect())
    }

    /// Scale a matrix column-wise, identically to the single-row path.
    pub fn transform(&self, matrix: &Array2<f64>) -> Result<Array2<f64>> {
        if matrix.ncols() != self.mean.len() {
            return Err(AppError::Internal(format!(
                "feature matrix has {} columns, scaler was fitted on {}",
                matrix.ncols(),
                self.mean.len()
            )));
        }

        let mut scaled = matrix.clone();
        for (j, mut column) in scaled.columns_mut().into_iter().enumerate() {
            let (m, s) = (self.mean[j], self.std[j]);
            column.mapv_inplace(|x| (x - m) / s);
        }
        Ok(scaled)
    }

    /// Number of features the scaler was fitted on.
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_known_mean_and_std() {
        // Column with mean 10 and population std 2.
        let matrix = array![[8.0], [10.0], [12.0], [12.0], [8.0]];
        let scaler = StandardScaler::fit(&matrix).unwrap();

        let scaled = scaler.transform_row(&[14.0]).unwrap();
        assert!((scaled[0] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_variance_column_rejected() {
        let matrix = array![[1.0, 5.0], [2.0, 5.0], [3.0, 5.0]];
        let err = StandardScaler::fit(&matrix).unwrap_err();
        match err {
            AppError::DegenerateFeature { column } => assert_eq!(column, "ADMIN1"),
            other => panic!("expected DegenerateFeature, got {other:?}"),
        }
    }

    #[test]
    fn test_row_and_matrix_transforms_agree() {
        let matrix = array![[1.0, 10.0], [3.0, 30.0], [5.0, 50.0]];
        let scaler = StandardScaler::fit(&matrix).unwrap();

        let scaled_matrix = scaler.transform(&matrix).unwrap();
        for (i, row) in matrix.rows().into_iter().enumerate() {
            let scaled_row = scaler.transform_row(row.as_slice().unwrap()).unwrap();
            for (j, &value) in scaled_row.iter().enumerate() {
                assert!((scaled_matrix[[i, j]] - value).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_scaled_columns_have_zero_mean_unit_variance() {
        let matrix = array![[2.0, 100.0], [4.0, 200.0], [6.0, 300.0], [8.0, 400.0]];
        let scaler = StandardScaler::fit(&matrix).unwrap();
        let scaled = scaler.transform(&matrix).unwrap();

        let mean = scaled.mean_axis(Axis(0)).unwrap();
        let std = scaled.std_axis(Axis(0), 0.0);
        for j in 0..2 {
            assert!(mean[j].abs() < 1e-12);
            assert!((std[j] - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_column_count_mismatch_rejected() {
        let matrix = array![[1.0, 2.0], [3.0, 4.0]];
        let scaler = StandardScaler::fit(&matrix).unwrap();
        assert!(scaler.transform_row(&[1.0]).is_err());
    }
}
