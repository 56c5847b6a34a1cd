use crate::error::{AppError, Result};
use crate::models::Label;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Train/test index partition.
#[derive(Debug, Clone)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Seeded stratified split preserving class-label proportions.
///
/// Indices are grouped per class, shuffled with the seeded RNG, and the
/// requested test fraction is taken from each class independently, so both
/// subsets keep the dataset's label balance.
pub fn stratified_split(labels: &[Label], test_fraction: f64, seed: u64) -> Result<SplitIndices> {
    if labels.is_empty() {
        return Err(AppError::Dataset(
            "cannot split an empty dataset".to_string(),
        ));
    }
    if !(0.0..1.0).contains(&test_fraction) || test_fraction <= 0.0 {
        return Err(AppError::Validation(format!(
            "test fraction must be in (0, 1), got {test_fraction}"
        )));
    }

    let mut by_class: [Vec<usize>; 2] = [Vec::new(), Vec::new()];
    for (idx, &label) in labels.iter().enumerate() {
        by_class[label as usize].push(idx);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for class_indices in by_class.iter_mut() {
        if class_indices.is_empty() {
            continue;
        }
        class_indices.shuffle(&mut rng);

        // A class with more than one member contributes at least one test
        // row and always keeps at least one training row.
        let n_test = ((class_indices.len() as f64) * test_fraction).round() as usize;
        let n_test = n_test
            .min(class_indices.len().saturating_sub(1))
            .max(usize::from(class_indices.len() > 1));

        test.extend_from_slice(&class_indices[..n_test]);
        train.extend_from_slice(&class_indices[n_test..]);
    }

    if train.is_empty() || test.is_empty() {
        return Err(AppError::Dataset(format!(
            "dataset too small to split: {} train rows, {} test rows",
            train.len(),
            test.len()
        )));
    }

    train.sort_unstable();
    test.sort_unstable();

    Ok(SplitIndices { train, test })
}
