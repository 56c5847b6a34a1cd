use crate::error::{AppError, Result};
use crate::models::Label;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Random forest hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    /// Number of trees in the ensemble.
    pub n_trees: usize,

    /// Maximum tree depth; `None` grows trees to purity.
    pub max_depth: Option<usize>,

    /// Minimum number of samples a leaf may hold.
    pub min_samples_leaf: usize,

    /// Master seed; fixing it makes `fit` fully reproducible.
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_leaf: 1,
            seed: 42,
        }
    }
}

/// One node of a fitted decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        label: Label,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn predict(&self, features: &[f64]) -> Label {
        match self {
            Node::Leaf { label } => *label,
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if features[*feature] <= *threshold {
                    left.predict(features)
                } else {
                    right.predict(features)
                }
            }
        }
    }
}

/// Bagged ensemble of Gini-split decision trees.
///
/// Each tree is fitted on a bootstrap resample and considers a random
/// sqrt-sized feature subset at every split. Trees are fitted in parallel,
/// each from a seed derived from the master seed and the tree index, so the
/// ensemble is identical for a fixed seed regardless of thread scheduling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    config: ForestConfig,
    trees: Vec<Node>,
    n_features: usize,
}

impl RandomForest {
    /// Train the ensemble on a scaled feature matrix and labels.
    pub fn fit(features: &Array2<f64>, labels: &[Label], config: ForestConfig) -> Result<Self> {
        let n_samples = features.nrows();
        let n_features = features.ncols();

        if n_samples == 0 || n_features == 0 {
            return Err(AppError::Dataset(
                "cannot fit forest on an empty feature matrix".to_string(),
            ));
        }
        if labels.len() != n_samples {
            return Err(AppError::Internal(format!(
                "label count {} does not match sample count {}",
                labels.len(),
                n_samples
            )));
        }
        if config.n_trees == 0 {
            return Err(AppError::Validation(
                "forest must have at least one tree".to_string(),
            ));
        }

        let rows: Vec<&[f64]> = features
            .rows()
            .into_iter()
            .map(|row| {
                row.to_slice().ok_or_else(|| {
                    AppError::Internal("feature matrix is not contiguous".to_string())
                })
            })
            .collect::<Result<_>>()?;

        let n_subset = feature_subset_size(n_features);
        let trees: Vec<Node> = (0..config.n_trees)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = StdRng::seed_from_u64(tree_seed(config.seed, tree_idx));
                let sample: Vec<usize> = (0..n_samples)
                    .map(|_| rng.gen_range(0..n_samples))
                    .collect();
                build_tree(&rows, labels, &sample, n_subset, 0, &config, &mut rng)
            })
            .collect();

        Ok(Self {
            config,
            trees,
            n_features,
        })
    }

    /// Majority vote over all trees. A 50/50 tie resolves to label 0.
    pub fn predict_label(&self, features: &[f64]) -> Result<Label> {
        let [p0, p1] = self.predict_proba(features)?;
        Ok(u8::from(p1 > p0))
    }

    /// Fraction of trees voting each class, as `[p0, p1]`.
    pub fn predict_proba(&self, features: &[f64]) -> Result<[f64; 2]> {
        if features.len() != self.n_features {
            return Err(AppError::Internal(format!(
                "feature vector has {} columns, forest was fitted on {}",
                features.len(),
                self.n_features
            )));
        }

        let votes_for_one: usize = self
            .trees
            .iter()
            .filter(|tree| tree.predict(features) == 1)
            .count();
        let p1 = votes_for_one as f64 / self.trees.len() as f64;
        Ok([1.0 - p1, p1])
    }

    /// Predict labels for each row of a scaled feature matrix.
    pub fn predict_batch(&self, features: &Array2<f64>) -> Result<Vec<Label>> {
        features
            .rows()
            .into_iter()
            .map(|row| {
                let slice = row.to_slice().ok_or_else(|| {
                    AppError::Internal("feature matrix is not contiguous".to_string())
                })?;
                self.predict_label(slice)
            })
            .collect()
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }
}

/// Features considered per split: floor(sqrt(n)), at least 1.
fn feature_subset_size(n_features: usize) -> usize {
    ((n_features as f64).sqrt().floor() as usize).max(1)
}

/// Derive an independent per-tree seed from the master seed.
fn tree_seed(master: u64, tree_idx: usize) -> u64 {
    // SplitMix64 step over master + index keeps per-tree streams decorrelated.
    let mut z = master
        .wrapping_add(0x9E37_79B9_7F4A_7C15u64.wrapping_mul(tree_idx as u64 + 1));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn majority_label(labels: &[Label], indices: &[usize]) -> Label {
    let ones = indices.iter().filter(|&&i| labels[i] == 1).count();
    u8::from(ones * 2 > indices.len())
}

fn gini(counts: [usize; 2]) -> f64 {
    let total = (counts[0] + counts[1]) as f64;
    if total == 0.0 {
        return 0.0;
    }
    let p0 = counts[0] as f64 / total;
    let p1 = counts[1] as f64 / total;
    1.0 - p0 * p0 - p1 * p1
}

fn is_pure(labels: &[Label], indices: &[usize]) -> bool {
    indices
        .windows(2)
        .all(|w| labels[w[0]] == labels[w[1]])
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

/// Find the lowest-impurity split over a random feature subset.
fn best_split(
    rows: &[&[f64]],
    labels: &[Label],
    indices: &[usize],
    n_subset: usize,
    min_samples_leaf: usize,
    rng: &mut StdRng,
) -> Option<BestSplit> {
    let n_features = rows[0].len();
    let subset = rand::seq::index::sample(rng, n_features, n_subset.min(n_features));

    let mut best: Option<BestSplit> = None;

    for feature in subset.iter() {
        // Sort node members by this feature; candidate thresholds are the
        // midpoints between adjacent distinct values.
        let mut ordered: Vec<usize> = indices.to_vec();
        ordered.sort_by(|&a, &b| {
            rows[a][feature]
                .partial_cmp(&rows[b][feature])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let total = ordered.len();
        let mut left_counts = [0usize; 2];
        let mut right_counts = [0usize; 2];
        for &i in &ordered {
            right_counts[labels[i] as usize] += 1;
        }

        for pos in 1..total {
            let moved = ordered[pos - 1];
            left_counts[labels[moved] as usize] += 1;
            right_counts[labels[moved] as usize] -= 1;

            let prev_value = rows[ordered[pos - 1]][feature];
            let value = rows[ordered[pos]][feature];
            if prev_value == value {
                continue;
            }
            if pos < min_samples_leaf || total - pos < min_samples_leaf {
                continue;
            }

            let left_weight = pos as f64 / total as f64;
            let impurity =
                left_weight * gini(left_counts) + (1.0 - left_weight) * gini(right_counts);

            let improves = match &best {
                Some(current) => impurity < current.impurity,
                None => true,
            };
            if improves {
                best = Some(BestSplit {
                    feature,
                    threshold: (prev_value + value) / 2.0,
                    impurity,
                });
            }
        }
    }

    best
}

fn build_tree(
    rows: &[&[f64]],
    labels: &[Label],
    indices: &[usize],
    n_subset: usize,
    depth: usize,
    config: &ForestConfig,
    rng: &mut StdRng,
) -> Node {
    let at_depth_limit = config
        .max_depth
        .map(|limit| depth >= limit)
        .unwrap_or(false);

    if indices.len() < 2 * config.min_samples_leaf.max(1)
        || at_depth_limit
        || is_pure(labels, indices)
    {
        return Node::Leaf {
            label: majority_label(labels, indices),
        };
    }

    let parent_impurity = {
        let mut counts = [0usize; 2];
        for &i in indices {
            counts[labels[i] as usize] += 1;
        }
        gini(counts)
    };

    let split = match best_split(
        rows,
        labels,
        indices,
        n_subset,
        config.min_samples_leaf.max(1),
        rng,
    ) {
        Some(split) if split.impurity < parent_impurity => split,
        _ => {
            return Node::Leaf {
                label: majority_label(labels, indices),
            }
        }
    };

    let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .copied()
        .partition(|&i| rows[i][split.feature] <= split.threshold);

    if left_indices.is_empty() || right_indices.is_empty() {
        return Node::Leaf {
            label: majority_label(labels, indices),
        };
    }

    let left = build_tree(rows, labels, &left_indices, n_subset, depth + 1, config, rng);
    let right = build_tree(
        rows,
        labels,
        &right_indices,
        n_subset,
        depth + 1,
        config,
        rng,
    );

    Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        left: Box::new(left),
        right: Box::new(right),
    }
}
