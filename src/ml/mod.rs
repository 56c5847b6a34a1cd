//! The train/predict core: feature encoding, scaling, the tree ensemble,
//! splitting, and evaluation metrics.

pub mod codec;
pub mod forest;
pub mod metrics;
pub mod scaler;
pub mod split;

pub use codec::{CategoryEncoder, FeatureCodec};
pub use forest::{ForestConfig, RandomForest};
pub use metrics::EvaluationMetrics;
pub use scaler::StandardScaler;
pub use split::{stratified_split, SplitIndices};
