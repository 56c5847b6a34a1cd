use crate::ml::ForestConfig;
use crate::pipeline::TrainingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Dataset and artifact paths
    pub data: DataConfig,

    /// Training configuration
    pub training: TrainingSettings,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/default.toml".to_string());

        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: CRISK_)
            .add_source(
                config::Environment::with_prefix("CRISK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Assemble the training-run configuration from the loaded settings.
    pub fn training_config(&self) -> TrainingConfig {
        TrainingConfig {
            data_path: self.data.dataset_path.clone(),
            bundle_dir: self.data.bundle_dir.clone(),
            test_fraction: self.training.test_fraction,
            seed: self.training.seed,
            forest: ForestConfig {
                n_trees: self.training.n_trees,
                max_depth: self.training.max_depth,
                min_samples_leaf: self.training.min_samples_leaf,
                seed: self.training.seed,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Training dataset (CSV)
    pub dataset_path: PathBuf,

    /// Directory the artifact bundle is read from and written to
    pub bundle_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSettings {
    /// Number of trees in the forest
    #[serde(default = "default_n_trees")]
    pub n_trees: usize,

    /// Depth limit per tree; unlimited when absent
    #[serde(default)]
    pub max_depth: Option<usize>,

    /// Minimum samples per leaf
    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,

    /// Seed for the split and the forest
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Held-out fraction for evaluation
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level filter
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON
    #[serde(default)]
    pub json_logs: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_n_trees() -> usize {
    100
}

fn default_min_samples_leaf() -> usize {
    1
}

fn default_seed() -> u64 {
    42
}

fn default_test_fraction() -> f64 {
    0.2
}

fn default_log_level() -> String {
    "conflict_risk_engine=info,tower_http=info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.training.n_trees, 100);
        assert_eq!(config.training.seed, 42);
        assert_eq!(config.training.test_fraction, 0.2);
    }

    #[test]
    fn test_training_config_assembly() {
        let config = Config {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
            },
            data: DataConfig {
                dataset_path: "data/conflict.csv".into(),
                bundle_dir: "models/current".into(),
            },
            training: TrainingSettings {
                n_trees: 50,
                max_depth: Some(12),
                min_samples_leaf: 2,
                seed: 7,
                test_fraction: 0.25,
            },
            observability: ObservabilityConfig {
                log_level: default_log_level(),
                json_logs: false,
            },
        };

        let training = config.training_config();
        assert_eq!(training.seed, 7);
        assert_eq!(training.forest.n_trees, 50);
        assert_eq!(training.forest.seed, 7);
        assert_eq!(training.forest.max_depth, Some(12));
    }
}
