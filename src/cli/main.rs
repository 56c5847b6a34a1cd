use anyhow::Context;
use clap::{Parser, Subcommand};
use conflict_risk_engine::{
    bundle::ArtifactBundle,
    dataset,
    inference::InferenceService,
    ml::ForestConfig,
    models::ConflictRecord,
    pipeline::{ProgressChannel, TrainingConfig, TrainingPipeline},
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "crisk")]
#[command(about = "Conflict Risk Engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model from a CSV dataset and persist the artifact bundle
    Train {
        /// Training dataset (CSV)
        #[arg(short, long)]
        data: PathBuf,

        /// Output directory for the artifact bundle
        #[arg(short, long, default_value = "models/current")]
        bundle_dir: PathBuf,

        /// Number of trees
        #[arg(short = 'n', long, default_value = "100")]
        n_trees: usize,

        /// Depth limit per tree
        #[arg(long)]
        max_depth: Option<usize>,

        /// Seed for the split and the forest
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Held-out fraction for evaluation
        #[arg(short, long, default_value = "0.2")]
        test_fraction: f64,
    },

    /// Predict a single record from a JSON file
    Predict {
        /// JSON file holding one record
        #[arg(value_name = "RECORD_JSON")]
        record: PathBuf,

        /// Artifact bundle directory
        #[arg(short, long, default_value = "models/current")]
        bundle_dir: PathBuf,
    },

    /// Predict a batch of records from a CSV file
    Batch {
        /// CSV file holding the records
        #[arg(value_name = "RECORDS_CSV")]
        records: PathBuf,

        /// Artifact bundle directory
        #[arg(short, long, default_value = "models/current")]
        bundle_dir: PathBuf,
    },

    /// Show metadata for a persisted bundle
    Info {
        /// Artifact bundle directory
        #[arg(short, long, default_value = "models/current")]
        bundle_dir: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "conflict_risk_engine=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            data,
            bundle_dir,
            n_trees,
            max_depth,
            seed,
            test_fraction,
        } => {
            let config = TrainingConfig {
                data_path: data,
                bundle_dir: bundle_dir.clone(),
                test_fraction,
                seed,
                forest: ForestConfig {
                    n_trees,
                    max_depth,
                    min_samples_leaf: 1,
                    seed,
                },
            };
            let pipeline = TrainingPipeline::new(config, ProgressChannel::default());
            let report = pipeline.run().context("training failed")?;

            println!("Trained on {} samples ({} train / {} test)", report.n_samples, report.n_train, report.n_test);
            println!("  accuracy:  {:.4}", report.metrics.accuracy);
            println!("  precision: {:.4}", report.metrics.precision);
            println!("  recall:    {:.4}", report.metrics.recall);
            println!("  f1:        {:.4}", report.metrics.f1_score);
            println!("Bundle written to {}", bundle_dir.display());
        }

        Commands::Predict { record, bundle_dir } => {
            let service = service_for(bundle_dir)?;
            let json = std::fs::read_to_string(&record)
                .with_context(|| format!("reading {}", record.display()))?;
            let record: ConflictRecord =
                serde_json::from_str(&json).context("parsing record JSON")?;

            let prediction = service.predict_one(&record)?;
            println!("{}", serde_json::to_string_pretty(&prediction)?);
        }

        Commands::Batch { records, bundle_dir } => {
            let service = service_for(bundle_dir)?;
            let file = std::fs::File::open(&records)
                .with_context(|| format!("opening {}", records.display()))?;
            let rows = dataset::read_inference_records(file)?;

            let result = service.predict_batch(&rows)?;
            println!(
                "{} rows: {} conflict, {} no-conflict, {} rejected",
                result.total,
                result.count_label1,
                result.count_label0,
                result.rejected.len()
            );
            for rejection in &result.rejected {
                eprintln!("  row {}: {}", rejection.index, rejection.reason);
            }
            println!("{}", serde_json::to_string_pretty(&result.predictions)?);
        }

        Commands::Info { bundle_dir } => {
            let bundle = ArtifactBundle::load(&bundle_dir)?;
            println!("{}", serde_json::to_string_pretty(&bundle.metadata)?);
        }
    }

    Ok(())
}

fn service_for(bundle_dir: PathBuf) -> anyhow::Result<InferenceService> {
    let config = TrainingConfig::new(PathBuf::new(), bundle_dir);
    let service = InferenceService::new(config);
    service.load_bundle().context("loading artifact bundle")?;
    Ok(service)
}
