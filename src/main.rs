use conflict_risk_engine::{
    api::{build_router, AppState},
    config::Config,
    inference::InferenceService,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    // Initialize tracing; RUST_LOG wins over the configured filter
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.observability.log_level.clone().into());
    if config.observability.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!(
        "Starting Conflict Risk Engine v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Initialize inference service
    let service = Arc::new(InferenceService::new(config.training_config()));

    // Load the artifact bundle if one has been trained already
    match service.load_bundle() {
        Ok(()) => tracing::info!("Model bundle loaded"),
        Err(e) => {
            tracing::warn!("No usable model bundle: {}", e);
            tracing::warn!("Serving without a model; POST /v1/retrain to train one");
        }
    }

    // Build HTTP router
    let app = build_router(AppState::new(service));

    // Start HTTP server
    let http_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;

    tracing::info!("HTTP API server listening on http://{}", http_addr);
    tracing::info!("   Health check: http://{}/health", http_addr);
    tracing::info!("   Predict: http://{}/v1/predict", http_addr);
    tracing::info!("   Retrain: http://{}/v1/retrain", http_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(e) = result {
                tracing::error!("HTTP server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
