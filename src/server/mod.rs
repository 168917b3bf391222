//! HTTP server
//!
//! Upload-triggered training, trained item listing and per-item prediction
//! over a JSON API.

mod api;
mod error;
mod state;
mod handlers;

pub use api::create_router;
pub use error::ServerError;
pub use handlers::PredictRequest;
pub use state::{AppState, JobStatus, TrainingJob};

use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use crate::inference::PredictorConfig;
use crate::training::TrainerConfig;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub models_dir: String,
    pub uploads_dir: String,
    pub max_upload_size: usize,
    /// Completed or failed jobs kept for status queries; older ones are dropped
    pub max_finished_jobs: usize,
    pub trainer: TrainerConfig,
    pub predictor: PredictorConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            models_dir: std::env::var("MODELS_DIR").unwrap_or_else(|_| "./models".to_string()),
            uploads_dir: std::env::var("UPLOADS_DIR").unwrap_or_else(|_| "./uploads".to_string()),
            max_upload_size: std::env::var("MAX_UPLOAD_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10 * 1024 * 1024), // 10MB
            max_finished_jobs: std::env::var("MAX_FINISHED_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(256),
            trainer: TrainerConfig::default(),
            predictor: PredictorConfig::default().with_cache(64, 300),
        }
    }
}

/// Start the server with the given configuration
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();
    info!(
        models_dir = %config.models_dir,
        uploads_dir = %config.uploads_dir,
        started_at = %start_time.to_rfc3339(),
        "Initializing server directories"
    );

    std::fs::create_dir_all(&config.models_dir)?;
    std::fs::create_dir_all(&config.uploads_dir)?;

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let state = Arc::new(AppState::new(config.clone()));
    let app = create_router(state);

    info!(
        host = %config.host,
        port = config.port,
        address = %addr,
        max_upload_size_mb = config.max_upload_size / 1024 / 1024,
        n_estimators = config.trainer.n_estimators,
        "Menu forecast server starting"
    );
    info!(url = %format!("http://{}/api/health", addr), "Health endpoint available");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, pid = std::process::id(), "Server listening and ready to accept connections");

    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for ctrl+c");
            std::future::pending::<()>().await;
        }
        let stop_time = chrono::Utc::now();
        let uptime = stop_time.signed_duration_since(start_time);
        info!(
            stopped_at = %stop_time.to_rfc3339(),
            uptime_secs = uptime.num_seconds(),
            "Shutdown signal received, stopping server gracefully"
        );
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}
