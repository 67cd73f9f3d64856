// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use crate::application::anomaly_repository::AnomalyRepository;
use crate::application::cell_repository::CellRepository;
use crate::application::telemetry_repository::TelemetryRepository;
use crate::domain::cell::{Cell, HealthStatus};
use crate::infrastructure::config::{load_service_config, load_thresholds, ServiceConfig, StorageBackend};
use crate::infrastructure::influx_repository::InfluxRepository;
use crate::infrastructure::memory_repository::{
    MemoryAnomalyRepository, MemoryCellRepository, MemoryTelemetryRepository,
};
use crate::presentation::app_state::AppState;
use crate::presentation::auth::AuthGate;
use crate::presentation::router::build_router;

fn telemetry_repository(config: &ServiceConfig) -> anyhow::Result<Arc<dyn TelemetryRepository>> {
    match config.storage.backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryTelemetryRepository::new())),
        StorageBackend::Influx => {
            let influx = config
                .influx
                .clone()
                .context("storage.backend = \"influx\" requires an [influx] section")?;
            tracing::info!(host = %influx.host, database = %influx.database, "Using InfluxDB telemetry store");
            Ok(Arc::new(InfluxRepository::new(
                influx.host,
                influx.token,
                influx.database,
                influx.retention_policy,
                influx.measurement,
            )))
        }
    }
}

async fn seed_cells(cells: &dyn CellRepository, ids: &[i64]) -> anyhow::Result<()> {
    for &cell_id in ids {
        if cells.insert(Cell::new(cell_id, HealthStatus::Healthy, 0)).await? {
            tracing::info!(cell_id, "Seeded cell");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_service_config()?;
    let thresholds = load_thresholds()?;

    // Create repositories (infrastructure layer)
    let telemetry = telemetry_repository(&config)?;
    let cells: Arc<dyn CellRepository> = Arc::new(MemoryCellRepository::new());
    let anomalies: Arc<dyn AnomalyRepository> = Arc::new(MemoryAnomalyRepository::new());
    seed_cells(cells.as_ref(), &config.seed_cell_ids).await?;

    // Create services and application state
    let state = Arc::new(AppState::new(
        telemetry,
        cells,
        anomalies,
        thresholds,
        AuthGate::new(&config.auth),
    ));

    // Build router (presentation layer)
    let router = build_router(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", config.server.bind))?;
    tracing::info!("Starting battery-telemetry service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
