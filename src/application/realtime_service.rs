// Real-time service - Latest known reading per active cell
use crate::application::cell_repository::CellRepository;
use crate::application::telemetry_repository::TelemetryRepository;
use crate::domain::cell::{Cell, CellId, HealthStatus};
use crate::domain::errors::ServiceResult;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellSnapshot {
    pub cell_id: CellId,
    pub voltage: f64,
    pub temperature: f64,
    pub cycle_count: i64,
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
}

impl CellSnapshot {
    /// Snapshot built from the cell's own stored aggregate fields.
    fn from_cell(cell: &Cell) -> Self {
        Self {
            cell_id: cell.cell_id,
            voltage: cell.avg_voltage,
            temperature: cell.avg_temperature,
            cycle_count: cell.charge_cycles,
            status: cell.status,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Clone)]
pub struct RealtimeService {
    telemetry: Arc<dyn TelemetryRepository>,
    cells: Arc<dyn CellRepository>,
}

impl RealtimeService {
    pub fn new(telemetry: Arc<dyn TelemetryRepository>, cells: Arc<dyn CellRepository>) -> Self {
        Self { telemetry, cells }
    }

    /// One snapshot per active cell, ordered by cell id. The per-cell lookups
    /// run concurrently.
    pub async fn snapshot(&self) -> ServiceResult<Vec<CellSnapshot>> {
        let cells = self.cells.list_active().await?;

        let lookups = cells.iter().map(|cell| async move {
            match self.telemetry.latest(cell.cell_id).await {
                Ok(Some(sample)) => CellSnapshot {
                    cell_id: cell.cell_id,
                    voltage: sample.voltage,
                    temperature: sample.temperature,
                    cycle_count: sample.cycle_count,
                    status: cell.status,
                    timestamp: sample.ts,
                },
                Ok(None) => CellSnapshot::from_cell(cell),
                Err(e) => {
                    tracing::warn!(cell_id = cell.cell_id, error = %e, "Latest sample lookup failed, using stored aggregate");
                    CellSnapshot::from_cell(cell)
                }
            }
        });

        Ok(join_all(lookups).await)
    }
}
