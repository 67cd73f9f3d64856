// History service - Per-cell time series and statistics over a window
use crate::application::cell_repository::CellRepository;
use crate::application::telemetry_repository::{TelemetryHistory, TelemetryRepository};
use crate::domain::cell::{CellId, HealthStatus};
use crate::domain::errors::{ServiceError, ServiceResult};
use crate::domain::telemetry::{TelemetryStats, TemperaturePoint, TimeRange, VoltagePoint};
use futures::TryStreamExt;
use serde::Serialize;
use std::sync::Arc;

pub const DEFAULT_HISTORY_DAYS: i64 = 30;

fn window(days: i64) -> ServiceResult<TimeRange> {
    TimeRange::last_days(days)
        .ok_or_else(|| ServiceError::Validation(format!("days out of range: {}", days)))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellHistory {
    pub cell_id: CellId,
    pub status: HealthStatus,
    pub charge_cycles: i64,
    pub statistics: TelemetryStats,
    pub period: TimeRange,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellHistorySummary {
    pub cell_id: CellId,
    pub status: HealthStatus,
    pub avg_voltage: f64,
    pub avg_temperature: f64,
    pub data_points: u64,
}

#[derive(Clone)]
pub struct HistoryService {
    telemetry: Arc<dyn TelemetryRepository>,
    cells: Arc<dyn CellRepository>,
}

impl HistoryService {
    pub fn new(telemetry: Arc<dyn TelemetryRepository>, cells: Arc<dyn CellRepository>) -> Self {
        Self { telemetry, cells }
    }

    pub fn history(&self, cell_id: CellId, range: TimeRange) -> TelemetryHistory {
        TelemetryHistory::new(self.telemetry.clone(), cell_id, range)
    }

    pub async fn voltage_history(&self, cell_id: CellId, days: i64) -> ServiceResult<Vec<VoltagePoint>> {
        let points: Vec<VoltagePoint> = self
            .history(cell_id, window(days)?)
            .stream()
            .map_ok(VoltagePoint::from)
            .try_collect()
            .await?;
        Ok(points)
    }

    pub async fn temperature_history(&self, cell_id: CellId, days: i64) -> ServiceResult<Vec<TemperaturePoint>> {
        let points: Vec<TemperaturePoint> = self
            .history(cell_id, window(days)?)
            .stream()
            .map_ok(TemperaturePoint::from)
            .try_collect()
            .await?;
        Ok(points)
    }

    pub async fn cell_history(&self, cell_id: CellId, days: i64) -> ServiceResult<CellHistory> {
        let period = window(days)?;
        let cell = self
            .cells
            .find(cell_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("cell {}", cell_id)))?;

        let statistics = self.telemetry.aggregate(cell_id, period).await?;

        Ok(CellHistory {
            cell_id: cell.cell_id,
            status: cell.status,
            charge_cycles: cell.charge_cycles,
            statistics,
            period,
        })
    }

    /// Window averages for every active cell. Cells with no data in the window
    /// report their stored aggregate fields.
    pub async fn all_cells_history(&self, days: i64) -> ServiceResult<Vec<CellHistorySummary>> {
        let period = window(days)?;
        let mut summaries = Vec::new();

        for cell in self.cells.list_active().await? {
            let stats = match self.telemetry.aggregate(cell.cell_id, period).await {
                Ok(stats) => stats,
                Err(e) => {
                    tracing::warn!(cell_id = cell.cell_id, error = %e, "Aggregate query failed");
                    TelemetryStats::default()
                }
            };

            let (avg_voltage, avg_temperature) = if stats.data_points > 0 {
                (stats.avg_voltage, stats.avg_temperature)
            } else {
                (cell.avg_voltage, cell.avg_temperature)
            };

            summaries.push(CellHistorySummary {
                cell_id: cell.cell_id,
                status: cell.status,
                avg_voltage,
                avg_temperature,
                data_points: stats.data_points,
            });
        }

        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cell::Cell;
    use crate::domain::telemetry::TelemetrySample;
    use crate::infrastructure::memory_repository::{MemoryCellRepository, MemoryTelemetryRepository};
    use chrono::{Duration, Utc};

    async fn service() -> HistoryService {
        let telemetry = Arc::new(MemoryTelemetryRepository::new());
        let cells = Arc::new(MemoryCellRepository::new());
        cells.insert(Cell::new(1, HealthStatus::Healthy, 4)).await.unwrap();
        cells.insert(Cell::new(2, HealthStatus::Critical, 0)).await.unwrap();

        let now = Utc::now();
        for (hours, v, t) in [(2, 3.6, 24.0), (1, 4.0, 28.0), (24 * 40, 2.0, 90.0)] {
            telemetry
                .append(&TelemetrySample::new(1, v, t, 0, now - Duration::hours(hours)))
                .await
                .unwrap();
        }
        HistoryService::new(telemetry, cells)
    }

    #[tokio::test]
    async fn test_voltage_history_is_windowed_and_ordered() {
        let service = service().await;
        let points = service.voltage_history(1, DEFAULT_HISTORY_DAYS).await.unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].voltage, 3.6);
        assert_eq!(points[1].voltage, 4.0);
        assert!(points[0].ts < points[1].ts);
    }

    #[tokio::test]
    async fn test_temperature_history_projection() {
        let service = service().await;
        let points = service.temperature_history(1, 1).await.unwrap();
        assert_eq!(points.iter().map(|p| p.temperature).collect::<Vec<_>>(), vec![24.0, 28.0]);
        assert!(points.iter().all(|p| p.cell_id == 1));
    }

    #[tokio::test]
    async fn test_cell_history_statistics() {
        let service = service().await;
        let history = service.cell_history(1, 30).await.unwrap();

        assert_eq!(history.statistics.data_points, 2);
        assert_eq!(history.statistics.max_voltage, 4.0);
        assert_eq!(history.statistics.min_temperature, 24.0);
        assert_eq!(history.charge_cycles, 4);

        let empty = service.cell_history(2, 30).await.unwrap();
        assert_eq!(empty.statistics, TelemetryStats::default());
    }

    #[tokio::test]
    async fn test_cell_history_unknown_cell() {
        let service = service().await;
        assert!(matches!(service.cell_history(99, 30).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_oversized_window_is_a_validation_error() {
        let service = service().await;
        assert!(matches!(
            service.voltage_history(1, 100_000_000).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(service.cell_history(1, i64::MAX).await, Err(ServiceError::Validation(_))));
        assert!(matches!(service.all_cells_history(i64::MAX).await, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_all_cells_history_falls_back_to_stored_values() {
        let service = service().await;
        let summaries = service.all_cells_history(30).await.unwrap();

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].data_points, 2);
        assert!((summaries[0].avg_voltage - 3.8).abs() < 1e-9);
        assert_eq!(summaries[1].data_points, 0);
        assert_eq!(summaries[1].avg_voltage, 3.85);
    }
}
