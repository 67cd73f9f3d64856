// Admin service - Cell registry and anomaly review
use crate::application::anomaly_repository::AnomalyRepository;
use crate::application::cell_repository::CellRepository;
use crate::domain::anomaly::{Anomaly, AnomalyFilter, AnomalyId, AnomalyPage};
use crate::domain::cell::{Cell, CellId, HealthStatus};
use crate::domain::errors::{ServiceError, ServiceResult};
use std::sync::Arc;

pub const DEFAULT_ANOMALY_LIMIT: usize = 100;

#[derive(Clone)]
pub struct AdminService {
    cells: Arc<dyn CellRepository>,
    anomalies: Arc<dyn AnomalyRepository>,
}

impl AdminService {
    pub fn new(cells: Arc<dyn CellRepository>, anomalies: Arc<dyn AnomalyRepository>) -> Self {
        Self { cells, anomalies }
    }

    pub async fn list_cells(&self) -> ServiceResult<Vec<Cell>> {
        Ok(self.cells.list_active().await?)
    }

    pub async fn add_cell(
        &self,
        cell_id: CellId,
        status: Option<HealthStatus>,
        charge_cycles: Option<i64>,
    ) -> ServiceResult<Cell> {
        let cell = Cell::new(cell_id, status.unwrap_or_default(), charge_cycles.unwrap_or(0));
        if !self.cells.insert(cell.clone()).await? {
            return Err(ServiceError::Conflict(format!("cell {} already exists", cell_id)));
        }
        tracing::info!(cell_id, "Cell registered");
        Ok(cell)
    }

    pub async fn retire_cell(&self, cell_id: CellId) -> ServiceResult<Cell> {
        let cell = self
            .cells
            .retire(cell_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("cell {}", cell_id)))?;
        tracing::info!(cell_id, "Cell retired");
        Ok(cell)
    }

    pub async fn list_anomalies(&self, filter: AnomalyFilter) -> ServiceResult<AnomalyPage> {
        let (anomalies, total) = self.anomalies.list(&filter).await?;
        Ok(AnomalyPage {
            anomalies,
            total,
            limit: filter.limit,
            skip: filter.skip,
        })
    }

    pub async fn get_anomaly(&self, id: AnomalyId) -> ServiceResult<Anomaly> {
        self.anomalies
            .find(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("anomaly {}", id)))
    }

    pub async fn set_anomaly_resolved(&self, id: AnomalyId, resolved: bool) -> ServiceResult<Anomaly> {
        self.anomalies
            .set_resolved(id, resolved)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("anomaly {}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::anomaly::{MeasurementType, Severity};
    use crate::infrastructure::memory_repository::{MemoryAnomalyRepository, MemoryCellRepository};
    use uuid::Uuid;

    fn service() -> (AdminService, Arc<MemoryAnomalyRepository>) {
        let anomalies = Arc::new(MemoryAnomalyRepository::new());
        (
            AdminService::new(Arc::new(MemoryCellRepository::new()), anomalies.clone()),
            anomalies,
        )
    }

    #[tokio::test]
    async fn test_add_cell_rejects_duplicates() {
        let (service, _) = service();
        let cell = service.add_cell(5, None, Some(12)).await.unwrap();
        assert_eq!(cell.status, HealthStatus::Healthy);
        assert_eq!(cell.charge_cycles, 12);

        assert!(matches!(service.add_cell(5, None, None).await, Err(ServiceError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_retire_cell() {
        let (service, _) = service();
        service.add_cell(1, None, None).await.unwrap();
        service.add_cell(2, Some(HealthStatus::Warning), None).await.unwrap();

        let retired = service.retire_cell(1).await.unwrap();
        assert!(!retired.is_active());

        let active = service.list_cells().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].cell_id, 2);

        assert!(matches!(service.retire_cell(9).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_resolve_anomaly() {
        let (service, repo) = service();
        let anomaly = Anomaly::new(1, Severity::Critical, MeasurementType::Temperature, "t".into(), 45.0, 40.0);
        repo.insert(&anomaly).await.unwrap();

        let resolved = service.set_anomaly_resolved(anomaly.id, true).await.unwrap();
        assert!(resolved.is_resolved);

        let page = service
            .list_anomalies(AnomalyFilter {
                resolved: Some(false),
                limit: DEFAULT_ANOMALY_LIMIT,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 0);
        assert_eq!(page.limit, DEFAULT_ANOMALY_LIMIT);

        assert!(matches!(
            service.get_anomaly(Uuid::new_v4()).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
