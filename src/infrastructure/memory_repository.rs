// In-memory repository implementations
use crate::application::anomaly_repository::AnomalyRepository;
use crate::application::cell_repository::CellRepository;
use crate::application::telemetry_repository::TelemetryRepository;
use crate::domain::anomaly::{Anomaly, AnomalyFilter, AnomalyId};
use crate::domain::cell::{Cell, CellId};
use crate::domain::errors::StorageError;
use crate::domain::telemetry::{TelemetrySample, TelemetryStats, TimeRange};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

/// Samples kept per cell, sorted by timestamp.
#[derive(Debug, Default)]
pub struct MemoryTelemetryRepository {
    samples: RwLock<HashMap<CellId, Vec<TelemetrySample>>>,
}

impl MemoryTelemetryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TelemetryRepository for MemoryTelemetryRepository {
    async fn append(&self, sample: &TelemetrySample) -> Result<(), StorageError> {
        let mut samples = self.samples.write();
        let series = samples.entry(sample.cell_id).or_default();
        // Insert after any sample with an equal timestamp to keep arrival order
        let idx = series.partition_point(|s| s.ts <= sample.ts);
        series.insert(idx, sample.clone());
        Ok(())
    }

    async fn history_page(
        &self,
        cell_id: CellId,
        range: TimeRange,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<TelemetrySample>, StorageError> {
        let samples = self.samples.read();
        let page = samples
            .get(&cell_id)
            .map(|series| {
                series
                    .iter()
                    .filter(|s| range.contains(s.ts))
                    .skip(offset)
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(page)
    }

    async fn latest(&self, cell_id: CellId) -> Result<Option<TelemetrySample>, StorageError> {
        Ok(self
            .samples
            .read()
            .get(&cell_id)
            .and_then(|series| series.last().cloned()))
    }

    async fn aggregate(&self, cell_id: CellId, range: TimeRange) -> Result<TelemetryStats, StorageError> {
        let samples = self.samples.read();
        let stats = match samples.get(&cell_id) {
            Some(series) => TelemetryStats::from_samples(series.iter().filter(|s| range.contains(s.ts))),
            None => TelemetryStats::default(),
        };
        Ok(stats)
    }
}

#[derive(Debug, Default)]
pub struct MemoryCellRepository {
    cells: RwLock<BTreeMap<CellId, Cell>>,
}

impl MemoryCellRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CellRepository for MemoryCellRepository {
    async fn find(&self, cell_id: CellId) -> Result<Option<Cell>, StorageError> {
        Ok(self.cells.read().get(&cell_id).cloned())
    }

    async fn list_active(&self) -> Result<Vec<Cell>, StorageError> {
        Ok(self
            .cells
            .read()
            .values()
            .filter(|c| c.is_active())
            .cloned()
            .collect())
    }

    async fn insert(&self, cell: Cell) -> Result<bool, StorageError> {
        let mut cells = self.cells.write();
        if cells.contains_key(&cell.cell_id) {
            return Ok(false);
        }
        cells.insert(cell.cell_id, cell);
        Ok(true)
    }

    async fn apply_reading(
        &self,
        cell_id: CellId,
        voltage: f64,
        temperature: f64,
        cycle_count: Option<i64>,
    ) -> Result<Option<Cell>, StorageError> {
        // The whole record is rewritten under one write lock, so concurrent
        // readings for the same cell never interleave their fields.
        let mut cells = self.cells.write();
        match cells.get_mut(&cell_id) {
            Some(cell) if cell.is_active() => {
                cell.apply_reading(voltage, temperature, cycle_count);
                Ok(Some(cell.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn retire(&self, cell_id: CellId) -> Result<Option<Cell>, StorageError> {
        let mut cells = self.cells.write();
        Ok(cells.get_mut(&cell_id).map(|cell| {
            cell.retire();
            cell.clone()
        }))
    }
}

#[derive(Debug, Default)]
pub struct MemoryAnomalyRepository {
    anomalies: RwLock<HashMap<AnomalyId, Anomaly>>,
}

impl MemoryAnomalyRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AnomalyRepository for MemoryAnomalyRepository {
    async fn insert(&self, anomaly: &Anomaly) -> Result<(), StorageError> {
        self.anomalies.write().insert(anomaly.id, anomaly.clone());
        Ok(())
    }

    async fn find(&self, id: AnomalyId) -> Result<Option<Anomaly>, StorageError> {
        Ok(self.anomalies.read().get(&id).cloned())
    }

    async fn list(&self, filter: &AnomalyFilter) -> Result<(Vec<Anomaly>, usize), StorageError> {
        let mut matching: Vec<Anomaly> = self
            .anomalies
            .read()
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.detected_at.cmp(&a.detected_at));

        let total = matching.len();
        let page = matching.into_iter().skip(filter.skip).take(filter.limit).collect();
        Ok((page, total))
    }

    async fn set_resolved(&self, id: AnomalyId, resolved: bool) -> Result<Option<Anomaly>, StorageError> {
        let mut anomalies = self.anomalies.write();
        Ok(anomalies.get_mut(&id).map(|anomaly| {
            anomaly.is_resolved = resolved;
            anomaly.clone()
        }))
    }
}

/// Repository doubles whose every call fails, for exercising fault isolation.
#[cfg(test)]
pub mod failing {
    use super::*;

    fn unavailable() -> StorageError {
        StorageError::Unavailable("store offline".to_string())
    }

    #[derive(Debug, Default)]
    pub struct FailingTelemetryRepository;

    #[async_trait]
    impl TelemetryRepository for FailingTelemetryRepository {
        async fn append(&self, _sample: &TelemetrySample) -> Result<(), StorageError> {
            Err(unavailable())
        }

        async fn history_page(
            &self,
            _cell_id: CellId,
            _range: TimeRange,
            _offset: usize,
            _limit: usize,
        ) -> Result<Vec<TelemetrySample>, StorageError> {
            Err(unavailable())
        }

        async fn latest(&self, _cell_id: CellId) -> Result<Option<TelemetrySample>, StorageError> {
            Err(unavailable())
        }

        async fn aggregate(&self, _cell_id: CellId, _range: TimeRange) -> Result<TelemetryStats, StorageError> {
            Err(unavailable())
        }
    }

    /// Fails inserts for the listed measurement types and delegates everything else.
    #[derive(Debug, Default)]
    pub struct FlakyAnomalyRepository {
        pub inner: MemoryAnomalyRepository,
        pub fail_on: Vec<crate::domain::anomaly::MeasurementType>,
    }

    #[async_trait]
    impl AnomalyRepository for FlakyAnomalyRepository {
        async fn insert(&self, anomaly: &Anomaly) -> Result<(), StorageError> {
            if self.fail_on.contains(&anomaly.measurement) {
                return Err(unavailable());
            }
            self.inner.insert(anomaly).await
        }

        async fn find(&self, id: AnomalyId) -> Result<Option<Anomaly>, StorageError> {
            self.inner.find(id).await
        }

        async fn list(&self, filter: &AnomalyFilter) -> Result<(Vec<Anomaly>, usize), StorageError> {
            self.inner.list(filter).await
        }

        async fn set_resolved(&self, id: AnomalyId, resolved: bool) -> Result<Option<Anomaly>, StorageError> {
            self.inner.set_resolved(id, resolved).await
        }
    }

    #[derive(Debug, Default)]
    pub struct FailingCellRepository;

    #[async_trait]
    impl CellRepository for FailingCellRepository {
        async fn find(&self, _cell_id: CellId) -> Result<Option<Cell>, StorageError> {
            Err(unavailable())
        }

        async fn list_active(&self) -> Result<Vec<Cell>, StorageError> {
            Err(unavailable())
        }

        async fn insert(&self, _cell: Cell) -> Result<bool, StorageError> {
            Err(unavailable())
        }

        async fn apply_reading(
            &self,
            _cell_id: CellId,
            _voltage: f64,
            _temperature: f64,
            _cycle_count: Option<i64>,
        ) -> Result<Option<Cell>, StorageError> {
            Err(unavailable())
        }

        async fn retire(&self, _cell_id: CellId) -> Result<Option<Cell>, StorageError> {
            Err(unavailable())
        }
    }
}
