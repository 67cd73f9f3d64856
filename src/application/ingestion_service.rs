// Ingestion service - Store sample, update cell aggregate, run anomaly detection
use crate::application::anomaly_detector::{AnomalyDetector, Reading};
use crate::application::cell_repository::CellRepository;
use crate::application::telemetry_repository::TelemetryRepository;
use crate::domain::cell::CellId;
use crate::domain::errors::{ServiceError, ServiceResult};
use crate::domain::telemetry::TelemetrySample;
use chrono::Utc;
use std::sync::Arc;

/// Raw ingestion request. Every field is optional so that presence can be
/// validated here rather than by the transport.
#[derive(Debug, Clone, Default)]
pub struct TelemetryInput {
    pub cell_id: Option<CellId>,
    pub voltage: Option<f64>,
    pub temperature: Option<f64>,
    pub cycle_count: Option<i64>,
}

impl TelemetryInput {
    fn validate(&self) -> ServiceResult<(CellId, f64, f64)> {
        let mut missing = Vec::new();
        if self.cell_id.is_none() {
            missing.push("cellId");
        }
        if self.voltage.is_none() {
            missing.push("voltage");
        }
        if self.temperature.is_none() {
            missing.push("temperature");
        }

        match (self.cell_id, self.voltage, self.temperature) {
            (Some(cell_id), Some(voltage), Some(temperature)) => {
                if !voltage.is_finite() || !temperature.is_finite() {
                    return Err(ServiceError::Validation(
                        "voltage and temperature must be finite numbers".to_string(),
                    ));
                }
                Ok((cell_id, voltage, temperature))
            }
            _ => Err(ServiceError::Validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            ))),
        }
    }
}

#[derive(Clone)]
pub struct IngestionService {
    telemetry: Arc<dyn TelemetryRepository>,
    cells: Arc<dyn CellRepository>,
    detector: AnomalyDetector,
}

impl IngestionService {
    pub fn new(
        telemetry: Arc<dyn TelemetryRepository>,
        cells: Arc<dyn CellRepository>,
        detector: AnomalyDetector,
    ) -> Self {
        Self {
            telemetry,
            cells,
            detector,
        }
    }

    /// Validation and the append are fatal. The cell update and anomaly
    /// detection that follow are isolated: their failures are logged and
    /// never undo the stored sample.
    pub async fn ingest(&self, input: TelemetryInput) -> ServiceResult<TelemetrySample> {
        let (cell_id, voltage, temperature) = input.validate()?;

        let sample = TelemetrySample::new(
            cell_id,
            voltage,
            temperature,
            input.cycle_count.unwrap_or(0),
            Utc::now(),
        );

        self.telemetry.append(&sample).await.map_err(|e| {
            tracing::error!(cell_id, error = %e, "Failed to store telemetry sample");
            e
        })?;

        match self
            .cells
            .apply_reading(cell_id, voltage, temperature, input.cycle_count)
            .await
        {
            Ok(Some(_)) => {}
            Ok(None) => {
                tracing::debug!(cell_id, "No active cell for sample, aggregate not updated");
            }
            Err(e) => {
                tracing::warn!(cell_id, error = %e, "Failed to update cell aggregate");
            }
        }

        let report = self.detector.detect(&Reading::from(&sample)).await;
        if !report.is_clean() {
            tracing::warn!(
                cell_id,
                failed = report.failed.len(),
                persisted = report.persisted.len(),
                "Anomaly detection completed with failures"
            );
        }
        for (anomaly, error) in &report.failed {
            tracing::warn!(
                cell_id,
                measurement = %anomaly.measurement,
                error = %error,
                "Failed to persist anomaly: {}",
                anomaly.description
            );
        }

        Ok(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::anomaly_repository::AnomalyRepository;
    use crate::application::telemetry_repository::TelemetryHistory;
    use crate::domain::anomaly::{AnomalyFilter, MeasurementType, Severity};
    use crate::domain::cell::{Cell, HealthStatus};
    use crate::domain::telemetry::TimeRange;
    use crate::domain::thresholds::ThresholdTable;
    use crate::infrastructure::memory_repository::failing::{
        FailingCellRepository, FailingTelemetryRepository, FlakyAnomalyRepository,
    };
    use futures::TryStreamExt;
    use crate::infrastructure::memory_repository::{
        MemoryAnomalyRepository, MemoryCellRepository, MemoryTelemetryRepository,
    };

    struct Fixture {
        service: IngestionService,
        telemetry: Arc<MemoryTelemetryRepository>,
        cells: Arc<MemoryCellRepository>,
        anomalies: Arc<MemoryAnomalyRepository>,
    }

    fn fixture() -> Fixture {
        let telemetry = Arc::new(MemoryTelemetryRepository::new());
        let cells = Arc::new(MemoryCellRepository::new());
        let anomalies = Arc::new(MemoryAnomalyRepository::new());
        let detector = AnomalyDetector::new(Arc::new(ThresholdTable::default()), anomalies.clone());
        Fixture {
            service: IngestionService::new(telemetry.clone(), cells.clone(), detector),
            telemetry,
            cells,
            anomalies,
        }
    }

    fn input(cell_id: CellId, voltage: f64, temperature: f64, cycle_count: Option<i64>) -> TelemetryInput {
        TelemetryInput {
            cell_id: Some(cell_id),
            voltage: Some(voltage),
            temperature: Some(temperature),
            cycle_count,
        }
    }

    async fn all_anomalies(repo: &dyn AnomalyRepository) -> Vec<crate::domain::anomaly::Anomaly> {
        let filter = AnomalyFilter {
            limit: 100,
            ..Default::default()
        };
        repo.list(&filter).await.unwrap().0
    }

    #[tokio::test]
    async fn test_high_voltage_scenario() {
        let f = fixture();
        f.cells.insert(Cell::new(7, HealthStatus::Healthy, 0)).await.unwrap();

        let sample = f.service.ingest(input(7, 4.5, 20.0, Some(10))).await.unwrap();
        assert_eq!(sample.cell_id, 7);
        assert_eq!(sample.cycle_count, 10);

        let cell = f.cells.find(7).await.unwrap().unwrap();
        assert_eq!(cell.avg_voltage, 4.5);
        assert_eq!(cell.avg_temperature, 20.0);
        assert_eq!(cell.charge_cycles, 10);

        let anomalies = all_anomalies(f.anomalies.as_ref()).await;
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].measurement, MeasurementType::Voltage);
        assert_eq!(anomalies[0].severity, Severity::High);
        assert_eq!(anomalies[0].value, 4.5);
        assert_eq!(anomalies[0].threshold, 4.2);
    }

    #[tokio::test]
    async fn test_critical_temperature_scenario() {
        let f = fixture();
        f.cells.insert(Cell::new(9, HealthStatus::Healthy, 3)).await.unwrap();

        let sample = f
            .service
            .ingest(TelemetryInput {
                cell_id: Some(9),
                voltage: Some(3.75),
                temperature: Some(42.0),
                cycle_count: None,
            })
            .await
            .unwrap();
        assert_eq!(sample.cycle_count, 0);
        assert_eq!(f.cells.find(9).await.unwrap().unwrap().charge_cycles, 3);

        let anomalies = all_anomalies(f.anomalies.as_ref()).await;
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].measurement, MeasurementType::Temperature);
        assert_eq!(anomalies[0].severity, Severity::Critical);
        assert_eq!(anomalies[0].value, 42.0);
        assert_eq!(anomalies[0].threshold, 40.0);
    }

    #[tokio::test]
    async fn test_missing_fields_have_no_side_effects() {
        let f = fixture();
        let err = f
            .service
            .ingest(TelemetryInput {
                cell_id: Some(1),
                voltage: None,
                temperature: Some(50.0),
                cycle_count: None,
            })
            .await
            .unwrap_err();

        match err {
            ServiceError::Validation(msg) => assert!(msg.contains("voltage")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(f.telemetry.latest(1).await.unwrap().is_none());
        assert!(all_anomalies(f.anomalies.as_ref()).await.is_empty());
    }

    #[tokio::test]
    async fn test_non_finite_values_are_rejected() {
        let f = fixture();
        let err = f.service.ingest(input(1, f64::NAN, 20.0, None)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_cell_is_still_ingested() {
        let f = fixture();
        f.service.ingest(input(42, 3.8, 25.0, None)).await.unwrap();

        assert!(f.cells.find(42).await.unwrap().is_none());
        assert!(f.telemetry.latest(42).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_sample_survives_anomaly_store_outage() {
        let telemetry = Arc::new(MemoryTelemetryRepository::new());
        let anomalies = Arc::new(FlakyAnomalyRepository {
            inner: MemoryAnomalyRepository::new(),
            fail_on: MeasurementType::ALL.to_vec(),
        });
        let detector = AnomalyDetector::new(Arc::new(ThresholdTable::default()), anomalies);
        let service = IngestionService::new(telemetry.clone(), Arc::new(FailingCellRepository), detector);

        let sample = service.ingest(input(3, 5.0, 60.0, None)).await.unwrap();

        let history: Vec<TelemetrySample> = TelemetryHistory::new(telemetry, 3, TimeRange::last_days(1).unwrap())
            .stream()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(history, vec![sample]);
    }

    #[tokio::test]
    async fn test_append_failure_is_fatal() {
        let anomalies = Arc::new(MemoryAnomalyRepository::new());
        let detector = AnomalyDetector::new(Arc::new(ThresholdTable::default()), anomalies.clone());
        let service = IngestionService::new(
            Arc::new(FailingTelemetryRepository),
            Arc::new(MemoryCellRepository::new()),
            detector,
        );

        let err = service.ingest(input(3, 5.0, 60.0, None)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Storage(_)));
        assert!(all_anomalies(anomalies.as_ref()).await.is_empty());
    }
}
