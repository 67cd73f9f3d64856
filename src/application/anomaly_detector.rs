// Anomaly detector - Evaluates samples against the threshold table and persists findings
use crate::application::anomaly_repository::AnomalyRepository;
use crate::domain::anomaly::{Anomaly, MeasurementType};
use crate::domain::cell::CellId;
use crate::domain::errors::StorageError;
use crate::domain::telemetry::TelemetrySample;
use crate::domain::thresholds::ThresholdTable;
use futures::future::join_all;
use std::sync::Arc;

/// The fields of a sample the detector looks at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub cell_id: CellId,
    pub voltage: f64,
    pub temperature: f64,
    pub cycle_count: i64,
}

impl Reading {
    pub fn value_of(&self, measurement: MeasurementType) -> f64 {
        match measurement {
            MeasurementType::Temperature => self.temperature,
            MeasurementType::Voltage => self.voltage,
            MeasurementType::CycleCount => self.cycle_count as f64,
        }
    }
}

impl From<&TelemetrySample> for Reading {
    fn from(sample: &TelemetrySample) -> Self {
        Self {
            cell_id: sample.cell_id,
            voltage: sample.voltage,
            temperature: sample.temperature,
            cycle_count: sample.cycle_count,
        }
    }
}

/// Outcome of one detection pass. Anomalies that could not be stored are
/// reported alongside the error rather than aborting the pass.
#[derive(Debug, Default)]
pub struct DetectionReport {
    pub persisted: Vec<Anomaly>,
    pub failed: Vec<(Anomaly, StorageError)>,
}

impl DetectionReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Clone)]
pub struct AnomalyDetector {
    thresholds: Arc<ThresholdTable>,
    repository: Arc<dyn AnomalyRepository>,
}

impl AnomalyDetector {
    pub fn new(thresholds: Arc<ThresholdTable>, repository: Arc<dyn AnomalyRepository>) -> Self {
        Self {
            thresholds,
            repository,
        }
    }

    /// Pure evaluation: at most one anomaly per measurement type.
    pub fn evaluate(&self, reading: &Reading) -> Vec<Anomaly> {
        MeasurementType::ALL
            .iter()
            .filter_map(|&measurement| {
                let value = reading.value_of(measurement);
                self.thresholds.classify(measurement, value).map(|rule| {
                    let description = format!(
                        "{} {}: {}{}",
                        measurement.label(),
                        rule.direction,
                        value,
                        measurement.unit()
                    );
                    Anomaly::new(reading.cell_id, rule.severity, measurement, description, value, rule.boundary)
                })
            })
            .collect()
    }

    /// Evaluate and persist every finding concurrently.
    pub async fn detect(&self, reading: &Reading) -> DetectionReport {
        let anomalies = self.evaluate(reading);
        if anomalies.is_empty() {
            return DetectionReport::default();
        }

        let results = join_all(anomalies.iter().map(|a| self.repository.insert(a))).await;

        let mut report = DetectionReport::default();
        for (anomaly, result) in anomalies.into_iter().zip(results) {
            match result {
                Ok(()) => {
                    tracing::info!(
                        cell_id = anomaly.cell_id,
                        severity = anomaly.severity.as_str(),
                        measurement = %anomaly.measurement,
                        "{}",
                        anomaly.description
                    );
                    report.persisted.push(anomaly);
                }
                Err(e) => report.failed.push((anomaly, e)),
            }
        }
        report
    }
}
