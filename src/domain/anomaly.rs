// Anomaly domain model
use super::cell::CellId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub type AnomalyId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

/// The quantity a threshold rule is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementType {
    Temperature,
    Voltage,
    CycleCount,
}

impl MeasurementType {
    pub const ALL: [MeasurementType; 3] = [
        MeasurementType::Temperature,
        MeasurementType::Voltage,
        MeasurementType::CycleCount,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MeasurementType::Temperature => "Temperature",
            MeasurementType::Voltage => "Voltage",
            MeasurementType::CycleCount => "Cycle count",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            MeasurementType::Temperature => "°C",
            MeasurementType::Voltage => "V",
            MeasurementType::CycleCount => "",
        }
    }
}

impl fmt::Display for MeasurementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MeasurementType::Temperature => "temperature",
            MeasurementType::Voltage => "voltage",
            MeasurementType::CycleCount => "cycle_count",
        };
        f.write_str(name)
    }
}

/// A detected out-of-band reading. Everything except `is_resolved` is fixed
/// at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anomaly {
    pub id: AnomalyId,
    pub cell_id: CellId,
    pub severity: Severity,
    #[serde(rename = "type")]
    pub measurement: MeasurementType,
    pub description: String,
    pub value: f64,
    pub threshold: f64,
    pub detected_at: DateTime<Utc>,
    pub is_resolved: bool,
}

impl Anomaly {
    pub fn new(
        cell_id: CellId,
        severity: Severity,
        measurement: MeasurementType,
        description: String,
        value: f64,
        threshold: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            cell_id,
            severity,
            measurement,
            description,
            value,
            threshold,
            detected_at: Utc::now(),
            is_resolved: false,
        }
    }
}

/// Filter and paging for the admin anomaly listing.
#[derive(Debug, Clone, Default)]
pub struct AnomalyFilter {
    pub severity: Option<Severity>,
    pub resolved: Option<bool>,
    pub limit: usize,
    pub skip: usize,
}

impl AnomalyFilter {
    pub fn matches(&self, anomaly: &Anomaly) -> bool {
        self.severity.is_none_or(|s| anomaly.severity == s)
            && self.resolved.is_none_or(|r| anomaly.is_resolved == r)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnomalyPage {
    pub anomalies: Vec<Anomaly>,
    pub total: usize,
    pub limit: usize,
    pub skip: usize,
}
