// Cell domain model
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type CellId = i64;

pub const DEFAULT_AVG_VOLTAGE: f64 = 3.85;
pub const DEFAULT_AVG_TEMPERATURE: f64 = 28.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HealthStatus {
    #[default]
    Healthy,
    Warning,
    Critical,
}

/// Soft-delete state. Retired cells stay in the store but are invisible to
/// ingestion and the real-time view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellLifecycle {
    #[default]
    Active,
    Retired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    pub cell_id: CellId,
    pub status: HealthStatus,
    pub charge_cycles: i64,
    /// Voltage of the most recent sample. Not a running average despite the name.
    pub avg_voltage: f64,
    /// Temperature of the most recent sample. Not a running average despite the name.
    pub avg_temperature: f64,
    pub lifecycle: CellLifecycle,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cell {
    pub fn new(cell_id: CellId, status: HealthStatus, charge_cycles: i64) -> Self {
        let now = Utc::now();
        Self {
            cell_id,
            status,
            charge_cycles,
            avg_voltage: DEFAULT_AVG_VOLTAGE,
            avg_temperature: DEFAULT_AVG_TEMPERATURE,
            lifecycle: CellLifecycle::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.lifecycle == CellLifecycle::Active
    }

    /// Overwrite the aggregate fields with one sample's readings.
    /// `cycle_count` of `None` keeps the current charge cycles.
    pub fn apply_reading(&mut self, voltage: f64, temperature: f64, cycle_count: Option<i64>) {
        self.avg_voltage = voltage;
        self.avg_temperature = temperature;
        if let Some(cycles) = cycle_count {
            self.charge_cycles = cycles;
        }
        self.updated_at = Utc::now();
    }

    pub fn retire(&mut self) {
        self.lifecycle = CellLifecycle::Retired;
        self.updated_at = Utc::now();
    }
}
