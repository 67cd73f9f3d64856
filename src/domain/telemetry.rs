// Telemetry sample domain models
use super::cell::CellId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One immutable reading for a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySample {
    pub cell_id: CellId,
    pub voltage: f64,
    pub temperature: f64,
    pub cycle_count: i64,
    pub ts: DateTime<Utc>,
}

impl TelemetrySample {
    pub fn new(cell_id: CellId, voltage: f64, temperature: f64, cycle_count: i64, ts: DateTime<Utc>) -> Self {
        Self {
            cell_id,
            voltage,
            temperature,
            cycle_count,
            ts,
        }
    }
}

/// Inclusive time window used by history and aggregate queries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    #[serde(rename = "startDate")]
    pub start: DateTime<Utc>,
    #[serde(rename = "endDate")]
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Window ending now and reaching back `days` days. `None` when the
    /// start would fall outside the representable date range.
    pub fn last_days(days: i64) -> Option<Self> {
        let end = Utc::now();
        let start = end.checked_sub_signed(Duration::try_days(days)?)?;
        Some(Self::new(start, end))
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }
}

/// Min/max/average statistics over a window. All zero when the window is empty.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryStats {
    pub avg_voltage: f64,
    pub max_voltage: f64,
    pub min_voltage: f64,
    pub avg_temperature: f64,
    pub max_temperature: f64,
    pub min_temperature: f64,
    pub data_points: u64,
}

impl TelemetryStats {
    pub fn from_samples<'a, I>(samples: I) -> Self
    where
        I: IntoIterator<Item = &'a TelemetrySample>,
    {
        let mut stats = Self::default();
        let mut voltage_sum = 0.0;
        let mut temperature_sum = 0.0;

        for sample in samples {
            if stats.data_points == 0 {
                stats.min_voltage = sample.voltage;
                stats.max_voltage = sample.voltage;
                stats.min_temperature = sample.temperature;
                stats.max_temperature = sample.temperature;
            } else {
                stats.min_voltage = stats.min_voltage.min(sample.voltage);
                stats.max_voltage = stats.max_voltage.max(sample.voltage);
                stats.min_temperature = stats.min_temperature.min(sample.temperature);
                stats.max_temperature = stats.max_temperature.max(sample.temperature);
            }
            voltage_sum += sample.voltage;
            temperature_sum += sample.temperature;
            stats.data_points += 1;
        }

        if stats.data_points > 0 {
            stats.avg_voltage = voltage_sum / stats.data_points as f64;
            stats.avg_temperature = temperature_sum / stats.data_points as f64;
        }

        stats
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoltagePoint {
    pub ts: DateTime<Utc>,
    pub voltage: f64,
    pub cell_id: CellId,
}

impl From<TelemetrySample> for VoltagePoint {
    fn from(sample: TelemetrySample) -> Self {
        Self {
            ts: sample.ts,
            voltage: sample.voltage,
            cell_id: sample.cell_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperaturePoint {
    pub ts: DateTime<Utc>,
    pub temperature: f64,
    pub cell_id: CellId,
}

impl From<TelemetrySample> for TemperaturePoint {
    fn from(sample: TelemetrySample) -> Self {
        Self {
            ts: sample.ts,
            temperature: sample.temperature,
            cell_id: sample.cell_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(voltage: f64, temperature: f64) -> TelemetrySample {
        TelemetrySample::new(1, voltage, temperature, 0, Utc::now())
    }

    #[test]
    fn test_stats_over_empty_window_are_zero() {
        let stats = TelemetryStats::from_samples(&Vec::<TelemetrySample>::new());
        assert_eq!(stats, TelemetryStats::default());
        assert_eq!(stats.data_points, 0);
    }

    #[test]
    fn test_stats_min_max_avg() {
        let samples = vec![sample(3.6, 20.0), sample(4.0, 30.0), sample(3.8, 25.0)];
        let stats = TelemetryStats::from_samples(&samples);

        assert_eq!(stats.data_points, 3);
        assert_eq!(stats.min_voltage, 3.6);
        assert_eq!(stats.max_voltage, 4.0);
        assert!((stats.avg_voltage - 3.8).abs() < 1e-9);
        assert_eq!(stats.min_temperature, 20.0);
        assert_eq!(stats.max_temperature, 30.0);
        assert!((stats.avg_temperature - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_range_contains_is_inclusive() {
        let range = TimeRange::last_days(1).unwrap();
        assert!(range.contains(range.start));
        assert!(range.contains(range.end));
        assert!(!range.contains(range.start - Duration::seconds(1)));
    }

    #[test]
    fn test_oversized_window_is_rejected() {
        assert!(TimeRange::last_days(100_000_000).is_none());
        assert!(TimeRange::last_days(i64::MAX).is_none());
        assert!(TimeRange::last_days(36_500).is_some());
    }
}
