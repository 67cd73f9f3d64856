// Threshold table - severity bands per measurement type
use super::anomaly::{MeasurementType, Severity};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    Above,
    Below,
}

/// One severity band: a reading strictly above (or below) `boundary` maps to `severity`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BandRule {
    pub severity: Severity,
    pub comparison: Comparison,
    pub boundary: f64,
    /// Wording used in the anomaly description, e.g. "too low".
    pub direction: String,
}

impl BandRule {
    pub fn new(severity: Severity, comparison: Comparison, boundary: f64, direction: &str) -> Self {
        Self {
            severity,
            comparison,
            boundary,
            direction: direction.to_string(),
        }
    }

    pub fn matches(&self, value: f64) -> bool {
        match self.comparison {
            Comparison::Above => value > self.boundary,
            Comparison::Below => value < self.boundary,
        }
    }
}

/// Ordered band rules per measurement type. Within a type the first matching
/// rule wins, so the most severe band must be listed first.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ThresholdTable {
    #[serde(default)]
    pub temperature: Vec<BandRule>,
    #[serde(default)]
    pub voltage: Vec<BandRule>,
    #[serde(default)]
    pub cycle_count: Vec<BandRule>,
}

impl ThresholdTable {
    pub fn rules_for(&self, measurement: MeasurementType) -> &[BandRule] {
        match measurement {
            MeasurementType::Temperature => &self.temperature,
            MeasurementType::Voltage => &self.voltage,
            MeasurementType::CycleCount => &self.cycle_count,
        }
    }

    /// First band matched by `value`, if any.
    pub fn classify(&self, measurement: MeasurementType, value: f64) -> Option<&BandRule> {
        self.rules_for(measurement).iter().find(|rule| rule.matches(value))
    }
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self {
            temperature: vec![
                BandRule::new(Severity::Critical, Comparison::Above, 40.0, "critically high"),
                BandRule::new(Severity::High, Comparison::Above, 35.0, "high"),
            ],
            voltage: vec![
                BandRule::new(Severity::High, Comparison::Above, 4.2, "too high"),
                BandRule::new(Severity::High, Comparison::Below, 3.2, "too low"),
            ],
            cycle_count: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_critical_band_takes_precedence() {
        let table = ThresholdTable::default();
        let rule = table.classify(MeasurementType::Temperature, 45.0).unwrap();
        assert_eq!(rule.severity, Severity::Critical);
        assert_eq!(rule.boundary, 40.0);

        let rule = table.classify(MeasurementType::Temperature, 40.0).unwrap();
        assert_eq!(rule.severity, Severity::High);
    }

    #[test]
    fn test_boundaries_are_strict() {
        let table = ThresholdTable::default();
        assert!(table.classify(MeasurementType::Temperature, 35.0).is_none());
        assert!(table.classify(MeasurementType::Voltage, 4.2).is_none());
        assert!(table.classify(MeasurementType::Voltage, 3.2).is_none());
    }

    #[test]
    fn test_cycle_count_has_no_default_rules() {
        let table = ThresholdTable::default();
        assert!(table.rules_for(MeasurementType::CycleCount).is_empty());
        assert!(table.classify(MeasurementType::CycleCount, 1.0e9).is_none());
    }

    #[test]
    fn test_deserialize_from_json() {
        let table: ThresholdTable = serde_json::from_value(serde_json::json!({
            "voltage": [
                { "severity": "medium", "comparison": "below", "boundary": 3.0, "direction": "too low" }
            ]
        }))
        .unwrap();

        assert!(table.temperature.is_empty());
        assert_eq!(table.voltage[0].comparison, Comparison::Below);
        assert!(table.voltage[0].matches(2.9));
    }
}
