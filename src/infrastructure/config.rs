use crate::domain::thresholds::ThresholdTable;
use serde::Deserialize;
use std::path::Path;

const SERVICE_CONFIG: &str = "config/service";
const THRESHOLDS_CONFIG: &str = "config/thresholds";
const ENV_PREFIX: &str = "BATTERY";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    pub influx: Option<InfluxSettings>,
    #[serde(default)]
    pub auth: AuthSettings,
    /// Cells registered at startup when the store does not know them yet
    #[serde(default)]
    pub seed_cell_ids: Vec<i64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Influx,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageSettings {
    #[serde(default)]
    pub backend: StorageBackend,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InfluxSettings {
    pub host: String,
    pub token: String,
    pub database: String,
    pub retention_policy: String,
    #[serde(default = "default_measurement")]
    pub measurement: String,
}

fn default_measurement() -> String {
    "battery_telemetry".to_string()
}

/// Static bearer tokens. No tokens at all leaves the API open.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AuthSettings {
    #[serde(default)]
    pub admin_tokens: Vec<String>,
    #[serde(default)]
    pub user_tokens: Vec<String>,
}

pub fn load_service_config() -> anyhow::Result<ServiceConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name(SERVICE_CONFIG).required(false))
        .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Threshold table from `config/thresholds.toml`, or the built-in defaults
/// when no such file exists.
pub fn load_thresholds() -> anyhow::Result<ThresholdTable> {
    if !Path::new(&format!("{}.toml", THRESHOLDS_CONFIG)).exists() {
        tracing::info!("No threshold config found, using built-in thresholds");
        return Ok(ThresholdTable::default());
    }

    let settings = config::Config::builder()
        .add_source(config::File::with_name(THRESHOLDS_CONFIG))
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::anomaly::{MeasurementType, Severity};
    use crate::domain::thresholds::Comparison;
    use config::{Config, File, FileFormat};

    #[test]
    fn test_service_config_defaults() {
        let settings = Config::builder()
            .add_source(File::from_str("", FileFormat::Toml))
            .build()
            .unwrap();
        let config: ServiceConfig = settings.try_deserialize().unwrap();

        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert!(config.influx.is_none());
        assert!(config.auth.admin_tokens.is_empty());
    }

    #[test]
    fn test_service_config_influx_backend() {
        let toml = r#"
            seed_cell_ids = [1, 2]

            [storage]
            backend = "influx"

            [influx]
            host = "http://localhost:8086/"
            token = "secret"
            database = "battery"
            retention_policy = "autogen"

            [auth]
            admin_tokens = ["root-token"]
        "#;
        let settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap();
        let config: ServiceConfig = settings.try_deserialize().unwrap();

        assert_eq!(config.storage.backend, StorageBackend::Influx);
        let influx = config.influx.unwrap();
        assert_eq!(influx.measurement, "battery_telemetry");
        assert_eq!(config.seed_cell_ids, vec![1, 2]);
        assert_eq!(config.auth.admin_tokens, vec!["root-token".to_string()]);
    }

    #[test]
    fn test_threshold_table_from_toml() {
        let toml = r#"
            [[temperature]]
            severity = "critical"
            comparison = "above"
            boundary = 45.0
            direction = "critically high"

            [[cycle_count]]
            severity = "medium"
            comparison = "above"
            boundary = 1000
            direction = "high"
        "#;
        let settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap();
        let table: ThresholdTable = settings.try_deserialize().unwrap();

        assert_eq!(table.temperature.len(), 1);
        assert_eq!(table.temperature[0].boundary, 45.0);
        assert!(table.voltage.is_empty());
        let rule = table.classify(MeasurementType::CycleCount, 1001.0).unwrap();
        assert_eq!(rule.severity, Severity::Medium);
        assert_eq!(rule.comparison, Comparison::Above);
    }
}
