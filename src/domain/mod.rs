// Domain layer - Battery cells, telemetry samples, anomalies and thresholds
pub mod anomaly;
pub mod cell;
pub mod errors;
pub mod telemetry;
pub mod thresholds;
