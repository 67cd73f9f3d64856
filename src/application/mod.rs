// Application layer - Use cases over the repository traits
pub mod admin_service;
pub mod anomaly_detector;
pub mod anomaly_repository;
pub mod cell_repository;
pub mod history_service;
pub mod ingestion_service;
pub mod realtime_service;
pub mod telemetry_repository;
