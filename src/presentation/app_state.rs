// Application state for HTTP handlers
use crate::application::admin_service::AdminService;
use crate::application::anomaly_detector::AnomalyDetector;
use crate::application::anomaly_repository::AnomalyRepository;
use crate::application::cell_repository::CellRepository;
use crate::application::history_service::HistoryService;
use crate::application::ingestion_service::IngestionService;
use crate::application::realtime_service::RealtimeService;
use crate::application::telemetry_repository::TelemetryRepository;
use crate::domain::thresholds::ThresholdTable;
use crate::presentation::auth::AuthGate;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub ingestion_service: IngestionService,
    pub realtime_service: RealtimeService,
    pub history_service: HistoryService,
    pub admin_service: AdminService,
    pub auth: Arc<AuthGate>,
}

impl AppState {
    pub fn new(
        telemetry: Arc<dyn TelemetryRepository>,
        cells: Arc<dyn CellRepository>,
        anomalies: Arc<dyn AnomalyRepository>,
        thresholds: ThresholdTable,
        auth: AuthGate,
    ) -> Self {
        let detector = AnomalyDetector::new(Arc::new(thresholds), anomalies.clone());
        Self {
            ingestion_service: IngestionService::new(telemetry.clone(), cells.clone(), detector),
            realtime_service: RealtimeService::new(telemetry.clone(), cells.clone()),
            history_service: HistoryService::new(telemetry, cells.clone()),
            admin_service: AdminService::new(cells, anomalies),
            auth: Arc::new(auth),
        }
    }
}
