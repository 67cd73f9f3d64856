// Route table
use crate::presentation::admin_handlers::{
    add_cell, get_anomaly, list_anomalies, list_cells, retire_cell, update_anomaly,
};
use crate::presentation::app_state::AppState;
use crate::presentation::auth::{require_admin, require_user};
use crate::presentation::handlers::{
    all_cells_history, cell_history, health_check, ingest_telemetry, realtime,
    temperature_history, voltage_history,
};
use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

pub fn build_router(state: Arc<AppState>) -> Router {
    let telemetry = Router::new()
        .route("/telemetry", post(ingest_telemetry))
        .route("/telemetry/realtime", get(realtime))
        .route("/telemetry/:cell_id/voltage/history", get(voltage_history))
        .route("/telemetry/:cell_id/temperature/history", get(temperature_history))
        .route_layer(middleware::from_fn_with_state(state.auth.clone(), require_user));

    let admin = Router::new()
        .route("/admin/cells", get(list_cells).post(add_cell))
        .route("/admin/cells/:cell_id", delete(retire_cell))
        .route("/admin/anomalies", get(list_anomalies))
        .route("/admin/anomalies/:id", get(get_anomaly).patch(update_anomaly))
        .route_layer(middleware::from_fn_with_state(state.auth.clone(), require_admin));

    Router::new()
        .route("/healthz", get(health_check))
        .route("/history/cells", get(all_cells_history))
        .route("/history/cells/:cell_id", get(cell_history))
        .merge(telemetry)
        .merge(admin)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
