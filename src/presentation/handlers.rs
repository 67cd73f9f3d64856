// HTTP request handlers for telemetry and history
use crate::application::history_service::DEFAULT_HISTORY_DAYS;
use crate::application::ingestion_service::TelemetryInput;
use crate::domain::cell::CellId;
use crate::infrastructure::http_response::{json_envelope, json_ok, ApiError};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::Response,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct DaysQuery {
    pub days: Option<i64>,
}

impl DaysQuery {
    fn days(&self) -> Result<i64, ApiError> {
        match self.days {
            None => Ok(DEFAULT_HISTORY_DAYS),
            Some(days) if days >= 0 => Ok(days),
            Some(_) => Err(ApiError::BadRequest("days must not be negative".to_string())),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    pub cell_id: Option<CellId>,
    pub voltage: Option<f64>,
    pub temperature: Option<f64>,
    pub cycle_count: Option<i64>,
}

impl From<IngestRequest> for TelemetryInput {
    fn from(request: IngestRequest) -> Self {
        Self {
            cell_id: request.cell_id,
            voltage: request.voltage,
            temperature: request.temperature,
            cycle_count: request.cycle_count,
        }
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Ingest one telemetry sample
pub async fn ingest_telemetry(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<IngestRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let sample = state.ingestion_service.ingest(request.into()).await?;
    Ok(json_envelope(
        StatusCode::CREATED,
        "Telemetry data ingested successfully",
        sample,
    ))
}

/// Latest reading for every active cell
pub async fn realtime(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let snapshot = state.realtime_service.snapshot().await?;
    Ok(json_ok("Real-time data retrieved successfully", snapshot))
}

pub async fn voltage_history(
    path: Result<Path<CellId>, PathRejection>,
    query: Result<Query<DaysQuery>, QueryRejection>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let (Path(cell_id), Query(query)) = (path?, query?);
    let points = state.history_service.voltage_history(cell_id, query.days()?).await?;
    Ok(json_ok("Voltage history retrieved successfully", points))
}

pub async fn temperature_history(
    path: Result<Path<CellId>, PathRejection>,
    query: Result<Query<DaysQuery>, QueryRejection>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let (Path(cell_id), Query(query)) = (path?, query?);
    let points = state
        .history_service
        .temperature_history(cell_id, query.days()?)
        .await?;
    Ok(json_ok("Temperature history retrieved successfully", points))
}

/// Window statistics for one cell
pub async fn cell_history(
    path: Result<Path<CellId>, PathRejection>,
    query: Result<Query<DaysQuery>, QueryRejection>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let (Path(cell_id), Query(query)) = (path?, query?);
    let history = state.history_service.cell_history(cell_id, query.days()?).await?;
    Ok(json_ok("Historical cell info retrieved successfully", history))
}

pub async fn all_cells_history(
    query: Result<Query<DaysQuery>, QueryRejection>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let summaries = state.history_service.all_cells_history(query.days()?).await?;
    Ok(json_ok("All historical cells info retrieved successfully", summaries))
}
