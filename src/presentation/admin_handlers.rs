// HTTP request handlers for the admin surface
use crate::application::admin_service::DEFAULT_ANOMALY_LIMIT;
use crate::domain::anomaly::{AnomalyFilter, AnomalyId, Severity};
use crate::domain::cell::{CellId, HealthStatus};
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
pub struct AnomalyQuery {
    pub severity: Option<String>,
    pub resolved: Option<String>,
    pub limit: Option<usize>,
    pub skip: Option<usize>,
}

impl AnomalyQuery {
    fn into_filter(self) -> Result<AnomalyFilter, ApiError> {
        let severity = match self.severity.as_deref() {
            None | Some("") => None,
            Some(s) => Some(s.parse::<Severity>().map_err(ApiError::BadRequest)?),
        };
        Ok(AnomalyFilter {
            severity,
            // Anything other than "true" filters for unresolved
            resolved: self.resolved.map(|r| r == "true"),
            limit: self.limit.unwrap_or(DEFAULT_ANOMALY_LIMIT),
            skip: self.skip.unwrap_or(0),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCellRequest {
    pub cell_id: CellId,
    pub status: Option<HealthStatus>,
    pub charge_cycles: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    pub is_resolved: bool,
}

pub async fn list_cells(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let cells = state.admin_service.list_cells().await?;
    Ok(json_ok("All cells retrieved successfully", cells))
}

pub async fn add_cell(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewCellRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let cell = state
        .admin_service
        .add_cell(request.cell_id, request.status, request.charge_cycles)
        .await?;
    Ok(json_envelope(StatusCode::CREATED, "Cell added successfully", cell))
}

pub async fn retire_cell(
    path: Result<Path<CellId>, PathRejection>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let Path(cell_id) = path?;
    let cell = state.admin_service.retire_cell(cell_id).await?;
    Ok(json_ok("Cell deleted successfully", cell))
}

pub async fn list_anomalies(
    query: Result<Query<AnomalyQuery>, QueryRejection>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let page = state.admin_service.list_anomalies(query.into_filter()?).await?;
    Ok(json_ok("All anomalies retrieved successfully", page))
}

pub async fn get_anomaly(
    path: Result<Path<AnomalyId>, PathRejection>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let Path(id) = path?;
    let anomaly = state.admin_service.get_anomaly(id).await?;
    Ok(json_ok("Anomaly retrieved successfully", anomaly))
}

pub async fn update_anomaly(
    path: Result<Path<AnomalyId>, PathRejection>,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ResolveRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let (Path(id), Json(request)) = (path?, payload?);
    let anomaly = state
        .admin_service
        .set_anomaly_resolved(id, request.is_resolved)
        .await?;
    Ok(json_ok("Anomaly status updated successfully", anomaly))
}
