// HTTP response utilities for the JSON envelope
use crate::domain::errors::ServiceError;
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Serialize)]
struct SuccessBody<T> {
    success: bool,
    message: String,
    data: T,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    error: String,
}

/// `{success: true, message, data}` with the given status
pub fn json_envelope<T: Serialize>(status: StatusCode, message: &str, data: T) -> Response {
    let body = SuccessBody {
        success: true,
        message: message.to_string(),
        data,
    };
    (status, Json(body)).into_response()
}

pub fn json_ok<T: Serialize>(message: &str, data: T) -> Response {
    json_envelope(StatusCode::OK, message, data)
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "Validation failed",
            ApiError::NotFound(_) => "Resource not found",
            ApiError::Conflict(_) => "Resource already exists",
            ApiError::Unauthorized => "Authentication required",
            ApiError::Forbidden => "Admin access required",
            ApiError::Internal(_) => "Internal server error",
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::Validation(msg) => ApiError::BadRequest(msg),
            ServiceError::NotFound(what) => ApiError::NotFound(format!("{} not found", what)),
            ServiceError::Conflict(msg) => ApiError::Conflict(msg),
            ServiceError::Storage(e) => {
                tracing::error!(error = %e, "Storage failure");
                ApiError::Internal(e.to_string())
            }
        }
    }
}

// Extractor rejections carry axum's plain-text body; re-wrap them in the envelope.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            message: self.message().to_string(),
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
