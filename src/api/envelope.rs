//! Response envelope shared by every endpoint.
//!
//! Success bodies are `{ "data": T, "meta": {...} }`; failures are
//! `{ "error": { "code": "...", "message": "..." }, "meta": {...} }`.
//! Monitor errors map onto HTTP statuses here, so handlers only decide
//! between the two shapes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::background::MonitorError;

/// Stamped on every body so dashboards can tell fresh data from cached.
#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub timestamp: DateTime<Utc>,
    pub version: &'static str,
}

impl ResponseMeta {
    fn now() -> Self {
        Self {
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Response {
        let body = Self {
            data,
            meta: ResponseMeta::now(),
        };
        (StatusCode::OK, axum::Json(body)).into_response()
    }
}

/// Machine-readable failure class; serialized as `SCREAMING_SNAKE_CASE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    BadRequest,
    Conflict,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::Conflict => StatusCode::CONFLICT,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub error: ErrorDetail,
    pub meta: ResponseMeta,
}

impl ApiErrorResponse {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Response {
        let body = Self {
            error: ErrorDetail {
                code,
                message: message.into(),
            },
            meta: ResponseMeta::now(),
        };
        (code.status(), axum::Json(body)).into_response()
    }

    pub fn not_found(message: impl Into<String>) -> Response {
        Self::new(ErrorCode::NotFound, message)
    }
}

impl From<&MonitorError> for ErrorCode {
    fn from(err: &MonitorError) -> Self {
        match err {
            MonitorError::UnknownComponent(_) | MonitorError::ReservedStatus(_) => ErrorCode::BadRequest,
            MonitorError::RecoveryInProgress(_) => ErrorCode::Conflict,
        }
    }
}

impl IntoResponse for MonitorError {
    fn into_response(self) -> Response {
        ApiErrorResponse::new(ErrorCode::from(&self), self.to_string())
    }
}
